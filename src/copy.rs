/// Copy the head of `source` into `destination` at `destination_offset`.
///
/// The number of bytes copied is the smallest of `source.len()`, `count`
/// and the capacity left in `destination` past the offset. Returns the
/// unconsumed tail of `source` and the number of bytes copied.
pub fn copy_with_remainder(
    destination: &mut [u8],
    destination_offset: usize,
    count: usize,
    source: &[u8],
) -> (Vec<u8>, usize) {
    let capacity = destination.len().saturating_sub(destination_offset);
    let copied = source.len().min(count).min(capacity);
    if copied > 0 {
        destination[destination_offset..destination_offset + copied]
            .copy_from_slice(&source[..copied]);
    }
    (source[copied..].to_vec(), copied)
}
