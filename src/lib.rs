//! Expose a tabular row cursor as a pull-based byte stream of delimited text.
//!
//! [`RowStream`] wraps any [`RowCursor`] and encodes one row at a time into
//! the caller's buffer, carrying the unread tail of a row over to the next
//! read. The `rowstream_*` functions expose the same adapter over a C ABI.

// The extern "C" functions below receive raw pointers from the host runtime.
// Each one checks for null before dereferencing; lengths are trusted.
#![allow(clippy::not_unsafe_ptr_arg_deref)]

mod config;
mod copy;
mod cursor;
mod debug;
mod encoding;
mod error;
mod handle;
mod reader;
mod sql;
mod value;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use base64::Engine;

pub use config::StreamConfig;
pub use copy::copy_with_remainder;
pub use cursor::{MemoryCursor, RowCursor, RowSet, RowSetColumn};
pub use debug::set_debug;
pub use encoding::{TextEncoder, TextEncoding};
pub use error::{Result, StreamError};
pub use reader::RowStream;
pub use sql::{open_query_cursor, sql_value_to_value, SqlRowCursor};
pub use value::Value;

fn read_cstr<'a>(ptr: *const c_char, param: &'static str) -> Result<&'a str> {
    if ptr.is_null() {
        return Err(StreamError::NullArgument(param));
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|e| StreamError::invalid(param, format!("Invalid UTF-8: {e}")))
}

fn to_cstring(s: &str) -> *mut c_char {
    CString::new(s).unwrap_or_default().into_raw()
}

/// Check the raw arguments of a buffer read, in the order the adapter
/// reports them: null buffer, overrun, negative offset, negative count.
fn validate_read_args(
    buffer_present: bool,
    buffer_len: usize,
    offset: i64,
    count: i64,
) -> Result<(usize, usize)> {
    if !buffer_present {
        return Err(StreamError::NullArgument("buffer"));
    }
    let end = offset.checked_add(count);
    if end.is_none_or(|end| end > 0 && end as u64 > buffer_len as u64) {
        return Err(StreamError::invalid("buffer", "Buffer is too small"));
    }
    if offset < 0 {
        return Err(StreamError::out_of_range("offset", "Offset cannot be negative"));
    }
    if count < 0 {
        return Err(StreamError::out_of_range("count", "Count cannot be negative"));
    }
    Ok((offset as usize, count as usize))
}

/// Largest single `rowstream_read` the host may request.
const MAX_READ_BYTES: u64 = 16 * 1024 * 1024;

fn alloc_read_buffer(max_bytes: u64) -> Result<Vec<u8>> {
    if max_bytes > MAX_READ_BYTES {
        return Err(StreamError::out_of_range(
            "max_bytes",
            format!("{max_bytes} exceeds the {MAX_READ_BYTES} byte read limit"),
        ));
    }
    let len = usize::try_from(max_bytes)
        .map_err(|_| StreamError::out_of_range("max_bytes", "does not fit in memory"))?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|e| StreamError::out_of_range("max_bytes", format!("allocation failed: {e}")))?;
    buf.resize(len, 0);
    Ok(buf)
}

// ══════════════════════════════════════════════════════════════
// Stream FFI
// ══════════════════════════════════════════════════════════════

/// Open a stream over a JSON row set. `config_json` may be null for
/// defaults. Returns 0 on failure; see `rowstream_last_error(0)`.
#[no_mangle]
pub extern "C" fn rowstream_open(rows_json: *const c_char, config_json: *const c_char) -> u64 {
    debug::init();
    let result = (|| -> Result<u64> {
        let rows = read_cstr(rows_json, "rows")?;
        let config = if config_json.is_null() {
            StreamConfig::default()
        } else {
            StreamConfig::from_json(read_cstr(config_json, "config")?)?
        };
        let cursor = MemoryCursor::from_json(rows)?;
        let stream = RowStream::from_config(cursor, &config)?;
        Ok(handle::store_stream(stream))
    })();
    match result {
        Ok(id) => {
            debug::debug_log!("Stream opened: id={}", id);
            id
        }
        Err(e) => {
            handle::set_open_error(e.to_string());
            0
        }
    }
}

/// Read up to `max_bytes` and return JSON `{ "data": base64, "length": n }`,
/// or `{ "__error": message }`.
#[no_mangle]
pub extern "C" fn rowstream_read(stream_id: u64, max_bytes: u64) -> *mut c_char {
    let result = handle::get_stream(stream_id).and_then(|h| {
        let mut buf = alloc_read_buffer(max_bytes)?;
        let len = buf.len();
        let n = h.lock().read_at(&mut buf, 0, len)?;
        buf.truncate(n);
        Ok(buf)
    });
    let response = match result {
        Ok(data) => serde_json::json!({
            "data": base64::engine::general_purpose::STANDARD.encode(&data),
            "length": data.len(),
        }),
        Err(e) => serde_json::json!({ "__error": e.to_string() }),
    };
    to_cstring(&response.to_string())
}

/// Read into caller memory at `buffer[offset..offset + count]`.
/// Returns the number of bytes written, or -1 with the error recorded on
/// the handle.
#[no_mangle]
pub extern "C" fn rowstream_read_into(
    stream_id: u64,
    buffer: *mut u8,
    buffer_len: usize,
    offset: i64,
    count: i64,
) -> i64 {
    let handle = match handle::get_stream(stream_id) {
        Ok(h) => h,
        Err(_) => return -1,
    };
    let result = validate_read_args(!buffer.is_null(), buffer_len, offset, count).and_then(
        |(offset, count)| {
            let buf = unsafe { std::slice::from_raw_parts_mut(buffer, buffer_len) };
            handle.lock().read_at(buf, offset, count)
        },
    );
    match result {
        Ok(n) => n as i64,
        Err(e) => {
            handle.set_error(e.to_string());
            -1
        }
    }
}

#[no_mangle]
pub extern "C" fn rowstream_can_read(stream_id: u64) -> u32 {
    match handle::get_stream(stream_id) {
        Ok(h) if h.lock().can_read() => 1,
        _ => 0,
    }
}

/// Close the stream's cursor. The handle stays valid; reads now fail.
#[no_mangle]
pub extern "C" fn rowstream_close(stream_id: u64) {
    debug::debug_log!("Closing stream {}", stream_id);
    if let Ok(h) = handle::get_stream(stream_id) {
        h.lock().close();
    }
}

/// Release the handle entirely.
#[no_mangle]
pub extern "C" fn rowstream_free(stream_id: u64) {
    debug::debug_log!("Freeing stream {}", stream_id);
    handle::remove_stream(stream_id);
}

#[no_mangle]
pub extern "C" fn rowstream_close_all() {
    debug::debug_log!("Closing all streams");
    handle::remove_all_streams();
}

// ══════════════════════════════════════════════════════════════
// Diagnostics / Debug FFI
// ══════════════════════════════════════════════════════════════

#[no_mangle]
pub extern "C" fn rowstream_diagnostic_info() -> *mut c_char {
    to_cstring(&handle::diagnostic_snapshot().to_string())
}

#[no_mangle]
pub extern "C" fn rowstream_set_debug(enabled: u32) {
    debug::set_debug(enabled != 0);
}

// ══════════════════════════════════════════════════════════════
// Error / Memory FFI
// ══════════════════════════════════════════════════════════════

/// Take the last error for a handle. Handle 0 returns the last failed open.
#[no_mangle]
pub extern "C" fn rowstream_last_error(stream_id: u64) -> *mut c_char {
    let err = if stream_id == 0 {
        handle::take_open_error()
    } else {
        handle::get_stream(stream_id).ok().and_then(|h| h.take_error())
    };
    match err {
        Some(msg) => to_cstring(&msg),
        None => std::ptr::null_mut(),
    }
}

#[no_mangle]
pub extern "C" fn rowstream_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            drop(CString::from_raw(ptr));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cstring(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    fn take_string(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        let s = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string();
        rowstream_free_string(ptr);
        s
    }

    fn open_two_rows() -> u64 {
        let rows = cstring(r#"{"rows": [["r0c0", "r0c1"], ["r1c0", "r1c1"]]}"#);
        let id = rowstream_open(rows.as_ptr(), std::ptr::null());
        assert_ne!(id, 0);
        id
    }

    #[test]
    fn validate_read_args_order() {
        assert!(matches!(
            validate_read_args(false, 4, 0, 1),
            Err(StreamError::NullArgument("buffer"))
        ));
        assert!(matches!(
            validate_read_args(true, 1, 0, 2),
            Err(StreamError::InvalidArgument { param: "buffer", .. })
        ));
        assert!(matches!(
            validate_read_args(true, 12, -1, 1),
            Err(StreamError::OutOfRange { param: "offset", .. })
        ));
        assert!(matches!(
            validate_read_args(true, 12, 0, -1),
            Err(StreamError::OutOfRange { param: "count", .. })
        ));
        assert!(matches!(
            validate_read_args(true, 12, i64::MAX, 1),
            Err(StreamError::InvalidArgument { param: "buffer", .. })
        ));
        assert_eq!(validate_read_args(true, 12, 2, 10).unwrap(), (2, 10));
    }

    #[test]
    fn open_read_close() {
        let id = open_two_rows();
        assert_eq!(rowstream_can_read(id), 1);

        let response: serde_json::Value =
            serde_json::from_str(&take_string(rowstream_read(id, 11))).unwrap();
        assert_eq!(response["length"], 11);
        let data = base64::engine::general_purpose::STANDARD
            .decode(response["data"].as_str().unwrap())
            .unwrap();
        assert_eq!(data, b"r0c0\tr0c1\r\n");

        rowstream_close(id);
        assert_eq!(rowstream_can_read(id), 0);
        let response: serde_json::Value =
            serde_json::from_str(&take_string(rowstream_read(id, 11))).unwrap();
        assert!(response["__error"].as_str().unwrap().contains("closed"));

        rowstream_free(id);
        assert_eq!(rowstream_can_read(id), 0);
    }

    #[test]
    fn oversized_read_returns_error() {
        let id = open_two_rows();
        for max in [u64::MAX, MAX_READ_BYTES + 1] {
            let response: serde_json::Value =
                serde_json::from_str(&take_string(rowstream_read(id, max))).unwrap();
            assert!(response["__error"].as_str().unwrap().contains("max_bytes"));
        }

        let response: serde_json::Value =
            serde_json::from_str(&take_string(rowstream_read(id, 4))).unwrap();
        assert_eq!(response["length"], 4);
        rowstream_free(id);
    }

    #[test]
    fn read_into_caller_buffer() {
        let id = open_two_rows();
        let mut buffer = [0u8; 16];
        let n = rowstream_read_into(id, buffer.as_mut_ptr(), buffer.len(), 3, 13);
        assert_eq!(n, 13);
        assert_eq!(&buffer, b"\0\0\0r0c0\tr0c1\r\nr1");

        let n = rowstream_read_into(id, buffer.as_mut_ptr(), buffer.len(), -1, 1);
        assert_eq!(n, -1);
        assert!(take_string(rowstream_last_error(id)).contains("offset"));

        let n = rowstream_read_into(id, std::ptr::null_mut(), 0, 0, 1);
        assert_eq!(n, -1);
        assert!(take_string(rowstream_last_error(id)).contains("buffer"));

        rowstream_free(id);
    }

    #[test]
    fn open_with_config() {
        let rows = cstring(r#"{"rows": [["a", "b"]]}"#);
        let config = cstring(r#"{"field_delimiter": ",", "end_of_line_delimiter": "\n"}"#);
        let id = rowstream_open(rows.as_ptr(), config.as_ptr());
        assert_ne!(id, 0);
        let mut buffer = [0u8; 8];
        let n = rowstream_read_into(id, buffer.as_mut_ptr(), buffer.len(), 0, 8);
        assert_eq!(&buffer[..n as usize], b"a,b\n");
        rowstream_free(id);
    }

    #[test]
    fn open_failures() {
        assert_eq!(rowstream_open(std::ptr::null(), std::ptr::null()), 0);

        let rows = cstring(r#"{"rows": []}"#);
        let config = cstring(r#"{"field_delimiter": ""}"#);
        assert_eq!(rowstream_open(rows.as_ptr(), config.as_ptr()), 0);

        let config = cstring(r#"{"encoding": "ebcdic"}"#);
        assert_eq!(rowstream_open(rows.as_ptr(), config.as_ptr()), 0);
    }

    #[test]
    fn unknown_handle() {
        assert_eq!(rowstream_can_read(u64::MAX), 0);
        let mut buffer = [0u8; 4];
        assert_eq!(
            rowstream_read_into(u64::MAX, buffer.as_mut_ptr(), buffer.len(), 0, 4),
            -1
        );
        assert!(rowstream_last_error(u64::MAX).is_null());
    }
}
