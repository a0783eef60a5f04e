use std::io;

use crate::config::StreamConfig;
use crate::copy::copy_with_remainder;
use crate::cursor::RowCursor;
use crate::debug::debug_log;
use crate::encoding::{TextEncoder, TextEncoding};
use crate::error::{Result, StreamError};
use crate::value::Value;

/// Serializes rows from a cursor into delimited text, on demand.
///
/// Each read drains any bytes left over from the previous row before the
/// cursor is advanced again, so at most one encoded row is held in memory
/// regardless of the caller's buffer size. The stream is read-only and
/// cannot seek.
pub struct RowStream<C: RowCursor, E: TextEncoder = TextEncoding> {
    cursor: C,
    field_delimiter: String,
    end_of_line_delimiter: String,
    encoding: E,
    remainder: Vec<u8>,
    /// Cursor failure hit after bytes were already handed out; reported on the next read.
    deferred_error: Option<StreamError>,
}

impl<C: RowCursor, E: TextEncoder> RowStream<C, E> {
    pub fn new(
        cursor: C,
        field_delimiter: &str,
        end_of_line_delimiter: &str,
        encoding: E,
    ) -> Result<Self> {
        if field_delimiter.is_empty() {
            return Err(StreamError::invalid(
                "field_delimiter",
                "field_delimiter must be a non-empty string",
            ));
        }
        if end_of_line_delimiter.is_empty() {
            return Err(StreamError::invalid(
                "end_of_line_delimiter",
                "end_of_line_delimiter must be a non-empty string",
            ));
        }

        debug_log!(
            "Row stream opened: fields={}, field_delimiter={:?}, eol={:?}",
            cursor.field_count(),
            field_delimiter,
            end_of_line_delimiter
        );

        Ok(Self {
            cursor,
            field_delimiter: field_delimiter.to_string(),
            end_of_line_delimiter: end_of_line_delimiter.to_string(),
            encoding,
            remainder: Vec::new(),
            deferred_error: None,
        })
    }

    /// True until the underlying cursor is closed.
    pub fn can_read(&self) -> bool {
        !self.cursor.is_closed()
    }

    pub fn can_seek(&self) -> bool {
        false
    }

    pub fn can_write(&self) -> bool {
        false
    }

    /// Bytes of the current row still waiting to be read.
    pub fn pending_bytes(&self) -> usize {
        self.remainder.len()
    }

    pub fn field_delimiter(&self) -> &str {
        &self.field_delimiter
    }

    pub fn end_of_line_delimiter(&self) -> &str {
        &self.end_of_line_delimiter
    }

    /// Fill `buffer[offset..offset + count]` with encoded rows.
    ///
    /// Returns the number of bytes written, which is 0 once the cursor is
    /// exhausted. Bytes outside `buffer[offset..offset + written]` are
    /// left untouched.
    pub fn read_at(&mut self, buffer: &mut [u8], offset: usize, count: usize) -> Result<usize> {
        if offset.checked_add(count).is_none_or(|end| end > buffer.len()) {
            return Err(StreamError::invalid("buffer", "Buffer is too small"));
        }
        if self.cursor.is_closed() {
            return Err(StreamError::Disposed(std::any::type_name::<Self>()));
        }
        if let Some(err) = self.deferred_error.take() {
            return Err(err);
        }

        let mut written = 0;

        if !self.remainder.is_empty() {
            let (rest, copied) = copy_with_remainder(buffer, offset, count, &self.remainder);
            self.remainder = rest;
            written += copied;

            if !self.remainder.is_empty() {
                return Ok(written);
            }
        }

        let mut values = vec![Value::Null; self.cursor.field_count()];

        while offset + written < buffer.len() && written < count {
            match self.next_encoded_row(&mut values) {
                Ok(Some(row)) => {
                    let (rest, copied) =
                        copy_with_remainder(buffer, offset + written, count - written, &row);
                    written += copied;
                    if !rest.is_empty() {
                        self.remainder = rest;
                        break;
                    }
                }
                Ok(None) => {
                    debug_log!("Row cursor exhausted");
                    break;
                }
                Err(err) if written > 0 => {
                    self.deferred_error = Some(err);
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        Ok(written)
    }

    fn next_encoded_row(&mut self, values: &mut [Value]) -> Result<Option<Vec<u8>>> {
        if !self.cursor.advance()? {
            return Ok(None);
        }
        values.fill(Value::Null);
        let filled = self.cursor.get_values(values)?;
        if filled != values.len() {
            return Err(StreamError::Cursor(format!(
                "Cursor filled {filled} of {} values",
                values.len()
            )));
        }
        Ok(Some(self.encode_row(values)))
    }

    /// Join the values with the field delimiter, terminate with the end of
    /// line delimiter and encode. A row with no columns is just the
    /// terminator.
    fn encode_row(&self, values: &[Value]) -> Vec<u8> {
        let mut line = String::new();
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                line.push_str(&self.field_delimiter);
            }
            line.push_str(&value.to_text());
        }
        line.push_str(&self.end_of_line_delimiter);
        self.encoding.encode(&line)
    }

    /// Close the cursor. Further reads fail; calling again is a no-op.
    pub fn close(&mut self) {
        if !self.cursor.is_closed() {
            self.cursor.close();
            debug_log!("Row stream closed");
        }
    }

    // ── Unsupported operations ─────────────────────────────────

    pub fn flush(&mut self) -> Result<()> {
        Err(StreamError::NotSupported("flush"))
    }

    pub fn len(&self) -> Result<u64> {
        Err(StreamError::NotSupported("len"))
    }

    pub fn position(&self) -> Result<u64> {
        Err(StreamError::NotSupported("position"))
    }

    pub fn set_position(&mut self, _position: u64) -> Result<()> {
        Err(StreamError::NotSupported("set_position"))
    }

    pub fn seek(&mut self, _pos: io::SeekFrom) -> Result<u64> {
        Err(StreamError::NotSupported("seek"))
    }

    pub fn set_len(&mut self, _len: u64) -> Result<()> {
        Err(StreamError::NotSupported("set_len"))
    }

    pub fn write(&mut self, _buf: &[u8]) -> Result<usize> {
        Err(StreamError::NotSupported("write"))
    }
}

impl<C: RowCursor> RowStream<C, TextEncoding> {
    /// Build a stream from a parsed config.
    pub fn from_config(cursor: C, config: &StreamConfig) -> Result<Self> {
        let encoding = config.text_encoding()?;
        Self::new(
            cursor,
            &config.field_delimiter,
            &config.end_of_line_delimiter,
            encoding,
        )
    }
}

impl<C: RowCursor, E: TextEncoder> io::Read for RowStream<C, E> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len();
        Ok(self.read_at(buf, 0, len)?)
    }
}

impl<C: RowCursor, E: TextEncoder> Drop for RowStream<C, E> {
    fn drop(&mut self) {
        self.close();
    }
}
