use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use lazy_static::lazy_static;

use crate::cursor::MemoryCursor;
use crate::error::{Result, StreamError};
use crate::reader::RowStream;

/// The concrete stream type held behind FFI handles.
pub type FfiStream = RowStream<MemoryCursor>;

// ── Handle ID counter ─────────────────────────────────────────

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(1);

fn next_stream_id() -> u64 {
    NEXT_STREAM_ID.fetch_add(1, Ordering::SeqCst)
}

// ── Global handle map ────────────────────────────────────────

lazy_static! {
    static ref STREAMS: Mutex<HashMap<u64, Arc<StreamHandle>>> = Mutex::new(HashMap::new());
    /// Errors from calls that never produced a handle (failed opens).
    static ref LAST_OPEN_ERROR: Mutex<Option<String>> = Mutex::new(None);
}

/// A stream plus the last error raised through its handle.
///
/// The stream sits behind a Mutex only so the global map is sound; callers
/// are still expected to drive one handle from one thread.
pub struct StreamHandle {
    pub stream: Mutex<FfiStream>,
    pub last_error: Mutex<Option<String>>,
}

impl StreamHandle {
    pub fn lock(&self) -> MutexGuard<'_, FfiStream> {
        self.stream.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_error(&self, msg: String) {
        *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) = Some(msg);
    }

    pub fn take_error(&self) -> Option<String> {
        self.last_error.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

fn streams() -> MutexGuard<'static, HashMap<u64, Arc<StreamHandle>>> {
    STREAMS.lock().unwrap_or_else(|e| e.into_inner())
}

// ── Stream operations ────────────────────────────────────────

pub fn store_stream(stream: FfiStream) -> u64 {
    let id = next_stream_id();
    let handle = Arc::new(StreamHandle {
        stream: Mutex::new(stream),
        last_error: Mutex::new(None),
    });
    streams().insert(id, handle);
    id
}

pub fn get_stream(id: u64) -> Result<Arc<StreamHandle>> {
    streams()
        .get(&id)
        .cloned()
        .ok_or_else(|| StreamError::invalid("stream_id", format!("Stream {id} not found")))
}

/// Drop the handle. The stream's Drop closes its cursor.
pub fn remove_stream(id: u64) -> Option<Arc<StreamHandle>> {
    streams().remove(&id)
}

pub fn remove_all_streams() {
    streams().clear();
}

// ── Open errors ──────────────────────────────────────────────

pub fn set_open_error(msg: String) {
    *LAST_OPEN_ERROR.lock().unwrap_or_else(|e| e.into_inner()) = Some(msg);
}

pub fn take_open_error() -> Option<String> {
    LAST_OPEN_ERROR.lock().unwrap_or_else(|e| e.into_inner()).take()
}

// ── Diagnostics ──────────────────────────────────────────────

/// Snapshot of all open stream handles.
pub fn diagnostic_snapshot() -> serde_json::Value {
    let streams = streams();
    let info: Vec<serde_json::Value> = streams
        .iter()
        .map(|(id, handle)| {
            let stream = handle.lock();
            serde_json::json!({
                "id": id,
                "can_read": stream.can_read(),
                "pending_bytes": stream.pending_bytes(),
            })
        })
        .collect();

    serde_json::json!({ "streams": info })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::TextEncoding;

    fn make_stream() -> FfiStream {
        let cursor = MemoryCursor::from_rows([["a", "b"]]).unwrap();
        RowStream::new(cursor, "\t", "\n", TextEncoding::Utf8).unwrap()
    }

    #[test]
    fn store_get_remove() {
        let id = store_stream(make_stream());
        let handle = get_stream(id).unwrap();
        assert!(handle.lock().can_read());

        handle.set_error("boom".into());
        assert_eq!(handle.take_error().as_deref(), Some("boom"));
        assert!(handle.take_error().is_none());

        assert!(remove_stream(id).is_some());
        assert!(get_stream(id).is_err());
    }

    #[test]
    fn ids_are_unique() {
        let a = store_stream(make_stream());
        let b = store_stream(make_stream());
        assert_ne!(a, b);
        remove_stream(a);
        remove_stream(b);
    }

    #[test]
    fn snapshot_lists_stream() {
        let id = store_stream(make_stream());
        let snapshot = diagnostic_snapshot();
        let listed = snapshot["streams"]
            .as_array()
            .unwrap()
            .iter()
            .any(|s| s["id"] == serde_json::json!(id));
        assert!(listed);
        remove_stream(id);
    }
}
