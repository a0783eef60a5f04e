use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Once;

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);
static INIT: Once = Once::new();

/// Read `ROWSTREAM_DEBUG` (`1` or `true`) once, on the first stream open.
pub fn init() {
    INIT.call_once(|| {
        if std::env::var("ROWSTREAM_DEBUG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
        {
            DEBUG_ENABLED.store(true, Ordering::SeqCst);
            eprintln!("[rowstream] Debug mode enabled via ROWSTREAM_DEBUG");
        }
    });
}

/// Toggle stream lifecycle logging, overriding the environment.
pub fn set_debug(enabled: bool) {
    DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    if enabled {
        eprintln!("[rowstream] Debug mode enabled");
    }
}

pub fn is_debug() -> bool {
    DEBUG_ENABLED.load(Ordering::SeqCst)
}

/// The first `max_chars` characters of `s`, cut on a char boundary.
pub(crate) fn preview(s: &str, max_chars: usize) -> &str {
    s.char_indices().nth(max_chars).map_or(s, |(i, _)| &s[..i])
}

/// Write a `[rowstream]`-prefixed line to stderr when debug mode is on.
/// Only lifecycle events go through here; error paths are returned, not logged.
macro_rules! debug_log {
    ($($arg:tt)*) => {
        if $crate::debug::is_debug() {
            eprintln!("[rowstream] {}", format!($($arg)*));
        }
    };
}

pub(crate) use debug_log;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_short_text_is_unchanged() {
        assert_eq!(preview("SELECT 1", 100), "SELECT 1");
        assert_eq!(preview("", 10), "");
    }

    #[test]
    fn preview_cuts_on_char_boundary() {
        let sql = format!("SELECT 'x{}'", "é".repeat(60));
        let cut = preview(&sql, 100);
        assert_eq!(cut.chars().count(), 100);
        assert!(sql.starts_with(cut));
        assert_eq!(preview("ฃ๘ab", 2), "ฃ๘");
    }
}
