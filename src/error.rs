use std::fmt;
use std::io;

/// Error types for the rowstream adapter and its FFI layer.
pub enum StreamError {
    /// A required argument was missing (null across FFI).
    NullArgument(&'static str),
    /// An argument was present but unusable.
    InvalidArgument {
        param: &'static str,
        message: String,
    },
    /// A numeric argument was outside its permitted range.
    OutOfRange {
        param: &'static str,
        message: String,
    },
    /// The stream was used after it was closed. Carries the stream type name.
    Disposed(&'static str),
    /// The stream is read-only and non-seekable.
    NotSupported(&'static str),
    /// The underlying row source failed.
    Cursor(String),
    Config(String),
}

impl StreamError {
    pub(crate) fn invalid(param: &'static str, message: impl Into<String>) -> Self {
        StreamError::InvalidArgument {
            param,
            message: message.into(),
        }
    }

    pub(crate) fn out_of_range(param: &'static str, message: impl Into<String>) -> Self {
        StreamError::OutOfRange {
            param,
            message: message.into(),
        }
    }

    /// Name of the offending argument, for argument errors.
    pub fn param_name(&self) -> Option<&'static str> {
        match self {
            StreamError::NullArgument(param)
            | StreamError::InvalidArgument { param, .. }
            | StreamError::OutOfRange { param, .. } => Some(param),
            _ => None,
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::NullArgument(param) => write!(f, "Argument '{param}' cannot be null"),
            StreamError::InvalidArgument { param, message } => {
                write!(f, "Invalid argument '{param}': {message}")
            }
            StreamError::OutOfRange { param, message } => {
                write!(f, "Argument '{param}' out of range: {message}")
            }
            StreamError::Disposed(name) => write!(f, "Cannot access a closed stream: {name}"),
            StreamError::NotSupported(op) => {
                write!(f, "Operation '{op}' not supported: stream is read-only and non-seekable")
            }
            StreamError::Cursor(msg) => write!(f, "Cursor error: {msg}"),
            StreamError::Config(msg) => write!(f, "Config error: {msg}"),
        }
    }
}

impl fmt::Debug for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl std::error::Error for StreamError {}

impl From<mssql_client::Error> for StreamError {
    fn from(e: mssql_client::Error) -> Self {
        match e {
            mssql_client::Error::ConnectionClosed => {
                StreamError::Cursor("Connection closed".into())
            }
            mssql_client::Error::CommandTimeout => StreamError::Cursor("Command timeout".into()),
            mssql_client::Error::Server {
                number,
                message,
                class,
                ..
            } => StreamError::Cursor(format!(
                "SQL Server error {number} (severity {class}): {message}"
            )),
            mssql_client::Error::Cancelled => StreamError::Cursor("Query cancelled".into()),
            other => StreamError::Cursor(format!("{other}")),
        }
    }
}

impl From<StreamError> for io::Error {
    fn from(e: StreamError) -> Self {
        let kind = match &e {
            StreamError::NullArgument(_)
            | StreamError::InvalidArgument { .. }
            | StreamError::OutOfRange { .. }
            | StreamError::Config(_) => io::ErrorKind::InvalidInput,
            StreamError::Disposed(_) => io::ErrorKind::NotConnected,
            StreamError::NotSupported(_) => io::ErrorKind::Unsupported,
            StreamError::Cursor(_) => io::ErrorKind::Other,
        };
        io::Error::new(kind, e)
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_name_only_for_argument_errors() {
        assert_eq!(StreamError::NullArgument("buffer").param_name(), Some("buffer"));
        assert_eq!(StreamError::invalid("buffer", "too small").param_name(), Some("buffer"));
        assert_eq!(StreamError::out_of_range("count", "negative").param_name(), Some("count"));
        assert_eq!(StreamError::Disposed("RowStream").param_name(), None);
        assert_eq!(StreamError::NotSupported("seek").param_name(), None);
    }

    #[test]
    fn io_error_kinds() {
        let err: io::Error = StreamError::NotSupported("write").into();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        let err: io::Error = StreamError::Disposed("RowStream").into();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
        let err: io::Error = StreamError::out_of_range("offset", "negative").into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn display_names_operation() {
        let msg = StreamError::NotSupported("seek").to_string();
        assert!(msg.contains("seek"));
        assert!(msg.contains("read-only"));
    }
}
