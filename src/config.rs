use serde::Deserialize;

use crate::encoding::TextEncoding;
use crate::error::{Result, StreamError};

pub const DEFAULT_FIELD_DELIMITER: &str = "\t";
pub const DEFAULT_END_OF_LINE_DELIMITER: &str = "\r\n";
pub const DEFAULT_ENCODING: &str = "utf-8";

/// JSON config for a row stream. Every key is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    #[serde(default = "default_field_delimiter")]
    pub field_delimiter: String,
    #[serde(default = "default_end_of_line_delimiter")]
    pub end_of_line_delimiter: String,
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

fn default_field_delimiter() -> String {
    DEFAULT_FIELD_DELIMITER.to_string()
}

fn default_end_of_line_delimiter() -> String {
    DEFAULT_END_OF_LINE_DELIMITER.to_string()
}

fn default_encoding() -> String {
    DEFAULT_ENCODING.to_string()
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            field_delimiter: default_field_delimiter(),
            end_of_line_delimiter: default_end_of_line_delimiter(),
            encoding: default_encoding(),
        }
    }
}

impl StreamConfig {
    /// Parse from a JSON string sent over FFI.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| StreamError::Config(format!("Invalid config JSON: {e}")))
    }

    /// Resolve the configured encoding label.
    pub fn text_encoding(&self) -> Result<TextEncoding> {
        TextEncoding::from_label(&self.encoding)
    }
}
