use crate::error::{Result, StreamError};

/// Converts row text into output bytes. Must be deterministic.
pub trait TextEncoder {
    fn encode(&self, text: &str) -> Vec<u8>;
}

impl<F> TextEncoder for F
where
    F: Fn(&str) -> Vec<u8>,
{
    fn encode(&self, text: &str) -> Vec<u8> {
        self(text)
    }
}

/// Built-in character encodings. None of them emit a byte-order mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
    Ascii,
    Latin1,
}

impl TextEncoding {
    /// Resolve an encoding label such as `utf-8` or `iso-8859-1`.
    pub fn from_label(label: &str) -> Result<Self> {
        match label.trim().to_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "utf-16" | "utf-16le" | "utf16" | "unicode" => Ok(TextEncoding::Utf16Le),
            "utf-16be" | "unicodefffe" => Ok(TextEncoding::Utf16Be),
            "ascii" | "us-ascii" => Ok(TextEncoding::Ascii),
            "latin1" | "iso-8859-1" => Ok(TextEncoding::Latin1),
            other => Err(StreamError::invalid(
                "encoding",
                format!("Unknown encoding: {other}"),
            )),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Utf16Le => "utf-16le",
            TextEncoding::Utf16Be => "utf-16be",
            TextEncoding::Ascii => "us-ascii",
            TextEncoding::Latin1 => "iso-8859-1",
        }
    }
}

impl TextEncoder for TextEncoding {
    fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            TextEncoding::Utf8 => text.as_bytes().to_vec(),
            TextEncoding::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            TextEncoding::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            TextEncoding::Ascii => single_byte(text, 0x7F),
            TextEncoding::Latin1 => single_byte(text, 0xFF),
        }
    }
}

/// Unmappable characters become `?`.
fn single_byte(text: &str, max: u32) -> Vec<u8> {
    text.chars()
        .map(|c| {
            let cp = c as u32;
            if cp <= max { cp as u8 } else { b'?' }
        })
        .collect()
}
