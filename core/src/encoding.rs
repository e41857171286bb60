//! UTF-16LE text codec for the documents stored inside a template bundle.
//!
//! Both `DataModelSchema` and `Report/Layout` are JSON text written as
//! UTF-16 little-endian without a byte-order mark. A leading BOM is tolerated
//! on read.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use thiserror::Error;

use crate::error_codes;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EncodingError {
    #[error("[PBIT_ENCODING_001] invalid UTF-16 byte length: {len}")]
    OddLength { len: usize },
    #[error("[PBIT_ENCODING_002] invalid UTF-16 text")]
    InvalidUtf16,
    #[error("[PBIT_ENCODING_003] JSON parse error: {0}")]
    InvalidJson(String),
    #[error("[PBIT_ENCODING_004] JSON serialize error: {0}")]
    Serialize(String),
}

impl EncodingError {
    pub fn code(&self) -> &'static str {
        match self {
            EncodingError::OddLength { .. } => error_codes::ENCODING_ODD_LENGTH,
            EncodingError::InvalidUtf16 => error_codes::ENCODING_INVALID_UTF16,
            EncodingError::InvalidJson(_) => error_codes::ENCODING_INVALID_JSON,
            EncodingError::Serialize(_) => error_codes::ENCODING_SERIALIZE,
        }
    }
}

/// How a JSON document is laid out when written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonLayout {
    /// Four-space indentation, as the schema document is stored.
    Pretty,
    /// No whitespace, as the report layout is stored.
    Compact,
}

pub fn decode_utf16le(bytes: &[u8]) -> Result<String, EncodingError> {
    let body = bytes.strip_prefix(&[0xFF, 0xFE]).unwrap_or(bytes);
    if body.len() % 2 != 0 {
        return Err(EncodingError::OddLength { len: bytes.len() });
    }

    let code_units: Vec<u16> = body
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
        .collect();

    String::from_utf16(&code_units).map_err(|_| EncodingError::InvalidUtf16)
}

pub fn encode_utf16le(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}

pub fn read_json_document(bytes: &[u8]) -> Result<Value, EncodingError> {
    let text = decode_utf16le(bytes)?;
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(&text);
    serde_json::from_str(text).map_err(|e| EncodingError::InvalidJson(e.to_string()))
}

pub fn write_json_document(value: &Value, layout: JsonLayout) -> Result<Vec<u8>, EncodingError> {
    let text = match layout {
        JsonLayout::Compact => {
            serde_json::to_string(value).map_err(|e| EncodingError::Serialize(e.to_string()))?
        }
        JsonLayout::Pretty => {
            let mut buf = Vec::new();
            let formatter = PrettyFormatter::with_indent(b"    ");
            let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
            value
                .serialize(&mut ser)
                .map_err(|e| EncodingError::Serialize(e.to_string()))?;
            String::from_utf8(buf).map_err(|e| EncodingError::Serialize(e.to_string()))?
        }
    };
    Ok(encode_utf16le(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_non_ascii_text() {
        let text = "Tabelle \u{e4}\u{f6}\u{fc} \u{1F600}";
        let bytes = encode_utf16le(text);
        assert_eq!(bytes.len(), text.encode_utf16().count() * 2);
        assert_eq!(decode_utf16le(&bytes).expect("decode"), text);
    }

    #[test]
    fn encodes_little_endian_without_bom() {
        assert_eq!(encode_utf16le("{}"), vec![b'{', 0, b'}', 0]);
    }

    #[test]
    fn tolerates_leading_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        bytes.extend(encode_utf16le("[1]"));
        assert_eq!(read_json_document(&bytes).expect("parse"), json!([1]));
    }

    #[test]
    fn rejects_odd_length() {
        let err = decode_utf16le(&[b'{', 0, b'}']).expect_err("odd length");
        assert!(matches!(err, EncodingError::OddLength { len: 3 }));
    }

    #[test]
    fn rejects_unpaired_surrogate() {
        let err = decode_utf16le(&0xD800u16.to_le_bytes()).expect_err("lone surrogate");
        assert!(matches!(err, EncodingError::InvalidUtf16));
        assert_eq!(err.code(), "PBIT_ENCODING_002");
    }

    #[test]
    fn rejects_invalid_json() {
        let err = read_json_document(&encode_utf16le("{nope")).expect_err("bad json");
        assert!(matches!(err, EncodingError::InvalidJson(_)));
    }

    #[test]
    fn pretty_layout_uses_four_space_indent() {
        let bytes = write_json_document(&json!({"a": [1]}), JsonLayout::Pretty).expect("write");
        let text = decode_utf16le(&bytes).expect("decode");
        assert_eq!(text, "{\n    \"a\": [\n        1\n    ]\n}");
    }

    #[test]
    fn compact_layout_has_no_whitespace() {
        let bytes =
            write_json_document(&json!({"a": 1, "b": "x"}), JsonLayout::Compact).expect("write");
        assert_eq!(decode_utf16le(&bytes).expect("decode"), "{\"a\":1,\"b\":\"x\"}");
    }
}
