//! JSON decoding for documents
//!
//! Single-key objects tagged `$bytes` or `$f64` with a string body decode
//! back to the wrapped value. Any other object stays an object, with one
//! leading `$` removed from keys that start with `$$`.
//!
//! Documents nested deeper than [`MAX_DOCUMENT_DEPTH`] are rejected.

use base64::Engine;
use dockv_core::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use super::depth::{check_document_depth, json_depth, DepthExceeded, MAX_DOCUMENT_DEPTH};
use super::KEY_ESCAPE;

/// Decode error types
#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    /// Body was empty or whitespace only
    #[error("empty document")]
    Empty,

    /// Invalid JSON syntax
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// Invalid base64 in $bytes wrapper
    #[error("invalid base64: {0}")]
    InvalidBase64(String),

    /// Invalid value in $f64 wrapper
    #[error("invalid $f64 value: {0}")]
    InvalidF64Wrapper(String),

    /// Nested deeper than documents may be
    #[error(transparent)]
    TooDeep(#[from] DepthExceeded),
}

/// Decode stored JSON text to a document
pub fn decode_document(text: &str) -> Result<Value, DecodeError> {
    if text.trim().is_empty() {
        return Err(DecodeError::Empty);
    }
    let json: serde_json::Value =
        serde_json::from_str(text).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;
    from_json(json)
}

/// Decode stored bytes, which must be UTF-8 JSON
pub fn decode_document_bytes(bytes: &[u8]) -> Result<Value, DecodeError> {
    let text = std::str::from_utf8(bytes).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;
    decode_document(text)
}

/// Convert a `serde_json` tree to a document
pub fn from_json(json: serde_json::Value) -> Result<Value, DecodeError> {
    // wrappers add one JSON level below the deepest container
    let depth = json_depth(&json);
    if depth > MAX_DOCUMENT_DEPTH + 1 {
        return Err(DepthExceeded { depth }.into());
    }
    let value = convert(json)?;
    check_document_depth(&value)?;
    Ok(value)
}

fn convert(json: serde_json::Value) -> Result<Value, DecodeError> {
    match json {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
        serde_json::Value::Number(n) => Ok(match n.as_i64() {
            Some(i) => Value::Int(i),
            // u64 beyond i64::MAX and real floats both land here
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        }),
        serde_json::Value::String(s) => Ok(Value::String(s)),
        serde_json::Value::Array(arr) => arr
            .into_iter()
            .map(convert)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        serde_json::Value::Object(map) => {
            if map.len() == 1 {
                if let Some(serde_json::Value::String(b64)) = map.get("$bytes") {
                    return decode_bytes_wrapper(b64);
                }
                if let Some(serde_json::Value::String(tag)) = map.get("$f64") {
                    return decode_f64_wrapper(tag);
                }
            }
            let mut obj = BTreeMap::new();
            for (k, v) in map {
                obj.insert(unescape_key(k), convert(v)?);
            }
            Ok(Value::Object(obj))
        }
    }
}

fn unescape_key(key: String) -> String {
    if key.starts_with("$$") {
        key[KEY_ESCAPE.len()..].to_string()
    } else {
        key
    }
}

fn decode_bytes_wrapper(b64: &str) -> Result<Value, DecodeError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64)
        .map_err(|e| DecodeError::InvalidBase64(e.to_string()))?;
    Ok(Value::Bytes(bytes))
}

fn decode_f64_wrapper(tag: &str) -> Result<Value, DecodeError> {
    let f = match tag {
        "NaN" => f64::NAN,
        "+Inf" => f64::INFINITY,
        "-Inf" => f64::NEG_INFINITY,
        "-0.0" => -0.0_f64,
        _ => return Err(DecodeError::InvalidF64Wrapper(tag.to_string())),
    };
    Ok(Value::Float(f))
}
