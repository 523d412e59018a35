//! JSON encoding for documents
//!
//! Non-JSON-native values are wrapped:
//! - `$bytes` for binary data (base64)
//! - `$f64` for special floats (NaN, ±Inf, -0.0)
//!
//! Object keys starting with `$` are written with one extra leading `$`, so
//! a user object can never be mistaken for a wrapper.

use base64::Engine;
use dockv_core::Value;
use serde_json::{Map, Number};

use super::KEY_ESCAPE;

/// Encode a document to its stored JSON text
pub fn encode_document(value: &Value) -> String {
    to_json(value).to_string()
}

/// Convert a document to a `serde_json` tree
pub fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::Number(Number::from(*i)),
        Value::Float(f) => encode_float(*f),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Bytes(b) => wrapper(
            "$bytes",
            base64::engine::general_purpose::STANDARD.encode(b),
        ),
        Value::Array(arr) => serde_json::Value::Array(arr.iter().map(to_json).collect()),
        Value::Object(obj) => {
            let map: Map<String, serde_json::Value> =
                obj.iter().map(|(k, v)| (escape_key(k), to_json(v))).collect();
            serde_json::Value::Object(map)
        }
    }
}

fn escape_key(key: &str) -> String {
    if key.starts_with(KEY_ESCAPE) {
        format!("{}{}", KEY_ESCAPE, key)
    } else {
        key.to_string()
    }
}

fn encode_float(f: f64) -> serde_json::Value {
    if f.is_nan() {
        wrapper("$f64", "NaN".to_string())
    } else if f == f64::INFINITY {
        wrapper("$f64", "+Inf".to_string())
    } else if f == f64::NEG_INFINITY {
        wrapper("$f64", "-Inf".to_string())
    } else if f.to_bits() == (-0.0_f64).to_bits() {
        wrapper("$f64", "-0.0".to_string())
    } else {
        // from_f64 only rejects non-finite values, handled above
        Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

fn wrapper(tag: &str, body: String) -> serde_json::Value {
    let mut map = Map::with_capacity(1);
    map.insert(tag.to_string(), serde_json::Value::String(body));
    serde_json::Value::Object(map)
}
