//! Document codec for dockv
//!
//! Documents cross the backend boundary as JSON text. This crate encodes a
//! [`Value`](dockv_core::Value) before it is submitted and decodes the body a
//! driver hands back after a fetch.
//!
//! ## Wire Encoding Rules
//!
//! | Value Type | JSON Encoding |
//! |------------|--------------|
//! | Null | `null` |
//! | Bool | `true`/`false` |
//! | Int | number |
//! | Float (normal) | number with a decimal point or exponent |
//! | Float (special) | `{"$f64": "..."}` |
//! | String | `"..."` |
//! | Bytes | `{"$bytes": "..."}` |
//! | Array | `[...]` |
//! | Object | `{...}` with sorted keys, `$`-prefixed keys escaped as `$$…` |
//!
//! Documents may nest at most [`MAX_DOCUMENT_DEPTH`] containers deep.
//!
//! ## Examples
//!
//! ```
//! use dockv_wire::{encode_document, decode_document};
//! use dockv_core::Value;
//!
//! let json = encode_document(&Value::Int(54));
//! assert_eq!(json, "54");
//!
//! let decoded = decode_document("54").unwrap();
//! assert_eq!(decoded, Value::Int(54));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod json;

pub use json::{
    check_document_depth, decode_document, decode_document_bytes, document_depth,
    encode_document, from_json, to_json, DecodeError, DepthExceeded, MAX_DOCUMENT_DEPTH,
};
