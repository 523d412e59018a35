//! JSON document encoding
//!
//! Documents are stored as JSON text. Special wrappers carry values that
//! plain JSON cannot:
//!
//! - `{"$bytes": "<base64>"}` for binary data
//! - `{"$f64": "NaN|+Inf|-Inf|-0.0"}` for special floats
//!
//! User keys starting with `$` get one more `$` on the way out and lose it
//! on the way back in.

mod decode;
mod depth;
mod encode;

pub use decode::{decode_document, decode_document_bytes, from_json, DecodeError};
pub use depth::{check_document_depth, document_depth, DepthExceeded, MAX_DOCUMENT_DEPTH};
pub use encode::{encode_document, to_json};

/// Prefix added to object keys that already start with it
const KEY_ESCAPE: &str = "$";
