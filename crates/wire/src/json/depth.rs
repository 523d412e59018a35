//! Nesting limits
//!
//! Both directions share one limit so anything that can be stored can be
//! read back. The limit sits below `serde_json`'s own parser limit even
//! after a `$bytes`/`$f64` wrapper adds a level.

use dockv_core::Value;
use thiserror::Error;

/// Deepest container nesting a document may have. Scalars have depth 0, an
/// array of scalars depth 1.
pub const MAX_DOCUMENT_DEPTH: usize = 100;

/// A document nested deeper than [`MAX_DOCUMENT_DEPTH`]
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("document nesting depth {depth} exceeds the limit of {}", MAX_DOCUMENT_DEPTH)]
pub struct DepthExceeded {
    /// Depth that was found
    pub depth: usize,
}

/// Container nesting depth of `value`
pub fn document_depth(value: &Value) -> usize {
    let mut deepest = 0;
    let mut stack = vec![(value, 0usize)];
    while let Some((value, depth)) = stack.pop() {
        match value {
            Value::Array(items) => {
                deepest = deepest.max(depth + 1);
                stack.extend(items.iter().map(|item| (item, depth + 1)));
            }
            Value::Object(fields) => {
                deepest = deepest.max(depth + 1);
                stack.extend(fields.values().map(|field| (field, depth + 1)));
            }
            _ => {}
        }
    }
    deepest
}

/// Reject documents nested deeper than [`MAX_DOCUMENT_DEPTH`]
pub fn check_document_depth(value: &Value) -> Result<(), DepthExceeded> {
    let depth = document_depth(value);
    if depth > MAX_DOCUMENT_DEPTH {
        Err(DepthExceeded { depth })
    } else {
        Ok(())
    }
}

pub(crate) fn json_depth(json: &serde_json::Value) -> usize {
    let mut deepest = 0;
    let mut stack = vec![(json, 0usize)];
    while let Some((json, depth)) = stack.pop() {
        match json {
            serde_json::Value::Array(items) => {
                deepest = deepest.max(depth + 1);
                stack.extend(items.iter().map(|item| (item, depth + 1)));
            }
            serde_json::Value::Object(fields) => {
                deepest = deepest.max(depth + 1);
                stack.extend(fields.values().map(|field| (field, depth + 1)));
            }
            _ => {}
        }
    }
    deepest
}
