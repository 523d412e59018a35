//! Request-level types shared by the client and its drivers

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Conditional semantics of a put
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorePolicy {
    /// Only store if the key does not exist yet
    AddIfAbsent,
    /// Only store if the key already exists
    ReplaceIfPresent,
    /// Store regardless of prior state
    #[default]
    SetUnconditionally,
}

impl StorePolicy {
    /// Short name used on the command line and in logs
    pub const fn as_str(&self) -> &'static str {
        match self {
            StorePolicy::AddIfAbsent => "add",
            StorePolicy::ReplaceIfPresent => "replace",
            StorePolicy::SetUnconditionally => "set",
        }
    }
}

impl fmt::Display for StorePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unrecognized policy name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown store policy: {0} (expected add, replace or set)")]
pub struct ParsePolicyError(pub String);

impl FromStr for StorePolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "add" => Ok(StorePolicy::AddIfAbsent),
            "replace" => Ok(StorePolicy::ReplaceIfPresent),
            "set" => Ok(StorePolicy::SetUnconditionally),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

/// Kind of an in-flight operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Store a document
    Put,
    /// Fetch a document
    Get,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Put => write!(f, "put"),
            OperationKind::Get => write!(f, "get"),
        }
    }
}

/// Opaque handle correlating a submitted request with its completion
///
/// Drivers only ever see this id; they hand it back untouched with the
/// response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(u64);

impl OperationId {
    /// Wrap a raw id
    pub const fn new(raw: u64) -> Self {
        OperationId(raw)
    }

    /// The raw id
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}
