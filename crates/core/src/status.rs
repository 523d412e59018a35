//! Backend status codes and their classification
//!
//! Drivers report one [`BackendStatus`] per completed request. The client
//! never routes on raw statuses: [`classify`] folds them into the four
//! [`Outcome`]s that operations understand.

use std::fmt;

/// Status code reported by a backend driver for a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BackendStatus {
    /// Request completed
    Success = 0,
    /// Key already exists (or is locked by another session)
    KeyExists = 1,
    /// Key does not exist
    KeyNotFound = 2,
    /// Key is locked and the request needed the lock
    Locked = 3,
    /// Server is temporarily unable to serve the request
    TemporaryFailure = 4,
    /// Credentials were rejected
    AuthFailure = 5,
    /// Bucket does not exist on the server
    BucketNotFound = 6,
    /// Request timed out inside the driver
    Timeout = 7,
    /// Socket-level failure
    NetworkError = 8,
    /// Malformed response or protocol violation
    ProtocolError = 9,
    /// Document exceeds the server's size limit
    ValueTooLarge = 10,
    /// Request was rejected as malformed
    InvalidArgument = 11,
    /// Driver has no live connection
    NotConnected = 12,
    /// Unclassified server-side failure
    Internal = 13,
}

impl BackendStatus {
    /// Check if the status indicates success
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, BackendStatus::Success)
    }

    /// Faults that may clear up on their own
    #[inline]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            BackendStatus::Locked
                | BackendStatus::TemporaryFailure
                | BackendStatus::Timeout
                | BackendStatus::NetworkError
        )
    }

    /// Get the status as a string
    pub const fn as_str(&self) -> &'static str {
        match self {
            BackendStatus::Success => "Success",
            BackendStatus::KeyExists => "KeyExists",
            BackendStatus::KeyNotFound => "KeyNotFound",
            BackendStatus::Locked => "Locked",
            BackendStatus::TemporaryFailure => "TemporaryFailure",
            BackendStatus::AuthFailure => "AuthFailure",
            BackendStatus::BucketNotFound => "BucketNotFound",
            BackendStatus::Timeout => "Timeout",
            BackendStatus::NetworkError => "NetworkError",
            BackendStatus::ProtocolError => "ProtocolError",
            BackendStatus::ValueTooLarge => "ValueTooLarge",
            BackendStatus::InvalidArgument => "InvalidArgument",
            BackendStatus::NotConnected => "NotConnected",
            BackendStatus::Internal => "Internal",
        }
    }
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Semantic outcome of a completed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Request did what was asked
    Success,
    /// Key was missing
    NotFound,
    /// Key was present (or locked) when the request required otherwise
    Conflict,
    /// Anything the caller cannot continue from
    Fatal,
}

impl Outcome {
    /// Expected outcomes that an operation may route to a continuation
    #[inline]
    pub const fn is_expected(&self) -> bool {
        !matches!(self, Outcome::Fatal)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "Success"),
            Outcome::NotFound => write!(f, "NotFound"),
            Outcome::Conflict => write!(f, "Conflict"),
            Outcome::Fatal => write!(f, "Fatal"),
        }
    }
}

/// Map a backend status to its semantic outcome.
///
/// Only `KeyExists` and `KeyNotFound` are expected failures. Transient
/// faults are not told apart from permanent ones here.
pub const fn classify(status: BackendStatus) -> Outcome {
    match status {
        BackendStatus::Success => Outcome::Success,
        BackendStatus::KeyNotFound => Outcome::NotFound,
        BackendStatus::KeyExists => Outcome::Conflict,
        BackendStatus::Locked
        | BackendStatus::TemporaryFailure
        | BackendStatus::AuthFailure
        | BackendStatus::BucketNotFound
        | BackendStatus::Timeout
        | BackendStatus::NetworkError
        | BackendStatus::ProtocolError
        | BackendStatus::ValueTooLarge
        | BackendStatus::InvalidArgument
        | BackendStatus::NotConnected
        | BackendStatus::Internal => Outcome::Fatal,
    }
}
