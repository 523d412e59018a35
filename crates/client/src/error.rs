//! Error types for the client.
//!
//! Errors fall into two groups:
//! - request-local problems (bad key, rejected submission, bad config) that
//!   are returned synchronously from the call that caused them
//! - [`FatalError`]s, which only ever surface from `process` when a
//!   completion carried a status no continuation is prepared for

use crate::config::ConfigError;
use dockv_core::{BackendStatus, OperationId, OperationKind};
use dockv_wire::{DecodeError, DepthExceeded};
use thiserror::Error;

/// All client errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Key failed local validation
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey {
        /// The offending key
        key: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Document cannot be stored in a form that reads back
    #[error("invalid document for {key:?}: {source}")]
    InvalidDocument {
        /// Target key
        key: String,
        /// Why it was rejected
        source: DepthExceeded,
    },

    /// Configuration could not be loaded or is inconsistent
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No driver is built in for the configured backend name
    #[error("no backend driver available for {0:?}")]
    NoBackend(String),

    /// The initial connection could not be established
    #[error("could not connect to {host} (bucket {bucket}): {status}")]
    Connect {
        /// Configured host
        host: String,
        /// Configured bucket
        bucket: String,
        /// Status the driver reported
        status: BackendStatus,
    },

    /// The driver refused to enqueue a request
    #[error("{kind} {key:?} rejected at submission: {status}")]
    Submit {
        /// Operation kind
        kind: OperationKind,
        /// Target key
        key: String,
        /// Status the driver reported
        status: BackendStatus,
    },

    /// The client behind a [`ClientHandle`](crate::ClientHandle) was dropped
    #[error("client is closed")]
    Closed,

    /// `process` was called from inside a completion callback
    #[error("process called from inside a completion callback")]
    Reentrant,

    /// A completion could not be routed to a continuation
    #[error(transparent)]
    Fatal(#[from] FatalError),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this is a fatal backend outcome.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Fatal(_))
    }

    /// Check if the caller's input was rejected before submission.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Error::InvalidKey { .. } | Error::InvalidDocument { .. })
    }

    /// The fatal error, if this is one.
    pub fn as_fatal(&self) -> Option<&FatalError> {
        match self {
            Error::Fatal(f) => Some(f),
            _ => None,
        }
    }
}

/// A completion that no continuation could accept
#[derive(Debug, Error)]
#[error("fatal {kind} failure on {key:?} ({id}): {cause}")]
pub struct FatalError {
    /// Operation the completion belonged to
    pub id: OperationId,
    /// Operation kind
    pub kind: OperationKind,
    /// Target key
    pub key: String,
    /// What went wrong
    pub cause: FatalCause,
}

impl FatalError {
    /// Backend status behind this error, if it came from one
    pub fn status(&self) -> Option<BackendStatus> {
        match self.cause {
            FatalCause::Status(status) => Some(status),
            FatalCause::Decode(_) => None,
        }
    }
}

/// Why a completion was fatal
#[derive(Debug, Error, PartialEq)]
pub enum FatalCause {
    /// Status outside the operation's expected outcomes
    #[error("backend reported {0}")]
    Status(BackendStatus),

    /// Fetched body did not decode as a document
    #[error("stored document is unreadable: {0}")]
    Decode(#[from] DecodeError),
}
