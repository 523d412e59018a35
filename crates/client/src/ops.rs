//! Put and get requests
//!
//! [`PutOperation`] and [`GetOperation`] turn a semantic request into a
//! driver command plus the continuation parked in the pending table.
//! [`dispatch`] is the other half: it classifies a completion and runs the
//! matching continuation.
//!
//! ## Routing
//!
//! | Outcome | put | get |
//! |---------|-----|-----|
//! | Success | `on_done()` | `on_done(document)` |
//! | Conflict | `on_conflict()` | fatal |
//! | NotFound | `on_conflict()` | `on_done(Null)` |
//! | Fatal | fatal | fatal |

use std::time::{Duration, Instant};

use tracing::debug;

use dockv_core::{classify, OperationId, Outcome, StorePolicy, Value};
use dockv_wire::{check_document_depth, decode_document_bytes, encode_document};

use crate::backend::{Completion, FetchCommand, StoreCommand};
use crate::error::{Error, FatalCause, FatalError, Result};
use crate::pending::{Callback, Continuation, PendingOperation, ValueCallback};

/// Longest key the backend accepts, in bytes
pub const MAX_KEY_BYTES: usize = 250;

/// Reject keys no backend would accept.
pub fn validate_key(key: &str) -> Result<()> {
    let reason = if key.is_empty() {
        "key is empty"
    } else if key.len() > MAX_KEY_BYTES {
        "key exceeds 250 bytes"
    } else {
        return Ok(());
    };
    Err(Error::InvalidKey {
        key: key.to_string(),
        reason,
    })
}

/// A document store request
///
/// ```ignore
/// let op = PutOperation::new("player:7", 54)
///     .policy(StorePolicy::AddIfAbsent)
///     .on_done(|| println!("stored"))
///     .on_conflict(|| println!("already there"));
/// client.submit_put(op)?;
/// ```
pub struct PutOperation {
    key: String,
    document: Value,
    policy: StorePolicy,
    on_done: Option<Callback>,
    on_conflict: Option<Callback>,
}

impl PutOperation {
    /// Store `document` under `key`, unconditionally by default
    pub fn new(key: impl Into<String>, document: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            document: document.into(),
            policy: StorePolicy::default(),
            on_done: None,
            on_conflict: None,
        }
    }

    /// Set the write policy
    pub fn policy(mut self, policy: StorePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run `f` once the store succeeded
    pub fn on_done(mut self, f: impl FnOnce() + 'static) -> Self {
        self.on_done = Some(Box::new(f));
        self
    }

    /// Run `f` if the key existed (add) or was missing (replace)
    pub fn on_conflict(mut self, f: impl FnOnce() + 'static) -> Self {
        self.on_conflict = Some(Box::new(f));
        self
    }

    /// Target key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Validate and encode; nothing is registered yet.
    pub(crate) fn prepare(self) -> Result<(StoreCommand, Continuation)> {
        validate_key(&self.key)?;
        if let Err(source) = check_document_depth(&self.document) {
            return Err(Error::InvalidDocument {
                key: self.key,
                source,
            });
        }
        let body = encode_document(&self.document).into_bytes();
        let command = StoreCommand {
            key: self.key,
            body,
            policy: self.policy,
        };
        let continuation = Continuation::Put {
            on_done: self.on_done,
            on_conflict: self.on_conflict,
        };
        Ok((command, continuation))
    }
}

/// A document fetch request
pub struct GetOperation {
    key: String,
    lock_seconds: u32,
    on_done: Option<ValueCallback>,
}

impl GetOperation {
    /// Fetch `key` and hand the document to `on_done`
    pub fn new(key: impl Into<String>, on_done: impl FnOnce(Value) + 'static) -> Self {
        Self {
            key: key.into(),
            lock_seconds: 0,
            on_done: Some(Box::new(on_done)),
        }
    }

    /// Also take an exclusive lock on the key for `seconds` (0 = no lock)
    pub fn lock(mut self, seconds: u32) -> Self {
        self.lock_seconds = seconds;
        self
    }

    /// Target key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Validate; nothing is registered yet.
    pub(crate) fn prepare(self) -> Result<(FetchCommand, Continuation)> {
        validate_key(&self.key)?;
        let lock = (self.lock_seconds > 0).then(|| Duration::from_secs(u64::from(self.lock_seconds)));
        let command = FetchCommand {
            key: self.key,
            lock,
        };
        Ok((command, Continuation::Get { on_done: self.on_done }))
    }
}

/// Route `completion` to the continuation of `op`.
///
/// `op` has already been removed from the table. Returns the fatal error
/// instead of running anything when the outcome is not one the operation
/// expects.
pub fn dispatch(op: PendingOperation, completion: Completion) -> std::result::Result<(), FatalError> {
    let PendingOperation {
        id,
        key,
        submitted_at,
        continuation,
    } = op;
    let kind = continuation.kind();
    let outcome = classify(completion.status);
    debug!(
        %id,
        %kind,
        key = %key,
        status = %completion.status,
        %outcome,
        elapsed_us = submitted_at.elapsed().as_micros() as u64,
        "dispatching completion"
    );

    let fatal = |cause: FatalCause| FatalError {
        id,
        kind,
        key: key.clone(),
        cause,
    };

    match continuation {
        Continuation::Put {
            on_done,
            on_conflict,
        } => match outcome {
            Outcome::Success => {
                if let Some(f) = on_done {
                    f();
                }
                Ok(())
            }
            Outcome::Conflict | Outcome::NotFound => {
                if let Some(f) = on_conflict {
                    f();
                }
                Ok(())
            }
            Outcome::Fatal => Err(fatal(FatalCause::Status(completion.status))),
        },
        Continuation::Get { on_done } => {
            let value = match outcome {
                Outcome::Success => match completion.body.as_deref() {
                    Some(body) => decode_document_bytes(body).map_err(|e| fatal(e.into()))?,
                    None => {
                        return Err(fatal(FatalCause::Status(
                            dockv_core::BackendStatus::ProtocolError,
                        )))
                    }
                },
                Outcome::NotFound => Value::Null,
                Outcome::Conflict | Outcome::Fatal => {
                    return Err(fatal(FatalCause::Status(completion.status)))
                }
            };
            if let Some(f) = on_done {
                f(value);
            }
            Ok(())
        }
    }
}

/// Build the table entry for a prepared operation
pub(crate) fn pending(id: OperationId, key: String, continuation: Continuation) -> PendingOperation {
    PendingOperation {
        id,
        key,
        submitted_at: Instant::now(),
        continuation,
    }
}
