//! Driver interface to the backend store
//!
//! The client never talks to the network itself. A [`Backend`] accepts
//! prepared commands tagged with an [`OperationId`], and later hands back one
//! [`Completion`] per command from its blocking [`Backend::wait`] primitive.
//!
//! ## Contract
//!
//! - `store` and `fetch` only enqueue; they must not block on the response
//! - every accepted command yields exactly one completion carrying its id
//! - `wait` returns [`Wakeup::TimedOut`] once `deadline` passes without a
//!   completion being available, and [`Wakeup::Idle`] when nothing is queued
//! - a timeout completes nothing; queued commands stay queued

#[cfg(feature = "memory-backend")]
pub mod memory;

use std::time::{Duration, Instant};

use dockv_core::{BackendStatus, OperationId, StorePolicy};

use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// Everything a driver needs to open its link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    /// Backend host
    pub host: String,
    /// User, absent for anonymous access
    pub user: Option<String>,
    /// Password, absent when not configured
    pub password: Option<String>,
    /// Bucket to open
    pub bucket: String,
}

impl ConnectParams {
    /// Extract connection settings; empty strings become `None`.
    pub fn from_config(config: &ClientConfig) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            host: config.host.clone(),
            user: non_empty(&config.user),
            password: non_empty(&config.password),
            bucket: config.bucket.clone(),
        }
    }
}

/// A store request ready for the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCommand {
    /// Target key
    pub key: String,
    /// Encoded document
    pub body: Vec<u8>,
    /// Conditional semantics
    pub policy: StorePolicy,
}

/// A fetch request ready for the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCommand {
    /// Target key
    pub key: String,
    /// Exclusive lock to take as part of the read
    pub lock: Option<Duration>,
}

/// One response from the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Id the command was submitted with
    pub id: OperationId,
    /// Raw backend status
    pub status: BackendStatus,
    /// Stored body, for successful fetches
    pub body: Option<Vec<u8>>,
}

/// Why [`Backend::wait`] returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wakeup {
    /// A response arrived
    Completed(Completion),
    /// The deadline passed first
    TimedOut,
    /// Nothing is in flight
    Idle,
}

/// A driver for one backend link.
///
/// Implementations are owned by a single [`Connection`](crate::Connection)
/// and only ever called from the thread driving it.
pub trait Backend {
    /// Driver name, for logs
    fn name(&self) -> &str;

    /// Establish the link synchronously
    fn connect(&mut self, params: &ConnectParams) -> std::result::Result<(), BackendStatus>;

    /// Enqueue a store
    fn store(&mut self, id: OperationId, command: StoreCommand)
        -> std::result::Result<(), BackendStatus>;

    /// Enqueue a fetch
    fn fetch(&mut self, id: OperationId, command: FetchCommand)
        -> std::result::Result<(), BackendStatus>;

    /// Block until the next completion, the deadline, or idleness
    fn wait(&mut self, deadline: Option<Instant>) -> Wakeup;

    /// Commands accepted but not yet completed
    fn in_flight(&self) -> usize;

    /// Tear the link down; queued commands are dropped
    fn disconnect(&mut self) {}
}

/// Build the driver named by `config.backend`.
///
/// Fails with [`Error::NoBackend`] when that driver is not compiled in.
pub fn from_config(config: &ClientConfig) -> Result<Box<dyn Backend>> {
    match config.backend.as_str() {
        #[cfg(feature = "memory-backend")]
        memory::DRIVER_NAME => {
            let cluster = memory::MemoryCluster::shared(&config.host);
            Ok(Box::new(memory::MemoryBackend::from_options(
                cluster,
                &config.memory,
            )))
        }
        other => Err(Error::NoBackend(other.to_string())),
    }
}
