//! Asynchronous document store client
//!
//! Requests are submitted without blocking and complete through callbacks.
//! Nothing happens in the background: completions are dispatched only while
//! the caller runs [`DbClient::process`], on the caller's thread.
//!
//! ## Layers
//!
//! - [`backend`]: the driver seam and the in-memory driver
//! - [`Connection`]: one connected driver plus its [`FatalHandler`]
//! - [`PendingOperationTable`]: continuations parked by [`OperationId`]
//! - [`PutOperation`] / [`GetOperation`]: request builders and routing
//! - [`DbClient`]: the owning client applications use, and [`ClientHandle`]
//!   for callbacks

#![warn(missing_docs)]

pub mod backend;
mod client;
pub mod config;
mod connection;
pub mod error;
mod ops;
mod pending;
mod pump;

pub use backend::{Backend, Completion, ConnectParams, FetchCommand, StoreCommand, Wakeup};
pub use client::{ClientHandle, DbClient};
pub use config::{ClientConfig, ConfigError, MemoryOptions};
pub use connection::{Connection, FatalAction, FatalHandler};
pub use error::{Error, FatalCause, FatalError, Result};
pub use ops::{dispatch, validate_key, GetOperation, PutOperation, MAX_KEY_BYTES};
pub use pending::{Callback, Continuation, PendingOperation, PendingOperationTable, ValueCallback};
pub use pump::{DrainReport, PumpState};

pub use dockv_core::{BackendStatus, OperationId, OperationKind, Outcome, StorePolicy, Value};
