//! # dockv
//!
//! Asynchronous, callback-driven client for document key-value stores.
//!
//! Requests never block: `put` and `get` register a continuation and hand the
//! command to the backend driver. Progress happens only inside
//! [`DbClient::process`], which dispatches completions on the calling thread
//! and may be bounded by a timeout.
//!
//! ## Quick Start
//!
//! ```ignore
//! use dockv::prelude::*;
//!
//! let client = DbClient::create(ClientConfig::default())?;
//!
//! client.get("abc", |doc| println!("RESULT: {:?}", doc))?;
//! client.process(Duration::ZERO)?;
//!
//! client.put("abc", 54, || println!("DONE"), None, StorePolicy::SetUnconditionally)?;
//! client.process(Duration::ZERO)?;
//! ```
//!
//! ## Outcomes
//!
//! Every backend status is classified into one of four outcomes:
//!
//! - **Success**: `on_done` runs
//! - **Conflict / NotFound** on a conditional put: `on_conflict` runs
//! - **NotFound** on a get: `on_done` receives [`Value::Null`]
//! - anything else is **Fatal** and goes to the connection's [`FatalHandler`]
//!
//! ## Crates
//!
//! - [`dockv_core`]: values, statuses, the classifier
//! - [`dockv_wire`]: the JSON document codec
//! - [`dockv_client`]: configuration, drivers, the client itself

#![warn(missing_docs)]

pub mod prelude;

pub use dockv_client;
pub use dockv_core;
pub use dockv_wire;

pub use dockv_client::{
    ClientConfig, ClientHandle, ConfigError, DbClient, DrainReport, Error, FatalAction, FatalError,
    FatalHandler, GetOperation, PumpState, PutOperation, Result,
};
pub use dockv_core::{classify, BackendStatus, OperationId, OperationKind, Outcome, StorePolicy, Value};
