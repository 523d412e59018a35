//! Convenient imports for dockv.
//!
//! ```ignore
//! use dockv::prelude::*;
//!
//! let client = DbClient::create(ClientConfig::default())?;
//! client.get("abc", |doc| println!("{:?}", doc))?;
//! client.process(Duration::ZERO)?;
//! ```

// Client
pub use crate::{ClientConfig, ClientHandle, DbClient, DrainReport, PumpState};

// Requests
pub use crate::{GetOperation, PutOperation, StorePolicy};

// Errors
pub use crate::{Error, FatalAction, FatalError, FatalHandler, Result};

// Documents
pub use crate::Value;

pub use std::time::Duration;
