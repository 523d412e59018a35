//! Core types for dockv
//!
//! This crate holds the vocabulary shared by the client, the codec and the
//! backend drivers:
//! - [`Value`]: the document model
//! - [`BackendStatus`] and [`classify`]: what a driver reports and what it means
//! - [`StorePolicy`], [`OperationKind`], [`OperationId`]: request metadata

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod status;
pub mod types;
pub mod value;

pub use status::{classify, BackendStatus, Outcome};
pub use types::{OperationId, OperationKind, ParsePolicyError, StorePolicy};
pub use value::Value;
