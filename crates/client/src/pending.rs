//! Registry of in-flight operations
//!
//! Every submitted operation is parked here under the [`OperationId`] the
//! driver will echo back. The table owns the continuation until the
//! completion arrives; [`PendingOperationTable::take`] removes the entry
//! before the continuation is run, so each entry is dispatched at most once.

use std::fmt;
use std::time::Instant;

use rustc_hash::{FxHashMap, FxHashSet};

use dockv_core::{OperationId, OperationKind, Value};

/// Callback without arguments
pub type Callback = Box<dyn FnOnce()>;

/// Callback receiving the fetched document
pub type ValueCallback = Box<dyn FnOnce(Value)>;

/// The caller's continuation for one operation
pub enum Continuation {
    /// Continuation of a put
    Put {
        /// Runs on success
        on_done: Option<Callback>,
        /// Runs on a conflict or a missing key
        on_conflict: Option<Callback>,
    },
    /// Continuation of a get
    Get {
        /// Runs with the document, or `Null` for a missing key
        on_done: Option<ValueCallback>,
    },
}

impl Continuation {
    /// Kind of operation this continuation belongs to
    pub fn kind(&self) -> OperationKind {
        match self {
            Continuation::Put { .. } => OperationKind::Put,
            Continuation::Get { .. } => OperationKind::Get,
        }
    }
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Continuation::Put {
                on_done,
                on_conflict,
            } => f
                .debug_struct("Put")
                .field("on_done", &on_done.is_some())
                .field("on_conflict", &on_conflict.is_some())
                .finish(),
            Continuation::Get { on_done } => f
                .debug_struct("Get")
                .field("on_done", &on_done.is_some())
                .finish(),
        }
    }
}

/// An operation waiting for its completion
#[derive(Debug)]
pub struct PendingOperation {
    /// Handle the driver echoes back
    pub id: OperationId,
    /// Target key
    pub key: String,
    /// When it was handed to the driver
    pub submitted_at: Instant,
    /// What to run on completion
    pub continuation: Continuation,
}

impl PendingOperation {
    /// Kind of this operation
    pub fn kind(&self) -> OperationKind {
        self.continuation.kind()
    }
}

/// In-flight operations keyed by id
#[derive(Debug, Default)]
pub struct PendingOperationTable {
    entries: FxHashMap<OperationId, PendingOperation>,
    next_id: u64,
}

impl PendingOperationTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh id. Ids are never reused within one table.
    pub fn allocate_id(&mut self) -> OperationId {
        self.next_id += 1;
        OperationId::new(self.next_id)
    }

    /// Park an operation until its completion arrives
    pub fn insert(&mut self, op: PendingOperation) {
        let previous = self.entries.insert(op.id, op);
        debug_assert!(previous.is_none(), "operation id registered twice");
    }

    /// Remove and return the operation for `id`, if still registered
    pub fn take(&mut self, id: OperationId) -> Option<PendingOperation> {
        self.entries.remove(&id)
    }

    /// Check if `id` is still outstanding
    pub fn contains(&self, id: OperationId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Snapshot of every outstanding id
    pub fn ids(&self) -> FxHashSet<OperationId> {
        self.entries.keys().copied().collect()
    }

    /// Number of outstanding operations
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is outstanding
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
