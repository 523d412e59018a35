//! Client entry point
//!
//! [`DbClient`] ties one [`Connection`], its pending-operation table and the
//! event pump together. [`ClientHandle`] is the weak counterpart that
//! callbacks capture, so a callback never keeps the connection alive.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::debug;

use dockv_core::{OperationId, StorePolicy, Value};

use crate::backend::{self, Backend};
use crate::config::ClientConfig;
use crate::connection::{Connection, FatalHandler};
use crate::error::{Error, Result};
use crate::ops::{self, GetOperation, PutOperation};
use crate::pending::{Callback, PendingOperationTable};
use crate::pump::{self, DrainReport, PumpState};

pub(crate) struct ClientState {
    pub(crate) connection: Connection,
    pub(crate) table: PendingOperationTable,
    pub(crate) draining: bool,
}

/// Asynchronous document store client.
///
/// Requests are submitted with [`put`](Self::put) and [`get`](Self::get) and
/// complete only while [`process`](Self::process) runs, on the calling
/// thread. The client owns the connection: dropping it disconnects, even
/// while continuations holding a [`ClientHandle`] are still registered.
///
/// # Example
///
/// ```ignore
/// use dockv::prelude::*;
///
/// let client = DbClient::create(ClientConfig::default())?;
/// client.put("abc", 54, || println!("DONE"), None, StorePolicy::SetUnconditionally)?;
/// client.get("abc", |value| println!("RESULT: {:?}", value))?;
/// client.process(Duration::ZERO)?;
/// ```
pub struct DbClient {
    shared: Rc<RefCell<ClientState>>,
}

impl DbClient {
    /// Connect using `config` and the driver it names.
    ///
    /// The fatal-error policy comes from `config.on_fatal`.
    pub fn create(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let backend = backend::from_config(&config)?;
        Self::with_backend(&config, backend)
    }

    /// Connect using a caller-supplied driver
    pub fn with_backend(config: &ClientConfig, backend: Box<dyn Backend>) -> Result<Self> {
        config.validate()?;
        let connection = Connection::open(config, backend, FatalHandler::new(config.on_fatal))?;
        Ok(Self {
            shared: Rc::new(RefCell::new(ClientState {
                connection,
                table: PendingOperationTable::new(),
                draining: false,
            })),
        })
    }

    /// A non-owning handle for continuations and fatal hooks to capture
    pub fn handle(&self) -> ClientHandle {
        ClientHandle {
            shared: Rc::downgrade(&self.shared),
        }
    }

    /// Store `document` under `key`.
    ///
    /// `on_done` runs once the store succeeded. `on_conflict` runs instead
    /// when `policy` could not be honoured (the key existed for an add, or
    /// was missing for a replace).
    pub fn put(
        &self,
        key: impl Into<String>,
        document: impl Into<Value>,
        on_done: impl FnOnce() + 'static,
        on_conflict: Option<Callback>,
        policy: StorePolicy,
    ) -> Result<OperationId> {
        self.submit_put(put_operation(key, document, on_done, on_conflict, policy))
    }

    /// Submit a prepared [`PutOperation`]
    pub fn submit_put(&self, op: PutOperation) -> Result<OperationId> {
        submit_put(&self.shared, op)
    }

    /// Fetch the document under `key`; `on_done` receives `Null` if absent.
    pub fn get(
        &self,
        key: impl Into<String>,
        on_done: impl FnOnce(Value) + 'static,
    ) -> Result<OperationId> {
        self.submit_get(GetOperation::new(key, on_done))
    }

    /// Fetch `key` and lock it for `lock_seconds`
    pub fn get_and_lock(
        &self,
        key: impl Into<String>,
        lock_seconds: u32,
        on_done: impl FnOnce(Value) + 'static,
    ) -> Result<OperationId> {
        self.submit_get(GetOperation::new(key, on_done).lock(lock_seconds))
    }

    /// Submit a prepared [`GetOperation`]
    pub fn submit_get(&self, op: GetOperation) -> Result<OperationId> {
        submit_get(&self.shared, op)
    }

    /// Dispatch completions for the operations outstanding now.
    ///
    /// `Duration::ZERO` blocks until all of them have completed; any other
    /// value returns once it elapses, leaving the rest registered for a later
    /// call.
    pub fn process(&self, timeout: Duration) -> Result<DrainReport> {
        pump::drive(&self.shared, timeout)
    }

    /// Call [`process`](Self::process) until nothing is outstanding,
    /// including operations submitted by continuations along the way.
    pub fn wait(&self) -> Result<DrainReport> {
        let mut total = DrainReport::default();
        loop {
            let report = self.process(Duration::ZERO)?;
            total.completed += report.completed;
            total.outstanding = report.outstanding;
            if report.is_idle() || report.completed == 0 {
                return Ok(total);
            }
        }
    }

    /// Replace the fatal-error handler
    pub fn register_fatal_handler(&self, handler: FatalHandler) -> Result<()> {
        let mut state = self.shared.try_borrow_mut().map_err(|_| Error::Reentrant)?;
        state.connection.register_fatal_handler(handler);
        Ok(())
    }

    /// Operations submitted and not yet dispatched
    pub fn outstanding(&self) -> usize {
        self.shared.borrow().table.len()
    }

    /// Current pump state
    pub fn state(&self) -> PumpState {
        pump_state(&self.shared.borrow())
    }

    /// Bucket the client is connected to
    pub fn bucket(&self) -> String {
        self.shared.borrow().connection.bucket().to_string()
    }

    /// Host the client is connected to
    pub fn host(&self) -> String {
        self.shared.borrow().connection.host().to_string()
    }
}

impl fmt::Debug for DbClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shared.try_borrow() {
            Ok(state) => f
                .debug_struct("DbClient")
                .field("connection", &state.connection)
                .field("outstanding", &state.table.len())
                .field("draining", &state.draining)
                .finish(),
            Err(_) => f.debug_struct("DbClient").finish_non_exhaustive(),
        }
    }
}

/// Weak reference to a [`DbClient`].
///
/// Cheap to clone. Every request fails with [`Error::Closed`] once the
/// owning client has been dropped.
#[derive(Clone, Debug)]
pub struct ClientHandle {
    shared: Weak<RefCell<ClientState>>,
}

impl ClientHandle {
    fn upgrade(&self) -> Result<Rc<RefCell<ClientState>>> {
        self.shared.upgrade().ok_or(Error::Closed)
    }

    /// Check if the owning client is gone
    pub fn is_closed(&self) -> bool {
        self.shared.strong_count() == 0
    }

    /// See [`DbClient::put`]
    pub fn put(
        &self,
        key: impl Into<String>,
        document: impl Into<Value>,
        on_done: impl FnOnce() + 'static,
        on_conflict: Option<Callback>,
        policy: StorePolicy,
    ) -> Result<OperationId> {
        self.submit_put(put_operation(key, document, on_done, on_conflict, policy))
    }

    /// See [`DbClient::submit_put`]
    pub fn submit_put(&self, op: PutOperation) -> Result<OperationId> {
        submit_put(&*self.upgrade()?, op)
    }

    /// See [`DbClient::get`]
    pub fn get(
        &self,
        key: impl Into<String>,
        on_done: impl FnOnce(Value) + 'static,
    ) -> Result<OperationId> {
        self.submit_get(GetOperation::new(key, on_done))
    }

    /// See [`DbClient::get_and_lock`]
    pub fn get_and_lock(
        &self,
        key: impl Into<String>,
        lock_seconds: u32,
        on_done: impl FnOnce(Value) + 'static,
    ) -> Result<OperationId> {
        self.submit_get(GetOperation::new(key, on_done).lock(lock_seconds))
    }

    /// See [`DbClient::submit_get`]
    pub fn submit_get(&self, op: GetOperation) -> Result<OperationId> {
        submit_get(&*self.upgrade()?, op)
    }

    /// See [`DbClient::process`]
    pub fn process(&self, timeout: Duration) -> Result<DrainReport> {
        pump::drive(&*self.upgrade()?, timeout)
    }

    /// Operations outstanding, 0 once closed
    pub fn outstanding(&self) -> usize {
        self.shared
            .upgrade()
            .map_or(0, |shared| shared.borrow().table.len())
    }

    /// Pump state, `Idle` once closed
    pub fn state(&self) -> PumpState {
        self.shared
            .upgrade()
            .map_or(PumpState::Idle, |shared| pump_state(&shared.borrow()))
    }
}

fn put_operation(
    key: impl Into<String>,
    document: impl Into<Value>,
    on_done: impl FnOnce() + 'static,
    on_conflict: Option<Callback>,
    policy: StorePolicy,
) -> PutOperation {
    let op = PutOperation::new(key, document).policy(policy).on_done(on_done);
    match on_conflict {
        Some(f) => op.on_conflict(f),
        None => op,
    }
}

fn submit_put(shared: &RefCell<ClientState>, op: PutOperation) -> Result<OperationId> {
    let key = op.key().to_string();
    let (command, continuation) = op.prepare()?;
    let policy = command.policy;
    let mut state = shared.try_borrow_mut().map_err(|_| Error::Reentrant)?;
    let id = state.table.allocate_id();
    state.connection.submit_store(id, command)?;
    debug!(%id, key = %key, %policy, "put submitted");
    state.table.insert(ops::pending(id, key, continuation));
    Ok(id)
}

fn submit_get(shared: &RefCell<ClientState>, op: GetOperation) -> Result<OperationId> {
    let key = op.key().to_string();
    let (command, continuation) = op.prepare()?;
    let lock = command.lock;
    let mut state = shared.try_borrow_mut().map_err(|_| Error::Reentrant)?;
    let id = state.table.allocate_id();
    state.connection.submit_fetch(id, command)?;
    debug!(%id, key = %key, ?lock, "get submitted");
    state.table.insert(ops::pending(id, key, continuation));
    Ok(id)
}

fn pump_state(state: &ClientState) -> PumpState {
    if state.draining || !state.table.is_empty() {
        PumpState::Draining
    } else {
        PumpState::Idle
    }
}
