//! Link to the backend store
//!
//! A [`Connection`] wraps one driver. It connects synchronously when opened,
//! owns the [`FatalHandler`] consulted when a completion cannot be routed,
//! and disconnects the driver when dropped.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::time::Instant;

use serde::Deserialize;
use tracing::{debug, error, info, warn};

use dockv_core::{OperationId, OperationKind};

use crate::backend::{Backend, ConnectParams, FetchCommand, StoreCommand, Wakeup};
use crate::config::ClientConfig;
use crate::error::{Error, FatalError, Result};

/// What happens once a fatal completion has been reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FatalAction {
    /// Terminate the process
    Abort,
    /// Return the error from `process`
    #[default]
    Propagate,
}

impl FromStr for FatalAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(FatalAction::Abort),
            "propagate" => Ok(FatalAction::Propagate),
            other => Err(format!("unknown fatal action: {}", other)),
        }
    }
}

/// Per-connection policy for fatal completions
///
/// The optional hook always runs first; the action then decides between
/// aborting and handing the error back to the caller of `process`. Hooks
/// run while the pump is active and must not call back into the client.
#[derive(Clone, Default)]
pub struct FatalHandler {
    action: FatalAction,
    hook: Option<Rc<dyn Fn(&FatalError)>>,
}

impl FatalHandler {
    /// Handler with the given action and no hook
    pub fn new(action: FatalAction) -> Self {
        Self { action, hook: None }
    }

    /// Return fatal errors from `process`
    pub fn propagate() -> Self {
        Self::new(FatalAction::Propagate)
    }

    /// Abort the process on the first fatal error
    pub fn abort() -> Self {
        Self::new(FatalAction::Abort)
    }

    /// Run `hook` for every fatal error before acting on it
    pub fn with_hook(mut self, hook: impl Fn(&FatalError) + 'static) -> Self {
        self.hook = Some(Rc::new(hook));
        self
    }

    /// The configured action
    pub fn action(&self) -> FatalAction {
        self.action
    }

    /// Report `err` and turn it into the error `process` returns.
    ///
    /// Does not return under [`FatalAction::Abort`].
    pub fn handle(&self, err: FatalError) -> Error {
        error!(
            id = %err.id,
            kind = %err.kind,
            key = %err.key,
            transient = err.status().map(|s| s.is_transient()).unwrap_or(false),
            "fatal backend error: {}",
            err.cause
        );
        if let Some(hook) = &self.hook {
            hook(&err);
        }
        if self.action == FatalAction::Abort {
            eprintln!("Database error: {}", err);
            std::process::abort();
        }
        Error::Fatal(err)
    }
}

impl fmt::Debug for FatalHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FatalHandler")
            .field("action", &self.action)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

/// One live link to a bucket
pub struct Connection {
    backend: Box<dyn Backend>,
    fatal: FatalHandler,
    host: String,
    bucket: String,
}

impl Connection {
    /// Connect `backend` using the settings in `config`.
    ///
    /// Fails with [`Error::Connect`] if the driver cannot establish the link.
    /// There is no retry.
    pub fn open(
        config: &ClientConfig,
        mut backend: Box<dyn Backend>,
        fatal: FatalHandler,
    ) -> Result<Self> {
        let params = ConnectParams::from_config(config);
        if let Err(status) = backend.connect(&params) {
            warn!(
                driver = backend.name(),
                host = %params.host,
                bucket = %params.bucket,
                %status,
                "connection failed"
            );
            return Err(Error::Connect {
                host: params.host,
                bucket: params.bucket,
                status,
            });
        }
        info!(
            driver = backend.name(),
            host = %params.host,
            bucket = %params.bucket,
            anonymous = params.user.is_none(),
            "connected"
        );
        Ok(Self {
            backend,
            fatal,
            host: params.host,
            bucket: params.bucket,
        })
    }

    /// Replace the fatal-error handler
    pub fn register_fatal_handler(&mut self, handler: FatalHandler) {
        self.fatal = handler;
    }

    /// The current fatal-error handler
    pub fn fatal_handler(&self) -> &FatalHandler {
        &self.fatal
    }

    /// Hand a store to the driver without waiting for it
    pub fn submit_store(&mut self, id: OperationId, command: StoreCommand) -> Result<()> {
        let key = command.key.clone();
        self.backend
            .store(id, command)
            .map_err(|status| Error::Submit {
                kind: OperationKind::Put,
                key,
                status,
            })
    }

    /// Hand a fetch to the driver without waiting for it
    pub fn submit_fetch(&mut self, id: OperationId, command: FetchCommand) -> Result<()> {
        let key = command.key.clone();
        self.backend
            .fetch(id, command)
            .map_err(|status| Error::Submit {
                kind: OperationKind::Get,
                key,
                status,
            })
    }

    /// Block for the next completion, up to `deadline`
    pub fn next_completion(&mut self, deadline: Option<Instant>) -> Wakeup {
        self.backend.wait(deadline)
    }

    /// Requests the driver still owes a response for
    pub fn in_flight(&self) -> usize {
        self.backend.in_flight()
    }

    /// Host this connection was opened against
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Bucket this connection was opened against
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let abandoned = self.backend.in_flight();
        if abandoned > 0 {
            warn!(abandoned, bucket = %self.bucket, "disconnecting with requests in flight");
        }
        self.backend.disconnect();
        debug!(host = %self.host, bucket = %self.bucket, "disconnected");
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("driver", &self.backend.name())
            .field("host", &self.host)
            .field("bucket", &self.bucket)
            .field("in_flight", &self.backend.in_flight())
            .finish()
    }
}
