//! Event pump
//!
//! The pump is the only caller of the driver's blocking wait. One call to
//! [`drive`] snapshots the operations outstanding at entry and dispatches
//! completions until all of them are done, the deadline passes, or a fatal
//! completion stops the drain.
//!
//! The client state is borrowed only around driver and table calls and is
//! released while a continuation runs, so continuations may submit new
//! operations. Those are sent to the driver straight away but are not waited
//! on by the drain that is already running.

use std::cell::RefCell;
use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::backend::Wakeup;
use crate::client::ClientState;
use crate::error::{Error, Result};
use crate::ops::dispatch;

/// Observable pump state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    /// Nothing outstanding
    Idle,
    /// Operations outstanding, or a drain is running
    Draining,
}

impl fmt::Display for PumpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PumpState::Idle => write!(f, "idle"),
            PumpState::Draining => write!(f, "draining"),
        }
    }
}

/// Summary of one drain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Continuations dispatched during the drain
    pub completed: usize,
    /// The deadline elapsed before the armed operations finished
    pub timed_out: bool,
    /// Operations still registered when the drain returned
    pub outstanding: usize,
}

impl DrainReport {
    /// Check if nothing is left to wait for
    pub fn is_idle(&self) -> bool {
        self.outstanding == 0
    }
}

/// Drive completions for up to `timeout`; `Duration::ZERO` waits without a
/// deadline.
///
/// Fails with [`Error::Reentrant`] when called from inside a running drain,
/// and with [`Error::Fatal`] when a completion could not be routed and the
/// fatal handler propagates. Operations not yet completed stay registered in
/// either case.
pub(crate) fn drive(shared: &RefCell<ClientState>, timeout: Duration) -> Result<DrainReport> {
    let started = Instant::now();
    // A timeout too large for the clock is treated as no deadline.
    let deadline = if timeout.is_zero() {
        None
    } else {
        started.checked_add(timeout)
    };

    let mut armed = {
        let mut state = shared.try_borrow_mut().map_err(|_| Error::Reentrant)?;
        if state.draining {
            return Err(Error::Reentrant);
        }
        state.draining = true;
        state.table.ids()
    };
    let guard = DrainGuard { shared };
    debug!(armed = armed.len(), timeout_us = timeout.as_micros() as u64, "drain started");

    let mut report = DrainReport::default();
    let result = loop {
        if armed.is_empty() {
            break Ok(());
        }

        let wakeup = shared.borrow_mut().connection.next_completion(deadline);
        let completion = match wakeup {
            Wakeup::Completed(completion) => completion,
            Wakeup::TimedOut => {
                report.timed_out = true;
                break Ok(());
            }
            Wakeup::Idle => {
                warn!(armed = armed.len(), "driver went idle with operations outstanding");
                break Ok(());
            }
        };

        armed.remove(&completion.id);
        let entry = shared.borrow_mut().table.take(completion.id);
        let Some(op) = entry else {
            warn!(id = %completion.id, status = %completion.status, "completion for unknown operation");
            continue;
        };

        report.completed += 1;
        if let Err(fatal) = dispatch(op, completion) {
            let handler = shared.borrow().connection.fatal_handler().clone();
            break Err(handler.handle(fatal));
        }
        trace!(remaining = armed.len(), "continuation returned");
    };

    drop(guard);
    report.outstanding = shared.borrow().table.len();
    debug!(
        completed = report.completed,
        timed_out = report.timed_out,
        outstanding = report.outstanding,
        elapsed_us = started.elapsed().as_micros() as u64,
        "drain finished"
    );
    result.map(|()| report)
}

/// Clears the draining flag when the drain ends, also when a continuation
/// unwinds.
struct DrainGuard<'a> {
    shared: &'a RefCell<ClientState>,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        match self.shared.try_borrow_mut() {
            Ok(mut state) => state.draining = false,
            Err(_) => warn!("client state still borrowed at end of drain"),
        }
    }
}
