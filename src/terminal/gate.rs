//! Blocking input rendezvous between the UI thread and a session worker.
//!
//! The gate is a small monitor with three states. The worker parks in
//! `Waiting` inside [`InputGate::await_input`]; the UI thread offers a
//! symbol with [`InputGate::send`], which succeeds only while the worker is
//! actually waiting — anything sent while the worker is draining
//! instructions is dropped and reported unaccepted, which is what protects
//! the session from double-submission races. Cancellation wakes every
//! waiter, including timed sleeps.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::trace;

use super::TerminalError;
use crate::input::InputSymbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    /// A reader is parked and will take the next symbol.
    Waiting,
    /// A symbol has been accepted and not yet collected by the reader.
    Received(InputSymbol),
    /// Nobody is listening; offered input is dropped.
    Ignoring,
}

#[derive(Debug)]
struct Slot {
    state: GateState,
    cancelled: bool,
}

/// See the module docs.
#[derive(Debug)]
pub struct InputGate {
    slot: Mutex<Slot>,
    cond: Condvar,
}

impl Default for InputGate {
    fn default() -> Self {
        Self::new()
    }
}

impl InputGate {
    pub fn new() -> Self {
        InputGate {
            slot: Mutex::new(Slot {
                state: GateState::Ignoring,
                cancelled: false,
            }),
            cond: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        // A poisoning panic can only come from a caller's thread; the slot
        // itself is always consistent, so keep going.
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Offer one input symbol. Returns `true` if a reader was waiting and
    /// the symbol was accepted, `false` if it was dropped.
    pub fn send(&self, symbol: InputSymbol) -> bool {
        let mut slot = self.lock();
        if slot.cancelled || slot.state != GateState::Waiting {
            trace!(?symbol, "input dropped, nobody waiting");
            return false;
        }
        slot.state = GateState::Received(symbol);
        self.cond.notify_all();
        true
    }

    /// Park until a symbol is offered or the gate is cancelled.
    pub fn await_input(&self) -> Result<InputSymbol, TerminalError> {
        let mut slot = self.lock();
        if slot.cancelled {
            return Err(TerminalError::Cancelled);
        }
        slot.state = GateState::Waiting;
        loop {
            if slot.cancelled {
                slot.state = GateState::Ignoring;
                return Err(TerminalError::Cancelled);
            }
            if let GateState::Received(symbol) = slot.state {
                slot.state = GateState::Ignoring;
                return Ok(symbol);
            }
            slot = self
                .cond
                .wait(slot)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Cancellable wait for the given duration.
    ///
    /// The gate stays `Ignoring` for the whole wait, so input offered while
    /// a session is sleeping is dropped just like input offered mid-drain.
    pub fn sleep(&self, duration: Duration) -> Result<(), TerminalError> {
        let deadline = Instant::now() + duration;
        let mut slot = self.lock();
        loop {
            if slot.cancelled {
                return Err(TerminalError::Cancelled);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            let (guard, _) = self
                .cond
                .wait_timeout(slot, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            slot = guard;
        }
    }

    /// Wake every waiter with [`TerminalError::Cancelled`]. Irreversible.
    pub fn cancel(&self) {
        let mut slot = self.lock();
        slot.cancelled = true;
        self.cond.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }
}
