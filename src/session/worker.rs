//! Dedicated worker thread for interactive sessions.
//!
//! The worker owns the [`Session`] exclusively and runs the blocking loop:
//! wait for input on the gate, submit it, drain. Frames cross to the UI
//! thread as [`SessionEvent::Frame`] messages, and the worker then parks
//! until the UI acknowledges with
//! [`frame_presented`](SessionWorker::frame_presented) — the compositor
//! never runs ahead of what has actually been drawn. Tearing the worker
//! down cancels every blocking wait (input, frame acknowledgement, timed
//! sleeps), so a dropped session cannot leak a parked thread.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::compositor::{Caret, Compositor, Frame};
use crate::engine::{Engine, Mode};
use crate::input::InputSymbol;
use crate::save::{RestoreError, SavedSession};
use crate::session::{Session, Status};
use crate::terminal::{
    ConsoleTerminal, HasCompositor, InputGate, RenderSink, Terminal, TerminalError,
};

/// Messages the worker sends to the UI thread, in order.
#[derive(Debug)]
pub enum SessionEvent {
    /// A composed frame. Must be answered with
    /// [`SessionWorker::frame_presented`] once drawn, or the worker stays
    /// parked.
    Frame { frame: Frame, caret: Caret },
    /// Outcome of one submitted input.
    Status(Status),
    /// Restoration failed; the worker has exited and a fresh session
    /// should be started instead.
    RestoreFailed(RestoreError),
    /// The worker loop has exited.
    Exited,
}

/// Monitor for the frame acknowledgement handshake.
#[derive(Debug)]
struct FrameAck {
    slot: Mutex<AckSlot>,
    cond: Condvar,
}

#[derive(Debug)]
struct AckSlot {
    presented: bool,
    cancelled: bool,
}

impl FrameAck {
    fn new() -> Self {
        FrameAck {
            slot: Mutex::new(AckSlot {
                presented: false,
                cancelled: false,
            }),
            cond: Condvar::new(),
        }
    }

    fn wait_presented(&self) -> Result<(), TerminalError> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if slot.cancelled {
                return Err(TerminalError::Cancelled);
            }
            if slot.presented {
                slot.presented = false;
                return Ok(());
            }
            slot = self.cond.wait(slot).unwrap_or_else(|e| e.into_inner());
        }
    }

    fn notify_presented(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.presented = true;
        self.cond.notify_all();
    }

    fn cancel(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.cancelled = true;
        self.cond.notify_all();
    }
}

/// Render sink that ships frames to the UI and waits for the handshake.
struct AckSink {
    events: Sender<SessionEvent>,
    ack: Arc<FrameAck>,
}

impl RenderSink for AckSink {
    fn present(&mut self, frame: Frame, caret: Caret) -> Result<(), TerminalError> {
        if self
            .events
            .send(SessionEvent::Frame { frame, caret })
            .is_err()
        {
            // The UI side is gone; treat it as a teardown.
            return Err(TerminalError::Cancelled);
        }
        self.ack.wait_presented()
    }
}

/// Handle to a session running on its own thread. See the module docs.
#[derive(Debug)]
pub struct SessionWorker {
    gate: Arc<InputGate>,
    ack: Arc<FrameAck>,
    events: Receiver<SessionEvent>,
    checkpoint: Arc<Mutex<SavedSession>>,
    thread: Option<JoinHandle<()>>,
}

impl SessionWorker {
    /// Start a fresh session on a new worker thread.
    ///
    /// `initial_input` is submitted before the input loop starts, so a
    /// caller that wants the first screen drawn immediately can kick the
    /// engine without racing the gate.
    pub fn spawn<E>(
        engine: E,
        mode: Mode,
        seed: u64,
        columns: usize,
        rows: usize,
        initial_input: Option<InputSymbol>,
    ) -> Self
    where
        E: Engine + Send + 'static,
    {
        let gate = Arc::new(InputGate::new());
        let ack = Arc::new(FrameAck::new());
        let (events_tx, events_rx) = mpsc::channel();

        let sink = AckSink {
            events: events_tx.clone(),
            ack: Arc::clone(&ack),
        };
        let terminal = ConsoleTerminal::new(Compositor::new(columns, rows), sink, Arc::clone(&gate));
        let session = Session::new(engine, mode, seed, terminal);
        let checkpoint = Arc::new(Mutex::new(session.save()));

        let thread = {
            let checkpoint = Arc::clone(&checkpoint);
            thread::spawn(move || {
                info!(seed, "session worker started");
                run_loop(session, events_tx, checkpoint, initial_input);
            })
        };

        SessionWorker {
            gate,
            ack,
            events: events_rx,
            checkpoint,
            thread: Some(thread),
        }
    }

    /// Restore a saved session and continue it on a new worker thread.
    ///
    /// The replay runs on the worker (its tail may present frames and
    /// sleep); if it fails, [`SessionEvent::RestoreFailed`] is delivered
    /// and the worker exits.
    pub fn resume<E>(saved: SavedSession, engine: E) -> Self
    where
        E: Engine + Send + 'static,
    {
        let gate = Arc::new(InputGate::new());
        let ack = Arc::new(FrameAck::new());
        let (events_tx, events_rx) = mpsc::channel();
        let checkpoint = Arc::new(Mutex::new(saved.clone()));

        let thread = {
            let gate = Arc::clone(&gate);
            let ack = Arc::clone(&ack);
            let checkpoint = Arc::clone(&checkpoint);
            thread::spawn(move || {
                let sink = AckSink {
                    events: events_tx.clone(),
                    ack,
                };
                let seed = saved.seed();
                match saved.restore(engine, sink, gate) {
                    Ok(mut session) => {
                        info!(seed, "session worker resumed from saved state");
                        // Show the restored screen before waiting for input.
                        if session.present().is_err() {
                            let _ = events_tx.send(SessionEvent::Exited);
                            return;
                        }
                        run_loop(session, events_tx, checkpoint, None);
                    }
                    Err(error) => {
                        warn!(%error, "failed to restore saved session");
                        let _ = events_tx.send(SessionEvent::RestoreFailed(error));
                    }
                }
            })
        };

        SessionWorker {
            gate,
            ack,
            events: events_rx,
            checkpoint,
            thread: Some(thread),
        }
    }

    /// Offer one input symbol. `false` means the worker was not waiting
    /// (mid-drain, sleeping, or already torn down) and the input was
    /// dropped.
    pub fn send_input(&self, symbol: InputSymbol) -> bool {
        self.gate.send(symbol)
    }

    /// The ordered stream of worker events.
    pub fn events(&self) -> &Receiver<SessionEvent> {
        &self.events
    }

    /// Acknowledge the most recently received frame.
    pub fn frame_presented(&self) {
        self.ack.notify_presented();
    }

    /// The latest consistent saved state: refreshed after every completed
    /// drain, safe to call at any time from any thread.
    pub fn save(&self) -> SavedSession {
        self.checkpoint
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Cancel every blocking wait and join the worker thread.
    pub fn shutdown(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        self.gate.cancel();
        self.ack.cancel();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("session worker panicked");
            }
        }
    }
}

impl Drop for SessionWorker {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn run_loop<E, T>(
    mut session: Session<E, T>,
    events: Sender<SessionEvent>,
    checkpoint: Arc<Mutex<SavedSession>>,
    initial_input: Option<InputSymbol>,
) where
    E: Engine,
    T: Terminal + HasCompositor,
{
    if let Some(symbol) = initial_input {
        if !step(&mut session, &events, &checkpoint, symbol) {
            let _ = events.send(SessionEvent::Exited);
            return;
        }
    }

    loop {
        let symbol = match session.terminal_mut().getch() {
            Ok(symbol) => symbol,
            Err(_) => break,
        };
        if !step(&mut session, &events, &checkpoint, symbol) {
            break;
        }
    }
    debug!("session worker exiting");
    let _ = events.send(SessionEvent::Exited);
}

/// Submit one symbol; returns `false` when the loop should stop.
fn step<E, T>(
    session: &mut Session<E, T>,
    events: &Sender<SessionEvent>,
    checkpoint: &Arc<Mutex<SavedSession>>,
    symbol: InputSymbol,
) -> bool
where
    E: Engine,
    T: Terminal + HasCompositor,
{
    match session.submit_input(symbol) {
        Ok(status) => {
            if status == Status::ExpectingMoreInput {
                *checkpoint.lock().unwrap_or_else(|e| e.into_inner()) = session.save();
            }
            let _ = events.send(SessionEvent::Status(status));
            status != Status::SessionEnded
        }
        Err(TerminalError::Cancelled) => false,
        Err(error) => {
            warn!(%error, "drain aborted");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::engine::ScriptedEngine;

    const GRID: (usize, usize) = (80, 24);

    /// Drain events until the next status, acknowledging frames along the
    /// way. Returns the frames seen.
    fn pump_until_status(worker: &SessionWorker) -> (Vec<Frame>, Status) {
        let mut frames = Vec::new();
        loop {
            match worker
                .events()
                .recv_timeout(Duration::from_secs(10))
                .expect("worker event")
            {
                SessionEvent::Frame { frame, .. } => {
                    frames.push(frame);
                    worker.frame_presented();
                }
                SessionEvent::Status(status) => return (frames, status),
                SessionEvent::RestoreFailed(error) => panic!("restore failed: {error}"),
                SessionEvent::Exited => panic!("worker exited early"),
            }
        }
    }

    fn send_until_accepted(worker: &SessionWorker, symbol: InputSymbol) {
        while !worker.send_input(symbol) {
            thread::yield_now();
        }
    }

    #[test]
    fn initial_input_draws_the_first_screen() {
        let worker = SessionWorker::spawn(
            ScriptedEngine::new(Mode::Endless, 42),
            Mode::Endless,
            42,
            GRID.0,
            GRID.1,
            Some(InputSymbol::Confirm),
        );
        let (frames, status) = pump_until_status(&worker);
        assert_eq!(status, Status::ExpectingMoreInput);
        assert!(!frames.is_empty());
        let last = frames.last().unwrap();
        assert_ne!(last.row_text(0).trim(), "");
        worker.shutdown();
    }

    #[test]
    fn inputs_flow_through_the_gate() {
        let worker = SessionWorker::spawn(
            ScriptedEngine::new(Mode::Endless, 7),
            Mode::Endless,
            7,
            GRID.0,
            GRID.1,
            Some(InputSymbol::Confirm),
        );
        pump_until_status(&worker);

        send_until_accepted(&worker, InputSymbol::Down);
        let (frames, status) = pump_until_status(&worker);
        assert_eq!(status, Status::ExpectingMoreInput);
        assert!(!frames.is_empty());

        let saved = worker.save();
        worker.shutdown();
        assert_eq!(saved.seed(), 7);
    }

    #[test]
    fn checkpoint_tracks_completed_drains() {
        let worker = SessionWorker::spawn(
            ScriptedEngine::new(Mode::Endless, 5),
            Mode::Endless,
            5,
            GRID.0,
            GRID.1,
            Some(InputSymbol::Confirm),
        );
        pump_until_status(&worker);
        send_until_accepted(&worker, InputSymbol::Down);
        pump_until_status(&worker);

        let saved = worker.save();
        worker.shutdown();

        // Both the kick and the Down made it into the checkpointed log.
        let decoded = SavedSession::decode(&saved.encode()).unwrap();
        assert_eq!(decoded, saved);
    }

    #[test]
    fn shutdown_unblocks_a_waiting_worker() {
        let worker = SessionWorker::spawn(
            ScriptedEngine::new(Mode::Endless, 1),
            Mode::Endless,
            1,
            GRID.0,
            GRID.1,
            Some(InputSymbol::Confirm),
        );
        pump_until_status(&worker);
        // The worker is now parked in getch; shutdown must not hang.
        worker.shutdown();
    }

    #[test]
    fn drop_tears_the_worker_down() {
        let worker = SessionWorker::spawn(
            ScriptedEngine::new(Mode::Endless, 2),
            Mode::Endless,
            2,
            GRID.0,
            GRID.1,
            None,
        );
        drop(worker);
    }

    #[test]
    fn session_end_reports_ended_then_exits() {
        let worker = SessionWorker::spawn(
            ScriptedEngine::new(Mode::Endless, 3),
            Mode::Endless,
            3,
            GRID.0,
            GRID.1,
            Some(InputSymbol::Confirm),
        );
        pump_until_status(&worker);

        send_until_accepted(&worker, InputSymbol::EndOfInput);
        let (_, status) = pump_until_status(&worker);
        assert_eq!(status, Status::SessionEnded);
        match worker
            .events()
            .recv_timeout(Duration::from_secs(10))
            .expect("exit event")
        {
            SessionEvent::Exited => {}
            other => panic!("expected exit, got {other:?}"),
        }
        worker.shutdown();
    }
}
