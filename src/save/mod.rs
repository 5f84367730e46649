//! Saved-session blobs: serialization and deterministic restoration.
//!
//! A saved session is one opaque, versioned JSON blob holding the engine
//! seed and mode, the recorded input log and a snapshot of the compositor.
//! Restoration builds a fresh engine and compositor and feeds the recorded
//! log back through the normal input path, with a
//! [`ReplayTerminal`]/[`ConsoleTerminal`] fallback chain standing in for
//! the user. Both decode failures are recoverable: callers should treat
//! them as "no restorable state" and start fresh.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::compositor::{Compositor, CompositorSnapshot};
use crate::engine::{Engine, Mode};
use crate::input::{InputLog, InputSymbol};
use crate::session::{Session, Status};
use crate::terminal::{
    ConsoleTerminal, Fallback, HasCompositor, InputGate, RenderSink, ReplayTerminal, Terminal,
    TerminalError,
};

/// Structural version of the blob. Bump on any incompatible change.
pub const SAVE_FORMAT_VERSION: u32 = 1;

/// Why a blob could not be turned back into a session.
#[derive(Debug, thiserror::Error)]
pub enum RestoreError {
    /// The blob (or the state it describes) is unusable. Recover by
    /// starting fresh.
    #[error("saved session is unusable: {0}")]
    CorruptState(String),

    /// The blob was written by an incompatible version of this crate.
    /// Recover by starting fresh.
    #[error("saved session has format version {found}, expected {}", SAVE_FORMAT_VERSION)]
    IncompatibleVersion { found: u32 },

    /// The session was torn down while the replay was still running.
    #[error("restoration was cancelled")]
    Cancelled,
}

/// The terminal a restored session runs on: recorded input first, the live
/// console after that.
pub type RestoredTerminal<S> =
    Fallback<ReplayTerminal<std::vec::IntoIter<InputSymbol>>, ConsoleTerminal<S>>;

/// A session rebuilt from a [`SavedSession`].
pub type RestoredSession<E, S> = Session<E, RestoredTerminal<S>>;

/// Everything needed to reconstruct a session, in serializable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSession {
    version: u32,
    seed: u64,
    mode: Mode,
    input_log: String,
    compositor: CompositorSnapshot,
}

impl SavedSession {
    pub(crate) fn capture(
        seed: u64,
        mode: Mode,
        log: &InputLog,
        compositor: CompositorSnapshot,
    ) -> Self {
        SavedSession {
            version: SAVE_FORMAT_VERSION,
            seed,
            mode,
            input_log: log.encode(),
            compositor,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Serialize into the opaque blob form.
    pub fn encode(&self) -> Vec<u8> {
        // Plain derived data types; JSON encoding cannot fail here.
        serde_json::to_vec(self).expect("saved session serializes to JSON")
    }

    /// Parse and validate a blob.
    pub fn decode(bytes: &[u8]) -> Result<Self, RestoreError> {
        #[derive(Deserialize)]
        struct VersionProbe {
            version: u32,
        }

        let probe: VersionProbe = serde_json::from_slice(bytes)
            .map_err(|e| RestoreError::CorruptState(e.to_string()))?;
        if probe.version != SAVE_FORMAT_VERSION {
            return Err(RestoreError::IncompatibleVersion {
                found: probe.version,
            });
        }

        let saved: SavedSession = serde_json::from_slice(bytes)
            .map_err(|e| RestoreError::CorruptState(e.to_string()))?;
        if !saved.compositor.is_well_formed() {
            return Err(RestoreError::CorruptState(
                "compositor snapshot is malformed".into(),
            ));
        }
        InputLog::decode(&saved.input_log)
            .map_err(|e| RestoreError::CorruptState(e.to_string()))?;
        Ok(saved)
    }

    /// Rebuild a live session by replaying the recorded input through a
    /// fresh engine and compositor.
    ///
    /// `engine` must be freshly created from [`seed`](Self::seed) and
    /// [`mode`](Self::mode) — determinism is what makes the replay land on
    /// the recorded state. Replay stops when the log runs out, leaving the
    /// session waiting for live input; the fallback chain stays in place
    /// and is transparent from then on.
    pub fn restore<E, S>(
        self,
        engine: E,
        sink: S,
        gate: Arc<InputGate>,
    ) -> Result<RestoredSession<E, S>, RestoreError>
    where
        E: Engine,
        S: RenderSink,
    {
        let symbols = InputLog::decode(&self.input_log)
            .map_err(|e| RestoreError::CorruptState(e.to_string()))?;
        debug!(
            seed = self.seed,
            symbols = symbols.len(),
            "replaying saved session"
        );

        let compositor = Compositor::new(self.compositor.columns(), self.compositor.rows());
        let console = ConsoleTerminal::new(compositor, sink, gate);
        let replay = ReplayTerminal::new(symbols.into_iter());
        let mut session = Session::new(engine, self.mode, self.seed, Fallback::new(replay, console));

        while !session.terminal().primary().is_finished() {
            let symbol = match session.terminal_mut().getch() {
                Ok(symbol) => symbol,
                Err(TerminalError::Cancelled) => return Err(RestoreError::Cancelled),
                Err(TerminalError::NoMoreInput) => break,
            };
            match session.submit_input(symbol) {
                Ok(Status::ExpectingMoreInput) => {}
                Ok(Status::SessionEnded) => {
                    if session.terminal().primary().is_finished() {
                        // The recorded session genuinely ended on its last
                        // input; hand it back as-is.
                        break;
                    }
                    return Err(RestoreError::CorruptState(
                        "recorded input continues past engine termination".into(),
                    ));
                }
                Ok(Status::UnexpectedInput) => {
                    return Err(RestoreError::CorruptState(
                        "replay desynchronized from the session state".into(),
                    ));
                }
                Err(TerminalError::Cancelled) => return Err(RestoreError::Cancelled),
                Err(TerminalError::NoMoreInput) => {
                    return Err(RestoreError::CorruptState(
                        "renderer refused a replayed instruction".into(),
                    ));
                }
            }
        }

        debug_assert_eq!(
            session.terminal().compositor().snapshot(),
            self.compositor,
            "replay landed on a different compositor state than was saved"
        );
        Ok(session)
    }
}
