//! gridcast — terminal-grid session core with input record/replay.
//!
//! The crate is the presentation-side core for a deterministic, seeded
//! game engine: it consumes the engine's drawing-instruction stream into a
//! fixed-size character grid ([`compositor`]), runs the input/drain
//! protocol between a UI thread and a session worker ([`session`]), and
//! reconstructs identical state after a relaunch by replaying the recorded
//! input log ([`save`]). The engine itself is external; [`engine`] defines
//! only its contract plus a scripted stand-in used by the demo binary and
//! the tests.

pub mod compositor;
pub mod engine;
pub mod input;
pub mod save;
pub mod session;
pub mod terminal;

pub use compositor::{Caret, Cell, Compositor, CompositorSnapshot, Frame, TextFragment};
pub use engine::{Color, Engine, Instruction, Milliseconds, Mode, ScriptedEngine};
pub use input::{InputLog, InputSymbol, LogParseError};
pub use save::{RestoreError, RestoredSession, SavedSession, SAVE_FORMAT_VERSION};
pub use session::worker::{SessionEvent, SessionWorker};
pub use session::{InputState, Session, Status};
pub use terminal::{
    ConsoleTerminal, Fallback, HasCompositor, InputGate, RenderSink, ReplayTerminal, Terminal,
    TerminalError,
};
