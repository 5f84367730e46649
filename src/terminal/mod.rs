//! The capability surface a session needs from a terminal backend.
//!
//! [`Terminal`] is deliberately minimal: the drawing primitives of the
//! instruction stream, a blocking input read, and a timed delay. The live
//! implementation ([`ConsoleTerminal`]) is backed by a [`Compositor`] and a
//! render sink; [`ReplayTerminal`] answers input from a recorded log; and
//! [`Fallback`] composes the two for session restoration, switching over at
//! the first failure rather than at any explicit point.

mod console;
mod fallback;
mod gate;
mod replay;

pub use console::{ConsoleTerminal, RenderSink};
pub use fallback::Fallback;
pub use gate::InputGate;
pub use replay::ReplayTerminal;

use crate::compositor::Compositor;
use crate::engine::{Color, Milliseconds};
use crate::input::InputSymbol;

/// Failures a terminal backend can report.
///
/// Neither is fatal: `NoMoreInput` is what a [`Fallback`] falls back on, and
/// `Cancelled` means the owning session is being torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TerminalError {
    #[error("the recorded input is exhausted")]
    NoMoreInput,

    #[error("the session was cancelled while waiting")]
    Cancelled,
}

/// Operations a session controller performs against a terminal backend.
pub trait Terminal {
    fn clear_screen(&mut self) -> Result<(), TerminalError>;

    fn write_str(&mut self, s: &str) -> Result<(), TerminalError>;

    fn move_cursor(&mut self, line: usize, column: usize) -> Result<(), TerminalError>;

    fn set_color(&mut self, foreground: Color, background: Color) -> Result<(), TerminalError>;

    fn cursor_position(&mut self) -> Result<(usize, usize), TerminalError>;

    /// Compose the current grid state and hand the frame to whoever
    /// presents it. May block until the frame has been consumed.
    fn flush(&mut self) -> Result<(), TerminalError>;

    /// Block until one input symbol is available.
    fn getch(&mut self) -> Result<InputSymbol, TerminalError>;

    /// Wait for the given duration. Must return early with
    /// [`TerminalError::Cancelled`] when the session is torn down.
    fn sleep_ms(&mut self, ms: Milliseconds) -> Result<(), TerminalError>;
}

/// Backends that can expose the compositor they draw into.
///
/// Implemented by [`ConsoleTerminal`] and by any [`Fallback`] whose live
/// side does; this is what lets a session be serialized without knowing the
/// concrete backend type.
pub trait HasCompositor {
    fn compositor(&self) -> &Compositor;
}
