//! Engine contract: the instruction stream and its vocabulary.
//!
//! The game engine is an external collaborator. This module defines the
//! closed instruction set it emits, the colors it may ask for, and the
//! [`Engine`] trait the session controller drives. The engine value itself
//! is an owned handle: constructing it creates the underlying state,
//! dropping it destroys it.

mod script;

pub use script::{ScriptedEngine, SCREEN_COLUMNS, SCREEN_LINES};

use serde::{Deserialize, Serialize};

use crate::input::InputSymbol;

/// Durations in the instruction stream are plain milliseconds.
pub type Milliseconds = u64;

/// Classic 16-slot terminal palette.
///
/// The compositor never interprets colors; it only carries them from
/// `SetColor` instructions into the composed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    Gray,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

impl Color {
    /// Default foreground for fresh compositors and blank frame cells.
    pub const DEFAULT_FOREGROUND: Color = Color::White;
    /// Default background for fresh compositors and blank frame cells.
    pub const DEFAULT_BACKGROUND: Color = Color::Black;
}

/// Engine variant selector, persisted with the session seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// The engine eventually signals termination on its own.
    Normal,
    /// The engine keeps producing screens until told to stop.
    Endless,
}

/// One drawing or control directive emitted by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    ClearScreen,
    Flush,
    WriteString(String),
    MoveCursor { line: usize, column: usize },
    SetColor { foreground: Color, background: Color },
    Sleep(Milliseconds),
}

/// The control surface of an external engine.
///
/// After a successful [`advance`](Engine::advance), the engine exposes an
/// ordered batch of instructions through
/// [`next_instruction`](Engine::next_instruction). `None` means the engine
/// is blocked awaiting the next input, not that it has ended; termination is
/// signalled by `advance` returning `false`.
pub trait Engine {
    /// Feed one input symbol. Returns `false` once the engine has
    /// terminated; a terminated engine never produces instructions again.
    fn advance(&mut self, input: InputSymbol) -> bool;

    /// Pull the next pending instruction, in emission order.
    fn next_instruction(&mut self) -> Option<Instruction>;
}
