//! Session controller: one engine, one terminal, one input log.
//!
//! A session is the single writer of its terminal's state. `submit_input`
//! drives the whole accept-advance-drain cycle synchronously; the
//! [`worker`] module wraps it in a dedicated thread with a blocking input
//! rendezvous for interactive use.

pub mod worker;

use tracing::{debug, trace};

use crate::engine::{Engine, Instruction, Mode};
use crate::input::{InputLog, InputSymbol};
use crate::save::SavedSession;
use crate::terminal::{HasCompositor, Terminal, TerminalError};

/// Outcome of a [`Session::submit_input`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The session was not waiting for input; the symbol was discarded.
    UnexpectedInput,
    /// The drain completed and the engine is blocked on the next input.
    ExpectingMoreInput,
    /// The engine terminated; the session should be replaced.
    SessionEnded,
}

/// Externally visible session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    WaitingForInput,
    Ignoring,
}

/// See the module docs.
#[derive(Debug)]
pub struct Session<E, T> {
    engine: E,
    seed: u64,
    mode: Mode,
    log: InputLog,
    state: InputState,
    terminal: T,
}

impl<E: Engine, T: Terminal> Session<E, T> {
    /// A fresh session, waiting for its first input.
    pub fn new(engine: E, mode: Mode, seed: u64, terminal: T) -> Self {
        Session {
            engine,
            seed,
            mode,
            log: InputLog::new(),
            state: InputState::WaitingForInput,
            terminal,
        }
    }

    pub fn state(&self) -> InputState {
        self.state
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn log(&self) -> &InputLog {
        &self.log
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut T {
        &mut self.terminal
    }

    /// Feed one input symbol and drain the resulting instruction stream.
    ///
    /// Returns [`Status::UnexpectedInput`] without touching anything if the
    /// session is not currently waiting — the guard against
    /// double-submission. After [`Status::SessionEnded`] the session stays
    /// in `Ignoring` for good; callers are expected to replace it.
    ///
    /// A terminal error aborts the remainder of the drain; nothing is
    /// retried.
    pub fn submit_input(&mut self, symbol: InputSymbol) -> Result<Status, TerminalError> {
        if self.state != InputState::WaitingForInput {
            trace!(?symbol, "input while ignoring, discarded");
            return Ok(Status::UnexpectedInput);
        }
        self.state = InputState::Ignoring;
        self.log.record(symbol);

        if !self.engine.advance(symbol) {
            debug!(?symbol, "engine terminated");
            return Ok(Status::SessionEnded);
        }

        let mut applied = 0usize;
        while let Some(instruction) = self.engine.next_instruction() {
            self.apply(instruction)?;
            applied += 1;
        }
        trace!(?symbol, applied, "drain complete");

        self.state = InputState::WaitingForInput;
        Ok(Status::ExpectingMoreInput)
    }

    /// Compose and deliver the current frame, outside of any drain.
    ///
    /// Used right after restoring a saved session, so the presentation
    /// layer has something to show before the next input arrives.
    pub fn present(&mut self) -> Result<(), TerminalError> {
        self.terminal.flush()
    }

    fn apply(&mut self, instruction: Instruction) -> Result<(), TerminalError> {
        match instruction {
            Instruction::ClearScreen => self.terminal.clear_screen(),
            Instruction::Flush => self.terminal.flush(),
            Instruction::WriteString(s) => self.terminal.write_str(&s),
            Instruction::MoveCursor { line, column } => self.terminal.move_cursor(line, column),
            Instruction::SetColor {
                foreground,
                background,
            } => self.terminal.set_color(foreground, background),
            Instruction::Sleep(ms) => self.terminal.sleep_ms(ms),
        }
    }
}

impl<E: Engine, T: Terminal + HasCompositor> Session<E, T> {
    /// Capture everything needed to reconstruct this session later.
    pub fn save(&self) -> SavedSession {
        SavedSession::capture(
            self.seed,
            self.mode,
            &self.log,
            self.terminal.compositor().snapshot(),
        )
    }
}
