//! Primary/fallback composition of two terminal backends.

use super::{HasCompositor, Terminal, TerminalError};
use crate::compositor::Compositor;
use crate::engine::{Color, Milliseconds};
use crate::input::InputSymbol;

/// Tries the primary backend for every call and falls back on failure.
///
/// Composing a [`ReplayTerminal`](super::ReplayTerminal) over a
/// [`ConsoleTerminal`](super::ConsoleTerminal) is how restoration works:
/// recorded input is served until it runs out, and the very first failing
/// call after that lands on the live backend — there is no explicit
/// switch-over anywhere.
#[derive(Debug)]
pub struct Fallback<P, F> {
    primary: P,
    fallback: F,
}

impl<P: Terminal, F: Terminal> Fallback<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Fallback { primary, fallback }
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }

    pub fn fallback(&self) -> &F {
        &self.fallback
    }
}

impl<P: Terminal, F: Terminal> Terminal for Fallback<P, F> {
    fn clear_screen(&mut self) -> Result<(), TerminalError> {
        self.primary
            .clear_screen()
            .or_else(|_| self.fallback.clear_screen())
    }

    fn write_str(&mut self, s: &str) -> Result<(), TerminalError> {
        self.primary
            .write_str(s)
            .or_else(|_| self.fallback.write_str(s))
    }

    fn move_cursor(&mut self, line: usize, column: usize) -> Result<(), TerminalError> {
        self.primary
            .move_cursor(line, column)
            .or_else(|_| self.fallback.move_cursor(line, column))
    }

    fn set_color(&mut self, foreground: Color, background: Color) -> Result<(), TerminalError> {
        self.primary
            .set_color(foreground, background)
            .or_else(|_| self.fallback.set_color(foreground, background))
    }

    fn cursor_position(&mut self) -> Result<(usize, usize), TerminalError> {
        self.primary
            .cursor_position()
            .or_else(|_| self.fallback.cursor_position())
    }

    fn flush(&mut self) -> Result<(), TerminalError> {
        self.primary.flush().or_else(|_| self.fallback.flush())
    }

    fn getch(&mut self) -> Result<InputSymbol, TerminalError> {
        self.primary.getch().or_else(|_| self.fallback.getch())
    }

    fn sleep_ms(&mut self, ms: Milliseconds) -> Result<(), TerminalError> {
        self.primary
            .sleep_ms(ms)
            .or_else(|_| self.fallback.sleep_ms(ms))
    }
}

impl<P, F: HasCompositor> HasCompositor for Fallback<P, F> {
    fn compositor(&self) -> &Compositor {
        self.fallback.compositor()
    }
}
