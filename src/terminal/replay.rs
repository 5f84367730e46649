//! Replay backend: answers `getch` from a recorded input log.
//!
//! Used while a saved session is being restored. Drawing calls are not
//! replayed here at all — they report [`TerminalError::NoMoreInput`] so
//! that a surrounding [`Fallback`](super::Fallback) routes them to the live
//! backend, keeping the compositor identical to the one the log was
//! recorded against. Flushes and sleeps, on the other hand, are swallowed
//! while recorded input remains: a replay neither waits nor presents.

use super::{Terminal, TerminalError};
use crate::engine::{Color, Milliseconds};
use crate::input::InputSymbol;

/// See the module docs.
#[derive(Debug)]
pub struct ReplayTerminal<I: Iterator<Item = InputSymbol>> {
    iter: I,
    next: Option<InputSymbol>,
}

impl<I: Iterator<Item = InputSymbol>> ReplayTerminal<I> {
    pub fn new(mut iter: I) -> Self {
        let next = iter.next();
        ReplayTerminal { iter, next }
    }

    /// True once every recorded symbol has been handed out.
    pub fn is_finished(&self) -> bool {
        self.next.is_none()
    }

    fn if_unfinished(&self) -> Result<(), TerminalError> {
        if self.is_finished() {
            Err(TerminalError::NoMoreInput)
        } else {
            Ok(())
        }
    }
}

impl<I: Iterator<Item = InputSymbol>> Terminal for ReplayTerminal<I> {
    fn clear_screen(&mut self) -> Result<(), TerminalError> {
        Err(TerminalError::NoMoreInput)
    }

    fn write_str(&mut self, _s: &str) -> Result<(), TerminalError> {
        Err(TerminalError::NoMoreInput)
    }

    fn move_cursor(&mut self, _line: usize, _column: usize) -> Result<(), TerminalError> {
        Err(TerminalError::NoMoreInput)
    }

    fn set_color(&mut self, _fg: Color, _bg: Color) -> Result<(), TerminalError> {
        Err(TerminalError::NoMoreInput)
    }

    fn cursor_position(&mut self) -> Result<(usize, usize), TerminalError> {
        Err(TerminalError::NoMoreInput)
    }

    fn flush(&mut self) -> Result<(), TerminalError> {
        self.if_unfinished()
    }

    fn getch(&mut self) -> Result<InputSymbol, TerminalError> {
        match self.next.take() {
            Some(symbol) => {
                self.next = self.iter.next();
                Ok(symbol)
            }
            None => Err(TerminalError::NoMoreInput),
        }
    }

    fn sleep_ms(&mut self, _ms: Milliseconds) -> Result<(), TerminalError> {
        self.if_unfinished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replay(symbols: &[InputSymbol]) -> ReplayTerminal<std::vec::IntoIter<InputSymbol>> {
        ReplayTerminal::new(symbols.to_vec().into_iter())
    }

    #[test]
    fn getch_yields_symbols_in_order_then_fails() {
        let mut terminal = replay(&[InputSymbol::Up, InputSymbol::Confirm]);
        assert_eq!(terminal.getch(), Ok(InputSymbol::Up));
        assert_eq!(terminal.getch(), Ok(InputSymbol::Confirm));
        assert!(terminal.is_finished());
        assert_eq!(terminal.getch(), Err(TerminalError::NoMoreInput));
    }

    #[test]
    fn flush_and_sleep_are_swallowed_while_input_remains() {
        let mut terminal = replay(&[InputSymbol::Up]);
        assert_eq!(terminal.flush(), Ok(()));
        assert_eq!(terminal.sleep_ms(10_000), Ok(()));
        terminal.getch().unwrap();
        assert_eq!(terminal.flush(), Err(TerminalError::NoMoreInput));
        assert_eq!(terminal.sleep_ms(1), Err(TerminalError::NoMoreInput));
    }

    #[test]
    fn drawing_is_never_handled_here() {
        let mut terminal = replay(&[InputSymbol::Up]);
        assert_eq!(terminal.clear_screen(), Err(TerminalError::NoMoreInput));
        assert_eq!(terminal.write_str("x"), Err(TerminalError::NoMoreInput));
        assert_eq!(terminal.move_cursor(0, 0), Err(TerminalError::NoMoreInput));
        assert_eq!(terminal.cursor_position(), Err(TerminalError::NoMoreInput));
    }

    #[test]
    fn empty_log_is_finished_immediately() {
        let terminal = replay(&[]);
        assert!(terminal.is_finished());
    }
}
