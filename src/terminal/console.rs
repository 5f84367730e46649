//! The live terminal backend: a compositor plus a render sink.

use std::sync::Arc;
use std::time::Duration;

use super::{HasCompositor, InputGate, Terminal, TerminalError};
use crate::compositor::{Caret, Compositor, Frame};
use crate::engine::{Color, Milliseconds};
use crate::input::InputSymbol;

/// Receives every composed frame, in order.
///
/// `present` may block until the presentation layer has actually consumed
/// the frame; that back-pressure is what keeps the compositor from racing
/// ahead of rendering. Closures implement the trait for callers that just
/// want the frames.
pub trait RenderSink {
    fn present(&mut self, frame: Frame, caret: Caret) -> Result<(), TerminalError>;
}

impl<F> RenderSink for F
where
    F: FnMut(Frame, Caret),
{
    fn present(&mut self, frame: Frame, caret: Caret) -> Result<(), TerminalError> {
        self(frame, caret);
        Ok(())
    }
}

/// The live [`Terminal`]: drawing goes to an owned [`Compositor`], `flush`
/// composes and hands the frame to the sink, `getch` and `sleep_ms` wait on
/// the shared [`InputGate`].
#[derive(Debug)]
pub struct ConsoleTerminal<S> {
    compositor: Compositor,
    sink: S,
    gate: Arc<InputGate>,
}

impl<S: RenderSink> ConsoleTerminal<S> {
    pub fn new(compositor: Compositor, sink: S, gate: Arc<InputGate>) -> Self {
        ConsoleTerminal {
            compositor,
            sink,
            gate,
        }
    }

    pub fn gate(&self) -> &Arc<InputGate> {
        &self.gate
    }
}

impl<S: RenderSink> Terminal for ConsoleTerminal<S> {
    fn clear_screen(&mut self) -> Result<(), TerminalError> {
        self.compositor.clear_screen();
        Ok(())
    }

    fn write_str(&mut self, s: &str) -> Result<(), TerminalError> {
        self.compositor.write_str(s);
        Ok(())
    }

    fn move_cursor(&mut self, line: usize, column: usize) -> Result<(), TerminalError> {
        self.compositor.move_cursor(line, column);
        Ok(())
    }

    fn set_color(&mut self, foreground: Color, background: Color) -> Result<(), TerminalError> {
        self.compositor.set_color(foreground, background);
        Ok(())
    }

    fn cursor_position(&mut self) -> Result<(usize, usize), TerminalError> {
        let caret = self.compositor.cursor();
        Ok((caret.line, caret.column))
    }

    fn flush(&mut self) -> Result<(), TerminalError> {
        let (frame, caret) = self.compositor.flush();
        self.sink.present(frame, caret)
    }

    fn getch(&mut self) -> Result<InputSymbol, TerminalError> {
        self.gate.await_input()
    }

    fn sleep_ms(&mut self, ms: Milliseconds) -> Result<(), TerminalError> {
        self.gate.sleep(Duration::from_millis(ms))
    }
}

impl<S> HasCompositor for ConsoleTerminal<S> {
    fn compositor(&self) -> &Compositor {
        &self.compositor
    }
}
