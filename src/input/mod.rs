//! Input vocabulary and the recorded input log.
//!
//! The core understands a small closed set of input symbols; anything richer
//! (keystrokes, gestures) is mapped down to this set by the embedding UI
//! before it reaches a session. Every accepted symbol is appended to an
//! [`InputLog`], which serializes to a compact run-length text form inside
//! the saved-session blob.

use serde::{Deserialize, Serialize};

/// One abstract input symbol.
///
/// `EndOfInput` tells the engine that no further input will arrive; engines
/// are expected to terminate in response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputSymbol {
    Up,
    Down,
    Confirm,
    Other,
    EndOfInput,
}

impl InputSymbol {
    /// Single-letter code used by the run-length log encoding.
    fn to_code(self) -> char {
        match self {
            InputSymbol::Up => 'U',
            InputSymbol::Down => 'D',
            InputSymbol::Confirm => 'C',
            InputSymbol::Other => 'O',
            InputSymbol::EndOfInput => 'E',
        }
    }

    fn from_code(code: char) -> Option<Self> {
        match code {
            'U' => Some(InputSymbol::Up),
            'D' => Some(InputSymbol::Down),
            'C' => Some(InputSymbol::Confirm),
            'O' => Some(InputSymbol::Other),
            'E' => Some(InputSymbol::EndOfInput),
            _ => None,
        }
    }
}

/// Errors produced while decoding an encoded input log.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LogParseError {
    #[error("unknown input code {found:?} at position {position}")]
    UnknownSymbol { position: usize, found: char },

    #[error("repeat count at position {position} is out of range")]
    CountOutOfRange { position: usize },

    #[error("encoded log ends in the middle of a repeat count")]
    TrailingCount,
}

/// Append-only log of accepted input symbols.
///
/// Recording is purely in-memory; persistence happens when the whole session
/// is serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputLog {
    entries: Vec<InputSymbol>,
}

impl InputLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one accepted symbol. No I/O.
    pub fn record(&mut self, symbol: InputSymbol) {
        self.entries.push(symbol);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn symbols(&self) -> &[InputSymbol] {
        &self.entries
    }

    /// Encode as run-length text: a run of N identical symbols becomes the
    /// symbol's letter, prefixed with N when N > 1 (`UUU` -> `3U`).
    pub fn encode(&self) -> String {
        let mut out = String::new();
        let mut run: Option<(InputSymbol, usize)> = None;

        for &symbol in &self.entries {
            match run {
                Some((current, count)) if current == symbol => {
                    run = Some((current, count + 1));
                }
                Some((current, count)) => {
                    push_run(&mut out, current, count);
                    run = Some((symbol, 1));
                }
                None => run = Some((symbol, 1)),
            }
        }
        if let Some((current, count)) = run {
            push_run(&mut out, current, count);
        }
        out
    }

    /// Decode a run-length encoded log back into symbols.
    pub fn decode(encoded: &str) -> Result<Vec<InputSymbol>, LogParseError> {
        // A repeat count large enough to matter in practice is tiny; the cap
        // guards decode against maliciously huge blobs.
        const MAX_RUN: usize = 1_000_000;

        let mut symbols = Vec::new();
        let mut count: Option<usize> = None;
        let mut count_start = 0;

        for (position, c) in encoded.chars().enumerate() {
            if let Some(digit) = c.to_digit(10) {
                let so_far = count.unwrap_or(0);
                if count.is_none() {
                    count_start = position;
                }
                let next = so_far * 10 + digit as usize;
                if next > MAX_RUN {
                    return Err(LogParseError::CountOutOfRange {
                        position: count_start,
                    });
                }
                count = Some(next);
                continue;
            }

            let symbol = InputSymbol::from_code(c)
                .ok_or(LogParseError::UnknownSymbol { position, found: c })?;
            let repeat = match count.take() {
                Some(0) => {
                    return Err(LogParseError::CountOutOfRange {
                        position: count_start,
                    })
                }
                Some(n) => n,
                None => 1,
            };
            for _ in 0..repeat {
                symbols.push(symbol);
            }
        }

        if count.is_some() {
            return Err(LogParseError::TrailingCount);
        }
        Ok(symbols)
    }
}

fn push_run(out: &mut String, symbol: InputSymbol, count: usize) {
    if count > 1 {
        out.push_str(&count.to_string());
    }
    out.push(symbol.to_code());
}

#[cfg(test)]
mod tests {
    use super::*;
    use InputSymbol::*;

    #[test]
    fn encode_collapses_runs() {
        let mut log = InputLog::new();
        for symbol in [
            Down, Confirm, Up, Other, Down, Down, Confirm, Confirm, Confirm, Other, Other, Up, Up,
            Up, Up, Up, Up, Up, Up, Up, Up, Up, Up, Down,
        ] {
            log.record(symbol);
        }
        assert_eq!(log.encode(), "DCUO2D3C2O12UD");
    }

    #[test]
    fn encode_empty_log() {
        assert_eq!(InputLog::new().encode(), "");
        assert_eq!(InputLog::decode("").unwrap(), vec![]);
    }

    #[test]
    fn decode_reverses_encode() {
        let mut log = InputLog::new();
        for symbol in [Up, Up, Confirm, Down, Other, Other, Other, EndOfInput] {
            log.record(symbol);
        }
        let decoded = InputLog::decode(&log.encode()).unwrap();
        assert_eq!(decoded, log.symbols());
    }

    #[test]
    fn decode_expands_counted_runs() {
        let decoded = InputLog::decode("3U2CD").unwrap();
        assert_eq!(decoded, vec![Up, Up, Up, Confirm, Confirm, Down]);
    }

    #[test]
    fn decode_rejects_unknown_symbol() {
        let err = InputLog::decode("2U!C").unwrap_err();
        assert_eq!(
            err,
            LogParseError::UnknownSymbol {
                position: 2,
                found: '!'
            }
        );
    }

    #[test]
    fn decode_rejects_trailing_count() {
        assert_eq!(
            InputLog::decode("UU13").unwrap_err(),
            LogParseError::TrailingCount
        );
    }

    #[test]
    fn decode_rejects_zero_count() {
        assert_eq!(
            InputLog::decode("0U").unwrap_err(),
            LogParseError::CountOutOfRange { position: 0 }
        );
    }

    #[test]
    fn record_preserves_order() {
        let mut log = InputLog::new();
        log.record(Up);
        log.record(Confirm);
        assert_eq!(log.symbols(), &[Up, Confirm]);
        assert_eq!(log.len(), 2);
    }
}
