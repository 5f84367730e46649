//! A deterministic, seeded demo engine.
//!
//! `ScriptedEngine` produces a small menu quest: each screen shows a title
//! and a handful of options, `Up`/`Down` move a wrapping highlight,
//! `Confirm` advances to the next screen, `Other` is ignored. Everything is
//! derived from the seed, so the same seed and input sequence always yields
//! the same instruction stream — which is what makes recorded sessions
//! replayable.

use std::collections::VecDeque;

use super::{Color, Engine, Instruction, Mode};
use crate::input::InputSymbol;

/// splitmix64; the classic single-u64 generator.
#[derive(Debug, Clone)]
struct Rng {
    state: u64,
}

impl Rng {
    fn new(seed: u64) -> Self {
        Rng { state: seed }
    }

    fn next(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    fn below(&mut self, bound: u64) -> u64 {
        self.next() % bound
    }
}

const TITLES: &[&str] = &[
    "Supply Depot",
    "Frost Gate",
    "Old Lighthouse",
    "Salt Flats",
    "Border Crossing",
    "Night Market",
];

const OPTIONS: &[&str] = &[
    "Scout the pass",
    "Mend the sails",
    "Trade for provisions",
    "Rest until dawn",
    "Study the charts",
    "Question the locals",
    "Follow the river",
    "Light a signal fire",
];

/// Grid geometry the engine draws against. The compositor is created with
/// the same dimensions.
pub const SCREEN_COLUMNS: usize = 80;
/// See [`SCREEN_COLUMNS`].
pub const SCREEN_LINES: usize = 24;

const OPTIONS_TOP_LINE: usize = 3;
const FOOTER_LINE: usize = SCREEN_LINES - 2;

/// Deterministic menu-quest engine. See the module docs.
#[derive(Debug)]
pub struct ScriptedEngine {
    rng: Rng,
    mode: Mode,
    screens_left: u64,
    screen_no: u64,
    title: &'static str,
    options: Vec<&'static str>,
    selection: usize,
    pending: VecDeque<Instruction>,
    started: bool,
    ended: bool,
}

impl ScriptedEngine {
    pub fn new(mode: Mode, seed: u64) -> Self {
        let mut rng = Rng::new(seed);
        let screens_left = 3 + rng.below(3);
        ScriptedEngine {
            rng,
            mode,
            screens_left,
            screen_no: 0,
            title: TITLES[0],
            options: Vec::new(),
            selection: 0,
            pending: VecDeque::new(),
            started: false,
            ended: false,
        }
    }

    fn roll_screen(&mut self) {
        self.screen_no += 1;
        self.title = TITLES[self.rng.below(TITLES.len() as u64) as usize];
        let count = 2 + self.rng.below(3) as usize;
        let first = self.rng.below(OPTIONS.len() as u64) as usize;
        self.options = (0..count)
            .map(|i| OPTIONS[(first + i) % OPTIONS.len()])
            .collect();
        self.selection = 0;
    }

    fn queue_full_screen(&mut self) {
        self.pending.push_back(Instruction::ClearScreen);
        self.pending.push_back(Instruction::SetColor {
            foreground: Color::BrightWhite,
            background: Color::Black,
        });
        self.pending.push_back(Instruction::MoveCursor { line: 0, column: 0 });
        self.pending.push_back(Instruction::WriteString(format!(
            "{} [{}]\n",
            self.title, self.screen_no
        )));
        self.pending.push_back(Instruction::SetColor {
            foreground: Color::Gray,
            background: Color::Black,
        });
        self.pending
            .push_back(Instruction::WriteString(format!("{}\n", "-".repeat(self.title.len()))));

        // A short dramatic pause on some screen transitions.
        if self.rng.below(4) == 0 {
            self.pending.push_back(Instruction::Flush);
            self.pending.push_back(Instruction::Sleep(15));
        }

        self.queue_options();
        self.pending.push_back(Instruction::MoveCursor {
            line: FOOTER_LINE,
            column: 0,
        });
        self.pending.push_back(Instruction::SetColor {
            foreground: Color::Gray,
            background: Color::Black,
        });
        self.pending.push_back(Instruction::WriteString(
            "arrows: choose   enter: commit".to_string(),
        ));
        self.pending.push_back(Instruction::Flush);
    }

    /// Redraw only the option rows, in place. Fragments from the previous
    /// draw stay on those rows; the fresh ones outrank them.
    fn queue_options(&mut self) {
        for (index, option) in self.options.iter().enumerate() {
            self.pending.push_back(Instruction::MoveCursor {
                line: OPTIONS_TOP_LINE + index,
                column: 2,
            });
            let (foreground, background) = if index == self.selection {
                (Color::BrightYellow, Color::Blue)
            } else {
                (Color::White, Color::Black)
            };
            self.pending.push_back(Instruction::SetColor {
                foreground,
                background,
            });
            let marker = if index == self.selection { "> " } else { "  " };
            self.pending
                .push_back(Instruction::WriteString(format!("{marker}{option}")));
        }
    }
}

impl Engine for ScriptedEngine {
    fn advance(&mut self, input: InputSymbol) -> bool {
        if self.ended {
            return false;
        }
        if input == InputSymbol::EndOfInput {
            self.ended = true;
            return false;
        }

        if !self.started {
            // The very first input only kicks the session into life.
            self.started = true;
            self.roll_screen();
            self.queue_full_screen();
            return true;
        }

        match input {
            InputSymbol::Up => {
                let count = self.options.len();
                self.selection = (self.selection + count - 1) % count;
                self.queue_options();
                self.pending.push_back(Instruction::Flush);
            }
            InputSymbol::Down => {
                self.selection = (self.selection + 1) % self.options.len();
                self.queue_options();
                self.pending.push_back(Instruction::Flush);
            }
            InputSymbol::Confirm => {
                if self.mode == Mode::Normal {
                    self.screens_left = self.screens_left.saturating_sub(1);
                    if self.screens_left == 0 {
                        self.ended = true;
                        return false;
                    }
                }
                self.roll_screen();
                self.queue_full_screen();
            }
            InputSymbol::Other => {}
            InputSymbol::EndOfInput => unreachable!("handled above"),
        }
        true
    }

    fn next_instruction(&mut self) -> Option<Instruction> {
        self.pending.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(engine: &mut ScriptedEngine, input: InputSymbol) -> Vec<Instruction> {
        assert!(engine.advance(input));
        let mut out = Vec::new();
        while let Some(instruction) = engine.next_instruction() {
            out.push(instruction);
        }
        out
    }

    #[test]
    fn same_seed_same_stream() {
        let mut a = ScriptedEngine::new(Mode::Normal, 42);
        let mut b = ScriptedEngine::new(Mode::Normal, 42);
        for input in [
            InputSymbol::Confirm,
            InputSymbol::Down,
            InputSymbol::Up,
            InputSymbol::Confirm,
        ] {
            assert_eq!(collect(&mut a, input), collect(&mut b, input));
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = ScriptedEngine::new(Mode::Normal, 1);
        let mut b = ScriptedEngine::new(Mode::Normal, 2);
        assert_ne!(
            collect(&mut a, InputSymbol::Confirm),
            collect(&mut b, InputSymbol::Confirm)
        );
    }

    #[test]
    fn first_input_draws_a_screen() {
        let mut engine = ScriptedEngine::new(Mode::Normal, 7);
        let instructions = collect(&mut engine, InputSymbol::Confirm);
        assert!(matches!(instructions.first(), Some(Instruction::ClearScreen)));
        assert!(instructions.contains(&Instruction::Flush));
    }

    #[test]
    fn other_produces_no_instructions() {
        let mut engine = ScriptedEngine::new(Mode::Normal, 7);
        collect(&mut engine, InputSymbol::Confirm);
        assert!(collect(&mut engine, InputSymbol::Other).is_empty());
    }

    #[test]
    fn selection_wraps_upward() {
        let mut engine = ScriptedEngine::new(Mode::Normal, 7);
        collect(&mut engine, InputSymbol::Confirm);
        let before = engine.selection;
        assert_eq!(before, 0);
        collect(&mut engine, InputSymbol::Up);
        assert_eq!(engine.selection, engine.options.len() - 1);
    }

    #[test]
    fn normal_mode_terminates_after_enough_confirms() {
        let mut engine = ScriptedEngine::new(Mode::Normal, 42);
        let mut confirms = 0;
        loop {
            if !engine.advance(InputSymbol::Confirm) {
                break;
            }
            while engine.next_instruction().is_some() {}
            confirms += 1;
            assert!(confirms < 32, "engine never terminated");
        }
        // Terminated engines refuse further input.
        assert!(!engine.advance(InputSymbol::Confirm));
    }

    #[test]
    fn endless_mode_survives_many_confirms() {
        let mut engine = ScriptedEngine::new(Mode::Endless, 42);
        for _ in 0..64 {
            assert!(engine.advance(InputSymbol::Confirm));
            while engine.next_instruction().is_some() {}
        }
    }

    #[test]
    fn end_of_input_terminates() {
        let mut engine = ScriptedEngine::new(Mode::Endless, 5);
        assert!(!engine.advance(InputSymbol::EndOfInput));
        assert!(!engine.advance(InputSymbol::Confirm));
    }
}
