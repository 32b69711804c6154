use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::{
    db::PuzzleStore,
    error::{AppError, AppResult},
    models::{
        wordle::{MAX_GUESSES, WORD_LENGTH},
        Feedback, GameKind, GameStatus, Word, WordlePuzzle,
    },
    services::session::PuzzleGame,
};

/// On-screen keyboard rows
pub const KEYBOARD_ROWS: [&str; 3] = ["QWERTYUIOP", "ASDFGHJKL", "ZXCVBNM"];

/// A key press from the on-screen or physical keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Letter(char),
    Enter,
    Backspace,
}

impl std::str::FromStr for Key {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ENTER" => Ok(Key::Enter),
            "BACKSPACE" => Ok(Key::Backspace),
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) if ch.is_ascii_uppercase() => Ok(Key::Letter(ch)),
                    _ => Err(AppError::InvalidInput(format!("Unknown key {:?}", s))),
                }
            }
        }
    }
}

/// Result of submitting the current row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Submission {
    /// Row not full, or the game is over
    Ignored,
    /// Wrong guess with rows to spare
    Continue,
    Won,
    Lost { answer: Word },
}

/// Daily Wordle engine
///
/// Feedback is positional and does not account for repeated letters: every occurrence
/// of a letter that appears anywhere in the target is marked present.
#[derive(Debug, Clone)]
pub struct Wordle {
    target: Word,
    guesses: [String; MAX_GUESSES],
    active: usize,
    submitted: Vec<Word>,
    guessed_letters: BTreeSet<char>,
    status: GameStatus,
}

impl Wordle {
    pub fn new(puzzle: WordlePuzzle) -> Self {
        Self {
            target: puzzle.word,
            guesses: Default::default(),
            active: 0,
            submitted: Vec::new(),
            guessed_letters: BTreeSet::new(),
            status: GameStatus::Playing,
        }
    }

    /// Dispatches a key press to the matching transition
    pub fn press(&mut self, key: Key) -> Submission {
        match key {
            Key::Letter(ch) => {
                self.append_letter(ch);
                Submission::Ignored
            }
            Key::Backspace => {
                self.delete_letter();
                Submission::Ignored
            }
            Key::Enter => self.submit_guess(),
        }
    }

    /// Adds a letter to the current row. Returns whether it was accepted.
    pub fn append_letter(&mut self, ch: char) -> bool {
        if self.status.is_terminal() || self.active >= MAX_GUESSES {
            return false;
        }
        let ch = ch.to_ascii_uppercase();
        if !ch.is_ascii_uppercase() {
            return false;
        }
        let row = &mut self.guesses[self.active];
        if row.len() >= WORD_LENGTH {
            return false;
        }
        row.push(ch);
        true
    }

    /// Removes the last letter of the current row
    pub fn delete_letter(&mut self) -> bool {
        if self.status.is_terminal() || self.active >= MAX_GUESSES {
            return false;
        }
        self.guesses[self.active].pop().is_some()
    }

    pub fn submit_guess(&mut self) -> Submission {
        if self.status.is_terminal() || self.active >= MAX_GUESSES {
            return Submission::Ignored;
        }
        // rows shorter than a word are not submitted
        let Ok(guess) = self.guesses[self.active].parse::<Word>() else {
            return Submission::Ignored;
        };

        self.guessed_letters.extend(guess.letters());
        let won = guess == self.target;
        self.submitted.push(guess);

        if won {
            self.status = GameStatus::Won;
            return Submission::Won;
        }
        if self.active == MAX_GUESSES - 1 {
            self.status = GameStatus::Lost;
            return Submission::Lost {
                answer: self.target.clone(),
            };
        }
        self.active += 1;
        Submission::Continue
    }

    /// Colour of one tile. Only submitted rows get feedback.
    pub fn letter_feedback(&self, guess_index: usize, letter_index: usize) -> Option<Feedback> {
        let guess = self.submitted.get(guess_index)?;
        let letter = guess.letter(letter_index)?;

        if self.target.letter(letter_index) == Some(letter) {
            Some(Feedback::Correct)
        } else if self.target.contains(letter) {
            Some(Feedback::Present)
        } else {
            Some(Feedback::Absent)
        }
    }

    /// Colour of a keyboard key across every submitted guess
    pub fn key_feedback(&self, letter: char) -> Option<Feedback> {
        let letter = letter.to_ascii_uppercase();
        if !self.guessed_letters.contains(&letter) {
            return None;
        }

        let ever_correct = self.submitted.iter().any(|guess| {
            guess
                .letters()
                .enumerate()
                .any(|(i, l)| l == letter && self.target.letter(i) == Some(letter))
        });

        if ever_correct {
            Some(Feedback::Correct)
        } else if self.target.contains(letter) {
            Some(Feedback::Present)
        } else {
            Some(Feedback::Absent)
        }
    }

    pub fn guess_count(&self) -> usize {
        self.submitted.len()
    }
}

/// One tile of the board
#[derive(Debug, Clone, Serialize)]
pub struct Tile {
    pub letter: char,
    pub feedback: Option<Feedback>,
}

/// One key of the on-screen keyboard
#[derive(Debug, Clone, Serialize)]
pub struct KeyState {
    pub letter: char,
    pub feedback: Option<Feedback>,
}

/// What the player sees of a Wordle session
#[derive(Debug, Clone, Serialize)]
pub struct WordleView {
    pub rows: Vec<Vec<Tile>>,
    pub active_row: usize,
    pub keyboard: Vec<Vec<KeyState>>,
    /// Revealed once the game is lost
    pub answer: Option<Word>,
}

#[async_trait::async_trait]
impl PuzzleGame for Wordle {
    const KIND: GameKind = GameKind::Wordle;
    type View = WordleView;

    async fn load(puzzles: &dyn PuzzleStore, date: NaiveDate) -> AppResult<Self> {
        let puzzle = puzzles.wordle_puzzle(date).await?;
        Ok(Wordle::new(puzzle))
    }

    fn status(&self) -> GameStatus {
        self.status
    }

    fn count(&self) -> u32 {
        self.submitted.len() as u32
    }

    fn view(&self) -> WordleView {
        let rows = self
            .guesses
            .iter()
            .enumerate()
            .map(|(row, guess)| {
                guess
                    .chars()
                    .enumerate()
                    .map(|(i, letter)| Tile {
                        letter,
                        feedback: self.letter_feedback(row, i),
                    })
                    .collect()
            })
            .collect();

        let keyboard = KEYBOARD_ROWS
            .iter()
            .map(|row| {
                row.chars()
                    .map(|letter| KeyState {
                        letter,
                        feedback: self.key_feedback(letter),
                    })
                    .collect()
            })
            .collect();

        WordleView {
            rows,
            active_row: self.active,
            keyboard,
            answer: (self.status == GameStatus::Lost).then(|| self.target.clone()),
        }
    }
}
