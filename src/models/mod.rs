use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

pub mod sudoku;
pub mod wordle;

pub use sudoku::{Digit, Grid, Position, SudokuPuzzle};
pub use wordle::{Feedback, Word, WordlePuzzle};

/// The daily games served by this API
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    Sudoku,
    Wordle,
}

impl Display for GameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameKind::Sudoku => write!(f, "sudoku"),
            GameKind::Wordle => write!(f, "wordle"),
        }
    }
}

/// Lifecycle of a game session. `Won` and `Lost` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Playing,
    Won,
    Lost,
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, GameStatus::Playing)
    }
}

/// Opaque reference to a signed-in player, resolved by the auth gateway
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Identity(pub Uuid);

impl Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A recorded result for one player, one day and one game
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreRecord {
    pub user_id: Identity,
    pub game: GameKind,
    pub puzzle_date: NaiveDate,
    pub time_seconds: u64,
    /// Mistakes for Sudoku, guesses used for Wordle
    pub count: u32,
}

/// What happened to the score of a finished session, reported back to the player
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScoreNotice {
    Recorded { record: ScoreRecord },
    AlreadyRecorded,
    Skipped { reason: String },
    Failed { reason: String },
}
