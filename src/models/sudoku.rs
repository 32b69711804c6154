use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use crate::error::AppError;

/// A Sudoku digit, always in `1..=9`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "u8", into = "u8")]
pub struct Digit(u8);

impl Digit {
    pub const ALL: [Digit; 9] = [
        Digit(1),
        Digit(2),
        Digit(3),
        Digit(4),
        Digit(5),
        Digit(6),
        Digit(7),
        Digit(8),
        Digit(9),
    ];

    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based index, for per-digit tables
    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }
}

impl TryFrom<u8> for Digit {
    type Error = AppError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (1..=9).contains(&value) {
            Ok(Digit(value))
        } else {
            Err(AppError::InvalidInput(format!(
                "Digit must be between 1 and 9, got {}",
                value
            )))
        }
    }
}

impl From<Digit> for u8 {
    fn from(digit: Digit) -> Self {
        digit.0
    }
}

impl Display for Digit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A cell coordinate on the 9×9 board
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Result<Self, AppError> {
        if row >= 9 || col >= 9 {
            return Err(AppError::InvalidInput(format!(
                "Cell ({}, {}) is outside the 9x9 board",
                row, col
            )));
        }
        Ok(Self { row, col })
    }

    /// Every position in row-major order
    pub fn all() -> impl Iterator<Item = Position> {
        (0..9).flat_map(|row| (0..9).map(move |col| Position { row, col }))
    }
}

/// A 9×9 board where `None` marks an empty cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Grid([[Option<Digit>; 9]; 9]);

impl Grid {
    pub fn empty() -> Self {
        Self([[None; 9]; 9])
    }

    pub fn get(&self, pos: Position) -> Option<Digit> {
        self.0[pos.row][pos.col]
    }

    pub fn set(&mut self, pos: Position, digit: Digit) {
        self.0[pos.row][pos.col] = Some(digit);
    }

    /// True when no cell is empty
    pub fn is_filled(&self) -> bool {
        Position::all().all(|pos| self.get(pos).is_some())
    }

    /// How many times each digit appears on the board, indexed by [`Digit::index`]
    pub fn digit_counts(&self) -> [u8; 9] {
        let mut counts = [0u8; 9];
        for digit in Position::all().filter_map(|pos| self.get(pos)) {
            counts[digit.index()] += 1;
        }
        counts
    }

    /// Positions holding `digit`
    pub fn positions_of(&self, digit: Digit) -> Vec<Position> {
        Position::all()
            .filter(|&pos| self.get(pos) == Some(digit))
            .collect()
    }
}

impl FromStr for Grid {
    type Err = AppError;

    /// Parses the stored 81-character row-major form, `'0'` or `'.'` for empty cells
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.chars().count() != 81 {
            return Err(AppError::InvalidPuzzle(format!(
                "Expected 81 cells, got {}",
                s.chars().count()
            )));
        }

        let mut grid = Grid::empty();
        for (pos, ch) in Position::all().zip(s.chars()) {
            match ch {
                '0' | '.' => {}
                '1'..='9' => {
                    let value = ch as u8 - b'0';
                    grid.set(pos, Digit(value));
                }
                other => {
                    return Err(AppError::InvalidPuzzle(format!(
                        "Unexpected character {:?} at row {}, column {}",
                        other, pos.row, pos.col
                    )))
                }
            }
        }

        Ok(grid)
    }
}

impl Display for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for pos in Position::all() {
            match self.get(pos) {
                Some(digit) => write!(f, "{}", digit)?,
                None => write!(f, "0")?,
            }
        }
        Ok(())
    }
}

/// The Sudoku for one calendar day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SudokuPuzzle {
    pub date: NaiveDate,
    pub puzzle: Grid,
    pub solution: Grid,
}

impl SudokuPuzzle {
    /// Builds a puzzle from its stored string form
    ///
    /// The solution must be completely filled and agree with every given of the puzzle.
    pub fn parse(date: NaiveDate, puzzle: &str, solution: &str) -> Result<Self, AppError> {
        let puzzle: Grid = puzzle.parse()?;
        let solution: Grid = solution.parse()?;

        if !solution.is_filled() {
            return Err(AppError::InvalidPuzzle(
                "Solution grid has empty cells".to_string(),
            ));
        }

        let conflict = Position::all()
            .find(|&pos| matches!(puzzle.get(pos), Some(given) if Some(given) != solution.get(pos)));
        if let Some(pos) = conflict {
            return Err(AppError::InvalidPuzzle(format!(
                "Given at row {}, column {} disagrees with the solution",
                pos.row, pos.col
            )));
        }

        Ok(Self {
            date,
            puzzle,
            solution,
        })
    }
}
