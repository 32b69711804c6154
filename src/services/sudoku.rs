use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    db::PuzzleStore,
    error::AppResult,
    models::{Digit, GameKind, GameStatus, Grid, Position, SudokuPuzzle},
    services::session::PuzzleGame,
};

/// Mistakes that end the game
pub const MAX_MISTAKES: u8 = 3;

/// Result of a digit placement attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Placement {
    /// Nothing selected, digit exhausted, or the game is over
    Ignored,
    Committed,
    /// The placement completed the board
    Solved,
    Mistake { mistakes: u8 },
    /// The placement was the final allowed mistake
    Lost,
}

/// Daily Sudoku engine
///
/// Digits are checked against the solution as they are entered: a correct digit is
/// written to the board, a wrong one only costs a mistake. The board therefore never
/// holds a digit that disagrees with the solution.
#[derive(Debug, Clone)]
pub struct Sudoku {
    working: Grid,
    solution: Grid,
    selected: Option<Position>,
    highlighted: Option<Digit>,
    mistakes: u8,
    placed: [u8; 9],
    status: GameStatus,
}

impl Sudoku {
    pub fn new(puzzle: SudokuPuzzle) -> Self {
        let placed = puzzle.puzzle.digit_counts();
        Self {
            working: puzzle.puzzle,
            solution: puzzle.solution,
            selected: None,
            highlighted: None,
            mistakes: 0,
            placed,
            status: GameStatus::Playing,
        }
    }

    /// Selects a cell and highlights every cell sharing its digit
    ///
    /// Returns false once the game is over.
    pub fn select_cell(&mut self, pos: Position) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.selected = Some(pos);
        self.highlighted = self.working.get(pos);
        true
    }

    /// Enters `digit` into the selected cell
    pub fn place_digit(&mut self, digit: Digit) -> Placement {
        if self.status.is_terminal() || self.is_exhausted(digit) {
            return Placement::Ignored;
        }
        let Some(pos) = self.selected else {
            return Placement::Ignored;
        };

        if self.solution.get(pos) == Some(digit) {
            self.working.set(pos, digit);
            self.placed = self.working.digit_counts();

            if self.is_complete() {
                self.status = GameStatus::Won;
                return Placement::Solved;
            }
            return Placement::Committed;
        }

        self.mistakes += 1;
        if self.mistakes >= MAX_MISTAKES {
            self.status = GameStatus::Lost;
            return Placement::Lost;
        }
        Placement::Mistake {
            mistakes: self.mistakes,
        }
    }

    /// Fills the board with the solution, bypassing validation
    #[cfg(any(test, feature = "dev-reveal"))]
    pub fn reveal_solution(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.working = self.solution.clone();
        self.placed = self.working.digit_counts();
        self.status = GameStatus::Won;
        true
    }

    /// A digit placed in all nine of its cells can no longer be entered
    pub fn is_exhausted(&self, digit: Digit) -> bool {
        self.placed[digit.index()] >= 9
    }

    pub fn mistakes(&self) -> u8 {
        self.mistakes
    }

    pub fn board(&self) -> &Grid {
        &self.working
    }

    fn is_complete(&self) -> bool {
        Position::all().all(|pos| self.working.get(pos) == self.solution.get(pos))
    }
}

/// What the player sees of a Sudoku session
#[derive(Debug, Clone, Serialize)]
pub struct SudokuView {
    pub board: Grid,
    pub selected: Option<Position>,
    pub highlighted: Vec<Position>,
    pub mistakes: u8,
    pub max_mistakes: u8,
    pub exhausted_digits: Vec<Digit>,
}

#[async_trait::async_trait]
impl PuzzleGame for Sudoku {
    const KIND: GameKind = GameKind::Sudoku;
    type View = SudokuView;

    async fn load(puzzles: &dyn PuzzleStore, date: NaiveDate) -> AppResult<Self> {
        let puzzle = puzzles.sudoku_puzzle(date).await?;
        Ok(Sudoku::new(puzzle))
    }

    fn status(&self) -> GameStatus {
        self.status
    }

    fn count(&self) -> u32 {
        u32::from(self.mistakes)
    }

    fn view(&self) -> SudokuView {
        SudokuView {
            board: self.working.clone(),
            selected: self.selected,
            highlighted: self
                .highlighted
                .map(|digit| self.working.positions_of(digit))
                .unwrap_or_default(),
            mistakes: self.mistakes,
            max_mistakes: MAX_MISTAKES,
            exhausted_digits: Digit::ALL
                .into_iter()
                .filter(|&digit| self.is_exhausted(digit))
                .collect(),
        }
    }
}
