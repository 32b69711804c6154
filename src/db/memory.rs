use chrono::NaiveDate;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::{
    config::PuzzleSeeds,
    db::{PuzzleStore, ScoreStore, TimerStore},
    error::{AppError, AppResult},
    models::{GameKind, Identity, ScoreRecord, SudokuPuzzle, WordlePuzzle},
    services::timer::TimerKey,
};

/// In-process store for local runs and tests
///
/// Implements every storage seam so a single instance can back the whole service.
#[derive(Default)]
pub struct MemoryStore {
    sudoku: RwLock<HashMap<NaiveDate, SudokuPuzzle>>,
    wordle: RwLock<HashMap<NaiveDate, WordlePuzzle>>,
    scores: RwLock<Vec<ScoreRecord>>,
    timers: RwLock<HashMap<String, u64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_sudoku(&self, puzzle: SudokuPuzzle) {
        self.sudoku.write().await.insert(puzzle.date, puzzle);
    }

    pub async fn add_wordle(&self, puzzle: WordlePuzzle) {
        self.wordle.write().await.insert(puzzle.date, puzzle);
    }

    /// Serves the seeded puzzles on `date`
    pub async fn seed(&self, date: NaiveDate, seeds: &PuzzleSeeds) -> AppResult<()> {
        if let Some((puzzle, solution)) = &seeds.sudoku {
            self.add_sudoku(SudokuPuzzle::parse(date, puzzle, solution)?)
                .await;
        }
        if let Some(word) = &seeds.wordle {
            self.add_wordle(WordlePuzzle::parse(date, word)?).await;
        }
        Ok(())
    }

    pub async fn score_count(&self) -> usize {
        self.scores.read().await.len()
    }
}

#[async_trait::async_trait]
impl PuzzleStore for MemoryStore {
    async fn sudoku_puzzle(&self, date: NaiveDate) -> AppResult<SudokuPuzzle> {
        self.sudoku
            .read()
            .await
            .get(&date)
            .cloned()
            .ok_or(AppError::PuzzleUnavailable(date))
    }

    async fn wordle_puzzle(&self, date: NaiveDate) -> AppResult<WordlePuzzle> {
        self.wordle
            .read()
            .await
            .get(&date)
            .cloned()
            .ok_or(AppError::PuzzleUnavailable(date))
    }
}

#[async_trait::async_trait]
impl ScoreStore for MemoryStore {
    async fn find_score(
        &self,
        user_id: Identity,
        date: NaiveDate,
        game: GameKind,
    ) -> AppResult<Option<ScoreRecord>> {
        Ok(self
            .scores
            .read()
            .await
            .iter()
            .find(|r| r.user_id == user_id && r.puzzle_date == date && r.game == game)
            .cloned())
    }

    async fn insert_score(&self, record: &ScoreRecord) -> AppResult<()> {
        self.scores.write().await.push(record.clone());
        Ok(())
    }
}

#[async_trait::async_trait]
impl TimerStore for MemoryStore {
    async fn load(&self, key: &TimerKey) -> AppResult<Option<u64>> {
        Ok(self.timers.read().await.get(&key.to_string()).copied())
    }

    async fn save(&self, key: &TimerKey, elapsed_seconds: u64) -> AppResult<()> {
        self.timers
            .write()
            .await
            .insert(key.to_string(), elapsed_seconds);
        Ok(())
    }

    async fn clear(&self, key: &TimerKey) -> AppResult<()> {
        self.timers.write().await.remove(&key.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::timer::TimerScope;
    use uuid::Uuid;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 14).unwrap()
    }

    #[tokio::test]
    async fn test_missing_puzzle_is_unavailable() {
        let store = MemoryStore::new();
        let err = store.wordle_puzzle(date()).await.unwrap_err();
        assert!(matches!(err, AppError::PuzzleUnavailable(d) if d == date()));
    }

    #[tokio::test]
    async fn test_puzzles_are_keyed_by_date() {
        let store = MemoryStore::new();
        store
            .add_wordle(WordlePuzzle::parse(date(), "crane").unwrap())
            .await;

        assert_eq!(store.wordle_puzzle(date()).await.unwrap().word.as_str(), "CRANE");
        assert!(store.wordle_puzzle(date().succ_opt().unwrap()).await.is_err());
    }

    #[tokio::test]
    async fn test_scores_are_scoped_by_game() {
        let store = MemoryStore::new();
        let user_id = Identity(Uuid::from_u128(1));
        let record = ScoreRecord {
            user_id,
            game: GameKind::Sudoku,
            puzzle_date: date(),
            time_seconds: 300,
            count: 2,
        };
        store.insert_score(&record).await.unwrap();

        let found = store
            .find_score(user_id, date(), GameKind::Sudoku)
            .await
            .unwrap();
        assert_eq!(found, Some(record));
        assert!(store
            .find_score(user_id, date(), GameKind::Wordle)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_timer_save_load_clear() {
        let store = MemoryStore::new();
        let key = TimerKey {
            game: GameKind::Sudoku,
            scope: TimerScope::Client("player".to_string()),
            date: date(),
        };

        assert_eq!(store.load(&key).await.unwrap(), None);
        store.save(&key, 17).await.unwrap();
        assert_eq!(store.load(&key).await.unwrap(), Some(17));
        store.clear(&key).await.unwrap();
        assert_eq!(store.load(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_seed_serves_puzzles_on_date() {
        let solution =
            "534678912672195348198342567859761423426853791713924856961537284287419635345286179";
        let store = MemoryStore::new();
        let seeds = PuzzleSeeds {
            sudoku: Some((format!(".{}", &solution[1..]), solution.to_string())),
            wordle: Some("crane".to_string()),
        };

        store.seed(date(), &seeds).await.unwrap();

        assert!(store.sudoku_puzzle(date()).await.is_ok());
        assert_eq!(store.wordle_puzzle(date()).await.unwrap().word.as_str(), "CRANE");
    }

    #[tokio::test]
    async fn test_seed_rejects_malformed_puzzle() {
        let store = MemoryStore::new();
        let seeds = PuzzleSeeds {
            sudoku: None,
            wordle: Some("cranes".to_string()),
        };

        let err = store.seed(date(), &seeds).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidPuzzle(_)));
        assert!(store.wordle_puzzle(date()).await.is_err());
    }
}
