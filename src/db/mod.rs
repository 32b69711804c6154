use chrono::NaiveDate;

use crate::{
    error::AppResult,
    models::{GameKind, Identity, ScoreRecord, SudokuPuzzle, WordlePuzzle},
    services::timer::TimerKey,
};

pub mod memory;
pub mod postgres;
pub mod redis;

pub use memory::MemoryStore;
pub use postgres::{create_pool, PgStore};
pub use self::redis::{create_redis_client, RedisTimerStore, TimerWriterHandle};

/// Source of the daily puzzles
///
/// Fails with [`AppError::PuzzleUnavailable`](crate::error::AppError::PuzzleUnavailable)
/// when nothing is scheduled for the requested day.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PuzzleStore: Send + Sync {
    async fn sudoku_puzzle(&self, date: NaiveDate) -> AppResult<SudokuPuzzle>;

    async fn wordle_puzzle(&self, date: NaiveDate) -> AppResult<WordlePuzzle>;
}

/// Persisted results, at most one per player, day and game
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ScoreStore: Send + Sync {
    /// Looks up the existing record. `Ok(None)` means there is none yet.
    async fn find_score(
        &self,
        user_id: Identity,
        date: NaiveDate,
        game: GameKind,
    ) -> AppResult<Option<ScoreRecord>>;

    async fn insert_score(&self, record: &ScoreRecord) -> AppResult<()>;
}

/// Elapsed-time persistence surviving reloads
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TimerStore: Send + Sync {
    async fn load(&self, key: &TimerKey) -> AppResult<Option<u64>>;

    async fn save(&self, key: &TimerKey, elapsed_seconds: u64) -> AppResult<()>;

    async fn clear(&self, key: &TimerKey) -> AppResult<()>;
}
