use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::{
    db::{PuzzleStore, ScoreStore},
    error::{AppError, AppResult},
    models::{GameKind, Identity, ScoreRecord, SudokuPuzzle, WordlePuzzle},
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

#[derive(sqlx::FromRow)]
struct SudokuRow {
    date: NaiveDate,
    puzzle: String,
    solution: String,
}

#[derive(sqlx::FromRow)]
struct WordleRow {
    date: NaiveDate,
    word: String,
}

#[derive(sqlx::FromRow)]
struct ScoreRow {
    user_id: Uuid,
    puzzle_date: NaiveDate,
    time_seconds: i64,
    count: i32,
}

const FIND_SUDOKU_SCORE: &str = r#"
    SELECT user_id, puzzle_date, time_seconds, mistakes AS count
    FROM sudoku_scores
    WHERE user_id = $1 AND puzzle_date = $2
"#;

const FIND_WORDLE_SCORE: &str = r#"
    SELECT user_id, puzzle_date, time_seconds, guesses AS count
    FROM wordle_scores
    WHERE user_id = $1 AND puzzle_date = $2
"#;

const INSERT_SUDOKU_SCORE: &str = r#"
    INSERT INTO sudoku_scores (user_id, puzzle_date, time_seconds, mistakes)
    VALUES ($1, $2, $3, $4)
"#;

const INSERT_WORDLE_SCORE: &str = r#"
    INSERT INTO wordle_scores (user_id, puzzle_date, time_seconds, guesses)
    VALUES ($1, $2, $3, $4)
"#;

/// Puzzle and score tables in PostgreSQL
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the bundled migrations
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl PuzzleStore for PgStore {
    async fn sudoku_puzzle(&self, date: NaiveDate) -> AppResult<SudokuPuzzle> {
        let row: Option<SudokuRow> =
            sqlx::query_as("SELECT date, puzzle, solution FROM sudoku_puzzles WHERE date = $1")
                .bind(date)
                .fetch_optional(&self.pool)
                .await?;

        let row = row.ok_or(AppError::PuzzleUnavailable(date))?;
        tracing::debug!(date = %date, "Loaded sudoku puzzle");
        SudokuPuzzle::parse(row.date, &row.puzzle, &row.solution)
    }

    async fn wordle_puzzle(&self, date: NaiveDate) -> AppResult<WordlePuzzle> {
        let row: Option<WordleRow> =
            sqlx::query_as("SELECT date, word FROM wordle_puzzles WHERE date = $1")
                .bind(date)
                .fetch_optional(&self.pool)
                .await?;

        let row = row.ok_or(AppError::PuzzleUnavailable(date))?;
        tracing::debug!(date = %date, "Loaded wordle puzzle");
        WordlePuzzle::parse(row.date, &row.word)
    }
}

#[async_trait]
impl ScoreStore for PgStore {
    async fn find_score(
        &self,
        user_id: Identity,
        date: NaiveDate,
        game: GameKind,
    ) -> AppResult<Option<ScoreRecord>> {
        let sql = match game {
            GameKind::Sudoku => FIND_SUDOKU_SCORE,
            GameKind::Wordle => FIND_WORDLE_SCORE,
        };

        let row: Option<ScoreRow> = sqlx::query_as(sql)
            .bind(user_id.0)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(ScoreRecord {
                user_id: Identity(row.user_id),
                game,
                puzzle_date: row.puzzle_date,
                time_seconds: u64::try_from(row.time_seconds).map_err(|_| {
                    AppError::Internal(format!("Negative time_seconds {}", row.time_seconds))
                })?,
                count: u32::try_from(row.count)
                    .map_err(|_| AppError::Internal(format!("Negative score count {}", row.count)))?,
            })
        })
        .transpose()
    }

    async fn insert_score(&self, record: &ScoreRecord) -> AppResult<()> {
        let sql = match record.game {
            GameKind::Sudoku => INSERT_SUDOKU_SCORE,
            GameKind::Wordle => INSERT_WORDLE_SCORE,
        };
        let time_seconds = i64::try_from(record.time_seconds)
            .map_err(|_| AppError::InvalidInput("Elapsed time out of range".to_string()))?;
        let count = i32::try_from(record.count)
            .map_err(|_| AppError::InvalidInput("Score count out of range".to_string()))?;

        sqlx::query(sql)
            .bind(record.user_id.0)
            .bind(record.puzzle_date)
            .bind(time_seconds)
            .bind(count)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
