use std::sync::Arc;

use crate::{
    db::ScoreStore,
    error::{AppError, AppResult},
    models::{GameKind, Identity, ScoreNotice, ScoreRecord},
    services::session::Completion,
};

/// Resolves the player behind the current request
pub trait IdentityResolver: Send + Sync {
    fn current_identity(&self) -> Option<Identity>;
}

impl IdentityResolver for Option<Identity> {
    fn current_identity(&self) -> Option<Identity> {
        *self
    }
}

/// Result of a successful report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreReport {
    Recorded(ScoreRecord),
    /// A score for this player and day was already on file; nothing was written
    AlreadyRecorded,
}

/// Records finished games, once per player, day and game
///
/// The existence check and the insert are separate calls, so two sessions of the same
/// player finishing at the same moment can both pass the check.
#[derive(Clone)]
pub struct ScoreReporter {
    scores: Arc<dyn ScoreStore>,
}

impl ScoreReporter {
    pub fn new(scores: Arc<dyn ScoreStore>) -> Self {
        Self { scores }
    }

    pub async fn report(
        &self,
        game: GameKind,
        resolver: &dyn IdentityResolver,
        completion: &Completion,
    ) -> AppResult<ScoreReport> {
        let user_id = resolver
            .current_identity()
            .ok_or(AppError::IdentityUnresolved)?;

        if let Some(existing) = self
            .scores
            .find_score(user_id, completion.date, game)
            .await?
        {
            tracing::info!(
                user_id = %user_id,
                game = %game,
                date = %existing.puzzle_date,
                "Score already recorded for today"
            );
            return Ok(ScoreReport::AlreadyRecorded);
        }

        let record = ScoreRecord {
            user_id,
            game,
            puzzle_date: completion.date,
            time_seconds: completion.elapsed_seconds,
            count: completion.count,
        };
        self.scores.insert_score(&record).await?;

        tracing::info!(
            user_id = %user_id,
            game = %game,
            time_seconds = record.time_seconds,
            count = record.count,
            "Score recorded"
        );

        Ok(ScoreReport::Recorded(record))
    }

    /// Reports and folds every failure into a player-facing notice
    pub async fn report_notice(
        &self,
        game: GameKind,
        resolver: &dyn IdentityResolver,
        completion: &Completion,
    ) -> ScoreNotice {
        match self.report(game, resolver, completion).await {
            Ok(ScoreReport::Recorded(record)) => ScoreNotice::Recorded { record },
            Ok(ScoreReport::AlreadyRecorded) => ScoreNotice::AlreadyRecorded,
            Err(AppError::IdentityUnresolved) => {
                tracing::warn!(game = %game, "Finished game without a signed-in user");
                ScoreNotice::Skipped {
                    reason: AppError::IdentityUnresolved.to_string(),
                }
            }
            Err(e) => {
                tracing::error!(error = %e, game = %game, "Failed to save score");
                ScoreNotice::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
