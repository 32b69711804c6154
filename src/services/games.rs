use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::{
    db::{PuzzleStore, ScoreStore, TimerStore},
    error::{AppError, AppResult},
    models::{GameStatus, ScoreNotice},
    services::{
        clock::Clock,
        score::{IdentityResolver, ScoreReporter},
        session::{Completion, PuzzleGame, PuzzleSession, SessionSnapshot},
        timer::{TimerKey, TimerScope},
    },
};

/// Timing knobs for live sessions
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    /// Timer resolution; one tick counts as one second of play
    pub tick: Duration,
    /// Finished sessions stay readable this long before they are dropped
    pub finished_linger: Duration,
    /// Sessions without input for this long are dropped
    pub idle_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            finished_linger: Duration::from_secs(3),
            idle_timeout: Duration::from_secs(6 * 60 * 60),
        }
    }
}

/// External collaborators shared by both games
#[derive(Clone)]
pub struct Stores {
    pub puzzles: Arc<dyn PuzzleStore>,
    pub scores: Arc<dyn ScoreStore>,
    pub timers: Arc<dyn TimerStore>,
    pub clock: Arc<dyn Clock>,
}

/// Response to one player input
#[derive(Debug, Serialize)]
pub struct Action<R, V> {
    pub outcome: R,
    pub session: SessionSnapshot<V>,
    /// Present only on the input that finished the game
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<ScoreNotice>,
}

enum Scoring<'a> {
    Report(&'a dyn IdentityResolver),
    Skip,
}

type SessionRef<G> = Arc<Mutex<PuzzleSession<G>>>;
type SessionMap<G> = Arc<RwLock<HashMap<Uuid, SessionRef<G>>>>;

/// Live sessions of one game
///
/// Every session gets a ticker task driving its timer. The ticker only holds a weak
/// reference, so removing a session from the map is enough to stop it.
pub struct GameService<G: PuzzleGame> {
    puzzles: Arc<dyn PuzzleStore>,
    timers: Arc<dyn TimerStore>,
    reporter: ScoreReporter,
    clock: Arc<dyn Clock>,
    settings: SessionSettings,
    sessions: SessionMap<G>,
}

impl<G: PuzzleGame> GameService<G> {
    pub fn new(stores: &Stores, settings: SessionSettings) -> Self {
        Self {
            puzzles: stores.puzzles.clone(),
            timers: stores.timers.clone(),
            reporter: ScoreReporter::new(stores.scores.clone()),
            clock: stores.clock.clone(),
            settings,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Starts a session on today's puzzle
    ///
    /// `scope` names whose persisted timer to resume; without one the timer starts
    /// from zero and is never persisted.
    pub async fn open(&self, scope: Option<TimerScope>) -> AppResult<SessionSnapshot<G::View>> {
        let date = self.clock.today();
        let game = G::load(self.puzzles.as_ref(), date).await?;

        let timer_key = scope.map(|scope| TimerKey {
            game: G::KIND,
            scope,
            date,
        });
        let elapsed = match &timer_key {
            Some(key) => self.timers.load(key).await.unwrap_or_else(|e| {
                tracing::warn!(error = %e, key = %key, "Failed to load persisted timer");
                None
            }),
            None => None,
        }
        .unwrap_or(0);

        let session = PuzzleSession::new(date, game, elapsed, timer_key);
        let id = session.id();
        let snapshot = session.snapshot();

        let session = Arc::new(Mutex::new(session));
        self.spawn_ticker(id, Arc::downgrade(&session));
        self.sessions.write().await.insert(id, session);

        tracing::info!(
            session_id = %id,
            game = %G::KIND,
            date = %date,
            resumed_seconds = elapsed,
            "Session opened"
        );

        Ok(snapshot)
    }

    pub async fn snapshot(&self, id: Uuid) -> AppResult<SessionSnapshot<G::View>> {
        let session = self.session(id).await?;
        let session = session.lock().await;
        Ok(session.snapshot())
    }

    /// Applies one player input and, when it finishes the game, reports the score
    pub async fn act<R, F>(
        &self,
        id: Uuid,
        resolver: &dyn IdentityResolver,
        input: F,
    ) -> AppResult<Action<R, G::View>>
    where
        F: FnOnce(&mut G) -> R + Send,
        R: Send,
    {
        self.apply(id, Scoring::Report(resolver), input).await
    }

    /// Like [`act`](Self::act), but a finish is never scored
    pub async fn act_unscored<R, F>(&self, id: Uuid, input: F) -> AppResult<Action<R, G::View>>
    where
        F: FnOnce(&mut G) -> R + Send,
        R: Send,
    {
        self.apply(id, Scoring::Skip, input).await
    }

    /// Drops a session, as when the player navigates away
    ///
    /// The persisted timer is kept so a reload resumes it.
    pub async fn close(&self, id: Uuid) -> AppResult<()> {
        if self.sessions.write().await.remove(&id).is_none() {
            return Err(AppError::NotFound(format!("Session {} not found", id)));
        }
        tracing::info!(session_id = %id, game = %G::KIND, "Session closed");
        Ok(())
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn apply<R, F>(
        &self,
        id: Uuid,
        scoring: Scoring<'_>,
        input: F,
    ) -> AppResult<Action<R, G::View>>
    where
        F: FnOnce(&mut G) -> R + Send,
        R: Send,
    {
        let session = self.session(id).await?;
        let (transition, snapshot) = {
            let mut session = session.lock().await;
            let transition = session.apply(input);
            (transition, session.snapshot())
        };

        let score = match transition.completion {
            Some(completion) => self.finish(id, scoring, &completion).await,
            None => None,
        };

        Ok(Action {
            outcome: transition.outcome,
            session: snapshot,
            score,
        })
    }

    async fn finish(
        &self,
        id: Uuid,
        scoring: Scoring<'_>,
        completion: &Completion,
    ) -> Option<ScoreNotice> {
        tracing::info!(
            session_id = %id,
            game = %G::KIND,
            status = ?completion.status,
            elapsed_seconds = completion.elapsed_seconds,
            count = completion.count,
            "Session finished"
        );

        if let Some(key) = &completion.timer_key {
            if let Err(e) = self.timers.clear(key).await {
                tracing::warn!(error = %e, key = %key, "Failed to clear persisted timer");
            }
        }

        self.schedule_eviction(id);

        match (completion.status, scoring) {
            (GameStatus::Won, Scoring::Report(resolver)) => Some(
                self.reporter
                    .report_notice(G::KIND, resolver, completion)
                    .await,
            ),
            _ => None,
        }
    }

    async fn session(&self, id: Uuid) -> AppResult<SessionRef<G>> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", id)))
    }

    /// Drops a finished session once the player has had time to see the result
    fn schedule_eviction(&self, id: Uuid) {
        let sessions = self.sessions.clone();
        let linger = self.settings.finished_linger;
        tokio::spawn(async move {
            tokio::time::sleep(linger).await;
            if sessions.write().await.remove(&id).is_some() {
                tracing::debug!(session_id = %id, "Finished session evicted");
            }
        });
    }

    fn spawn_ticker(&self, id: Uuid, session: Weak<Mutex<PuzzleSession<G>>>) {
        let sessions = self.sessions.clone();
        let timers = self.timers.clone();
        let settings = self.settings;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + settings.tick, settings.tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                let Some(strong) = session.upgrade() else {
                    break;
                };
                let mut guard = strong.lock().await;

                if guard.idle_for() >= settings.idle_timeout {
                    drop(guard);
                    sessions.write().await.remove(&id);
                    tracing::info!(session_id = %id, game = %G::KIND, "Idle session evicted");
                    break;
                }

                if !guard.tick() {
                    break;
                }

                // saved under the lock so a save can never land after the finish clears it
                if let Some(key) = guard.timer_key() {
                    if let Err(e) = timers.save(key, guard.elapsed_seconds()).await {
                        tracing::warn!(error = %e, key = %key, "Failed to persist timer");
                    }
                }
            }

            tracing::debug!(session_id = %id, "Session ticker stopped");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, MockScoreStore, MockTimerStore};
    use crate::models::{Digit, GameKind, Identity, Position, SudokuPuzzle, WordlePuzzle};
    use crate::services::clock::FixedClock;
    use crate::services::sudoku::{Placement, Sudoku};
    use crate::services::wordle::{Submission, Wordle};
    use chrono::NaiveDate;

    const SOLUTION: &str = "534678912672195348198342567859761423426853791713924856961537284287419635345286179";

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 14).unwrap()
    }

    fn player() -> Option<Identity> {
        Some(Identity(Uuid::from_u128(42)))
    }

    async fn memory_stores() -> (Arc<MemoryStore>, Stores) {
        let memory = Arc::new(MemoryStore::new());
        let puzzle = format!("0{}", &SOLUTION[1..]);
        memory
            .add_sudoku(SudokuPuzzle::parse(date(), &puzzle, SOLUTION).unwrap())
            .await;
        memory
            .add_wordle(WordlePuzzle::parse(date(), "crane").unwrap())
            .await;
        let stores = Stores {
            puzzles: memory.clone(),
            scores: memory.clone(),
            timers: memory.clone(),
            clock: Arc::new(FixedClock(date())),
        };
        (memory, stores)
    }

    fn type_word(game: &mut Wordle, word: &str) -> Submission {
        for ch in word.chars() {
            game.append_letter(ch);
        }
        game.submit_guess()
    }

    #[tokio::test]
    async fn test_open_fails_without_puzzle() {
        let memory = Arc::new(MemoryStore::new());
        let stores = Stores {
            puzzles: memory.clone(),
            scores: memory.clone(),
            timers: memory.clone(),
            clock: Arc::new(FixedClock(date())),
        };
        let service: GameService<Wordle> = GameService::new(&stores, SessionSettings::default());

        let result = service.open(None).await;
        assert!(matches!(result, Err(AppError::PuzzleUnavailable(d)) if d == date()));
        assert_eq!(service.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_win_records_score_once() {
        let (memory, stores) = memory_stores().await;
        let service: GameService<Wordle> = GameService::new(&stores, SessionSettings::default());

        let first = service.open(None).await.unwrap();
        let action = service
            .act(first.session_id, &player(), |game| type_word(game, "CRANE"))
            .await
            .unwrap();
        assert_eq!(action.outcome, Submission::Won);
        assert!(matches!(action.score, Some(ScoreNotice::Recorded { .. })));

        let second = service.open(None).await.unwrap();
        let action = service
            .act(second.session_id, &player(), |game| type_word(game, "CRANE"))
            .await
            .unwrap();
        assert_eq!(action.score, Some(ScoreNotice::AlreadyRecorded));
        assert_eq!(memory.score_count().await, 1);
    }

    #[tokio::test]
    async fn test_loss_is_not_scored() {
        let (memory, stores) = memory_stores().await;
        let service: GameService<Sudoku> = GameService::new(&stores, SessionSettings::default());
        let snapshot = service.open(None).await.unwrap();
        let id = snapshot.session_id;

        service
            .act(id, &player(), |game| game.select_cell(Position::new(0, 0).unwrap()))
            .await
            .unwrap();
        let wrong = Digit::try_from(1).unwrap();
        for _ in 0..2 {
            service.act(id, &player(), |game| game.place_digit(wrong)).await.unwrap();
        }
        let action = service
            .act(id, &player(), |game| game.place_digit(wrong))
            .await
            .unwrap();

        assert_eq!(action.outcome, Placement::Lost);
        assert_eq!(action.session.status, GameStatus::Lost);
        assert!(action.score.is_none());
        assert_eq!(memory.score_count().await, 0);
    }

    #[tokio::test]
    async fn test_unscored_finish_skips_reporter() {
        let (_memory, mut stores) = memory_stores().await;
        let mut scores = MockScoreStore::new();
        scores.expect_find_score().never();
        scores.expect_insert_score().never();
        stores.scores = Arc::new(scores);

        let service: GameService<Sudoku> = GameService::new(&stores, SessionSettings::default());
        let id = service.open(None).await.unwrap().session_id;
        let action = service
            .act_unscored(id, |game| game.reveal_solution())
            .await
            .unwrap();

        assert!(action.outcome);
        assert_eq!(action.session.status, GameStatus::Won);
        assert!(action.score.is_none());
    }

    #[tokio::test]
    async fn test_timer_resumes_and_clears() {
        let (_memory, mut stores) = memory_stores().await;
        let mut timers = MockTimerStore::new();
        timers.expect_load().times(1).returning(|_| Ok(Some(120)));
        timers.expect_save().returning(|_, _| Ok(()));
        timers
            .expect_clear()
            .withf(|key| key.scope == TimerScope::Client("tab-1".to_string()) && key.date == date())
            .times(1)
            .returning(|_| Ok(()));
        stores.timers = Arc::new(timers);

        let service: GameService<Wordle> = GameService::new(&stores, SessionSettings::default());
        let snapshot = service.open(Some(TimerScope::Client("tab-1".to_string()))).await.unwrap();
        assert_eq!(snapshot.elapsed_seconds, 120);

        service
            .act(snapshot.session_id, &player(), |game| type_word(game, "CRANE"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_close_removes_session() {
        let (_memory, stores) = memory_stores().await;
        let service: GameService<Wordle> = GameService::new(&stores, SessionSettings::default());
        let id = service.open(None).await.unwrap().session_id;

        service.close(id).await.unwrap();
        assert!(matches!(service.snapshot(id).await, Err(AppError::NotFound(_))));
        assert!(matches!(service.close(id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_counts_seconds_and_stops_on_finish() {
        let (memory, stores) = memory_stores().await;
        let service: GameService<Wordle> = GameService::new(&stores, SessionSettings::default());
        let id = service.open(Some(TimerScope::Client("tab".to_string()))).await.unwrap().session_id;

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(service.snapshot(id).await.unwrap().elapsed_seconds, 3);
        let key = TimerKey {
            game: GameKind::Wordle,
            scope: TimerScope::Client("tab".to_string()),
            date: date(),
        };
        assert_eq!(memory.load(&key).await.unwrap(), Some(3));

        service
            .act(id, &player(), |game| type_word(game, "CRANE"))
            .await
            .unwrap();
        assert_eq!(memory.load(&key).await.unwrap(), None);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(service.snapshot(id).await.unwrap().elapsed_seconds, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_session_is_evicted_after_linger() {
        let (_memory, stores) = memory_stores().await;
        let service: GameService<Wordle> = GameService::new(&stores, SessionSettings::default());
        let id = service.open(None).await.unwrap().session_id;

        service
            .act(id, &player(), |game| type_word(game, "CRANE"))
            .await
            .unwrap();
        assert!(service.snapshot(id).await.is_ok());

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(matches!(service.snapshot(id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_session_is_evicted() {
        let (_memory, stores) = memory_stores().await;
        let settings = SessionSettings {
            idle_timeout: Duration::from_secs(10),
            ..SessionSettings::default()
        };
        let service: GameService<Wordle> = GameService::new(&stores, settings);
        let id = service.open(None).await.unwrap().session_id;

        tokio::time::sleep(Duration::from_secs(12)).await;
        assert_eq!(service.session_count().await, 0);
        assert!(service.snapshot(id).await.is_err());
    }
}
