use chrono::NaiveDate;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::{
    db::PuzzleStore,
    error::AppResult,
    models::{GameKind, GameStatus},
    services::timer::{TimerKey, TimerState},
};

/// A daily puzzle the session machinery can drive
///
/// Implementors own their board state and transition functions; the session adds the
/// timer, the calendar day and terminal-state bookkeeping shared by every game.
#[async_trait::async_trait]
pub trait PuzzleGame: Send + Sync + Sized + 'static {
    const KIND: GameKind;

    /// Player-facing snapshot of the board
    type View: Serialize + Send;

    /// Builds today's game from the puzzle store
    async fn load(puzzles: &dyn PuzzleStore, date: NaiveDate) -> AppResult<Self>;

    fn status(&self) -> GameStatus;

    /// Mistakes or guesses, as recorded with the score
    fn count(&self) -> u32;

    fn view(&self) -> Self::View;
}

/// Facts about a session that just reached a terminal state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub status: GameStatus,
    pub date: NaiveDate,
    pub elapsed_seconds: u64,
    pub count: u32,
    pub timer_key: Option<TimerKey>,
}

/// Outcome of applying one input to a session
#[derive(Debug)]
pub struct Transition<R> {
    pub outcome: R,
    /// Set only on the input that ended the game
    pub completion: Option<Completion>,
}

/// One player's attempt at one day's puzzle
#[derive(Debug)]
pub struct PuzzleSession<G> {
    id: Uuid,
    date: NaiveDate,
    timer: TimerState,
    timer_key: Option<TimerKey>,
    last_input: Instant,
    game: G,
}

impl<G: PuzzleGame> PuzzleSession<G> {
    pub fn new(date: NaiveDate, game: G, elapsed_seconds: u64, timer_key: Option<TimerKey>) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            timer: TimerState::resume(elapsed_seconds),
            timer_key,
            last_input: Instant::now(),
            game,
        }
    }

    /// Applies an input through the game's transition function
    ///
    /// The first transition into a terminal state stops the timer and yields a
    /// [`Completion`]; later inputs never produce another one.
    pub fn apply<R>(&mut self, input: impl FnOnce(&mut G) -> R) -> Transition<R> {
        self.last_input = Instant::now();
        let was_terminal = self.game.status().is_terminal();
        let outcome = input(&mut self.game);

        let status = self.game.status();
        let completion = if !was_terminal && status.is_terminal() {
            self.timer.stop();
            Some(Completion {
                status,
                date: self.date,
                elapsed_seconds: self.timer.elapsed_seconds(),
                count: self.game.count(),
                timer_key: self.timer_key.clone(),
            })
        } else {
            None
        };

        Transition {
            outcome,
            completion,
        }
    }

    /// Advances the timer by one second while the game is still being played
    pub fn tick(&mut self) -> bool {
        if self.game.status().is_terminal() {
            self.timer.stop();
            return false;
        }
        self.timer.tick()
    }

    pub fn idle_for(&self) -> Duration {
        self.last_input.elapsed()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.timer.elapsed_seconds()
    }

    pub fn timer_key(&self) -> Option<&TimerKey> {
        self.timer_key.as_ref()
    }

    pub fn status(&self) -> GameStatus {
        self.game.status()
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn snapshot(&self) -> SessionSnapshot<G::View> {
        SessionSnapshot {
            session_id: self.id,
            game: G::KIND,
            date: self.date,
            status: self.game.status(),
            elapsed_seconds: self.timer.elapsed_seconds(),
            board: self.game.view(),
        }
    }
}

/// Serializable state of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot<V> {
    pub session_id: Uuid,
    pub game: GameKind,
    pub date: NaiveDate,
    pub status: GameStatus,
    pub elapsed_seconds: u64,
    pub board: V,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WordlePuzzle;
    use crate::services::wordle::{Submission, Wordle};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 14).unwrap()
    }

    fn session(elapsed: u64) -> PuzzleSession<Wordle> {
        let puzzle = WordlePuzzle::parse(date(), "CRANE").unwrap();
        PuzzleSession::new(date(), Wordle::new(puzzle), elapsed, None)
    }

    fn guess(game: &mut Wordle, word: &str) -> Submission {
        for ch in word.chars() {
            game.append_letter(ch);
        }
        game.submit_guess()
    }

    #[test]
    fn test_timer_resumes_from_persisted_value() {
        let mut session = session(30);
        assert!(session.tick());
        assert_eq!(session.elapsed_seconds(), 31);
    }

    #[test]
    fn test_winning_input_completes_once() {
        let mut session = session(12);
        session.tick();

        let transition = session.apply(|game| guess(game, "CRANE"));
        assert_eq!(transition.outcome, Submission::Won);
        let completion = transition.completion.unwrap();
        assert_eq!(completion.status, GameStatus::Won);
        assert_eq!(completion.elapsed_seconds, 13);
        assert_eq!(completion.count, 1);
        assert_eq!(completion.date, date());

        let again = session.apply(|game| game.submit_guess());
        assert!(again.completion.is_none());
    }

    #[test]
    fn test_timer_stops_at_terminal_state() {
        let mut session = session(0);
        session.apply(|game| guess(game, "CRANE"));
        assert!(!session.tick());
        assert_eq!(session.elapsed_seconds(), 0);
    }

    #[test]
    fn test_non_terminal_input_has_no_completion() {
        let mut session = session(0);
        let transition = session.apply(|game| guess(game, "SLOTH"));
        assert_eq!(transition.outcome, Submission::Continue);
        assert!(transition.completion.is_none());
        assert_eq!(session.status(), GameStatus::Playing);
    }

    #[test]
    fn test_snapshot_carries_session_fields() {
        let session = session(5);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.session_id, session.id());
        assert_eq!(snapshot.game, GameKind::Wordle);
        assert_eq!(snapshot.elapsed_seconds, 5);
        assert_eq!(snapshot.status, GameStatus::Playing);
    }

    #[test]
    fn test_sessions_have_independent_timers() {
        let mut first = session(0);
        let second = session(0);
        first.tick();
        first.tick();
        assert_eq!(first.elapsed_seconds(), 2);
        assert_eq!(second.elapsed_seconds(), 0);
        assert_ne!(first.id(), second.id());
    }
}
