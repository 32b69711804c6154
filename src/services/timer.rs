use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::Display;

use crate::models::{GameKind, Identity};

/// Elapsed-second counter owned by one session
///
/// The counter only moves forward while running; once stopped it never restarts,
/// matching the terminal states of the games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimerState {
    elapsed_seconds: u64,
    running: bool,
}

impl TimerState {
    /// Starts counting from a previously persisted value
    pub fn resume(elapsed_seconds: u64) -> Self {
        Self {
            elapsed_seconds,
            running: true,
        }
    }

    /// Advances one second. Returns false if the timer is stopped.
    pub fn tick(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.elapsed_seconds += 1;
        true
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

/// Whose timer a session resumes
///
/// Signed-in players and anonymous browsers live in separate namespaces, so a client id
/// that happens to equal a player's UUID never reaches that player's timer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerScope {
    Player(Identity),
    Client(String),
}

impl Display for TimerScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerScope::Player(identity) => write!(f, "user:{}", identity),
            TimerScope::Client(id) => write!(f, "client:{}", id),
        }
    }
}

/// Where a session's elapsed time is persisted between reloads
///
/// One key per game, player scope and day, so a Sudoku and a Wordle played side by side
/// never share a counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimerKey {
    pub game: GameKind,
    pub scope: TimerScope,
    pub date: NaiveDate,
}

impl Display for TimerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timer:{}:{}:{}", self.game, self.scope, self.date)
    }
}
