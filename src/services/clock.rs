use chrono::{NaiveDate, Utc};

/// Source of the current calendar day, the key for puzzles, scores and timers
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// The UTC calendar day
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Always the same day
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
