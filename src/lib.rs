//! Daily Sudoku and Wordle sessions with once-per-day score tracking.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
