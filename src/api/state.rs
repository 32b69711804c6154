use std::sync::Arc;

use crate::services::{GameService, SessionSettings, Stores, Sudoku, Wordle};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub sudoku: Arc<GameService<Sudoku>>,
    pub wordle: Arc<GameService<Wordle>>,
}

impl AppState {
    /// Builds one session service per game over the same stores
    pub fn new(stores: Stores, settings: SessionSettings) -> Self {
        Self {
            sudoku: Arc::new(GameService::new(&stores, settings)),
            wordle: Arc::new(GameService::new(&stores, settings)),
        }
    }
}
