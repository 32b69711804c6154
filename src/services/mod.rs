pub mod clock;
pub mod games;
pub mod score;
pub mod session;
pub mod sudoku;
pub mod timer;
pub mod wordle;

pub use clock::{Clock, FixedClock, SystemClock};
pub use games::{Action, GameService, SessionSettings, Stores};
pub use score::{IdentityResolver, ScoreReport, ScoreReporter};
pub use session::{PuzzleGame, PuzzleSession, SessionSnapshot};
pub use sudoku::Sudoku;
pub use timer::{TimerKey, TimerScope, TimerState};
pub use wordle::Wordle;
