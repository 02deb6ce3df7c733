pub mod board;
pub mod cli_rendering;
pub mod engine;
pub mod error;
pub mod game;
pub mod grid;
pub mod logging;
pub mod tui;

// Re-export main types
pub use board::{Board, Direction, DEFAULT_DIMENSION};
pub use error::{CodecError, EngineError};
pub use game::{Game, GameState, MoveResult};
pub use grid::Grid;
pub use tui::run_tui;
// Re-export main engine types (others available via engine::*)
pub use engine::{mcts, EngineConfig, MctsEngine, SearchStatistics};
