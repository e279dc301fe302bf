//! Core match logic - pure, deterministic, and testable
//!
//! Everything here is synchronous and free of I/O: the orchestrator owns the
//! clock and calls into [`MatchState`] on each input or timer firing.
//!
//! # Module Structure
//!
//! - [`board`]: 20x10 shared board with per-side collision and segment clearing
//! - [`match_state`]: Both players' pieces, lock/respawn, hold, win detection
//! - [`pieces`]: Tetromino shapes, spawn geometry, horizontal wall kicks
//! - [`rng`]: Seeded 7-bag piece queue
//! - [`snapshot`]: Read-only copies of the match for broadcasting
//!
//! # Rules in brief
//!
//! - Player A spawns at the top and falls down; player B spawns at the bottom and falls up
//! - Locked blocks of either side are solid for both
//! - The opponent's half of the background is solid; your own half is open
//! - A horizontal run of at least 5 cells filled for a side clears, even across a partial row
//!
//! # Example
//!
//! ```
//! use duel_tetris_core::MatchState;
//! use duel_tetris_types::{MatchStatus, PlayerAction, Side};
//!
//! let mut game = MatchState::new(12345);
//! game.start_match().unwrap();
//!
//! game.apply_input(Side::A, PlayerAction::MoveRight);
//! game.apply_input(Side::B, PlayerAction::RotateCw);
//! game.tick();
//!
//! assert_eq!(game.status(), MatchStatus::Playing);
//! ```

pub mod board;
pub mod match_state;
pub mod pieces;
pub mod rng;
pub mod snapshot;

pub use duel_tetris_types as types;

pub use board::{Board, CellPos, ClearEvent, ClearSegment};
pub use match_state::{InputOutcome, MatchError, MatchState, PlayerState, TickOutcome};
pub use pieces::{get_shape, try_rotate, Piece};
pub use rng::PieceQueue;
pub use snapshot::{ActiveSnapshot, MatchSnapshot, PlayerSnapshot};
