//! Duel Tetris (workspace facade crate).
//!
//! Re-exports the member crates under one name: `duel_tetris::{types, core, ai, adapter}`.
//! The implementation lives in dedicated crates under `crates/`.

pub use duel_tetris_adapter as adapter;
pub use duel_tetris_ai as ai;
pub use duel_tetris_core as core;
pub use duel_tetris_types as types;
