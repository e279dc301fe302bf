//! Adapter - match rooms served over a TCP socket with a JSON protocol
//!
//! This crate hosts the match orchestrator ([`room::Room`]) and the network
//! plumbing around it.
//!
//! # Protocol Overview
//!
//! The server speaks a **line-delimited JSON protocol** over TCP:
//!
//! 1. **Connection**: Client connects to the TCP socket (default: 127.0.0.1:7878)
//! 2. **Join**: Client sends `join`; the server binds it to a room and a side and answers `join_ack`
//! 3. **Countdown**: Once both sides are filled (by a second human or an AI) the room counts down
//! 4. **Play**: Clients send inputs; the server broadcasts `state`, `clear` and finally `win`
//!
//! # Message Types
//!
//! ## Client → Server
//!
//! - **join** `{playerId, preferredSide?, aiOpponent?, roomId?}`
//! - **ready**, **soft_drop**, **hard_drop**, **hold**
//! - **move** `{direction: left|right}`, **rotate** `{direction: cw|ccw}`
//!
//! ## Server → Client
//!
//! - **room_state** `{status, winner, players: {a, b}}`
//! - **state** `{state}`, **countdown** `{seconds}`, **clear** `{player, rows, segments, cells}`
//! - **win** `{winner}`, **join_ack** `{player, playerId, roomId}`, **error** `{message}`
//!
//! # Environment Variables
//!
//! - `DUEL_HOST`: Bind address (default: "127.0.0.1")
//! - `DUEL_PORT`: Port number (default: 7878)
//! - `DUEL_AI_MOVE_MS`: AI input interval, clamped to 60..=1200 (default: 180)
//! - `DUEL_AI_FALLBACK_MS`: Wait before an AI takes an empty seat (default: 10000)
//! - `DUEL_SEED`: Fixed match seed
//!
//! # Example Protocol Flow
//!
//! ```text
//! Client -> Server: {"type":"join","playerId":"p1","aiOpponent":true}
//! Server -> Client: {"type":"join_ack","player":"a","playerId":"p1","roomId":"default"}
//! Server -> Client: {"type":"countdown","seconds":3}
//! Client -> Server: {"type":"move","direction":"left"}
//! Server -> Client: {"type":"state","state":{...}}
//! ```

pub mod protocol;
pub mod room;
pub mod server;
pub mod timers;

pub use duel_tetris_ai as ai;
pub use duel_tetris_core as core;
pub use duel_tetris_types as types;

pub use protocol::*;
pub use room::{ConnectionId, Room, RoomConfig, RoomEvent, Seat};
pub use server::*;
pub use timers::{ManualTimerDriver, RoomTimers, TimerDriver, TimerFire, TimerKind, TokioTimerDriver};
