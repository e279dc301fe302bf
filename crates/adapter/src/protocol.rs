//! Wire protocol - line-delimited JSON messages
//!
//! Every message is a JSON object with a `type` discriminator. Inbound
//! messages are parsed in two steps (raw JSON, then typed) so an unparseable
//! line and an unknown `type` produce different error codes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::core::{ClearEvent, MatchSnapshot, PlayerSnapshot};
use crate::types::{PlayerAction, Side};

/// Room used when a `join` names none
pub const DEFAULT_ROOM_ID: &str = "default";

/// Inbound message types this server understands
const CLIENT_MESSAGE_TYPES: [&str; 7] = [
    "join",
    "ready",
    "move",
    "rotate",
    "soft_drop",
    "hard_drop",
    "hold",
];

// ============== Client -> Server ==============

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Join(JoinRequest),
    Ready {},
    Move { direction: MoveDirection },
    Rotate { direction: RotateDirection },
    SoftDrop {},
    HardDrop {},
    Hold {},
}

impl ClientMessage {
    /// Game input carried by this message, if it is one
    pub fn action(&self) -> Option<PlayerAction> {
        match self {
            ClientMessage::Move {
                direction: MoveDirection::Left,
            } => Some(PlayerAction::MoveLeft),
            ClientMessage::Move {
                direction: MoveDirection::Right,
            } => Some(PlayerAction::MoveRight),
            ClientMessage::Rotate {
                direction: RotateDirection::Cw,
            } => Some(PlayerAction::RotateCw),
            ClientMessage::Rotate {
                direction: RotateDirection::Ccw,
            } => Some(PlayerAction::RotateCcw),
            ClientMessage::SoftDrop {} => Some(PlayerAction::SoftDrop),
            ClientMessage::HardDrop {} => Some(PlayerAction::HardDrop),
            ClientMessage::Hold {} => Some(PlayerAction::Hold),
            ClientMessage::Join(_) | ClientMessage::Ready {} => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    #[serde(default)]
    pub player_id: Option<String>,
    #[serde(default)]
    pub preferred_side: Option<String>,
    #[serde(default)]
    pub ai_opponent: bool,
    #[serde(default)]
    pub room_id: Option<String>,
}

impl JoinRequest {
    /// Requested side, ignoring values that name no side
    pub fn preferred_side(&self) -> Option<Side> {
        self.preferred_side.as_deref().and_then(Side::from_str)
    }

    pub fn room_id(&self) -> &str {
        self.room_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_ROOM_ID)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotateDirection {
    Cw,
    Ccw,
}

// ============== Errors ==============

/// Error codes sent in `error` messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    MissingPlayerId,
    RoomFull,
    NotJoined,
    InvalidJson,
    UnsupportedMessage,
    GameStartFailed,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingPlayerId => "missing_player_id",
            ErrorCode::RoomFull => "room_full",
            ErrorCode::NotJoined => "not_joined",
            ErrorCode::InvalidJson => "invalid_json",
            ErrorCode::UnsupportedMessage => "unsupported_message",
            ErrorCode::GameStartFailed => "game_start_failed",
        }
    }
}

/// Why an inbound line was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("line is not valid JSON")]
    InvalidJson,
    #[error("unsupported message type `{0}`")]
    UnsupportedMessage(String),
    #[error("join requires a playerId")]
    MissingPlayerId,
    #[error("malformed message: {0}")]
    Malformed(String),
}

impl ProtocolError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ProtocolError::InvalidJson | ProtocolError::Malformed(_) => ErrorCode::InvalidJson,
            ProtocolError::UnsupportedMessage(_) => ErrorCode::UnsupportedMessage,
            ProtocolError::MissingPlayerId => ErrorCode::MissingPlayerId,
        }
    }
}

/// Parse one inbound line
pub fn parse_client_message(line: &str) -> Result<ClientMessage, ProtocolError> {
    let value: Value = serde_json::from_str(line).map_err(|_| ProtocolError::InvalidJson)?;
    let Some(kind) = value.get("type").and_then(Value::as_str) else {
        return Err(ProtocolError::Malformed("missing `type`".to_string()));
    };
    if !CLIENT_MESSAGE_TYPES.contains(&kind) {
        return Err(ProtocolError::UnsupportedMessage(kind.to_string()));
    }

    let message: ClientMessage =
        serde_json::from_value(value).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
    if let ClientMessage::Join(join) = &message {
        if join.player_id.as_deref().map_or(true, |id| id.trim().is_empty()) {
            return Err(ProtocolError::MissingPlayerId);
        }
    }
    Ok(message)
}

// ============== Server -> Client ==============

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    RoomState(RoomStateView),
    State { state: StateView },
    Countdown { seconds: u32 },
    Clear(ClearView),
    Win { winner: &'static str },
    JoinAck(JoinAck),
    Error { message: ErrorCode },
}

impl ServerMessage {
    pub fn error(code: ErrorCode) -> Self {
        ServerMessage::Error { message: code }
    }

    pub fn state(snapshot: &MatchSnapshot) -> Self {
        ServerMessage::State {
            state: StateView::from(snapshot),
        }
    }

    /// Serialize to a single JSON line, without the trailing newline
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinAck {
    pub player: &'static str,
    pub player_id: String,
    pub room_id: String,
}

/// A value per side, serialized as `{"a": .., "b": ..}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PerSide<T> {
    pub a: T,
    pub b: T,
}

impl<T> PerSide<T> {
    pub fn from_fn(mut f: impl FnMut(Side) -> T) -> Self {
        Self {
            a: f(Side::A),
            b: f(Side::B),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatView {
    pub player_id: String,
    pub ai: bool,
    pub connected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomStateView {
    pub status: &'static str,
    pub winner: Option<&'static str>,
    pub players: PerSide<Option<SeatView>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveView {
    pub kind: &'static str,
    pub rotation: u8,
    pub row: i8,
    pub col: i8,
    pub cells: Vec<[i8; 2]>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub active: Option<ActiveView>,
    pub next_piece: &'static str,
    pub preview: Vec<&'static str>,
    pub hold: Option<&'static str>,
    pub can_hold: bool,
    pub cleared_segments: u32,
    pub piece_id: u32,
}

impl From<&PlayerSnapshot> for PlayerView {
    fn from(value: &PlayerSnapshot) -> Self {
        Self {
            active: value.active.map(|a| ActiveView {
                kind: a.kind.as_str(),
                rotation: a.rotation,
                row: a.row,
                col: a.col,
                cells: a.cells.iter().map(|&(r, c)| [r, c]).collect(),
            }),
            next_piece: value.next_piece.as_str(),
            preview: value.preview.iter().map(|k| k.as_str()).collect(),
            hold: value.hold.map(|k| k.as_str()),
            can_hold: value.can_hold,
            cleared_segments: value.cleared_segments,
            piece_id: value.piece_id,
        }
    }
}

/// Public match state. Board cells use codes Zone-1 = 0, Zone-2 = 1, A = 2, B = 3.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateView {
    pub board: Vec<Vec<u8>>,
    pub players: PerSide<PlayerView>,
    pub status: &'static str,
    pub winner: Option<&'static str>,
    pub seed: u64,
}

impl From<&MatchSnapshot> for StateView {
    fn from(value: &MatchSnapshot) -> Self {
        Self {
            board: value
                .board
                .iter()
                .map(|row| row.iter().map(|c| c.code()).collect())
                .collect(),
            players: PerSide::from_fn(|side| PlayerView::from(value.player(side))),
            status: value.status.as_str(),
            winner: value.winner.map(Side::as_str),
            seed: value.seed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentView {
    pub row: usize,
    pub start_col: usize,
    pub end_col: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellView {
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClearView {
    pub player: &'static str,
    pub rows: Vec<usize>,
    pub segments: Vec<SegmentView>,
    pub cells: Vec<CellView>,
}

impl From<&ClearEvent> for ClearView {
    fn from(value: &ClearEvent) -> Self {
        Self {
            player: value.side.as_str(),
            rows: value.rows.clone(),
            segments: value
                .segments
                .iter()
                .map(|s| SegmentView {
                    row: s.row,
                    start_col: s.start_col,
                    end_col: s.end_col,
                })
                .collect(),
            cells: value
                .cells
                .iter()
                .map(|c| CellView {
                    row: c.row,
                    col: c.col,
                })
                .collect(),
        }
    }
}
