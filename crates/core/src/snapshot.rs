//! Snapshot module - detached, read-only copies of a match
//!
//! Snapshots own all of their data, so they can be handed to the protocol
//! layer or compared in tests without borrowing the live [`MatchState`].
//!
//! [`MatchState`]: crate::MatchState

use crate::match_state::PlayerState;
use crate::pieces::Piece;
use crate::types::{Cell, MatchStatus, PieceKind, Side, PREVIEW_LEN};

/// Active piece as seen by observers, with its absolute cells resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActiveSnapshot {
    pub kind: PieceKind,
    pub rotation: u8,
    pub row: i8,
    pub col: i8,
    pub cells: [(i8, i8); 4],
}

impl From<Piece> for ActiveSnapshot {
    fn from(value: Piece) -> Self {
        Self {
            kind: value.kind,
            rotation: value.rotation,
            row: value.row,
            col: value.col,
            cells: value.cells(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerSnapshot {
    pub active: Option<ActiveSnapshot>,
    pub next_piece: PieceKind,
    pub preview: [PieceKind; PREVIEW_LEN],
    pub hold: Option<PieceKind>,
    pub can_hold: bool,
    pub cleared_segments: u32,
    pub piece_id: u32,
}

impl From<&PlayerState> for PlayerSnapshot {
    fn from(value: &PlayerState) -> Self {
        Self {
            active: value.active().map(ActiveSnapshot::from),
            next_piece: value.next_piece(),
            preview: value.queue().preview(),
            hold: value.hold_piece(),
            can_hold: value.can_hold(),
            cleared_segments: value.cleared_segments(),
            piece_id: value.piece_id(),
        }
    }
}

/// Deep copy of a match, detached from the live state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSnapshot {
    /// Rows top to bottom
    pub board: Vec<Vec<Cell>>,
    /// Indexed by [`Side::index`]
    pub players: [PlayerSnapshot; 2],
    pub status: MatchStatus,
    pub winner: Option<Side>,
    pub seed: u64,
}

impl MatchSnapshot {
    pub fn player(&self, side: Side) -> &PlayerSnapshot {
        &self.players[side.index()]
    }
}
