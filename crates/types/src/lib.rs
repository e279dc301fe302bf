//! Core types module - shared vocabulary and constants
//!
//! This crate defines the fundamental types used by the engine, the placement
//! AI and the match orchestrator. All types are pure data with no external
//! dependencies, so they can be used from any layer.
//!
//! # Board Geometry
//!
//! The board is a single shared grid played from both ends:
//!
//! - **Width**: 10 columns (indexed 0-9)
//! - **Height**: 20 rows (indexed 0-19, row 0 at the top)
//! - **Divider**: row 10; rows 0-9 carry the Zone-1 background, rows 10-19 Zone-2
//!
//! Side A spawns at the top edge and falls down. Side B spawns at the bottom
//! edge and falls up.
//!
//! # Timing Constants
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `GRAVITY_MS` | 700 | Gravity tick interval while playing |
//! | `COUNTDOWN_SECONDS` | 3 | Countdown length before a match starts |
//! | `COUNTDOWN_STEP_MS` | 1000 | Countdown broadcast interval |
//! | `COUNTDOWN_GRACE_MS` | 1500 | Safety deadline slack past the nominal countdown end |
//! | `AI_FALLBACK_MS` | 10000 | Idle wait before an AI takes the open side |
//! | `DEFAULT_AI_MOVE_MS` | 180 | AI input cadence (clamped to 60-1200) |
//!
//! # Examples
//!
//! ```
//! use duel_tetris_types::{Cell, Side, BOARD_HEIGHT, DIVIDER_ROW};
//!
//! assert_eq!(Side::A.opponent(), Side::B);
//! assert_eq!(Side::A.fall_step(), 1);
//! assert_eq!(Side::B.fall_step(), -1);
//!
//! // Background cells carry collision meaning.
//! assert!(Cell::ZoneTwo.is_solid_for(Side::A));
//! assert!(!Cell::ZoneOne.is_solid_for(Side::A));
//! assert!(Cell::ZoneOne.is_solid_for(Side::B));
//!
//! assert_eq!(Cell::background_for_row(0), Cell::ZoneOne);
//! assert_eq!(Cell::background_for_row(DIVIDER_ROW), Cell::ZoneTwo);
//! assert_eq!(Cell::background_for_row(BOARD_HEIGHT - 1), Cell::ZoneTwo);
//! ```

/// Board width in cells (10 columns)
pub const BOARD_WIDTH: usize = 10;

/// Board height in cells (20 rows)
pub const BOARD_HEIGHT: usize = 20;

/// First row of the lower (Zone-2) background region
pub const DIVIDER_ROW: usize = 10;

/// Minimum contiguous run length that qualifies as a clearable segment
pub const MIN_CLEAR_RUN: usize = 5;

/// Gravity tick interval in milliseconds
pub const GRAVITY_MS: u64 = 700;

/// Countdown length in seconds
pub const COUNTDOWN_SECONDS: u32 = 3;

/// Countdown broadcast interval in milliseconds
pub const COUNTDOWN_STEP_MS: u64 = 1000;

/// Extra slack granted to the countdown before the safety deadline force-starts the match
pub const COUNTDOWN_GRACE_MS: u64 = 1500;

/// Delay before an AI is attached to the open side of a half-filled room
pub const AI_FALLBACK_MS: u64 = 10_000;

/// Default AI input cadence in milliseconds
pub const DEFAULT_AI_MOVE_MS: u64 = 180;

/// Fastest allowed AI input cadence
pub const MIN_AI_MOVE_MS: u64 = 60;

/// Slowest allowed AI input cadence
pub const MAX_AI_MOVE_MS: u64 = 1200;

/// Number of upcoming pieces exposed in snapshots
pub const PREVIEW_LEN: usize = 5;

/// One of the two competing players.
///
/// Side A owns the top edge and falls down; side B owns the bottom edge and
/// falls up. Every direction-dependent scan in the engine is driven by
/// [`Side::fall_step`] and [`Side::spawn_row`] instead of branching per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    A,
    B,
}

impl Side {
    /// Both sides in tick order
    pub const ALL: [Side; 2] = [Side::A, Side::B];

    pub fn opponent(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    /// Stable array index (A = 0, B = 1)
    pub fn index(self) -> usize {
        match self {
            Side::A => 0,
            Side::B => 1,
        }
    }

    /// Signed row delta of one step of gravity for this side
    pub fn fall_step(self) -> i8 {
        match self {
            Side::A => 1,
            Side::B => -1,
        }
    }

    /// The board row this side spawns against (its home edge)
    pub fn spawn_row(self) -> usize {
        match self {
            Side::A => 0,
            Side::B => BOARD_HEIGHT - 1,
        }
    }

    /// Distance of `row` from this side's home edge
    pub fn depth_of(self, row: usize) -> usize {
        match self {
            Side::A => row,
            Side::B => BOARD_HEIGHT - 1 - row,
        }
    }

    /// Background value that is solid (blocking) for this side
    pub fn blocking_zone(self) -> Cell {
        match self {
            Side::A => Cell::ZoneTwo,
            Side::B => Cell::ZoneOne,
        }
    }

    /// Locked-cell value written by this side
    pub fn filled(self) -> Cell {
        match self {
            Side::A => Cell::FilledA,
            Side::B => Cell::FilledB,
        }
    }

    /// Parse side from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "a" => Some(Side::A),
            "b" => Some(Side::B),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::A => "a",
            Side::B => "b",
        }
    }
}

/// A cell on the shared board.
///
/// There is no empty sentinel: a cell is always either a locked block of one
/// side or one of the two background values, and the background values carry
/// collision meaning of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    FilledA,
    FilledB,
    ZoneOne,
    ZoneTwo,
}

impl Cell {
    /// Whether this cell blocks a piece owned by `side`.
    ///
    /// Locked cells block both sides. Zone-2 blocks A, Zone-1 blocks B.
    pub fn is_solid_for(self, side: Side) -> bool {
        match self {
            Cell::FilledA | Cell::FilledB => true,
            Cell::ZoneOne | Cell::ZoneTwo => self == side.blocking_zone(),
        }
    }

    /// Whether this cell counts towards a clearable run for `side`.
    ///
    /// Uses the collision polarity for background cells; only the side's own
    /// locked cells count, the opponent's blocks never do.
    pub fn is_filled_for(self, side: Side) -> bool {
        self == side.filled() || self == side.blocking_zone()
    }

    pub fn is_locked(self) -> bool {
        matches!(self, Cell::FilledA | Cell::FilledB)
    }

    /// Background value belonging to `row`
    pub fn background_for_row(row: usize) -> Cell {
        if row < DIVIDER_ROW {
            Cell::ZoneOne
        } else {
            Cell::ZoneTwo
        }
    }

    /// Wire code used in board snapshots
    pub fn code(self) -> u8 {
        match self {
            Cell::ZoneOne => 0,
            Cell::ZoneTwo => 1,
            Cell::FilledA => 2,
            Cell::FilledB => 3,
        }
    }
}

/// The seven tetromino piece kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl PieceKind {
    /// All kinds in canonical bag order
    pub const ALL: [PieceKind; 7] = [
        PieceKind::I,
        PieceKind::O,
        PieceKind::T,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::J,
        PieceKind::L,
    ];

    /// Number of distinct rotation states.
    ///
    /// Symmetric shapes expose fewer states: O has one, I/S/Z have two.
    pub fn rotation_count(self) -> u8 {
        match self {
            PieceKind::O => 1,
            PieceKind::I | PieceKind::S | PieceKind::Z => 2,
            PieceKind::T | PieceKind::J | PieceKind::L => 4,
        }
    }

    /// Parse piece kind from string (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use duel_tetris_types::PieceKind;
    ///
    /// assert_eq!(PieceKind::from_str("i"), Some(PieceKind::I));
    /// assert_eq!(PieceKind::from_str("T"), Some(PieceKind::T));
    /// assert_eq!(PieceKind::from_str("unknown"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "i" => Some(PieceKind::I),
            "o" => Some(PieceKind::O),
            "t" => Some(PieceKind::T),
            "s" => Some(PieceKind::S),
            "z" => Some(PieceKind::Z),
            "j" => Some(PieceKind::J),
            "l" => Some(PieceKind::L),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PieceKind::I => "i",
            PieceKind::O => "o",
            PieceKind::T => "t",
            PieceKind::S => "s",
            PieceKind::Z => "z",
            PieceKind::J => "j",
            PieceKind::L => "l",
        }
    }
}

/// Player inputs accepted by the engine.
///
/// Human clients and the AI pilot go through the same set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerAction {
    /// Move piece one column left
    MoveLeft,
    /// Move piece one column right
    MoveRight,
    /// Rotate clockwise, with horizontal kicks
    RotateCw,
    /// Rotate counter-clockwise, with horizontal kicks
    RotateCcw,
    /// Advance one step towards the fall direction, or lock when blocked
    SoftDrop,
    /// Advance until blocked, then lock
    HardDrop,
    /// Swap the active piece with the held piece (once per piece)
    Hold,
}

impl PlayerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerAction::MoveLeft => "moveLeft",
            PlayerAction::MoveRight => "moveRight",
            PlayerAction::RotateCw => "rotateCw",
            PlayerAction::RotateCcw => "rotateCcw",
            PlayerAction::SoftDrop => "softDrop",
            PlayerAction::HardDrop => "hardDrop",
            PlayerAction::Hold => "hold",
        }
    }
}

/// Match lifecycle: `waiting -> countdown -> playing -> finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchStatus {
    Waiting,
    Countdown,
    Playing,
    Finished,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Waiting => "waiting",
            MatchStatus::Countdown => "countdown",
            MatchStatus::Playing => "playing",
            MatchStatus::Finished => "finished",
        }
    }
}
