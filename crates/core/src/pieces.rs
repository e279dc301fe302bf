//! Pieces module - tetromino shapes, spawn geometry and horizontal wall kicks
//!
//! Shapes are the standard SRS offsets, trimmed to the distinct rotation
//! states of each kind (O has one, I/S/Z two, J/L/T four). Offsets are
//! `(dx, dy)` = (column, row) relative to the piece anchor.

use crate::types::{PieceKind, Side, BOARD_HEIGHT, BOARD_WIDTH};

/// Offset of a single mino relative to piece origin
pub type MinoOffset = (i8, i8);

/// Shape of a piece - 4 mino offsets from piece origin
pub type PieceShape = [MinoOffset; 4];

/// Horizontal offsets tried, in order, when a rotation collides in place
pub const WALL_KICKS: [i8; 5] = [0, -1, 1, -2, 2];

/// Get the shape (mino offsets) for a piece kind and rotation index.
///
/// The rotation index is reduced modulo the kind's rotation count.
pub fn get_shape(kind: PieceKind, rotation: u8) -> PieceShape {
    let r = rotation % kind.rotation_count();
    match kind {
        PieceKind::I => I_SHAPES[r as usize],
        PieceKind::O => O_SHAPE,
        PieceKind::T => T_SHAPES[r as usize],
        PieceKind::S => S_SHAPES[r as usize],
        PieceKind::Z => Z_SHAPES[r as usize],
        PieceKind::J => J_SHAPES[r as usize],
        PieceKind::L => L_SHAPES[r as usize],
    }
}

const I_SHAPES: [PieceShape; 2] = [
    [(0, 1), (1, 1), (2, 1), (3, 1)],
    [(2, 0), (2, 1), (2, 2), (2, 3)],
];

const O_SHAPE: PieceShape = [(1, 0), (2, 0), (1, 1), (2, 1)];

const T_SHAPES: [PieceShape; 4] = [
    [(1, 0), (0, 1), (1, 1), (2, 1)],
    [(1, 0), (1, 1), (2, 1), (1, 2)],
    [(0, 1), (1, 1), (2, 1), (1, 2)],
    [(1, 0), (0, 1), (1, 1), (1, 2)],
];

const S_SHAPES: [PieceShape; 2] = [
    [(1, 0), (2, 0), (0, 1), (1, 1)],
    [(1, 0), (1, 1), (2, 1), (2, 2)],
];

const Z_SHAPES: [PieceShape; 2] = [
    [(0, 0), (1, 0), (1, 1), (2, 1)],
    [(2, 0), (1, 1), (2, 1), (1, 2)],
];

const J_SHAPES: [PieceShape; 4] = [
    [(0, 0), (0, 1), (1, 1), (2, 1)],
    [(1, 0), (2, 0), (1, 1), (1, 2)],
    [(0, 1), (1, 1), (2, 1), (2, 2)],
    [(1, 0), (1, 1), (0, 2), (1, 2)],
];

const L_SHAPES: [PieceShape; 4] = [
    [(2, 0), (0, 1), (1, 1), (2, 1)],
    [(1, 0), (1, 1), (1, 2), (2, 2)],
    [(0, 1), (1, 1), (2, 1), (0, 2)],
    [(0, 0), (1, 0), (1, 1), (1, 2)],
];

/// Bounding box of a shape as `(min_dx, max_dx, min_dy, max_dy)`
pub fn shape_bounds(shape: &PieceShape) -> (i8, i8, i8, i8) {
    let mut min_dx = i8::MAX;
    let mut max_dx = i8::MIN;
    let mut min_dy = i8::MAX;
    let mut max_dy = i8::MIN;
    for &(dx, dy) in shape {
        min_dx = min_dx.min(dx);
        max_dx = max_dx.max(dx);
        min_dy = min_dy.min(dy);
        max_dy = max_dy.max(dy);
    }
    (min_dx, max_dx, min_dy, max_dy)
}

/// A piece on the board: kind, rotation index and anchor position.
///
/// Ownership is implicit; each side holds at most one active piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub kind: PieceKind,
    pub rotation: u8,
    pub row: i8,
    pub col: i8,
}

impl Piece {
    /// Spawn a piece in rotation 0 against `side`'s home edge
    pub fn spawn(kind: PieceKind, side: Side) -> Self {
        Self::spawn_rotated(kind, 0, side)
    }

    /// Place a piece in the given rotation flush against `side`'s home edge,
    /// horizontally centered for that rotation.
    pub fn spawn_rotated(kind: PieceKind, rotation: u8, side: Side) -> Self {
        let rotation = rotation % kind.rotation_count();
        let shape = get_shape(kind, rotation);
        let (min_dx, max_dx, min_dy, max_dy) = shape_bounds(&shape);
        let width = max_dx - min_dx + 1;
        let col = (BOARD_WIDTH as i8 - width) / 2 - min_dx;
        let row = match side {
            Side::A => -min_dy,
            Side::B => BOARD_HEIGHT as i8 - 1 - max_dy,
        };
        Self {
            kind,
            rotation,
            row,
            col,
        }
    }

    pub fn shape(&self) -> PieceShape {
        get_shape(self.kind, self.rotation)
    }

    /// Absolute `(row, col)` of each occupied cell
    pub fn cells(&self) -> [(i8, i8); 4] {
        let shape = self.shape();
        std::array::from_fn(|i| (self.row + shape[i].1, self.col + shape[i].0))
    }

    pub fn shifted(&self, d_row: i8, d_col: i8) -> Self {
        Self {
            row: self.row + d_row,
            col: self.col + d_col,
            ..*self
        }
    }

    /// Same anchor, rotation index advanced by `steps` (may be negative)
    pub fn rotated(&self, steps: i8) -> Self {
        let count = self.kind.rotation_count() as i8;
        let rotation = (self.rotation as i8 + steps).rem_euclid(count) as u8;
        Self { rotation, ..*self }
    }
}

/// Try to rotate a piece, kicking horizontally when the in-place result is illegal.
///
/// Returns the first legal candidate over [`WALL_KICKS`], or None when every
/// kick collides.
pub fn try_rotate(piece: &Piece, clockwise: bool, is_legal: impl Fn(&Piece) -> bool) -> Option<Piece> {
    let turned = piece.rotated(if clockwise { 1 } else { -1 });
    WALL_KICKS
        .iter()
        .map(|&dc| turned.shifted(0, dc))
        .find(|candidate| is_legal(candidate))
}
