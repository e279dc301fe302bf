//! Board module - the shared double-sided grid
//!
//! The board is a 10x20 grid stored as a flat row-major array. Row 0 is the
//! top edge (side A's home), row 19 the bottom edge (side B's home). Every
//! cell holds one of four values; background cells are split by the divider
//! row into Zone-1 (upper) and Zone-2 (lower).
//!
//! Line clearing works on partial rows: a clear is a maximal run of cells that
//! are filled for the acting side, at least [`MIN_CLEAR_RUN`] long. Clearing a
//! segment only shifts the columns it covers; the rest of the row stays put.

use arrayvec::ArrayVec;

use crate::pieces::Piece;
use crate::types::{Cell, Side, BOARD_HEIGHT, BOARD_WIDTH, MIN_CLEAR_RUN};

/// Total number of cells on the board
const BOARD_SIZE: usize = BOARD_WIDTH * BOARD_HEIGHT;

/// Upper bound on segments a single resolution can produce
pub const MAX_SEGMENTS: usize = BOARD_HEIGHT * (BOARD_WIDTH / MIN_CLEAR_RUN);

/// One clearable run inside a row, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClearSegment {
    pub row: usize,
    pub start_col: usize,
    pub end_col: usize,
}

impl ClearSegment {
    pub fn len(&self) -> usize {
        self.end_col - self.start_col + 1
    }

    pub fn contains_col(&self, col: usize) -> bool {
        (self.start_col..=self.end_col).contains(&col)
    }
}

/// Board coordinate of a single cleared cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellPos {
    pub row: usize,
    pub col: usize,
}

/// Everything a single clear resolution removed, for broadcasting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearEvent {
    pub side: Side,
    /// Affected rows, ascending and unique
    pub rows: Vec<usize>,
    pub segments: Vec<ClearSegment>,
    /// Flattened cleared cells, segment by segment
    pub cells: Vec<CellPos>,
}

/// The shared game board
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    /// Flat array of cells, row-major order (row * WIDTH + col)
    cells: [Cell; BOARD_SIZE],
    /// Derived index: bit `r` is set when row `r` holds a locked cell of either side
    active_rows: u32,
}

impl Board {
    /// Create a board holding only background cells
    pub fn new() -> Self {
        Self {
            cells: std::array::from_fn(|idx| Cell::background_for_row(idx / BOARD_WIDTH)),
            active_rows: 0,
        }
    }

    #[inline(always)]
    fn index(row: i8, col: i8) -> Option<usize> {
        if row < 0 || row >= BOARD_HEIGHT as i8 || col < 0 || col >= BOARD_WIDTH as i8 {
            return None;
        }
        Some((row as usize) * BOARD_WIDTH + (col as usize))
    }

    /// Get cell at `(row, col)`, None if out of bounds
    pub fn get(&self, row: i8, col: i8) -> Option<Cell> {
        Self::index(row, col).map(|idx| self.cells[idx])
    }

    /// Set cell at `(row, col)`, keeping the active-row index current.
    /// Returns false if out of bounds.
    pub fn set(&mut self, row: i8, col: i8, cell: Cell) -> bool {
        let Some(idx) = Self::index(row, col) else {
            return false;
        };
        self.cells[idx] = cell;
        let r = row as usize;
        if cell.is_locked() {
            self.active_rows |= 1 << r;
        } else if !self.row_cells(r).iter().any(|c| c.is_locked()) {
            self.active_rows &= !(1 << r);
        }
        true
    }

    /// Whether `(row, col)` blocks `side`. Out-of-bounds positions always block.
    pub fn is_solid_for(&self, side: Side, row: i8, col: i8) -> bool {
        self.get(row, col).map_or(true, |cell| cell.is_solid_for(side))
    }

    /// Whether every cell of `piece` is in bounds and passable for `side`
    pub fn fits(&self, side: Side, piece: &Piece) -> bool {
        piece
            .cells()
            .iter()
            .all(|&(row, col)| !self.is_solid_for(side, row, col))
    }

    /// Final position of `piece` after advancing in `side`'s fall direction until blocked
    pub fn drop_position(&self, side: Side, piece: &Piece) -> Piece {
        let mut landed = *piece;
        loop {
            let next = landed.shifted(side.fall_step(), 0);
            if !self.fits(side, &next) {
                return landed;
            }
            landed = next;
        }
    }

    /// Write `piece` into the board as `side`'s locked cells
    pub fn lock_piece(&mut self, side: Side, piece: &Piece) {
        for (row, col) in piece.cells() {
            self.set(row, col, side.filled());
        }
    }

    pub fn row_cells(&self, row: usize) -> &[Cell] {
        let start = row * BOARD_WIDTH;
        &self.cells[start..start + BOARD_WIDTH]
    }

    pub fn is_row_active(&self, row: usize) -> bool {
        row < BOARD_HEIGHT && self.active_rows & (1 << row) != 0
    }

    /// Rows currently flagged in the active-row index, ascending
    pub fn active_rows(&self) -> impl Iterator<Item = usize> + '_ {
        (0..BOARD_HEIGHT).filter(|&r| self.is_row_active(r))
    }

    /// Rebuild the active-row index by scanning the grid
    pub fn recompute_active_rows(&mut self) {
        self.active_rows = 0;
        for row in 0..BOARD_HEIGHT {
            if self.row_cells(row).iter().any(|c| c.is_locked()) {
                self.active_rows |= 1 << row;
            }
        }
    }

    /// Collect every clearable segment for `side` across all active rows.
    ///
    /// A row only contributes when it contains at least one of `side`'s own
    /// locked cells, so rows of pure background never clear.
    pub fn find_clear_segments(&self, side: Side) -> ArrayVec<ClearSegment, MAX_SEGMENTS> {
        let mut segments = ArrayVec::new();
        for row in self.active_rows() {
            let cells = self.row_cells(row);
            if !cells.contains(&side.filled()) {
                continue;
            }

            let mut col = 0;
            while col < BOARD_WIDTH {
                if !cells[col].is_filled_for(side) {
                    col += 1;
                    continue;
                }
                let start = col;
                while col < BOARD_WIDTH && cells[col].is_filled_for(side) {
                    col += 1;
                }
                if col - start >= MIN_CLEAR_RUN {
                    segments.push(ClearSegment {
                        row,
                        start_col: start,
                        end_col: col - 1,
                    });
                }
            }
        }
        segments
    }

    /// Remove the given segments and close the gaps column by column.
    ///
    /// Each touched column drops exactly its cleared cells; the remaining
    /// cells keep their order and slide away from `side`'s home edge, and
    /// background filler enters at that edge. Untouched columns are left
    /// exactly as they were.
    pub fn apply_clear(&mut self, side: Side, segments: &[ClearSegment]) -> ClearEvent {
        let mut rows: Vec<usize> = segments.iter().map(|s| s.row).collect();
        rows.sort_unstable();
        rows.dedup();

        let cells: Vec<CellPos> = segments
            .iter()
            .flat_map(|s| (s.start_col..=s.end_col).map(move |col| CellPos { row: s.row, col }))
            .collect();

        for col in 0..BOARD_WIDTH {
            let mut removed = [false; BOARD_HEIGHT];
            let mut count = 0;
            for seg in segments.iter().filter(|s| s.contains_col(col)) {
                if !removed[seg.row] {
                    removed[seg.row] = true;
                    count += 1;
                }
            }
            if count == 0 {
                continue;
            }

            let mut column = ArrayVec::<Cell, BOARD_HEIGHT>::new();
            if side == Side::A {
                column.extend((0..count).map(Cell::background_for_row));
            }
            column.extend(
                (0..BOARD_HEIGHT)
                    .filter(|&r| !removed[r])
                    .map(|r| self.cells[r * BOARD_WIDTH + col]),
            );
            if side == Side::B {
                column.extend((BOARD_HEIGHT - count..BOARD_HEIGHT).map(Cell::background_for_row));
            }

            for (row, cell) in column.into_iter().enumerate() {
                self.cells[row * BOARD_WIDTH + col] = cell;
            }
        }

        self.recompute_active_rows();

        ClearEvent {
            side,
            rows,
            segments: segments.to_vec(),
            cells,
        }
    }

    /// Find and clear every segment for `side` in one pass
    pub fn resolve_clears(&mut self, side: Side) -> Option<ClearEvent> {
        let segments = self.find_clear_segments(side);
        if segments.is_empty() {
            return None;
        }
        Some(self.apply_clear(side, &segments))
    }

    /// Get a reference to the internal cells array
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Convert to a row-major 2D vector
    pub fn to_rows(&self) -> Vec<Vec<Cell>> {
        (0..BOARD_HEIGHT).map(|r| self.row_cells(r).to_vec()).collect()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
