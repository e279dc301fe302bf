use std::iter;

use duel_tetris_core::types::{PieceKind, Side, BOARD_HEIGHT, BOARD_WIDTH};
use duel_tetris_core::{Board, Piece};
use rand::Rng;

use crate::AiTuning;

/// Leftmost anchor column tried; shapes carry up to three empty columns of offset
const MIN_ANCHOR_COL: i8 = -3;

/// Where the AI wants its current piece to end up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub target_rotation: u8,
    pub target_col: i8,
    /// Swap to the held piece instead of placing the current one
    pub use_hold: bool,
}

/// A legal landing position and its heuristic score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredPlacement {
    pub landed: Piece,
    pub score: f32,
}

/// Choose a target for `piece`, or for the held piece when it is clearly better.
///
/// With no legal placement at all the target is the piece's current rotation
/// and column, so the caller's normal lock handling takes over.
pub fn find_best_placement<R>(
    board: &Board,
    side: Side,
    piece: &Piece,
    held: Option<PieceKind>,
    hold_used: bool,
    tuning: &AiTuning,
    rng: &mut R,
) -> Placement
where
    R: Rng + ?Sized,
{
    let current = scored_placements(board, side, piece.kind, tuning);

    if let Some(held_kind) = held.filter(|_| !hold_used) {
        let held_options = scored_placements(board, side, held_kind, tuning);
        let beats_current = match (held_options.first(), current.first()) {
            (Some(h), Some(c)) => h.score > c.score + tuning.hold_margin,
            (Some(_), None) => true,
            _ => false,
        };
        if beats_current {
            let chosen = select(&held_options, tuning, rng);
            return Placement {
                target_rotation: chosen.landed.rotation,
                target_col: chosen.landed.col,
                use_hold: true,
            };
        }
    }

    if current.is_empty() {
        return Placement {
            target_rotation: piece.rotation,
            target_col: piece.col,
            use_hold: false,
        };
    }

    let chosen = select(&current, tuning, rng);
    Placement {
        target_rotation: chosen.landed.rotation,
        target_col: chosen.landed.col,
        use_hold: false,
    }
}

/// Every legal landing for `kind`, best first.
///
/// Candidates are checked at the spawn edge for each rotation and column,
/// then dropped in `side`'s fall direction.
pub fn scored_placements(
    board: &Board,
    side: Side,
    kind: PieceKind,
    tuning: &AiTuning,
) -> Vec<ScoredPlacement> {
    let mut scored: Vec<ScoredPlacement> = (0..kind.rotation_count())
        .flat_map(|rotation| {
            let spawn = Piece::spawn_rotated(kind, rotation, side);
            (MIN_ANCHOR_COL..=BOARD_WIDTH as i8).map(move |col| Piece { col, ..spawn })
        })
        .filter(|candidate| board.fits(side, candidate))
        .map(|candidate| {
            let landed = board.drop_position(side, &candidate);
            ScoredPlacement {
                landed,
                score: score_landing(board, side, &landed, tuning),
            }
        })
        .collect();
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored
}

/// Pick from a best-first list, injecting the configured imperfection
fn select<R>(scored: &[ScoredPlacement], tuning: &AiTuning, rng: &mut R) -> ScoredPlacement
where
    R: Rng + ?Sized,
{
    let len = scored.len();
    if len > 1 && rng.random_bool(tuning.mistake_rate.clamp(0.0, 1.0)) {
        return scored[rng.random_range(len / 2..len)];
    }
    if len > 1 && rng.random_bool(tuning.second_best_rate.clamp(0.0, 1.0)) {
        return scored[1];
    }
    scored[0]
}

/// Score the board as it would look with `landed` locked for `side`
pub fn score_landing(board: &Board, side: Side, landed: &Piece, tuning: &AiTuning) -> f32 {
    let mut sim = board.clone();
    sim.lock_piece(side, landed);

    let clears = sim.find_clear_segments(side).len() as f32;
    let depths = landed
        .cells()
        .map(|(row, _)| side.depth_of(row as usize));
    let depth: usize = depths.iter().sum();
    let near_spawn = depths.iter().filter(|&&d| d < tuning.danger_rows).count() as f32;

    clears * tuning.clear_reward + depth as f32 * tuning.depth_bias
        - count_holes(&sim, side) as f32 * tuning.hole_penalty
        - bumpiness(&sim, side) as f32 * tuning.bumpiness_penalty
        - near_spawn * tuning.spawn_danger_penalty
}

/// Rows of `side`'s half of a column, ordered from its spawn edge outward
fn rows_from_spawn(side: Side) -> impl Iterator<Item = usize> {
    (0..BOARD_HEIGHT).map(move |depth| match side {
        Side::A => depth,
        Side::B => BOARD_HEIGHT - 1 - depth,
    })
}

/// Empty-for-side cells with a solid cell between them and the spawn edge
pub fn count_holes(board: &Board, side: Side) -> usize {
    (0..BOARD_WIDTH as i8)
        .map(|col| {
            let mut covered = false;
            let mut holes = 0;
            for row in rows_from_spawn(side) {
                if board.is_solid_for(side, row as i8, col) {
                    covered = true;
                } else if covered {
                    holes += 1;
                }
            }
            holes
        })
        .sum()
}

/// Depth of the first solid cell in each column, seen from `side`'s spawn edge
pub fn surface_depths(board: &Board, side: Side) -> [usize; BOARD_WIDTH] {
    std::array::from_fn(|col| {
        rows_from_spawn(side)
            .position(|row| board.is_solid_for(side, row as i8, col as i8))
            .unwrap_or(BOARD_HEIGHT)
    })
}

/// Sum of absolute depth differences between adjacent columns
pub fn bumpiness(board: &Board, side: Side) -> usize {
    let depths = surface_depths(board, side);
    iter::zip(&depths, &depths[1..])
        .map(|(a, b)| a.abs_diff(*b))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use duel_tetris_core::types::{Cell, DIVIDER_ROW};
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    #[test]
    fn empty_board_has_flat_surface() {
        let board = Board::new();
        assert_eq!(surface_depths(&board, Side::A), [DIVIDER_ROW; BOARD_WIDTH]);
        assert_eq!(bumpiness(&board, Side::B), 0);
        assert_eq!(count_holes(&board, Side::A), 0);
    }

    #[test]
    fn covered_gap_is_a_hole() {
        let mut board = Board::new();
        board.set(8, 4, Cell::FilledA);
        assert_eq!(count_holes(&board, Side::A), 1);
        assert_eq!(count_holes(&board, Side::B), 0);
    }

    #[test]
    fn o_piece_lands_on_far_edge() {
        let board = Board::new();
        let piece = Piece::spawn(PieceKind::O, Side::A);
        let mut rng = Pcg32::seed_from_u64(4);
        let placement =
            find_best_placement(&board, Side::A, &piece, None, false, &AiTuning::PERFECT, &mut rng);
        assert!(!placement.use_hold);

        let target = Piece {
            rotation: placement.target_rotation,
            col: placement.target_col,
            ..piece
        };
        assert!(board.fits(Side::A, &target));
        let landed = board.drop_position(Side::A, &target);
        let deepest = landed.cells().iter().map(|c| c.0).max();
        assert_eq!(deepest, Some(DIVIDER_ROW as i8 - 1));
    }

    #[test]
    fn prefers_completing_a_segment() {
        let mut board = Board::new();
        for col in 0..4 {
            board.set(DIVIDER_ROW as i8, col, Cell::FilledB);
        }
        let best = scored_placements(&board, Side::B, PieceKind::I, &AiTuning::PERFECT)[0];
        let mut sim = board.clone();
        sim.lock_piece(Side::B, &best.landed);
        assert_eq!(sim.find_clear_segments(Side::B).len(), 1);
    }

    #[test]
    fn blocked_board_keeps_current_target() {
        let mut board = Board::new();
        for row in 0..DIVIDER_ROW as i8 {
            for col in 0..BOARD_WIDTH as i8 {
                board.set(row, col, Cell::FilledB);
            }
        }
        let piece = Piece::spawn(PieceKind::T, Side::A);
        let mut rng = Pcg32::seed_from_u64(1);
        let placement =
            find_best_placement(&board, Side::A, &piece, None, false, &AiTuning::STANDARD, &mut rng);
        assert_eq!(placement.target_col, piece.col);
        assert_eq!(placement.target_rotation, piece.rotation);
        assert!(!placement.use_hold);
    }

    #[test]
    fn used_hold_is_never_offered() {
        let board = Board::new();
        let piece = Piece::spawn(PieceKind::S, Side::A);
        let mut rng = Pcg32::seed_from_u64(2);
        let placement = find_best_placement(
            &board,
            Side::A,
            &piece,
            Some(PieceKind::O),
            true,
            &AiTuning::STANDARD,
            &mut rng,
        );
        assert!(!placement.use_hold);
    }

    fn tuned(mistake_rate: f64, second_best_rate: f64) -> AiTuning {
        AiTuning {
            mistake_rate,
            second_best_rate,
            ..AiTuning::STANDARD
        }
    }

    #[test]
    fn mistakes_come_from_the_worse_half() {
        let board = Board::new();
        let tuning = tuned(1.0, 0.0);
        let scored = scored_placements(&board, Side::A, PieceKind::T, &tuning);
        let worse = &scored[scored.len() / 2..];
        for seed in 0..32 {
            let mut rng = Pcg32::seed_from_u64(seed);
            let pick = select(&scored, &tuning, &mut rng);
            assert!(worse.contains(&pick), "seed {seed} picked {pick:?}");
        }
    }

    #[test]
    fn second_best_rate_takes_the_runner_up() {
        let board = Board::new();
        let tuning = tuned(0.0, 1.0);
        let scored = scored_placements(&board, Side::B, PieceKind::L, &tuning);
        for seed in 0..8 {
            let mut rng = Pcg32::seed_from_u64(seed);
            assert_eq!(select(&scored, &tuning, &mut rng), scored[1]);
        }

        let piece = Piece::spawn(PieceKind::L, Side::B);
        let mut rng = Pcg32::seed_from_u64(5);
        let placement = find_best_placement(&board, Side::B, &piece, None, false, &tuning, &mut rng);
        assert_eq!(placement.target_rotation, scored[1].landed.rotation);
        assert_eq!(placement.target_col, scored[1].landed.col);
    }

    #[test]
    fn perfect_tuning_takes_the_best() {
        let board = Board::new();
        let scored = scored_placements(&board, Side::A, PieceKind::J, &AiTuning::PERFECT);
        let mut rng = Pcg32::seed_from_u64(9);
        assert_eq!(select(&scored, &AiTuning::PERFECT, &mut rng), scored[0]);
    }
}
