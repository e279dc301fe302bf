use arrayvec::ArrayVec;
use duel_tetris_core::types::{PlayerAction, Side, BOARD_WIDTH};
use duel_tetris_core::{try_rotate, Board, Piece};

use crate::Placement;

/// Soft drops allowed to clear the home edge before a rotation fits
const MAX_ROOM_DROPS: usize = 3;

/// Longest input sequence a single placement can need:
/// three rotations, the soft drops that make room for them, a full sweep
/// across the anchor range, and the drop.
pub const MAX_PLAN_LEN: usize = 3 + MAX_ROOM_DROPS + BOARD_WIDTH + 4 + 1;

pub type InputPlan = ArrayVec<PlayerAction, MAX_PLAN_LEN>;

/// Translate a target placement into discrete inputs for `piece`.
///
/// Rotation goes first, in whichever direction needs fewer steps, simulated
/// against `board` so wall kicks are accounted for before the horizontal
/// moves are counted. A piece flush against its home edge may be too close
/// to turn, so a few soft drops are inserted until the rotation fits.
/// A hold request plans only the hold; the swapped-in piece is planned afresh.
pub fn plan_inputs(board: &Board, side: Side, piece: &Piece, placement: &Placement) -> InputPlan {
    let mut plan = InputPlan::new();
    if placement.use_hold {
        plan.push(PlayerAction::Hold);
        return plan;
    }

    let count = piece.kind.rotation_count() as i8;
    let cur = piece.rotation as i8;
    let tgt = placement.target_rotation as i8;
    let cw = (tgt - cur).rem_euclid(count);
    let ccw = (cur - tgt).rem_euclid(count);
    let (clockwise, steps, action) = if ccw < cw {
        (false, ccw, PlayerAction::RotateCcw)
    } else {
        (true, cw, PlayerAction::RotateCw)
    };

    let mut sim = *piece;
    let mut turned = 0;
    let mut drops = 0;
    while turned < steps {
        if let Some(next) = try_rotate(&sim, clockwise, |p| board.fits(side, p)) {
            sim = next;
            turned += 1;
            plan.push(action);
            continue;
        }
        let lowered = sim.shifted(side.fall_step(), 0);
        if drops == MAX_ROOM_DROPS || !board.fits(side, &lowered) {
            break;
        }
        sim = lowered;
        drops += 1;
        plan.push(PlayerAction::SoftDrop);
    }

    let dx = placement.target_col - sim.col;
    let step = if dx < 0 {
        PlayerAction::MoveLeft
    } else {
        PlayerAction::MoveRight
    };
    for _ in 0..dx.unsigned_abs().min((MAX_PLAN_LEN - 1 - plan.len()) as u8) {
        plan.push(step);
    }

    plan.push(PlayerAction::HardDrop);
    plan
}
