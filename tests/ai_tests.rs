//! Placement AI tests - target selection, hold decisions and full pilot runs

use rand::SeedableRng as _;
use rand_pcg::Pcg32;

use duel_tetris::ai::{find_best_placement, plan_inputs, AiPilot, AiTuning, PilotStep};
use duel_tetris::core::{Board, MatchState, Piece};
use duel_tetris::types::{Cell, MatchStatus, PieceKind, PlayerAction, Side, DIVIDER_ROW};

#[test]
fn test_o_piece_reaches_far_edge_on_empty_board() {
    let board = Board::new();
    for seed in 0..16 {
        let mut rng = Pcg32::seed_from_u64(seed);
        for side in Side::ALL {
            let piece = Piece::spawn(PieceKind::O, side);
            let placement = find_best_placement(
                &board,
                side,
                &piece,
                None,
                false,
                &AiTuning::STANDARD,
                &mut rng,
            );
            assert!(!placement.use_hold);

            let target = Piece {
                col: placement.target_col,
                ..Piece::spawn_rotated(PieceKind::O, placement.target_rotation, side)
            };
            assert!(board.fits(side, &target), "seed {seed} {side:?}");
            let landed = board.drop_position(side, &target);
            let rows = landed.cells().map(|(row, _)| row);
            match side {
                Side::A => assert!(rows.contains(&(DIVIDER_ROW as i8 - 1))),
                Side::B => assert!(rows.contains(&(DIVIDER_ROW as i8))),
            }
        }
    }
}

#[test]
fn test_hold_taken_when_held_piece_clears_more() {
    // A two-wide, four-deep well against the divider on B's half
    let mut board = Board::new();
    for row in DIVIDER_ROW as i8..DIVIDER_ROW as i8 + 4 {
        for col in (0..=3).chain(6..=9) {
            board.set(row, col, Cell::FilledB);
        }
    }
    let piece = Piece::spawn(PieceKind::O, Side::B);
    let mut rng = Pcg32::seed_from_u64(0);

    let placement = find_best_placement(
        &board,
        Side::B,
        &piece,
        Some(PieceKind::I),
        false,
        &AiTuning::PERFECT,
        &mut rng,
    );
    assert!(placement.use_hold);

    let plan = plan_inputs(&board, Side::B, &piece, &placement);
    assert_eq!(plan.as_slice(), &[PlayerAction::Hold]);

    // Hold is off the table once used for this piece
    let placement = find_best_placement(
        &board,
        Side::B,
        &piece,
        Some(PieceKind::I),
        true,
        &AiTuning::PERFECT,
        &mut rng,
    );
    assert!(!placement.use_hold);
}

#[test]
fn test_ai_duel_makes_progress() {
    let mut state = MatchState::new(99);
    state.start_match().unwrap();
    let mut pilots = Side::ALL.map(|side| {
        AiPilot::new(side, AiTuning::PERFECT, Pcg32::seed_from_u64(side.index() as u64 + 1))
    });

    for step in 0..1500 {
        if state.status() != MatchStatus::Playing {
            break;
        }
        for pilot in pilots.iter_mut() {
            if let PilotStep::Input(action) = pilot.step(&state) {
                state.apply_input(pilot.side(), action);
            }
        }
        if step % 4 == 3 {
            state.tick();
        }
    }

    let placed = state.player(Side::A).piece_id() + state.player(Side::B).piece_id();
    assert!(placed >= 16, "only {placed} pieces spawned");
}
