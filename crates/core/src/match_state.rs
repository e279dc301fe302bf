//! Match state module - the two-player simulation
//!
//! Ties together the board, both players' pieces and their bag queues. All
//! mutation goes through [`MatchState::start_match`], [`MatchState::apply_input`]
//! and [`MatchState::tick`]; each returns an outcome describing what changed so
//! the orchestrator can derive broadcasts from it.

use thiserror::Error;

use crate::board::{Board, ClearEvent};
use crate::pieces::{try_rotate, Piece};
use crate::rng::PieceQueue;
use crate::snapshot::{MatchSnapshot, PlayerSnapshot};
use crate::types::{MatchStatus, PieceKind, PlayerAction, Side};

/// Failure to start a match from its current status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("match already started")]
    AlreadyStarted,
    #[error("match is finished")]
    Finished,
}

/// Per-side state
#[derive(Debug, Clone)]
pub struct PlayerState {
    active: Option<Piece>,
    hold: Option<PieceKind>,
    can_hold: bool,
    queue: PieceQueue,
    /// Number of segments this side has cleared
    cleared_segments: u32,
    /// Monotonic id of the active piece instance (bumped on every spawn and hold swap)
    piece_id: u32,
}

impl PlayerState {
    pub fn new(seed: u64) -> Self {
        Self {
            active: None,
            hold: None,
            can_hold: true,
            queue: PieceQueue::new(seed),
            cleared_segments: 0,
            piece_id: 0,
        }
    }

    pub fn active(&self) -> Option<Piece> {
        self.active
    }

    pub fn hold_piece(&self) -> Option<PieceKind> {
        self.hold
    }

    pub fn can_hold(&self) -> bool {
        self.can_hold
    }

    pub fn next_piece(&self) -> PieceKind {
        self.queue.peek()
    }

    pub fn cleared_segments(&self) -> u32 {
        self.cleared_segments
    }

    pub fn piece_id(&self) -> u32 {
        self.piece_id
    }

    pub fn queue(&self) -> &PieceQueue {
        &self.queue
    }
}

/// Result of a single player input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputOutcome {
    pub changed: bool,
    pub clear: Option<ClearEvent>,
    pub winner: Option<Side>,
}

/// Result of one gravity tick over both sides
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub changed: bool,
    pub clears: Vec<ClearEvent>,
    pub winner: Option<Side>,
}

/// Complete match state
#[derive(Debug, Clone)]
pub struct MatchState {
    board: Board,
    players: [PlayerState; 2],
    status: MatchStatus,
    winner: Option<Side>,
    seed: u64,
}

impl MatchState {
    /// Create a waiting match on an empty board. Both bags share `seed`.
    pub fn new(seed: u64) -> Self {
        Self::with_board(seed, Board::new())
    }

    /// Create a waiting match on a prepared board
    pub fn with_board(seed: u64, board: Board) -> Self {
        Self {
            board,
            players: [PlayerState::new(seed), PlayerState::new(seed)],
            status: MatchStatus::Waiting,
            winner: None,
            seed,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn player(&self, side: Side) -> &PlayerState {
        &self.players[side.index()]
    }

    fn player_mut(&mut self, side: Side) -> &mut PlayerState {
        &mut self.players[side.index()]
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    pub fn winner(&self) -> Option<Side> {
        self.winner
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Enter the countdown phase. Only valid from waiting.
    pub fn begin_countdown(&mut self) -> bool {
        if self.status != MatchStatus::Waiting {
            return false;
        }
        self.status = MatchStatus::Countdown;
        true
    }

    /// End the match with `winner`, regardless of board state
    pub fn finish(&mut self, winner: Side) {
        self.status = MatchStatus::Finished;
        self.winner = Some(winner);
    }

    /// Spawn both sides' first pieces and start playing.
    ///
    /// A side whose spawn is already blocked loses on the spot, so the match
    /// can be finished when this returns.
    pub fn start_match(&mut self) -> Result<(), MatchError> {
        match self.status {
            MatchStatus::Waiting | MatchStatus::Countdown => {}
            MatchStatus::Playing => return Err(MatchError::AlreadyStarted),
            MatchStatus::Finished => return Err(MatchError::Finished),
        }
        self.status = MatchStatus::Playing;

        for side in Side::ALL {
            if !self.spawn_next(side) {
                self.finish(side.opponent());
                break;
            }
        }
        Ok(())
    }

    /// Draw the next queued piece for `side` and place it at the home edge.
    /// Returns false, leaving no active piece, when the spawn is blocked.
    fn spawn_next(&mut self, side: Side) -> bool {
        let kind = self.player_mut(side).queue.draw();
        self.player_mut(side).can_hold = true;
        self.place_spawn(side, kind)
    }

    fn place_spawn(&mut self, side: Side, kind: PieceKind) -> bool {
        let piece = Piece::spawn(kind, side);
        let fits = self.board.fits(side, &piece);
        let player = self.player_mut(side);
        player.piece_id = player.piece_id.wrapping_add(1);
        player.active = fits.then_some(piece);
        fits
    }

    /// Apply one player input.
    ///
    /// Illegal or mistimed inputs are no-ops reported as `changed == false`.
    pub fn apply_input(&mut self, side: Side, action: PlayerAction) -> InputOutcome {
        if self.status != MatchStatus::Playing {
            return InputOutcome::default();
        }
        let Some(piece) = self.player(side).active else {
            return InputOutcome::default();
        };

        match action {
            PlayerAction::MoveLeft => self.try_place(side, piece.shifted(0, -1)),
            PlayerAction::MoveRight => self.try_place(side, piece.shifted(0, 1)),
            PlayerAction::RotateCw | PlayerAction::RotateCcw => {
                let clockwise = action == PlayerAction::RotateCw;
                match try_rotate(&piece, clockwise, |p| self.board.fits(side, p)) {
                    // Single-state shapes come back unchanged
                    Some(rotated) if rotated != piece => self.try_place(side, rotated),
                    _ => InputOutcome::default(),
                }
            }
            PlayerAction::SoftDrop => self.advance_or_lock(side),
            PlayerAction::HardDrop => {
                let landed = self.board.drop_position(side, &piece);
                self.player_mut(side).active = Some(landed);
                self.lock_active(side)
            }
            PlayerAction::Hold => self.hold(side),
        }
    }

    fn try_place(&mut self, side: Side, candidate: Piece) -> InputOutcome {
        if !self.board.fits(side, &candidate) {
            return InputOutcome::default();
        }
        self.player_mut(side).active = Some(candidate);
        InputOutcome {
            changed: true,
            ..InputOutcome::default()
        }
    }

    /// Move one step towards `side`'s fall direction, locking in place when blocked
    fn advance_or_lock(&mut self, side: Side) -> InputOutcome {
        let Some(piece) = self.player(side).active else {
            return InputOutcome::default();
        };
        let next = piece.shifted(side.fall_step(), 0);
        if self.board.fits(side, &next) {
            self.player_mut(side).active = Some(next);
            return InputOutcome {
                changed: true,
                ..InputOutcome::default()
            };
        }
        self.lock_active(side)
    }

    /// Lock the active piece, resolve clears, then respawn or lose
    fn lock_active(&mut self, side: Side) -> InputOutcome {
        let Some(piece) = self.player_mut(side).active.take() else {
            return InputOutcome::default();
        };
        self.board.lock_piece(side, &piece);

        let clear = self.board.resolve_clears(side);
        if let Some(event) = clear.as_ref() {
            self.player_mut(side).cleared_segments += event.segments.len() as u32;
        }

        let mut winner = None;
        if !self.spawn_next(side) {
            self.finish(side.opponent());
            winner = Some(side.opponent());
        }

        InputOutcome {
            changed: true,
            clear,
            winner,
        }
    }

    /// Swap the active piece with the held one, once per piece
    fn hold(&mut self, side: Side) -> InputOutcome {
        let player = self.player(side);
        if !player.can_hold {
            return InputOutcome::default();
        }
        let Some(current) = player.active else {
            return InputOutcome::default();
        };

        let previous = self.player_mut(side).hold.replace(current.kind);
        let spawned = match previous {
            Some(kind) => self.place_spawn(side, kind),
            None => self.spawn_next(side),
        };
        self.player_mut(side).can_hold = false;

        let mut winner = None;
        if !spawned {
            self.finish(side.opponent());
            winner = Some(side.opponent());
        }
        InputOutcome {
            changed: true,
            clear: None,
            winner,
        }
    }

    /// One gravity step for both sides, A first.
    ///
    /// If A's step ends the match, B's step for this tick is skipped.
    pub fn tick(&mut self) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        if self.status != MatchStatus::Playing {
            return outcome;
        }

        for side in Side::ALL {
            let step = self.advance_or_lock(side);
            outcome.changed |= step.changed;
            outcome.clears.extend(step.clear);
            if step.winner.is_some() {
                outcome.winner = step.winner;
                break;
            }
        }
        outcome
    }

    /// Deep, read-only copy of the state for transmission
    pub fn public_state(&self) -> MatchSnapshot {
        MatchSnapshot {
            board: self.board.to_rows(),
            players: Side::ALL.map(|side| PlayerSnapshot::from(self.player(side))),
            status: self.status,
            winner: self.winner,
            seed: self.seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cell, BOARD_WIDTH, DIVIDER_ROW};

    fn started(seed: u64) -> MatchState {
        let mut state = MatchState::new(seed);
        state.start_match().unwrap();
        state
    }

    #[test]
    fn start_spawns_both_sides() {
        let state = started(1);
        assert_eq!(state.status(), MatchStatus::Playing);
        assert!(state.player(Side::A).active().is_some());
        assert!(state.player(Side::B).active().is_some());
        assert_eq!(state.player(Side::A).piece_id(), 1);
    }

    #[test]
    fn start_twice_is_rejected() {
        let mut state = started(1);
        assert_eq!(state.start_match(), Err(MatchError::AlreadyStarted));
    }

    #[test]
    fn both_sides_share_a_sequence() {
        let state = started(42);
        let a = state.player(Side::A).active().unwrap().kind;
        let b = state.player(Side::B).active().unwrap().kind;
        assert_eq!(a, b);
        assert_eq!(state.player(Side::A).next_piece(), state.player(Side::B).next_piece());
    }

    #[test]
    fn inputs_ignored_before_start() {
        let mut state = MatchState::new(1);
        let out = state.apply_input(Side::A, PlayerAction::MoveLeft);
        assert!(!out.changed);
    }

    #[test]
    fn soft_drop_moves_each_side_its_own_way() {
        let mut state = started(5);
        let a0 = state.player(Side::A).active().unwrap();
        let b0 = state.player(Side::B).active().unwrap();

        assert!(state.apply_input(Side::A, PlayerAction::SoftDrop).changed);
        assert!(state.apply_input(Side::B, PlayerAction::SoftDrop).changed);

        assert_eq!(state.player(Side::A).active().unwrap().row, a0.row + 1);
        assert_eq!(state.player(Side::B).active().unwrap().row, b0.row - 1);
    }

    #[test]
    fn move_into_wall_is_a_noop() {
        let mut state = started(9);
        for _ in 0..BOARD_WIDTH {
            state.apply_input(Side::A, PlayerAction::MoveLeft);
        }
        let before = state.player(Side::A).active();
        let out = state.apply_input(Side::A, PlayerAction::MoveLeft);
        assert!(!out.changed);
        assert_eq!(state.player(Side::A).active(), before);
    }

    #[test]
    fn hard_drop_locks_above_divider_and_respawns() {
        let mut state = started(3);
        let first_id = state.player(Side::A).piece_id();
        let out = state.apply_input(Side::A, PlayerAction::HardDrop);
        assert!(out.changed);
        assert!(out.winner.is_none());
        assert_eq!(state.player(Side::A).piece_id(), first_id + 1);

        let locked = state.board().row_cells(DIVIDER_ROW - 1);
        assert!(locked.contains(&Cell::FilledA));
        assert!(!state.board().row_cells(DIVIDER_ROW).contains(&Cell::FilledA));
    }

    #[test]
    fn hold_swaps_once_per_piece() {
        let mut state = started(11);
        let first = state.player(Side::B).active().unwrap().kind;
        let next = state.player(Side::B).next_piece();

        assert!(state.apply_input(Side::B, PlayerAction::Hold).changed);
        assert_eq!(state.player(Side::B).hold_piece(), Some(first));
        assert_eq!(state.player(Side::B).active().unwrap().kind, next);

        assert!(!state.apply_input(Side::B, PlayerAction::Hold).changed);

        state.apply_input(Side::B, PlayerAction::HardDrop);
        assert!(state.player(Side::B).can_hold());
        assert!(state.apply_input(Side::B, PlayerAction::Hold).changed);
        assert_eq!(state.player(Side::B).active().unwrap().kind, first);
    }

    #[test]
    fn tick_advances_both_sides() {
        let mut state = started(2);
        let a0 = state.player(Side::A).active().unwrap();
        let b0 = state.player(Side::B).active().unwrap();
        let out = state.tick();
        assert!(out.changed);
        assert_eq!(state.player(Side::A).active().unwrap().row, a0.row + 1);
        assert_eq!(state.player(Side::B).active().unwrap().row, b0.row - 1);
    }

    #[test]
    fn tick_is_noop_when_finished() {
        let mut state = started(2);
        state.finish(Side::B);
        let before = state.public_state();
        let out = state.tick();
        assert!(!out.changed);
        assert_eq!(state.public_state(), before);
    }
}
