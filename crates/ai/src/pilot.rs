use std::collections::VecDeque;

use duel_tetris_core::types::{MatchStatus, PlayerAction, Side};
use duel_tetris_core::MatchState;
use rand::Rng;

use crate::{find_best_placement, plan_inputs, AiTuning};

/// Where the pilot is with respect to the current piece
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PilotPhase {
    /// No piece to drive
    Idle,
    /// A new piece was seen; the next step computes its plan
    Planning { piece_id: u32 },
    /// Feeding out the plan for `piece_id`
    Executing {
        piece_id: u32,
        moves: VecDeque<PlayerAction>,
    },
}

/// What a single pilot step did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PilotStep {
    Idle,
    /// A plan of this many inputs was queued; nothing was applied
    Planned(usize),
    /// This input should be applied through the normal input path
    Input(PlayerAction),
}

/// Drives one side of a match, one input per step
#[derive(Debug, Clone)]
pub struct AiPilot<R> {
    side: Side,
    tuning: AiTuning,
    rng: R,
    phase: PilotPhase,
}

impl<R: Rng> AiPilot<R> {
    pub fn new(side: Side, tuning: AiTuning, rng: R) -> Self {
        Self {
            side,
            tuning,
            rng,
            phase: PilotPhase::Idle,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn phase(&self) -> &PilotPhase {
        &self.phase
    }

    /// Drop any queued plan
    pub fn reset(&mut self) {
        self.phase = PilotPhase::Idle;
    }

    /// Advance the pilot against the current match state.
    ///
    /// Queued moves belong to the piece id they were planned for; once the
    /// side's piece id changes the queue is discarded and a new plan is made.
    pub fn step(&mut self, state: &MatchState) -> PilotStep {
        let player = state.player(self.side);
        let Some(piece) = player.active().filter(|_| state.status() == MatchStatus::Playing) else {
            self.phase = PilotPhase::Idle;
            return PilotStep::Idle;
        };
        let current_id = player.piece_id();

        let stale = match &self.phase {
            PilotPhase::Idle => true,
            PilotPhase::Planning { piece_id } | PilotPhase::Executing { piece_id, .. } => {
                *piece_id != current_id
            }
        };
        if stale {
            self.phase = PilotPhase::Planning {
                piece_id: current_id,
            };
        }

        if let PilotPhase::Executing { moves, .. } = &mut self.phase {
            if let Some(action) = moves.pop_front() {
                return PilotStep::Input(action);
            }
        }

        let placement = find_best_placement(
            state.board(),
            self.side,
            &piece,
            player.hold_piece(),
            !player.can_hold(),
            &self.tuning,
            &mut self.rng,
        );
        let moves: VecDeque<PlayerAction> =
            plan_inputs(state.board(), self.side, &piece, &placement).into_iter().collect();
        let planned = moves.len();
        self.phase = PilotPhase::Executing {
            piece_id: current_id,
            moves,
        };
        PilotStep::Planned(planned)
    }
}
