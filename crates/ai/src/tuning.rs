/// Heuristic weights and imperfection rates used by the placement search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AiTuning {
    /// Reward per segment the placement would make clearable
    pub clear_reward: f32,
    /// Reward per cell of depth from the side's own spawn edge
    pub depth_bias: f32,
    /// Penalty per enclosed hole
    pub hole_penalty: f32,
    /// Penalty per unit of surface bumpiness
    pub bumpiness_penalty: f32,
    /// Penalty per piece cell landing within [`AiTuning::danger_rows`] of the spawn edge
    pub spawn_danger_penalty: f32,
    pub danger_rows: usize,
    /// Score lead the held piece needs before the AI swaps to it
    pub hold_margin: f32,
    /// Chance of picking uniformly from the worse half of placements
    pub mistake_rate: f64,
    /// Chance of picking the runner-up when not making a mistake
    pub second_best_rate: f64,
}

impl AiTuning {
    pub const STANDARD: Self = Self {
        clear_reward: 100.0,
        depth_bias: 0.5,
        hole_penalty: 15.0,
        bumpiness_penalty: 3.0,
        spawn_danger_penalty: 20.0,
        danger_rows: 3,
        hold_margin: 15.0,
        mistake_rate: 0.30,
        second_best_rate: 0.30,
    };

    /// Same heuristic with imperfection disabled; always takes the best placement
    pub const PERFECT: Self = Self {
        mistake_rate: 0.0,
        second_best_rate: 0.0,
        ..Self::STANDARD
    };
}

impl Default for AiTuning {
    fn default() -> Self {
        Self::STANDARD
    }
}
