//! RNG module - seeded 7-bag piece generation
//!
//! Each bag contains one of each piece (I, O, T, S, Z, J, L), shuffled with a
//! seeded PCG generator. The queue is topped up with a fresh bag whenever it
//! runs low, so two queues built from the same seed always deal the same
//! sequence.

use std::collections::VecDeque;

use rand::{seq::SliceRandom, SeedableRng as _};
use rand_pcg::Pcg32;

use crate::types::{PieceKind, PREVIEW_LEN};

/// 7-bag piece generator
#[derive(Debug, Clone)]
pub struct PieceQueue {
    rng: Pcg32,
    queue: VecDeque<PieceKind>,
    seed: u64,
}

impl PieceQueue {
    /// Create a new piece queue with the given seed
    pub fn new(seed: u64) -> Self {
        let mut this = Self {
            rng: Pcg32::seed_from_u64(seed),
            queue: VecDeque::with_capacity(PieceKind::ALL.len() * 2),
            seed,
        };
        this.refill();
        this
    }

    /// Append shuffled bags until more than one bag's worth is queued,
    /// keeping the preview window always populated.
    fn refill(&mut self) {
        while self.queue.len() <= PieceKind::ALL.len() {
            let mut bag = PieceKind::ALL;
            bag.shuffle(&mut self.rng);
            self.queue.extend(bag);
        }
    }

    /// Peek at the next piece without removing it
    pub fn peek(&self) -> PieceKind {
        self.queue[0]
    }

    /// Upcoming pieces, next first
    pub fn preview(&self) -> [PieceKind; PREVIEW_LEN] {
        std::array::from_fn(|i| self.queue[i])
    }

    /// Draw the next piece from the queue
    pub fn draw(&mut self) -> PieceKind {
        let piece = self.queue.pop_front().unwrap_or(PieceKind::I);
        self.refill();
        piece
    }

    /// Seed this queue was created with
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Default for PieceQueue {
    fn default() -> Self {
        Self::new(1)
    }
}
