//! Placement AI for an unattended side.
//!
//! The AI only reads engine state. [`find_best_placement`] picks a target
//! rotation and column, [`plan_inputs`] turns that target into the same
//! discrete inputs a human would send, and [`AiPilot`] feeds them out one at
//! a time keyed on the active piece's identity.

pub use self::{pilot::*, placement::*, plan::*, tuning::*};

mod pilot;
mod placement;
mod plan;
mod tuning;
