//! Concrete task adapters.
//!
//! Each module is pure domain mechanics: legal moves, transitions, goal
//! test. Nothing here knows about scores or beams.

pub mod blocks_world;
pub mod checker_jumping;
pub mod graph;
pub mod hanoi;
