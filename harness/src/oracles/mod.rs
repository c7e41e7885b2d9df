//! Scoring oracles for the bundled tasks.
//!
//! [`hanoi`] is a hand-written domain heuristic, [`table`] a fixed lookup,
//! and [`wire`] adapts any JSON request/response service.

pub mod hanoi;
pub mod table;
pub mod wire;
