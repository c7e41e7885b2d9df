//! Task adapter contract.

use std::fmt::Debug;
use std::hash::Hash;

use serde::Serialize;

/// Rejection from [`TaskAdapter::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// The action is not legal in the given state.
    InvalidAction { detail: String },
}

impl std::fmt::Display for ApplyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAction { detail } => write!(f, "invalid action: {detail}"),
        }
    }
}

impl std::error::Error for ApplyError {}

/// Domain mechanics for one problem: legal moves, transitions, goal test.
///
/// The engine treats states and actions as opaque. It only clones them,
/// hashes states for deduplication, and serializes states to fingerprint
/// them in the audit trace.
///
/// # Contract
///
/// - `generate_actions` is finite, side-effect-free, and deterministic. Its
///   order is the order used when ranking is disabled.
/// - `apply` is deterministic and accepts every action `generate_actions`
///   produced for the same state. Rejecting one aborts the run.
/// - `is_goal` is deterministic. A positive answer is re-checked once and a
///   different second answer aborts the run.
/// - No scoring or strategy lives here.
pub trait TaskAdapter: Sync {
    type State: Clone + Eq + Hash + Debug + Serialize + Send + Sync;
    type Action: Clone + Eq + Hash + Debug + Serialize + Send + Sync;
    type Goal: Sync;

    /// Stable identifier recorded in trace metadata.
    fn task_id(&self) -> &str;

    /// All legal actions from `state`.
    fn generate_actions(&self, state: &Self::State) -> Vec<Self::Action>;

    /// Apply `action` to `state`.
    ///
    /// # Errors
    ///
    /// [`ApplyError::InvalidAction`] if `action` is not legal in `state`.
    fn apply(&self, state: &Self::State, action: &Self::Action)
        -> Result<Self::State, ApplyError>;

    /// Whether `state` satisfies `goal`.
    fn is_goal(&self, state: &Self::State, goal: &Self::Goal) -> bool;
}
