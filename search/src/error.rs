//! Typed search errors.
//!
//! `SearchError` covers pre-flight failures and fatal adapter contract
//! violations. Oracle trouble never surfaces here: the guard turns it into a
//! degradation recorded in [`crate::trace::SearchTraceV1`], and the run
//! continues.

/// Which adapter callback was running when a panic was caught.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterStageV1 {
    GenerateActions,
    Apply,
    IsGoal,
}

impl AdapterStageV1 {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GenerateActions => "generate_actions",
            Self::Apply => "apply",
            Self::IsGoal => "is_goal",
        }
    }
}

/// A broken promise on the task adapter's side.
///
/// `node_id` names the node being expanded (for `InvalidAction` and
/// `Panicked`) or the candidate whose goal test flip-flopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterViolationV1 {
    /// `apply` rejected an action that `generate_actions` produced.
    InvalidAction { node_id: u64, detail: String },
    /// `is_goal` gave different answers for the same `(state, goal)`.
    NondeterministicGoal { node_id: u64 },
    /// An adapter callback panicked.
    Panicked { stage: AdapterStageV1, node_id: u64 },
}

impl std::fmt::Display for AdapterViolationV1 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAction { node_id, detail } => write!(
                f,
                "apply rejected a generated action while expanding node {node_id}: {detail}"
            ),
            Self::NondeterministicGoal { node_id } => write!(
                f,
                "is_goal returned different answers on re-check for node {node_id}"
            ),
            Self::Panicked { stage, node_id } => write!(
                f,
                "adapter panicked in {} while expanding node {node_id}",
                stage.as_str()
            ),
        }
    }
}

/// Typed failure for a search run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// A policy field is out of its valid range.
    InvalidPolicy { detail: String },
    /// The policy needs an oracle capability the oracle does not advertise.
    UnsupportedCapability { capability: &'static str },
    /// The task adapter broke its contract; the run was aborted.
    AdapterContractViolation(AdapterViolationV1),
    /// A state or policy could not be canonically encoded for the trace.
    StateEncoding { detail: String },
}

impl std::fmt::Display for SearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPolicy { detail } => write!(f, "invalid beam policy: {detail}"),
            Self::UnsupportedCapability { capability } => {
                write!(f, "policy requires oracle capability `{capability}`")
            }
            Self::AdapterContractViolation(v) => {
                write!(f, "task adapter contract violation: {v}")
            }
            Self::StateEncoding { detail } => {
                write!(f, "state is not canonically encodable: {detail}")
            }
        }
    }
}

impl std::error::Error for SearchError {}

impl From<AdapterViolationV1> for SearchError {
    fn from(v: AdapterViolationV1) -> Self {
        Self::AdapterContractViolation(v)
    }
}
