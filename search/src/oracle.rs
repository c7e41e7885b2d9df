//! Scoring oracle contract and built-in oracles.

use crate::context::{OracleContext, RankRequest};

/// Provenance tag for a node's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreSourceV1 {
    /// Accepted from the oracle after validation.
    Oracle,
    /// Neutral value substituted after an oracle failure.
    Fallback,
    /// Not scored (root, goal node, or evaluation disabled).
    Unscored,
}

impl ScoreSourceV1 {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Oracle => "oracle",
            Self::Fallback => "fallback",
            Self::Unscored => "unscored",
        }
    }
}

/// Failure reported by an oracle implementation.
///
/// `Timeout` and `Transient` are retried by the guard. The rest degrade
/// immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    Timeout { elapsed_ms: u64 },
    Transient { detail: String },
    /// The oracle's response could not be decoded into the typed result.
    Malformed { detail: String },
    /// The oracle refused the request permanently.
    Rejected { detail: String },
    Unsupported { capability: &'static str },
}

impl OracleError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transient { .. })
    }
}

impl std::fmt::Display for OracleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout { elapsed_ms } => write!(f, "oracle timed out after {elapsed_ms} ms"),
            Self::Transient { detail } => write!(f, "transient oracle failure: {detail}"),
            Self::Malformed { detail } => write!(f, "malformed oracle response: {detail}"),
            Self::Rejected { detail } => write!(f, "oracle rejected request: {detail}"),
            Self::Unsupported { capability } => {
                write!(f, "oracle does not support {capability}")
            }
        }
    }
}

impl std::error::Error for OracleError {}

/// External judge of state promise and action preference.
///
/// Implementations are stateless from the engine's point of view: no call may
/// depend on earlier calls in the same run except through its arguments.
///
/// # Contract
///
/// - `evaluate_batch` returns exactly one score per input state, in input
///   order, each in `[0, 1]` (1.0 goal-equivalent, 0.0 hopeless).
/// - `rank_actions` returns a permutation of `actions`, most preferred first.
/// - `rank_batch` returns one such permutation per request, in request order.
/// - The `*_with_context` variants follow the same contracts. The engine
///   always calls those; their defaults drop the context and delegate.
///
/// Violations are caught by [`crate::guard::GuardedOracle`] and degrade the
/// affected batch. They never reach beam ordering.
pub trait ScoringOracle<S, A, G>: Send + Sync {
    /// Identifier recorded in trace metadata.
    fn oracle_id(&self) -> &str;

    /// Score a batch of states against `goal`.
    ///
    /// # Errors
    ///
    /// Any [`OracleError`]; transient ones are retried by the guard.
    fn evaluate_batch(&self, states: &[S], goal: &G) -> Result<Vec<f64>, OracleError>;

    /// Order `actions` from `state` by descending preference.
    ///
    /// # Errors
    ///
    /// The default implementation returns [`OracleError::Unsupported`].
    fn rank_actions(&self, state: &S, actions: &[A], goal: &G) -> Result<Vec<A>, OracleError> {
        let _ = (state, actions, goal);
        Err(OracleError::Unsupported {
            capability: "rank_actions",
        })
    }

    /// [`Self::evaluate_batch`] with one [`OracleContext`] per state.
    ///
    /// # Errors
    ///
    /// As [`Self::evaluate_batch`].
    fn evaluate_with_context(
        &self,
        states: &[S],
        contexts: &[OracleContext<'_, A>],
        goal: &G,
    ) -> Result<Vec<f64>, OracleError> {
        let _ = contexts;
        self.evaluate_batch(states, goal)
    }

    /// [`Self::rank_actions`] with the state's [`OracleContext`].
    ///
    /// # Errors
    ///
    /// As [`Self::rank_actions`].
    fn rank_with_context(
        &self,
        state: &S,
        actions: &[A],
        context: &OracleContext<'_, A>,
        goal: &G,
    ) -> Result<Vec<A>, OracleError> {
        let _ = context;
        self.rank_actions(state, actions, goal)
    }

    /// Rank the actions of several states in one call.
    ///
    /// # Errors
    ///
    /// The default implementation returns [`OracleError::Unsupported`].
    fn rank_batch(
        &self,
        requests: &[RankRequest<'_, S, A>],
        goal: &G,
    ) -> Result<Vec<Vec<A>>, OracleError> {
        let _ = (requests, goal);
        Err(OracleError::Unsupported {
            capability: "rank_batch",
        })
    }

    fn supports_evaluation(&self) -> bool {
        true
    }

    fn supports_ranking(&self) -> bool {
        false
    }

    fn supports_batch_ranking(&self) -> bool {
        false
    }
}

/// Scores every state identically. With `0.0` this is the zero-signal oracle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformOracle {
    pub score: f64,
}

impl Default for UniformOracle {
    fn default() -> Self {
        Self { score: 0.5 }
    }
}

impl<S, A, G> ScoringOracle<S, A, G> for UniformOracle {
    fn oracle_id(&self) -> &str {
        "uniform"
    }

    fn evaluate_batch(&self, states: &[S], _goal: &G) -> Result<Vec<f64>, OracleError> {
        Ok(vec![self.score; states.len()])
    }
}

/// Scores 1.0 for a state equal to the goal and 0.0 for everything else.
///
/// Requires the goal to be a state (`G = S`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatchOracle;

impl<S: PartialEq, A> ScoringOracle<S, A, S> for ExactMatchOracle {
    fn oracle_id(&self) -> &str {
        "exact_match"
    }

    fn evaluate_batch(&self, states: &[S], goal: &S) -> Result<Vec<f64>, OracleError> {
        Ok(states
            .iter()
            .map(|s| if s == goal { 1.0 } else { 0.0 })
            .collect())
    }
}
