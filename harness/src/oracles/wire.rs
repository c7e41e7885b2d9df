//! JSON request/response oracle.
//!
//! [`JsonOracle`] turns oracle calls into JSON exchanges over an
//! [`OracleTransport`] (an HTTP client, a subprocess, an in-memory stub).
//! The transport moves bytes; this module owns the record shapes and the
//! mapping of transport and decoding failures onto [`OracleError`].
//!
//! # Records
//!
//! Every request carries `task_description` and `goal`, plus for each state
//! its action path (`action_histories`) and the trimmed scores of its
//! ancestors (`evaluation_histories`, `{ node_id, depth, score }`).
//!
//! - [`EvaluateRequestV1`] (`oracle_evaluate.v1`) answered by
//!   [`EvaluateResponseV1`]: `{ state_scores, reasoning?, best_state_index?,
//!   individual_reasoning? }`.
//! - [`RankRequestV1`] (`oracle_rank.v1`) answered by [`RankResponseV1`]:
//!   `{ ranked_actions, strategy_explanation? }`.
//! - [`BatchRankRequestV1`] (`oracle_rank_batch.v1`) answered by
//!   [`BatchRankResponseV1`]: `{ state_rankings, strategy_explanation? }`.
//!
//! Ranked actions must equal one of the request's serialized actions.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use beamline_search::context::{EvaluationRecordV1, OracleContext, RankRequest};
use beamline_search::oracle::{OracleError, ScoringOracle};

/// Schema tag of an evaluation request.
pub const EVALUATE_SCHEMA_VERSION: &str = "oracle_evaluate.v1";

/// Schema tag of a ranking request.
pub const RANK_SCHEMA_VERSION: &str = "oracle_rank.v1";

/// Schema tag of a batched ranking request.
pub const RANK_BATCH_SCHEMA_VERSION: &str = "oracle_rank_batch.v1";

/// Task description sent when none is configured.
pub const DEFAULT_TASK_DESCRIPTION: &str = "Generic puzzle game";

/// Failure moving a request or response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No response within the deadline.
    Timeout { elapsed_ms: u64 },
    /// Connection-level failure worth retrying.
    Connection { detail: String },
    /// The peer answered but refused the request.
    Refused { detail: String },
    /// The peer answered with something that is not a response record.
    Protocol { detail: String },
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout { elapsed_ms } => write!(f, "transport timeout after {elapsed_ms} ms"),
            Self::Connection { detail } => write!(f, "connection failure: {detail}"),
            Self::Refused { detail } => write!(f, "request refused: {detail}"),
            Self::Protocol { detail } => write!(f, "protocol error: {detail}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<TransportError> for OracleError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout { elapsed_ms } => OracleError::Timeout { elapsed_ms },
            TransportError::Connection { detail } => OracleError::Transient { detail },
            TransportError::Refused { detail } => OracleError::Rejected { detail },
            TransportError::Protocol { detail } => OracleError::Malformed { detail },
        }
    }
}

/// One request/response exchange with an external scorer.
pub trait OracleTransport: Send + Sync {
    /// Send `request` and wait for the response.
    ///
    /// # Errors
    ///
    /// [`TransportError`] on any failure to obtain a response value.
    fn exchange(&self, request: &Value, timeout: Option<Duration>)
        -> Result<Value, TransportError>;
}

/// Transport backed by a closure. Useful for in-process services and tests.
pub struct FnTransport<F>(F);

impl<F> FnTransport<F>
where
    F: Fn(&Value) -> Result<Value, TransportError> + Send + Sync,
{
    #[must_use]
    pub fn new(respond: F) -> Self {
        Self(respond)
    }
}

impl<F> OracleTransport for FnTransport<F>
where
    F: Fn(&Value) -> Result<Value, TransportError> + Send + Sync,
{
    fn exchange(
        &self,
        request: &Value,
        _timeout: Option<Duration>,
    ) -> Result<Value, TransportError> {
        (self.0)(request)
    }
}

/// One ancestor score as sent on the wire.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HistoryEntryV1 {
    pub node_id: u64,
    pub depth: u32,
    pub score: f64,
}

impl From<&EvaluationRecordV1> for HistoryEntryV1 {
    fn from(record: &EvaluationRecordV1) -> Self {
        Self {
            node_id: record.node_id,
            depth: record.depth,
            score: record.score.value(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EvaluateRequestV1 {
    pub schema_version: String,
    pub task_description: String,
    pub goal: Value,
    pub states: Vec<Value>,
    /// Per state: actions from the root.
    pub action_histories: Vec<Vec<Value>>,
    /// Per state: accepted ancestor scores, root first.
    pub evaluation_histories: Vec<Vec<HistoryEntryV1>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EvaluateResponseV1 {
    pub state_scores: Vec<f64>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub best_state_index: Option<usize>,
    #[serde(default)]
    pub individual_reasoning: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RankRequestV1 {
    pub schema_version: String,
    pub task_description: String,
    pub goal: Value,
    pub state: Value,
    pub actions: Vec<Value>,
    pub action_history: Vec<Value>,
    /// Accepted scores along the path, the ranked state's own included.
    pub evaluation_history: Vec<HistoryEntryV1>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RankResponseV1 {
    pub ranked_actions: Vec<Value>,
    #[serde(default)]
    pub strategy_explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BatchRankRequestV1 {
    pub schema_version: String,
    pub task_description: String,
    pub goal: Value,
    pub states: Vec<Value>,
    pub valid_actions_per_state: Vec<Vec<Value>>,
    pub action_histories: Vec<Vec<Value>>,
    pub evaluation_histories: Vec<Vec<HistoryEntryV1>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BatchRankResponseV1 {
    /// One ordering per requested state, in request order.
    pub state_rankings: Vec<Vec<Value>>,
    #[serde(default)]
    pub strategy_explanation: Option<String>,
}

/// Oracle speaking the `oracle_*.v1` records over a transport.
pub struct JsonOracle<T> {
    oracle_id: String,
    transport: T,
    task_description: String,
    timeout: Option<Duration>,
    ranking: bool,
    batch_ranking: bool,
}

impl<T: OracleTransport> JsonOracle<T> {
    /// Evaluation only; ranking is off until [`Self::with_ranking`] or
    /// [`Self::with_batch_ranking`].
    #[must_use]
    pub fn new(oracle_id: impl Into<String>, transport: T) -> Self {
        Self {
            oracle_id: oracle_id.into(),
            transport,
            task_description: DEFAULT_TASK_DESCRIPTION.to_string(),
            timeout: None,
            ranking: false,
            batch_ranking: false,
        }
    }

    #[must_use]
    pub fn with_ranking(mut self) -> Self {
        self.ranking = true;
        self
    }

    /// Accept `oracle_rank_batch.v1` requests as well as per-state ones.
    #[must_use]
    pub fn with_batch_ranking(mut self) -> Self {
        self.ranking = true;
        self.batch_ranking = true;
        self
    }

    /// Free-text description of the task, sent with every request.
    #[must_use]
    pub fn with_task_description(mut self, description: impl Into<String>) -> Self {
        self.task_description = description.into();
        self
    }

    /// Deadline handed to the transport on every exchange.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn task_description(&self) -> &str {
        &self.task_description
    }

    fn exchange<Q: Serialize, R: DeserializeOwned>(&self, request: &Q) -> Result<R, OracleError> {
        let request = encode("request", request)?;
        let response = self.transport.exchange(&request, self.timeout)?;
        serde_json::from_value(response).map_err(|e| OracleError::Malformed {
            detail: e.to_string(),
        })
    }
}

fn encode<V: Serialize + ?Sized>(what: &str, value: &V) -> Result<Value, OracleError> {
    serde_json::to_value(value).map_err(|e| OracleError::Rejected {
        detail: format!("cannot encode {what}: {e}"),
    })
}

fn encode_each<V: Serialize>(what: &str, values: &[V]) -> Result<Vec<Value>, OracleError> {
    values.iter().map(|v| encode(what, v)).collect()
}

fn wire_history(history: &[EvaluationRecordV1]) -> Vec<HistoryEntryV1> {
    history.iter().map(HistoryEntryV1::from).collect()
}

/// Map serialized rankings back onto the caller's actions. Completeness is
/// the guard's concern; unknown values are rejected here.
fn match_ranking<A: Clone>(
    ranked: &[Value],
    encoded: &[Value],
    actions: &[A],
) -> Result<Vec<A>, OracleError> {
    ranked
        .iter()
        .map(|value| {
            encoded
                .iter()
                .position(|candidate| candidate == value)
                .map(|i| actions[i].clone())
                .ok_or_else(|| OracleError::Malformed {
                    detail: format!("ranked action {value} is not a candidate"),
                })
        })
        .collect()
}

impl<T, S, A, G> ScoringOracle<S, A, G> for JsonOracle<T>
where
    T: OracleTransport,
    S: Serialize,
    A: Serialize + Clone,
    G: Serialize,
{
    fn oracle_id(&self) -> &str {
        &self.oracle_id
    }

    fn evaluate_batch(&self, states: &[S], goal: &G) -> Result<Vec<f64>, OracleError> {
        let contexts: Vec<OracleContext<'_, A>> = vec![OracleContext::empty(); states.len()];
        <Self as ScoringOracle<S, A, G>>::evaluate_with_context(self, states, &contexts, goal)
    }

    fn evaluate_with_context(
        &self,
        states: &[S],
        contexts: &[OracleContext<'_, A>],
        goal: &G,
    ) -> Result<Vec<f64>, OracleError> {
        let request = EvaluateRequestV1 {
            schema_version: EVALUATE_SCHEMA_VERSION.to_string(),
            task_description: self.task_description.clone(),
            goal: encode("goal", goal)?,
            states: encode_each("state", states)?,
            action_histories: contexts
                .iter()
                .map(|c| encode_each("action", c.path))
                .collect::<Result<_, _>>()?,
            evaluation_histories: contexts.iter().map(|c| wire_history(c.history)).collect(),
        };
        let response: EvaluateResponseV1 = self.exchange(&request)?;
        if let Some(best) = response.best_state_index {
            if best >= response.state_scores.len() {
                return Err(OracleError::Malformed {
                    detail: format!(
                        "best_state_index {best} outside {} scores",
                        response.state_scores.len()
                    ),
                });
            }
        }
        Ok(response.state_scores)
    }

    fn rank_actions(&self, state: &S, actions: &[A], goal: &G) -> Result<Vec<A>, OracleError> {
        <Self as ScoringOracle<S, A, G>>::rank_with_context(
            self,
            state,
            actions,
            &OracleContext::empty(),
            goal,
        )
    }

    fn rank_with_context(
        &self,
        state: &S,
        actions: &[A],
        context: &OracleContext<'_, A>,
        goal: &G,
    ) -> Result<Vec<A>, OracleError> {
        if !self.ranking {
            return Err(OracleError::Unsupported {
                capability: "rank_actions",
            });
        }
        let encoded = encode_each("action", actions)?;
        let request = RankRequestV1 {
            schema_version: RANK_SCHEMA_VERSION.to_string(),
            task_description: self.task_description.clone(),
            goal: encode("goal", goal)?,
            state: encode("state", state)?,
            actions: encoded.clone(),
            action_history: encode_each("action", context.path)?,
            evaluation_history: wire_history(context.history),
        };
        let response: RankResponseV1 = self.exchange(&request)?;
        match_ranking(&response.ranked_actions, &encoded, actions)
    }

    fn rank_batch(
        &self,
        requests: &[RankRequest<'_, S, A>],
        goal: &G,
    ) -> Result<Vec<Vec<A>>, OracleError> {
        if !self.batch_ranking {
            return Err(OracleError::Unsupported {
                capability: "rank_batch",
            });
        }
        let encoded: Vec<Vec<Value>> = requests
            .iter()
            .map(|r| encode_each("action", r.actions))
            .collect::<Result<_, _>>()?;
        let request = BatchRankRequestV1 {
            schema_version: RANK_BATCH_SCHEMA_VERSION.to_string(),
            task_description: self.task_description.clone(),
            goal: encode("goal", goal)?,
            states: requests
                .iter()
                .map(|r| encode("state", r.state))
                .collect::<Result<_, _>>()?,
            valid_actions_per_state: encoded.clone(),
            action_histories: requests
                .iter()
                .map(|r| encode_each("action", r.context.path))
                .collect::<Result<_, _>>()?,
            evaluation_histories: requests
                .iter()
                .map(|r| wire_history(r.context.history))
                .collect(),
        };
        let response: BatchRankResponseV1 = self.exchange(&request)?;
        if response.state_rankings.len() != requests.len() {
            return Err(OracleError::Malformed {
                detail: format!(
                    "{} rankings for {} states",
                    response.state_rankings.len(),
                    requests.len()
                ),
            });
        }
        response
            .state_rankings
            .iter()
            .zip(requests.iter().zip(&encoded))
            .map(|(ranked, (r, encoded))| match_ranking(ranked, encoded, r.actions))
            .collect()
    }

    fn supports_ranking(&self) -> bool {
        self.ranking
    }

    fn supports_batch_ranking(&self) -> bool {
        self.batch_ranking
    }
}
