//! Search trace: per-round audit record of a beam search run.
//!
//! The trace is the run's observability surface. It serializes to canonical
//! JSON (integers only, so scores are stored as micro-units) and is
//! byte-identical across runs with identical inputs.

use serde::Serialize;

use beamline_kernel::proof::canon::{canonical_json_bytes, canonical_json_of, CanonError};
use beamline_kernel::proof::hash::{canonical_hash, ContentHash};
use beamline_kernel::proof::hash_domain::HashDomain;

use crate::guard::{DegradationKindV1, MalformedResultV1, OracleStageV1};
use crate::node::SearchNode;
use crate::oracle::ScoreSourceV1;

/// Content fingerprint of a state: hash of its canonical JSON.
///
/// # Errors
///
/// Returns [`CanonError`] if the state does not serialize to integer-only JSON.
pub fn state_fingerprint<S: Serialize>(state: &S) -> Result<ContentHash, CanonError> {
    let bytes = canonical_json_of(state)?;
    Ok(canonical_hash(HashDomain::StateFingerprint, &bytes))
}

/// Compact, state-free view of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSummaryV1 {
    pub node_id: u64,
    pub parent_id: Option<u64>,
    pub depth: u32,
    /// Hex digest of [`state_fingerprint`].
    pub state_fingerprint: String,
    pub score_micros: Option<u64>,
    pub score_source: ScoreSourceV1,
}

impl NodeSummaryV1 {
    /// # Errors
    ///
    /// Propagates [`state_fingerprint`] failures.
    pub fn of<S: Serialize, A>(node: &SearchNode<S, A>) -> Result<Self, CanonError> {
        Ok(Self {
            node_id: node.node_id,
            parent_id: node.parent_id,
            depth: node.depth,
            state_fingerprint: state_fingerprint(&node.state)?.hex_digest().to_string(),
            score_micros: node.score.map(crate::node::Score::micros),
            score_source: node.score_source,
        })
    }
}

/// Beam refilled from the backup pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplenishEventV1 {
    pub pulled_node_ids: Vec<u64>,
    /// Pool entries dropped because their state was already expanded.
    pub stale_dropped: u64,
}

/// One expansion round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundEventV1 {
    pub round: u32,
    /// Nodes expanded this round, in beam order.
    pub beam: Vec<NodeSummaryV1>,
    /// Successor states produced by `apply`.
    pub candidates_generated: u64,
    pub duplicates_suppressed: u64,
    /// Beam nodes with zero legal actions.
    pub dead_end_node_ids: Vec<u64>,
    /// Beam nodes whose action list was cut by `per_node_expansion_limit`.
    pub expansion_cap_hits: u64,
    pub candidates_scored: u64,
    /// Candidates dropped by the `Exclude` fallback.
    pub candidates_excluded: u64,
    /// Size of the next beam before recovery.
    pub next_beam_len: u64,
    /// Pool size after this round's merge and any recovery.
    pub backup_pool_len: u64,
    pub replenishment: Option<ReplenishEventV1>,
}

/// What the engine did instead of using the oracle's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackAppliedV1 {
    NeutralScore,
    Excluded,
    /// Ranking failed; the adapter's order was used.
    OriginalOrder,
}

impl FallbackAppliedV1 {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NeutralScore => "neutral_score",
            Self::Excluded => "excluded",
            Self::OriginalOrder => "original_order",
        }
    }
}

/// A recorded oracle degradation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegradationV1 {
    pub round: u32,
    pub stage: OracleStageV1,
    /// Node whose actions were being ranked (`None` for evaluation and
    /// batched ranking).
    pub node_id: Option<u64>,
    /// States in a failed evaluation or batched ranking; actions in a
    /// failed per-node ranking.
    pub batch_len: u64,
    pub attempts: u32,
    pub kind: DegradationKindV1,
    pub fallback: FallbackAppliedV1,
}

/// Why the run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReasonV1 {
    GoalReached { node_id: u64, depth: u32 },
    /// Beam and pool both empty after `round`.
    Exhausted { round: u32 },
    DepthLimitReached { max_depth: u32 },
}

/// Run-level summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceMetadataV1 {
    pub task_id: String,
    pub oracle_id: String,
    pub root_state_fingerprint: String,
    pub policy_digest: String,
    pub total_rounds: u64,
    pub total_candidates_generated: u64,
    pub total_duplicates_suppressed: u64,
    pub total_oracle_calls: u64,
    pub total_oracle_retries: u64,
    pub total_replenishments: u64,
    pub beam_high_water: u64,
    pub backup_high_water: u64,
    pub termination: TerminationReasonV1,
}

/// The complete audit record of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTraceV1 {
    pub rounds: Vec<RoundEventV1>,
    pub degradations: Vec<DegradationV1>,
    pub metadata: TraceMetadataV1,
}

impl SearchTraceV1 {
    /// Whether any oracle call fell back.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    /// # Errors
    ///
    /// Returns [`CanonError`] if canonicalization fails (it cannot for traces
    /// built by the engine; all numbers are integers).
    pub fn to_canonical_json_bytes(&self) -> Result<Vec<u8>, CanonError> {
        canonical_json_bytes(&self.to_json_value())
    }

    /// Content digest of the canonical bytes.
    ///
    /// # Errors
    ///
    /// Same as [`Self::to_canonical_json_bytes`].
    pub fn digest(&self) -> Result<ContentHash, CanonError> {
        let bytes = self.to_canonical_json_bytes()?;
        Ok(canonical_hash(HashDomain::SearchTrace, &bytes))
    }

    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "degradations": self.degradations.iter().map(degradation_to_json).collect::<Vec<_>>(),
            "metadata": metadata_to_json(&self.metadata),
            "rounds": self.rounds.iter().map(round_to_json).collect::<Vec<_>>(),
            "schema_version": "search_trace.v1",
        })
    }
}

fn node_summary_to_json(n: &NodeSummaryV1) -> serde_json::Value {
    serde_json::json!({
        "depth": n.depth,
        "node_id": n.node_id,
        "parent_id": n.parent_id,
        "score_micros": n.score_micros,
        "score_source": n.score_source.as_str(),
        "state_fingerprint": n.state_fingerprint,
    })
}

fn round_to_json(r: &RoundEventV1) -> serde_json::Value {
    serde_json::json!({
        "backup_pool_len": r.backup_pool_len,
        "beam": r.beam.iter().map(node_summary_to_json).collect::<Vec<_>>(),
        "candidates_excluded": r.candidates_excluded,
        "candidates_generated": r.candidates_generated,
        "candidates_scored": r.candidates_scored,
        "dead_end_node_ids": r.dead_end_node_ids,
        "duplicates_suppressed": r.duplicates_suppressed,
        "expansion_cap_hits": r.expansion_cap_hits,
        "next_beam_len": r.next_beam_len,
        "replenishment": r.replenishment.as_ref().map(|e| serde_json::json!({
            "pulled_node_ids": e.pulled_node_ids,
            "stale_dropped": e.stale_dropped,
        })),
        "round": r.round,
    })
}

fn degradation_to_json(d: &DegradationV1) -> serde_json::Value {
    serde_json::json!({
        "attempts": d.attempts,
        "batch_len": d.batch_len,
        "fallback": d.fallback.as_str(),
        "kind": degradation_kind_to_json(&d.kind),
        "node_id": d.node_id,
        "round": d.round,
        "stage": d.stage.as_str(),
    })
}

fn degradation_kind_to_json(k: &DegradationKindV1) -> serde_json::Value {
    match k {
        DegradationKindV1::RetriesExhausted {
            attempts,
            last_error,
        } => serde_json::json!({
            "attempts": attempts,
            "last_error": last_error,
            "type": "retries_exhausted",
        }),
        DegradationKindV1::Rejected { detail } => {
            serde_json::json!({"detail": detail, "type": "rejected"})
        }
        DegradationKindV1::Unsupported { capability } => {
            serde_json::json!({"capability": capability, "type": "unsupported"})
        }
        DegradationKindV1::Panicked => serde_json::json!({"type": "panicked"}),
        DegradationKindV1::Malformed(m) => serde_json::json!({
            "malformed": malformed_to_json(m),
            "type": "malformed",
        }),
    }
}

fn malformed_to_json(m: &MalformedResultV1) -> serde_json::Value {
    match m {
        MalformedResultV1::WrongLength { expected, actual } => {
            serde_json::json!({"actual": actual, "expected": expected, "type": "wrong_length"})
        }
        MalformedResultV1::ScoreOutOfRange { index, raw } => {
            serde_json::json!({"index": index, "raw": raw, "type": "score_out_of_range"})
        }
        MalformedResultV1::NotAPermutation { expected, actual } => {
            serde_json::json!({"actual": actual, "expected": expected, "type": "not_a_permutation"})
        }
        MalformedResultV1::Undecodable { detail } => {
            serde_json::json!({"detail": detail, "type": "undecodable"})
        }
    }
}

fn metadata_to_json(m: &TraceMetadataV1) -> serde_json::Value {
    serde_json::json!({
        "backup_high_water": m.backup_high_water,
        "beam_high_water": m.beam_high_water,
        "oracle_id": m.oracle_id,
        "policy_digest": m.policy_digest,
        "root_state_fingerprint": m.root_state_fingerprint,
        "task_id": m.task_id,
        "termination": termination_reason_to_json(m.termination),
        "total_candidates_generated": m.total_candidates_generated,
        "total_duplicates_suppressed": m.total_duplicates_suppressed,
        "total_oracle_calls": m.total_oracle_calls,
        "total_oracle_retries": m.total_oracle_retries,
        "total_replenishments": m.total_replenishments,
        "total_rounds": m.total_rounds,
    })
}

/// JSON form of a termination reason (also used by harness outcome records).
#[must_use]
pub fn termination_reason_to_json(r: TerminationReasonV1) -> serde_json::Value {
    match r {
        TerminationReasonV1::GoalReached { node_id, depth } => {
            serde_json::json!({"depth": depth, "node_id": node_id, "type": "goal_reached"})
        }
        TerminationReasonV1::Exhausted { round } => {
            serde_json::json!({"round": round, "type": "exhausted"})
        }
        TerminationReasonV1::DepthLimitReached { max_depth } => {
            serde_json::json!({"max_depth": max_depth, "type": "depth_limit_reached"})
        }
    }
}
