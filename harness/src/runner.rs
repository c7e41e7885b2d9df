//! Harness runner: one search run packaged as an artifact bundle.
//!
//! The runner uses ONLY the search crate's public entry points. It does
//! not implement any search logic itself.
//!
//! # Pipeline
//!
//! ```text
//! search_with_backoff() → policy echo bytes → trace bytes
//!   → outcome record (binds trace + policy digests) → build_bundle()
//! ```
//!
//! # Artifacts
//!
//! | name              | normative | content                                  |
//! |-------------------|-----------|------------------------------------------|
//! | `policy.json`     | yes       | canonical policy echo                    |
//! | `trace.json`      | yes       | canonical search trace                   |
//! | `outcome.json`    | yes       | outcome, path, bindings                  |
//! | `run_timing.json` | no        | wall-clock duration of the search call   |

use std::time::Instant;

use serde_json::json;

use beamline_kernel::proof::canon::canonical_json_bytes;
use beamline_kernel::proof::hash::canonical_hash;
use beamline_kernel::proof::hash_domain::HashDomain;
use beamline_search::contract::TaskAdapter;
use beamline_search::error::SearchError;
use beamline_search::guard::{Backoff, ThreadSleep};
use beamline_search::oracle::ScoringOracle;
use beamline_search::policy::BeamPolicyV1;
use beamline_search::search::{search_with_backoff, SearchResult};
use beamline_search::trace::termination_reason_to_json;

use crate::bundle::{
    build_bundle, ArtifactBundleV1, BundleBuildError, OUTCOME_ARTIFACT, POLICY_ARTIFACT,
    TIMING_ARTIFACT, TRACE_ARTIFACT,
};

/// Schema tag of `outcome.json`.
pub const OUTCOME_SCHEMA_VERSION: &str = "run_outcome.v1";

/// Error during a harness run.
#[derive(Debug)]
pub enum RunError {
    /// The search itself failed (bad policy, capability gap, adapter fault).
    Search(SearchError),
    /// An artifact could not be rendered as canonical JSON.
    Encoding { detail: String },
    BundleFailed(BundleBuildError),
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Search(e) => write!(f, "search failed: {e}"),
            Self::Encoding { detail } => write!(f, "artifact encoding failed: {detail}"),
            Self::BundleFailed(e) => write!(f, "bundle assembly failed: {e}"),
        }
    }
}

impl std::error::Error for RunError {}

impl From<SearchError> for RunError {
    fn from(e: SearchError) -> Self {
        Self::Search(e)
    }
}

/// Search result plus its bundle.
#[derive(Debug, Clone)]
pub struct RunOutputV1<S, A> {
    pub result: SearchResult<S, A>,
    pub bundle: ArtifactBundleV1,
}

/// Run one search and package it. Retry backoff blocks the calling thread.
///
/// # Errors
///
/// [`RunError::Search`] for anything [`beamline_search::search()`] rejects;
/// [`RunError::Encoding`] if the solution path holds non-integer numbers.
pub fn run_task<T: TaskAdapter>(
    root: T::State,
    goal: &T::Goal,
    task: &T,
    oracle: &dyn ScoringOracle<T::State, T::Action, T::Goal>,
    policy: &BeamPolicyV1,
) -> Result<RunOutputV1<T::State, T::Action>, RunError> {
    run_task_with_backoff(root, goal, task, oracle, policy, &ThreadSleep)
}

/// [`run_task`] with an explicit retry [`Backoff`].
///
/// # Errors
///
/// Same as [`run_task`].
pub fn run_task_with_backoff<T: TaskAdapter>(
    root: T::State,
    goal: &T::Goal,
    task: &T,
    oracle: &dyn ScoringOracle<T::State, T::Action, T::Goal>,
    policy: &BeamPolicyV1,
    backoff: &dyn Backoff,
) -> Result<RunOutputV1<T::State, T::Action>, RunError> {
    let started = Instant::now();
    let result = search_with_backoff(root, goal, task, oracle, policy, backoff)?;
    let elapsed_micros = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

    let policy_bytes = policy.to_canonical_json_bytes()?;
    let trace_bytes = result.trace.to_canonical_json_bytes().map_err(encoding)?;
    let outcome_bytes = outcome_bytes(&result, &policy_bytes, &trace_bytes)?;
    let timing_bytes = canonical_json_bytes(&json!({
        "elapsed_micros": elapsed_micros,
        "schema_version": "run_timing.v1",
    }))
    .map_err(encoding)?;

    let bundle = build_bundle(vec![
        (POLICY_ARTIFACT.to_string(), policy_bytes, true),
        (TRACE_ARTIFACT.to_string(), trace_bytes, true),
        (OUTCOME_ARTIFACT.to_string(), outcome_bytes, true),
        (TIMING_ARTIFACT.to_string(), timing_bytes, false),
    ])
    .map_err(RunError::BundleFailed)?;

    Ok(RunOutputV1 { result, bundle })
}

fn encoding(e: impl std::fmt::Display) -> RunError {
    RunError::Encoding {
        detail: e.to_string(),
    }
}

fn outcome_bytes<S, A: serde::Serialize>(
    result: &SearchResult<S, A>,
    policy_bytes: &[u8],
    trace_bytes: &[u8],
) -> Result<Vec<u8>, RunError> {
    let metadata = &result.trace.metadata;
    let path = result
        .path()
        .map(serde_json::to_value)
        .transpose()
        .map_err(encoding)?;
    let value = json!({
        "degradation_count": result.trace.degradations.len(),
        "degraded": result.is_degraded(),
        "goal_node_id": result.goal_node.as_ref().map(|n| n.node_id),
        "oracle_id": metadata.oracle_id,
        "outcome": result.outcome.as_str(),
        "path": path,
        "path_len": result.path().map(<[A]>::len),
        "policy_digest": canonical_hash(HashDomain::BeamPolicy, policy_bytes).as_str(),
        "schema_version": OUTCOME_SCHEMA_VERSION,
        "task_id": metadata.task_id,
        "termination": termination_reason_to_json(metadata.termination),
        "trace_digest": canonical_hash(HashDomain::SearchTrace, trace_bytes).as_str(),
    });
    canonical_json_bytes(&value).map_err(encoding)
}
