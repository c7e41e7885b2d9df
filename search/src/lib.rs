//! Beamline Search: oracle-guided beam search with an auditable trace.
//!
//! This crate depends only on `beamline_kernel`. It does NOT depend on
//! `beamline_harness`.
//!
//! # Crate dependency graph
//!
//! ```text
//! beamline_kernel  ←  beamline_search  ←  beamline_harness
//! (canon, hashing)    (beam, guard, trace)  (tasks, oracles, bundles)
//! ```
//!
//! # Key types
//!
//! - [`TaskAdapter`] -- domain mechanics: legal actions, transitions, goal test
//! - [`ScoringOracle`] -- external judge: batch evaluation and action ranking
//! - [`OracleContext`] -- path and trimmed score history sent with each state
//! - [`GuardedOracle`] -- retry, timeout, validation around a raw oracle
//! - [`BeamPolicyV1`] -- width, depth, pool, ranking/evaluation toggles, fallback
//! - [`SearchTraceV1`] -- per-round audit record (canonical JSON)
//! - [`search()`] -- the entry point

#![forbid(unsafe_code)]

pub mod beam;
pub mod context;
pub mod contract;
pub mod error;
pub mod guard;
pub mod node;
pub mod oracle;
pub mod policy;
pub mod search;
pub mod trace;

pub use context::{limit_history, EvaluationRecordV1, OracleContext, RankRequest};
pub use contract::{ApplyError, TaskAdapter};
pub use error::{AdapterStageV1, AdapterViolationV1, SearchError};
pub use guard::{Backoff, GuardedOracle, NoBackoff, ThreadSleep};
pub use node::{Score, SearchNode};
pub use oracle::{ExactMatchOracle, OracleError, ScoringOracle, UniformOracle};
pub use policy::{BeamPolicyV1, FallbackPolicyV1, RetryPolicyV1};
pub use search::{search, search_with_backoff, SearchOutcomeV1, SearchResult};
pub use trace::SearchTraceV1;
