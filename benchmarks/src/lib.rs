//! Shared helpers for beamline benchmark suites.
//!
//! Every workload is run through [`guard_determinism`] before it is timed:
//! a benchmark of a nondeterministic search measures nothing reproducible.

use beamline_harness::oracles::table::TableOracle;
use beamline_harness::tasks::graph::{GoalVertices, GraphTask};
use beamline_harness::tasks::hanoi::{HanoiMove, TowerOfHanoi, Towers};
use beamline_kernel::proof::hash::{canonical_hash, ContentHash};
use beamline_kernel::proof::hash_domain::HashDomain;
use beamline_search::guard::NoBackoff;
use beamline_search::oracle::ScoringOracle;
use beamline_search::policy::BeamPolicyV1;
use beamline_search::search::{search_with_backoff, SearchResult};
use beamline_search::trace::SearchTraceV1;

/// Policy sized for an `n`-disk Hanoi run: depth budget of four optimal
/// solutions, ranking on.
#[must_use]
pub fn hanoi_policy(disks: u8, beam_width: usize, parallel_expansion: bool) -> BeamPolicyV1 {
    BeamPolicyV1 {
        max_depth: 4 * ((1u32 << disks) - 1),
        use_ranking: true,
        parallel_expansion,
        ..BeamPolicyV1::with_beam_width(beam_width)
    }
}

/// Run Hanoi from its initial state with no retry delay.
///
/// # Panics
///
/// Panics if `search()` returns an error. Benchmark runs are expected to succeed.
pub fn solve_hanoi(
    task: &TowerOfHanoi,
    oracle: &dyn ScoringOracle<Towers, HanoiMove, Towers>,
    policy: &BeamPolicyV1,
) -> SearchResult<Towers, HanoiMove> {
    search_with_backoff(
        task.initial_state(),
        &task.goal_state(),
        task,
        oracle,
        policy,
        &NoBackoff,
    )
    .expect("search should succeed in benchmarks")
}

/// Complete tree of the given branching factor and depth, vertices numbered
/// breadth-first from 0. No vertex is a goal, so a search visits every
/// reachable vertex the beam and pool let it.
#[must_use]
pub fn tree_graph(branching: u32, depth: u32) -> GraphTask {
    let mut graph = GraphTask::new(format!("tree_{branching}x{depth}"));
    let mut level_start = 0u32;
    let mut level_len = 1u32;
    for _ in 0..depth {
        let next_start = level_start + level_len;
        for i in 0..level_len {
            let parent = level_start + i;
            for k in 0..branching {
                graph = graph.edge(parent, next_start + i * branching + k);
            }
        }
        level_start = next_start;
        level_len *= branching;
    }
    graph
}

/// Deterministic pseudo-random score per vertex in `[0, 1)`.
#[must_use]
pub fn scattered_table(vertices: u32) -> TableOracle<u32> {
    (0..vertices).fold(TableOracle::new("scattered", 0.0), |oracle, v| {
        oracle.with(v, f64::from(v.wrapping_mul(7919) % 1000) / 1000.0)
    })
}

/// Run a tree search that can never succeed; exercises dead ends and pool
/// replenishment.
///
/// # Panics
///
/// Panics if `search()` returns an error.
pub fn exhaust_tree(
    graph: &GraphTask,
    oracle: &TableOracle<u32>,
    policy: &BeamPolicyV1,
) -> SearchResult<u32, u32> {
    search_with_backoff(
        0,
        &GoalVertices::single(u32::MAX),
        graph,
        oracle,
        policy,
        &NoBackoff,
    )
    .expect("search should succeed in benchmarks")
}

/// Determinism guard digest of a trace.
///
/// # Panics
///
/// Panics if the trace cannot be canonicalized.
#[must_use]
pub fn guard_digest(trace: &SearchTraceV1) -> ContentHash {
    let bytes = trace
        .to_canonical_json_bytes()
        .expect("trace canonicalization");
    canonical_hash(HashDomain::BenchGuard, &bytes)
}

/// Run `workload` twice and require identical traces.
///
/// # Panics
///
/// Panics if the two runs disagree.
pub fn guard_determinism(label: &str, workload: impl Fn() -> SearchTraceV1) -> ContentHash {
    let first = guard_digest(&workload());
    let second = guard_digest(&workload());
    assert_eq!(
        first, second,
        "benchmark workload {label} is not deterministic"
    );
    first
}
