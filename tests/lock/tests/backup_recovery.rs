//! Backup pool recovery on hand-built graphs.
//!
//! Scores are chosen so the beam (width 1) walks into a dead end and must
//! pull a discarded candidate back out of the pool.

use beamline_harness::oracles::table::TableOracle;
use beamline_harness::tasks::graph::{GoalVertices, GraphTask};
use beamline_search::guard::NoBackoff;
use beamline_search::policy::BeamPolicyV1;
use beamline_search::search::{search_with_backoff, SearchOutcomeV1, SearchResult};
use beamline_search::trace::{ReplenishEventV1, TerminationReasonV1};

fn width_one(pool: usize) -> BeamPolicyV1 {
    BeamPolicyV1 {
        beam_width: 1,
        backup_pool_size: pool,
        max_depth: 20,
        ..BeamPolicyV1::default()
    }
}

fn run(
    graph: &GraphTask,
    oracle: &TableOracle<u32>,
    goal: u32,
    pool: usize,
) -> SearchResult<u32, u32> {
    search_with_backoff(
        0,
        &GoalVertices::single(goal),
        graph,
        oracle,
        &width_one(pool),
        &NoBackoff,
    )
    .unwrap()
}

/// `0 → {1, 2, 3}`, `1 → 4` (dead end), `2 → 5 → 6` (goal).
fn decoy_graph() -> (GraphTask, TableOracle<u32>) {
    let graph = GraphTask::from_edges(
        "decoy",
        &[(0, 1), (0, 2), (0, 3), (1, 4), (2, 5), (5, 6)],
    );
    let oracle = TableOracle::new("decoy_table", 0.0)
        .with(1, 0.9)
        .with(2, 0.5)
        .with(3, 0.1)
        .with(4, 0.8)
        .with(5, 0.4);
    (graph, oracle)
}

// ACCEPTANCE: when the beam empties, the best pooled candidate is pulled
// back and the search continues from it.
#[test]
fn dead_end_recovers_from_pool() {
    let (graph, oracle) = decoy_graph();
    let result = run(&graph, &oracle, 6, 5);

    assert_eq!(result.outcome, SearchOutcomeV1::Found { path: vec![2, 5, 6] });
    assert_eq!(result.trace.rounds.len(), 5);

    let dead_end_round = &result.trace.rounds[2];
    assert_eq!(dead_end_round.dead_end_node_ids, vec![4]);
    assert_eq!(dead_end_round.next_beam_len, 0);
    assert_eq!(
        dead_end_round.replenishment,
        Some(ReplenishEventV1 {
            pulled_node_ids: vec![2],
            stale_dropped: 0,
        })
    );
    assert_eq!(dead_end_round.backup_pool_len, 1);

    let meta = &result.trace.metadata;
    assert_eq!(meta.total_replenishments, 1);
    assert_eq!(meta.backup_high_water, 2);
    assert_eq!(
        meta.termination,
        TerminationReasonV1::GoalReached {
            node_id: 6,
            depth: 3
        }
    );
}

#[test]
fn recovered_node_keeps_its_original_identity() {
    let (graph, oracle) = decoy_graph();
    let result = run(&graph, &oracle, 6, 5);

    let resumed = &result.trace.rounds[3];
    assert_eq!(resumed.beam.len(), 1);
    assert_eq!(resumed.beam[0].node_id, 2);
    assert_eq!(resumed.beam[0].parent_id, Some(0));
    assert_eq!(resumed.beam[0].depth, 1);
    assert_eq!(resumed.beam[0].score_micros, Some(500_000));

    let goal = result.goal_node.unwrap();
    assert_eq!(goal.parent_id, Some(5));
    assert_eq!(goal.path, vec![2, 5, 6]);
}

// ACCEPTANCE: with recovery disabled the same graph is exhausted at the
// dead end.
#[test]
fn zero_pool_exhausts_at_dead_end() {
    let (graph, oracle) = decoy_graph();
    let result = run(&graph, &oracle, 6, 0);

    assert_eq!(result.outcome, SearchOutcomeV1::Exhausted);
    assert_eq!(
        result.trace.metadata.termination,
        TerminationReasonV1::Exhausted { round: 2 }
    );
    assert!(result.trace.rounds.iter().all(|r| r.replenishment.is_none()));
    assert_eq!(result.trace.metadata.backup_high_water, 0);
    assert_eq!(result.trace.metadata.total_replenishments, 0);
}

/// `0 → {1, 2}`, `1 → 3 → {7, 4}`, `2 → 7 → 8`. Vertex 7 is first found
/// at depth 3 and later again at depth 2.
fn rediscovery_graph() -> (GraphTask, TableOracle<u32>) {
    let graph = GraphTask::from_edges(
        "rediscovery",
        &[(0, 1), (0, 2), (1, 3), (3, 7), (3, 4), (2, 7), (7, 8)],
    );
    let oracle = TableOracle::new("rediscovery_table", 0.0)
        .with(1, 0.9)
        .with(2, 0.5)
        .with(3, 0.8)
        .with(7, 0.1)
        .with(4, 0.6)
        .with(8, 0.2);
    (graph, oracle)
}

// ACCEPTANCE: a state reached again at a shallower depth is re-admitted as
// a fresh node.
#[test]
fn shallower_rediscovery_is_readmitted() {
    let (graph, oracle) = rediscovery_graph();
    let result = run(&graph, &oracle, 99, 5);

    assert_eq!(
        result.trace.rounds[3].replenishment,
        Some(ReplenishEventV1 {
            pulled_node_ids: vec![2],
            stale_dropped: 0,
        })
    );

    let rediscovery = &result.trace.rounds[4];
    assert_eq!(rediscovery.candidates_generated, 1);
    assert_eq!(rediscovery.duplicates_suppressed, 0);

    let next = &result.trace.rounds[5];
    assert_eq!(next.beam[0].node_id, 6);
    assert_eq!(next.beam[0].parent_id, Some(2));
    assert_eq!(next.beam[0].depth, 2);
}

// ACCEPTANCE: pooled nodes whose state was already expanded are dropped
// instead of being re-expanded.
#[test]
fn stale_pool_entries_are_dropped() {
    let (graph, oracle) = rediscovery_graph();
    let result = run(&graph, &oracle, 99, 5);

    assert_eq!(result.outcome, SearchOutcomeV1::Exhausted);
    assert_eq!(result.trace.rounds.len(), 7);
    assert_eq!(
        result.trace.rounds[6].replenishment,
        Some(ReplenishEventV1 {
            pulled_node_ids: vec![],
            stale_dropped: 1,
        })
    );
    assert_eq!(result.trace.rounds[6].backup_pool_len, 0);
    assert_eq!(result.trace.metadata.total_replenishments, 1);
    assert_eq!(
        result.trace.metadata.termination,
        TerminationReasonV1::Exhausted { round: 6 }
    );
}

#[test]
fn pool_capacity_bounds_retained_discards() {
    // Root fans out to ten leaves; only the best one fits the beam.
    let edges: Vec<(u32, u32)> = (1..=10).map(|v| (0, v)).collect();
    let graph = GraphTask::from_edges("fan", &edges);
    let oracle = (1..=10u32).fold(TableOracle::new("fan_table", 0.0), |o, v| {
        o.with(v, f64::from(v) / 10.0)
    });
    let result = run(&graph, &oracle, 99, 3);

    assert_eq!(result.trace.rounds[0].backup_pool_len, 3);
    assert_eq!(result.trace.metadata.backup_high_water, 3);
    // Leaf 10 is expanded first, then the pool hands back 9, 8, 7 in order.
    let order: Vec<u64> = result
        .trace
        .rounds
        .iter()
        .map(|r| r.beam[0].node_id)
        .collect();
    assert_eq!(order, vec![0, 10, 9, 8, 7]);
    assert_eq!(result.outcome, SearchOutcomeV1::Exhausted);
}

/// `0 → {1, 2, 3}`, `1 → 4 → {6, 7, 9, 20}`, `2 → 5`, `3 → {20, 30, 31}`,
/// `20 → 40`. Vertex 20 is pooled at depth 3, then found again at depth 2
/// from a recovered node and pooled a second time.
fn superseded_graph() -> (GraphTask, TableOracle<u32>) {
    let graph = GraphTask::from_edges(
        "superseded",
        &[
            (0, 1),
            (0, 2),
            (0, 3),
            (1, 4),
            (2, 5),
            (4, 6),
            (4, 7),
            (4, 9),
            (4, 20),
            (3, 20),
            (3, 30),
            (3, 31),
            (20, 40),
        ],
    );
    let oracle = TableOracle::new("superseded_table", 0.0)
        .with(1, 0.9)
        .with(2, 0.8)
        .with(3, 0.3)
        .with(4, 0.7)
        .with(5, 0.6)
        .with(6, 0.5)
        .with(7, 0.45)
        .with(9, 0.4)
        .with(20, 0.2)
        .with(30, 0.95)
        .with(31, 0.85);
    (graph, oracle)
}

// ACCEPTANCE: a pooled node superseded by a shallower rediscovery of its
// state is dropped as stale, so a recovered beam never holds one state twice.
#[test]
fn superseded_pool_entry_is_not_recovered() {
    let (graph, oracle) = superseded_graph();
    let policy = BeamPolicyV1 {
        beam_width: 2,
        backup_pool_size: 5,
        max_depth: 20,
        ..BeamPolicyV1::default()
    };
    let result = search_with_backoff(
        0,
        &GoalVertices::single(40),
        &graph,
        &oracle,
        &policy,
        &NoBackoff,
    )
    .unwrap();

    // Round 3: both beam nodes are dead ends; vertex 9 and vertex 3 come back.
    assert_eq!(
        result.trace.rounds[3].replenishment,
        Some(ReplenishEventV1 {
            pulled_node_ids: vec![8, 3],
            stale_dropped: 0,
        })
    );

    // Round 4 re-admits vertex 20 at depth 2 as node 10 and pools it.
    let rediscovery = &result.trace.rounds[4];
    assert_eq!(rediscovery.duplicates_suppressed, 0);
    assert_eq!(rediscovery.backup_pool_len, 2);

    // Round 5: node 9 (vertex 20 at depth 3) is superseded by node 10.
    assert_eq!(
        result.trace.rounds[5].replenishment,
        Some(ReplenishEventV1 {
            pulled_node_ids: vec![10],
            stale_dropped: 1,
        })
    );

    for round in &result.trace.rounds {
        let mut fingerprints: Vec<&str> = round
            .beam
            .iter()
            .map(|n| n.state_fingerprint.as_str())
            .collect();
        let total = fingerprints.len();
        fingerprints.sort_unstable();
        fingerprints.dedup();
        assert_eq!(fingerprints.len(), total, "round {} repeats a state", round.round);
    }

    assert_eq!(result.outcome, SearchOutcomeV1::Found { path: vec![3, 20, 40] });
    assert_eq!(
        result.trace.metadata.termination,
        TerminationReasonV1::GoalReached {
            node_id: 13,
            depth: 3
        }
    );
    assert_eq!(result.trace.rounds.len(), 7);
}
