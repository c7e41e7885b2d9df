//! Oracle failure handling: retry, fallback, and the degradation record.
//!
//! Every scenario runs on a small graph with `NoBackoff`, so retries cost
//! nothing and the trace is fully determined by the injected fault.

use std::time::Duration;

use beamline_harness::tasks::graph::{GoalVertices, GraphTask};
use beamline_search::error::SearchError;
use beamline_search::guard::{DegradationKindV1, MalformedResultV1, NoBackoff, OracleStageV1};
use beamline_search::oracle::{OracleError, ScoreSourceV1, ScoringOracle, UniformOracle};
use beamline_search::policy::{BeamPolicyV1, FallbackPolicyV1, RetryPolicyV1};
use beamline_search::search::{search_with_backoff, SearchOutcomeV1, SearchResult};
use beamline_search::trace::{FallbackAppliedV1, TerminationReasonV1};
use lock_tests::faults::{
    CountingOracle, Fault, FaultyOracle, FlakyOracle, ReversingRanker, SlowOracle,
};

/// `0 → {1, 2}`, `1 → 3`.
fn fork() -> GraphTask {
    GraphTask::from_edges("fork", &[(0, 1), (0, 2), (1, 3)])
}

fn run(
    graph: &GraphTask,
    goal: u32,
    oracle: &dyn ScoringOracle<u32, u32, GoalVertices>,
    policy: &BeamPolicyV1,
) -> Result<SearchResult<u32, u32>, SearchError> {
    search_with_backoff(
        0,
        &GoalVertices::single(goal),
        graph,
        oracle,
        policy,
        &NoBackoff,
    )
}

// ACCEPTANCE: transient failures are retried; a later success is used as if
// nothing happened, and the retries are counted.
#[test]
fn transient_failures_retried_until_success() {
    let oracle = FlakyOracle::new(2, 0.5);
    let result = run(&fork(), 3, &oracle, &BeamPolicyV1::default()).unwrap();

    assert_eq!(result.outcome, SearchOutcomeV1::Found { path: vec![1, 3] });
    assert!(!result.is_degraded());
    assert_eq!(oracle.calls(), 3);
    assert_eq!(result.trace.metadata.total_oracle_calls, 3);
    assert_eq!(result.trace.metadata.total_oracle_retries, 2);
    assert_eq!(result.trace.rounds[0].candidates_scored, 2);
}

// ACCEPTANCE: once retries run out the batch falls back to the neutral score
// and the search carries on.
#[test]
fn exhausted_retries_fall_back_to_neutral_score() {
    let oracle = FlakyOracle::new(u64::MAX, 0.5);
    let result = run(&fork(), 3, &oracle, &BeamPolicyV1::default()).unwrap();

    assert_eq!(result.outcome, SearchOutcomeV1::Found { path: vec![1, 3] });
    assert!(result.is_degraded());
    assert_eq!(oracle.calls(), 3);

    let degradations = &result.trace.degradations;
    assert_eq!(degradations.len(), 1);
    let d = &degradations[0];
    assert_eq!(d.round, 0);
    assert_eq!(d.stage, OracleStageV1::Evaluate);
    assert_eq!(d.node_id, None);
    assert_eq!(d.batch_len, 2);
    assert_eq!(d.attempts, 3);
    assert_eq!(d.fallback, FallbackAppliedV1::NeutralScore);
    assert_eq!(
        d.kind,
        DegradationKindV1::RetriesExhausted {
            attempts: 3,
            last_error: "transient oracle failure: connection reset on call 2".into(),
        }
    );

    let next = &result.trace.rounds[1];
    assert_eq!(next.beam.len(), 2);
    for node in &next.beam {
        assert_eq!(node.score_micros, Some(0));
        assert_eq!(node.score_source, ScoreSourceV1::Fallback);
    }
    assert_eq!(result.trace.rounds[0].candidates_scored, 0);
}

#[test]
fn exclude_fallback_drops_the_batch() {
    let oracle = FlakyOracle::new(u64::MAX, 0.5);
    let policy = BeamPolicyV1 {
        fallback: FallbackPolicyV1::Exclude,
        ..BeamPolicyV1::default()
    };
    let result = run(&fork(), 3, &oracle, &policy).unwrap();

    assert_eq!(result.outcome, SearchOutcomeV1::Exhausted);
    assert_eq!(
        result.trace.metadata.termination,
        TerminationReasonV1::Exhausted { round: 0 }
    );
    assert_eq!(result.trace.rounds[0].candidates_excluded, 2);
    assert_eq!(result.trace.rounds[0].next_beam_len, 0);
    assert_eq!(
        result.trace.degradations[0].fallback,
        FallbackAppliedV1::Excluded
    );
}

// ACCEPTANCE: permanent failures and contract breaches degrade on the first
// attempt, without retrying.
#[test]
fn permanent_failures_are_not_retried() {
    let cases = [
        (
            Fault::Fail(OracleError::Rejected {
                detail: "quota".into(),
            }),
            DegradationKindV1::Rejected {
                detail: "quota".into(),
            },
        ),
        (
            Fault::Fail(OracleError::Malformed {
                detail: "not json".into(),
            }),
            DegradationKindV1::Malformed(MalformedResultV1::Undecodable {
                detail: "not json".into(),
            }),
        ),
        (
            Fault::Truncate,
            DegradationKindV1::Malformed(MalformedResultV1::WrongLength {
                expected: 2,
                actual: 1,
            }),
        ),
        (
            Fault::Score(1.5),
            DegradationKindV1::Malformed(MalformedResultV1::ScoreOutOfRange {
                index: 0,
                raw: "1.5".into(),
            }),
        ),
        (
            Fault::Score(f64::NAN),
            DegradationKindV1::Malformed(MalformedResultV1::ScoreOutOfRange {
                index: 0,
                raw: "NaN".into(),
            }),
        ),
        (Fault::Panic, DegradationKindV1::Panicked),
    ];

    for (fault, expected) in cases {
        let oracle = CountingOracle::new(FaultyOracle {
            fault: fault.clone(),
        });
        let result = run(&fork(), 3, &oracle, &BeamPolicyV1::default()).unwrap();

        assert_eq!(oracle.evaluations(), 1, "{fault:?} was retried");
        assert_eq!(result.trace.degradations.len(), 1, "{fault:?}");
        let d = &result.trace.degradations[0];
        assert_eq!(d.attempts, 1, "{fault:?}");
        assert_eq!(d.kind, expected, "{fault:?}");
        assert_eq!(result.trace.metadata.total_oracle_retries, 0);
        // Neutral fallback keeps the search alive.
        assert_eq!(result.outcome, SearchOutcomeV1::Found { path: vec![1, 3] });
    }
}

// ACCEPTANCE: a failed ranking falls back to the adapter's order.
#[test]
fn ranking_failure_uses_original_order() {
    let oracle = FaultyOracle {
        fault: Fault::Fail(OracleError::Rejected {
            detail: "no ranking today".into(),
        }),
    };
    let policy = BeamPolicyV1 {
        use_ranking: true,
        use_evaluation: false,
        per_node_expansion_limit: Some(1),
        beam_width: 1,
        ..BeamPolicyV1::default()
    };
    let result = run(&fork(), 3, &oracle, &policy).unwrap();

    // Original order is [1, 2]; the cap keeps 1, which leads to 3.
    assert_eq!(result.outcome, SearchOutcomeV1::Found { path: vec![1, 3] });
    let d = &result.trace.degradations[0];
    assert_eq!(d.stage, OracleStageV1::Rank);
    assert_eq!(d.node_id, Some(0));
    assert_eq!(d.batch_len, 2);
    assert_eq!(d.fallback, FallbackAppliedV1::OriginalOrder);
    assert_eq!(result.trace.rounds[0].expansion_cap_hits, 1);
}

#[test]
fn incomplete_ranking_is_not_a_permutation() {
    let oracle = FaultyOracle {
        fault: Fault::Truncate,
    };
    let policy = BeamPolicyV1 {
        use_ranking: true,
        use_evaluation: false,
        ..BeamPolicyV1::default()
    };
    let result = run(&fork(), 3, &oracle, &policy).unwrap();

    assert_eq!(
        result.trace.degradations[0].kind,
        DegradationKindV1::Malformed(MalformedResultV1::NotAPermutation {
            expected: 2,
            actual: 1,
        })
    );
    assert!(result.is_goal_reached());
}

#[test]
fn ranking_decides_which_actions_survive_the_cap() {
    let graph = GraphTask::from_edges("fan", &[(0, 1), (0, 2), (0, 3)]);
    let capped = BeamPolicyV1 {
        per_node_expansion_limit: Some(1),
        beam_width: 1,
        backup_pool_size: 0,
        ..BeamPolicyV1::default()
    };

    let ranked = BeamPolicyV1 {
        use_ranking: true,
        ..capped.clone()
    };
    let result = run(&graph, 3, &ReversingRanker, &ranked).unwrap();
    assert_eq!(result.outcome, SearchOutcomeV1::Found { path: vec![3] });
    assert_eq!(result.trace.rounds[0].candidates_generated, 1);

    let unranked = run(&graph, 3, &ReversingRanker, &capped).unwrap();
    assert_eq!(unranked.outcome, SearchOutcomeV1::Exhausted);
    assert_eq!(unranked.trace.rounds[0].expansion_cap_hits, 1);
}

// ACCEPTANCE: a call that overruns its timeout counts as a timed-out attempt
// and is retried like any transient failure.
#[test]
fn slow_oracle_times_out() {
    let oracle = SlowOracle {
        delay: Duration::from_millis(30),
    };
    let policy = BeamPolicyV1 {
        retry: RetryPolicyV1 {
            max_attempts: 2,
            call_timeout_ms: Some(1),
            ..RetryPolicyV1::default()
        },
        ..BeamPolicyV1::default()
    };
    let result = run(&fork(), 3, &oracle, &policy).unwrap();

    let d = &result.trace.degradations[0];
    assert_eq!(d.attempts, 2);
    match &d.kind {
        DegradationKindV1::RetriesExhausted {
            attempts,
            last_error,
        } => {
            assert_eq!(*attempts, 2);
            assert!(last_error.contains("timed out"), "{last_error}");
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
    assert_eq!(result.trace.metadata.total_oracle_retries, 1);
}

#[test]
fn root_goal_makes_no_oracle_calls() {
    let oracle = CountingOracle::new(UniformOracle::default());
    let result = run(&fork(), 0, &oracle, &BeamPolicyV1::default()).unwrap();
    assert_eq!(result.outcome, SearchOutcomeV1::Found { path: vec![] });
    assert_eq!(oracle.evaluations(), 0);
    assert_eq!(oracle.rankings(), 0);
}

// ACCEPTANCE: asking for ranking from an oracle that cannot rank fails
// before the search starts.
#[test]
fn ranking_without_capability_fails_preflight() {
    let oracle = CountingOracle::new(UniformOracle::default());
    let policy = BeamPolicyV1 {
        use_ranking: true,
        ..BeamPolicyV1::default()
    };
    let err = run(&fork(), 3, &oracle, &policy).unwrap_err();
    assert_eq!(
        err,
        SearchError::UnsupportedCapability {
            capability: "rank_actions"
        }
    );
    assert_eq!(oracle.evaluations(), 0);
}

#[test]
fn batches_are_chunked() {
    let edges: Vec<(u32, u32)> = (1..=5).map(|v| (0, v)).collect();
    let graph = GraphTask::from_edges("fan", &edges);
    let oracle = CountingOracle::new(UniformOracle::default());
    let policy = BeamPolicyV1 {
        max_batch_size: Some(2),
        ..BeamPolicyV1::default()
    };
    let result = run(&graph, 99, &oracle, &policy).unwrap();

    assert_eq!(result.trace.rounds[0].candidates_scored, 5);
    // Leaves produce no candidates, so only round 0 calls the oracle.
    assert_eq!(oracle.evaluations(), 3);
    assert_eq!(result.trace.metadata.total_oracle_calls, 3);
}
