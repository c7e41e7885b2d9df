//! The bundled puzzle adapters, solved end to end.

use beamline_harness::tasks::blocks_world::{BlockMove, Blocks, BlocksWorld, Destination};
use beamline_harness::tasks::checker_jumping::{CheckerJumping, Hop, ReachCell, Strip};
use beamline_search::contract::TaskAdapter;
use beamline_search::guard::NoBackoff;
use beamline_search::oracle::{ExactMatchOracle, UniformOracle};
use beamline_search::policy::BeamPolicyV1;
use beamline_search::search::{search_with_backoff, SearchOutcomeV1};
use beamline_search::trace::TerminationReasonV1;

fn replay<T: TaskAdapter>(task: &T, root: T::State, path: &[T::Action]) -> T::State {
    path.iter()
        .fold(root, |state, action| task.apply(&state, action).unwrap())
}

#[test]
fn checker_jumping_solvable_strip() {
    let strip = Strip::solvable(7);
    let goal = ReachCell { target: 6 };
    let result = search_with_backoff(
        strip.clone(),
        &goal,
        &CheckerJumping,
        &UniformOracle::default(),
        &BeamPolicyV1::default(),
        &NoBackoff,
    )
    .unwrap();

    assert_eq!(
        result.outcome,
        SearchOutcomeV1::Found {
            path: vec![
                Hop { from: 0, to: 2 },
                Hop { from: 2, to: 4 },
                Hop { from: 4, to: 6 },
            ]
        }
    );
    assert_eq!(result.trace.metadata.total_rounds, 3);
    let end = replay(&CheckerJumping, strip, result.path().unwrap());
    assert_eq!(end.piece(), Some(6));
}

#[test]
fn checker_jumping_mixes_steps_and_jumps() {
    let strip = Strip::parse("P.#.").unwrap();
    let result = search_with_backoff(
        strip,
        &ReachCell { target: 3 },
        &CheckerJumping,
        &UniformOracle::default(),
        &BeamPolicyV1::default(),
        &NoBackoff,
    )
    .unwrap();
    assert_eq!(
        result.path(),
        Some(&[Hop { from: 0, to: 1 }, Hop { from: 1, to: 3 }][..])
    );
}

// ACCEPTANCE: a root with no legal moves is a dead end and the run is
// exhausted in its first round.
#[test]
fn checker_jumping_blocked_piece_exhausts() {
    let strip = Strip::parse("P##.").unwrap();
    let result = search_with_backoff(
        strip,
        &ReachCell { target: 3 },
        &CheckerJumping,
        &UniformOracle::default(),
        &BeamPolicyV1::default(),
        &NoBackoff,
    )
    .unwrap();
    assert_eq!(result.outcome, SearchOutcomeV1::Exhausted);
    assert_eq!(
        result.trace.metadata.termination,
        TerminationReasonV1::Exhausted { round: 0 }
    );
    assert_eq!(result.trace.rounds[0].dead_end_node_ids, vec![0]);
    assert_eq!(result.trace.metadata.total_oracle_calls, 0);
}

#[test]
fn blocks_world_single_move() {
    let start = Blocks::parse("AB C");
    let goal = Blocks::parse("ABC");
    let result = search_with_backoff(
        start,
        &goal,
        &BlocksWorld,
        &ExactMatchOracle,
        &BeamPolicyV1::default(),
        &NoBackoff,
    )
    .unwrap();
    assert_eq!(
        result.outcome,
        SearchOutcomeV1::Found {
            path: vec![BlockMove {
                block: 'C',
                to: Destination::Onto('B'),
            }]
        }
    );
}

#[test]
fn blocks_world_reverses_a_tower() {
    let start = Blocks::parse("ABC");
    let goal = Blocks::parse("CBA");
    let result = search_with_backoff(
        start.clone(),
        &goal,
        &BlocksWorld,
        &ExactMatchOracle,
        &BeamPolicyV1::default(),
        &NoBackoff,
    )
    .unwrap();

    let path = result.path().expect("13-state space is fully reachable");
    assert!(path.len() >= 3);
    assert_eq!(replay(&BlocksWorld, start, path), goal);
    assert_eq!(result.trace.metadata.task_id, "blocks_world");
}
