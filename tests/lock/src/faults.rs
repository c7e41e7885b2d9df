//! Fault-injecting oracles and task adapters.
//!
//! Every fixture here is deterministic: a fault fires on a fixed call count
//! or a fixed vertex, never on timing or randomness (except [`SlowOracle`],
//! which is only used with a timeout far below its delay).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use beamline_harness::tasks::graph::{GoalVertices, GraphTask};
use beamline_search::context::{OracleContext, RankRequest};
use beamline_search::contract::{ApplyError, TaskAdapter};
use beamline_search::error::AdapterStageV1;
use beamline_search::oracle::{OracleError, ScoringOracle};

/// Counts calls into a wrapped oracle. Context is passed through.
pub struct CountingOracle<O> {
    inner: O,
    evaluations: AtomicU64,
    rankings: AtomicU64,
    batch_rankings: AtomicU64,
}

impl<O> CountingOracle<O> {
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            evaluations: AtomicU64::new(0),
            rankings: AtomicU64::new(0),
            batch_rankings: AtomicU64::new(0),
        }
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations.load(Ordering::SeqCst)
    }

    pub fn rankings(&self) -> u64 {
        self.rankings.load(Ordering::SeqCst)
    }

    pub fn batch_rankings(&self) -> u64 {
        self.batch_rankings.load(Ordering::SeqCst)
    }
}

impl<S, A, G, O: ScoringOracle<S, A, G>> ScoringOracle<S, A, G> for CountingOracle<O> {
    fn oracle_id(&self) -> &str {
        self.inner.oracle_id()
    }

    fn evaluate_batch(&self, states: &[S], goal: &G) -> Result<Vec<f64>, OracleError> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        self.inner.evaluate_batch(states, goal)
    }

    fn rank_actions(&self, state: &S, actions: &[A], goal: &G) -> Result<Vec<A>, OracleError> {
        self.rankings.fetch_add(1, Ordering::SeqCst);
        self.inner.rank_actions(state, actions, goal)
    }

    fn evaluate_with_context(
        &self,
        states: &[S],
        contexts: &[OracleContext<'_, A>],
        goal: &G,
    ) -> Result<Vec<f64>, OracleError> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        self.inner.evaluate_with_context(states, contexts, goal)
    }

    fn rank_with_context(
        &self,
        state: &S,
        actions: &[A],
        context: &OracleContext<'_, A>,
        goal: &G,
    ) -> Result<Vec<A>, OracleError> {
        self.rankings.fetch_add(1, Ordering::SeqCst);
        self.inner.rank_with_context(state, actions, context, goal)
    }

    fn rank_batch(
        &self,
        requests: &[RankRequest<'_, S, A>],
        goal: &G,
    ) -> Result<Vec<Vec<A>>, OracleError> {
        self.batch_rankings.fetch_add(1, Ordering::SeqCst);
        self.inner.rank_batch(requests, goal)
    }

    fn supports_evaluation(&self) -> bool {
        self.inner.supports_evaluation()
    }

    fn supports_ranking(&self) -> bool {
        self.inner.supports_ranking()
    }

    fn supports_batch_ranking(&self) -> bool {
        self.inner.supports_batch_ranking()
    }
}

/// Fails the first `failures` evaluation calls with a transient error, then
/// scores every state `score`.
pub struct FlakyOracle {
    failures: u64,
    score: f64,
    calls: AtomicU64,
}

impl FlakyOracle {
    pub fn new(failures: u64, score: f64) -> Self {
        Self {
            failures,
            score,
            calls: AtomicU64::new(0),
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<S, A, G> ScoringOracle<S, A, G> for FlakyOracle {
    fn oracle_id(&self) -> &str {
        "flaky"
    }

    fn evaluate_batch(&self, states: &[S], _goal: &G) -> Result<Vec<f64>, OracleError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            Err(OracleError::Transient {
                detail: format!("connection reset on call {call}"),
            })
        } else {
            Ok(vec![self.score; states.len()])
        }
    }
}

/// A fixed misbehavior applied to every call.
#[derive(Debug, Clone)]
pub enum Fault {
    /// Return this error.
    Fail(OracleError),
    /// One score too few / one action too few.
    Truncate,
    /// Every score is this (out-of-range) value.
    Score(f64),
    Panic,
}

/// Oracle that always misbehaves the same way. Advertises both kinds of
/// ranking.
pub struct FaultyOracle {
    pub fault: Fault,
}

impl<S, A: Clone, G> ScoringOracle<S, A, G> for FaultyOracle {
    fn oracle_id(&self) -> &str {
        "faulty"
    }

    fn evaluate_batch(&self, states: &[S], _goal: &G) -> Result<Vec<f64>, OracleError> {
        match &self.fault {
            Fault::Fail(e) => Err(e.clone()),
            Fault::Truncate => Ok(vec![0.5; states.len().saturating_sub(1)]),
            Fault::Score(v) => Ok(vec![*v; states.len()]),
            Fault::Panic => panic!("oracle exploded"),
        }
    }

    fn rank_actions(&self, _state: &S, actions: &[A], _goal: &G) -> Result<Vec<A>, OracleError> {
        match &self.fault {
            Fault::Fail(e) => Err(e.clone()),
            Fault::Truncate => Ok(actions[1..].to_vec()),
            Fault::Score(_) => Ok(actions.iter().rev().cloned().collect()),
            Fault::Panic => panic!("oracle exploded"),
        }
    }

    /// `Truncate` drops the last state's ranking.
    fn rank_batch(
        &self,
        requests: &[RankRequest<'_, S, A>],
        _goal: &G,
    ) -> Result<Vec<Vec<A>>, OracleError> {
        match &self.fault {
            Fault::Fail(e) => Err(e.clone()),
            Fault::Truncate => Ok(requests
                .iter()
                .skip(1)
                .map(|r| r.actions.to_vec())
                .collect()),
            Fault::Score(_) => Ok(requests
                .iter()
                .map(|r| r.actions.iter().rev().cloned().collect())
                .collect()),
            Fault::Panic => panic!("oracle exploded"),
        }
    }

    fn supports_ranking(&self) -> bool {
        true
    }

    fn supports_batch_ranking(&self) -> bool {
        true
    }
}

/// Sleeps `delay` on every evaluation, then scores everything 0.5.
pub struct SlowOracle {
    pub delay: Duration,
}

impl<S, A, G> ScoringOracle<S, A, G> for SlowOracle {
    fn oracle_id(&self) -> &str {
        "slow"
    }

    fn evaluate_batch(&self, states: &[S], _goal: &G) -> Result<Vec<f64>, OracleError> {
        std::thread::sleep(self.delay);
        Ok(vec![0.5; states.len()])
    }
}

/// Reverses the action order it is given, per node or in batches.
pub struct ReversingRanker;

impl<S, A: Clone, G> ScoringOracle<S, A, G> for ReversingRanker {
    fn oracle_id(&self) -> &str {
        "reversing"
    }

    fn evaluate_batch(&self, states: &[S], _goal: &G) -> Result<Vec<f64>, OracleError> {
        Ok(vec![0.5; states.len()])
    }

    fn rank_actions(&self, _state: &S, actions: &[A], _goal: &G) -> Result<Vec<A>, OracleError> {
        Ok(actions.iter().rev().cloned().collect())
    }

    fn rank_batch(
        &self,
        requests: &[RankRequest<'_, S, A>],
        _goal: &G,
    ) -> Result<Vec<Vec<A>>, OracleError> {
        Ok(requests
            .iter()
            .map(|r| r.actions.iter().rev().cloned().collect())
            .collect())
    }

    fn supports_ranking(&self) -> bool {
        true
    }

    fn supports_batch_ranking(&self) -> bool {
        true
    }
}

/// Vertex that no edge ever reaches. `apply` rejects it.
pub const PHANTOM_VERTEX: u32 = 999;

/// Graph task whose `generate_actions` advertises an edge that does not
/// exist from `from`.
pub struct PhantomEdgeTask {
    pub graph: GraphTask,
    pub from: u32,
}

impl TaskAdapter for PhantomEdgeTask {
    type State = u32;
    type Action = u32;
    type Goal = GoalVertices;

    fn task_id(&self) -> &str {
        "phantom_edge"
    }

    fn generate_actions(&self, state: &u32) -> Vec<u32> {
        let mut actions = self.graph.generate_actions(state);
        if *state == self.from {
            actions.push(PHANTOM_VERTEX);
        }
        actions
    }

    fn apply(&self, state: &u32, action: &u32) -> Result<u32, ApplyError> {
        self.graph.apply(state, action)
    }

    fn is_goal(&self, state: &u32, goal: &GoalVertices) -> bool {
        self.graph.is_goal(state, goal)
    }
}

/// Graph task whose goal test at `vertex` alternates true, false, true, ...
pub struct FlipFlopGoalTask {
    pub graph: GraphTask,
    pub vertex: u32,
    next: AtomicBool,
}

impl FlipFlopGoalTask {
    pub fn new(graph: GraphTask, vertex: u32) -> Self {
        Self {
            graph,
            vertex,
            next: AtomicBool::new(true),
        }
    }
}

impl TaskAdapter for FlipFlopGoalTask {
    type State = u32;
    type Action = u32;
    type Goal = GoalVertices;

    fn task_id(&self) -> &str {
        "flip_flop_goal"
    }

    fn generate_actions(&self, state: &u32) -> Vec<u32> {
        self.graph.generate_actions(state)
    }

    fn apply(&self, state: &u32, action: &u32) -> Result<u32, ApplyError> {
        self.graph.apply(state, action)
    }

    fn is_goal(&self, state: &u32, _goal: &GoalVertices) -> bool {
        *state == self.vertex && self.next.fetch_xor(true, Ordering::SeqCst)
    }
}

/// Graph task that panics in `stage` when it touches vertex `at`.
pub struct PanickingTask {
    pub graph: GraphTask,
    pub stage: AdapterStageV1,
    pub at: u32,
}

impl PanickingTask {
    fn trip(&self, stage: AdapterStageV1, state: u32) {
        assert!(
            !(stage == self.stage && state == self.at),
            "adapter fault injected at vertex {state}"
        );
    }
}

impl TaskAdapter for PanickingTask {
    type State = u32;
    type Action = u32;
    type Goal = GoalVertices;

    fn task_id(&self) -> &str {
        "panicking"
    }

    fn generate_actions(&self, state: &u32) -> Vec<u32> {
        self.trip(AdapterStageV1::GenerateActions, *state);
        self.graph.generate_actions(state)
    }

    fn apply(&self, state: &u32, action: &u32) -> Result<u32, ApplyError> {
        self.trip(AdapterStageV1::Apply, *state);
        self.graph.apply(state, action)
    }

    fn is_goal(&self, state: &u32, goal: &GoalVertices) -> bool {
        self.trip(AdapterStageV1::IsGoal, *state);
        self.graph.is_goal(state, goal)
    }
}
