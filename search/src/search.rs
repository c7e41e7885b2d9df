//! Search entry point and round loop.

use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};

use rayon::prelude::*;

use crate::beam::{BackupPool, Beam, VisitedIndex};
use crate::context::{limit_history, EvaluationRecordV1, OracleContext, RankRequest};
use crate::contract::TaskAdapter;
use crate::error::{AdapterStageV1, AdapterViolationV1, SearchError};
use crate::guard::{Backoff, DegradationKindV1, GuardedOracle, OracleStageV1, ThreadSleep};
use crate::node::{Score, SearchNode};
use crate::oracle::{ScoreSourceV1, ScoringOracle};
use crate::policy::{BeamPolicyV1, FallbackPolicyV1};
use crate::trace::{
    state_fingerprint, DegradationV1, FallbackAppliedV1, NodeSummaryV1, ReplenishEventV1,
    RoundEventV1, SearchTraceV1, TerminationReasonV1, TraceMetadataV1,
};

/// Terminal outcome of a run. `Exhausted` and `DepthLimitReached` are normal
/// results, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcomeV1<A> {
    Found { path: Vec<A> },
    Exhausted,
    DepthLimitReached,
}

impl<A> SearchOutcomeV1<A> {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Found { .. } => "found",
            Self::Exhausted => "exhausted",
            Self::DepthLimitReached => "depth_limit_reached",
        }
    }
}

/// Result of a search run: outcome plus the full audit trace.
#[derive(Debug, Clone)]
pub struct SearchResult<S, A> {
    pub outcome: SearchOutcomeV1<A>,
    /// The goal node (if found). Unscored.
    pub goal_node: Option<SearchNode<S, A>>,
    pub trace: SearchTraceV1,
}

impl<S, A> SearchResult<S, A> {
    #[must_use]
    pub fn is_goal_reached(&self) -> bool {
        matches!(self.outcome, SearchOutcomeV1::Found { .. })
    }

    /// The solution path, if a goal was reached.
    #[must_use]
    pub fn path(&self) -> Option<&[A]> {
        match &self.outcome {
            SearchOutcomeV1::Found { path } => Some(path),
            _ => None,
        }
    }

    /// Whether any oracle call fell back during the run.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.trace.is_degraded()
    }
}

/// Run oracle-guided beam search from `root` toward `goal`.
///
/// Retry backoff blocks the calling thread. Use [`search_with_backoff`] to
/// supply a different [`Backoff`].
///
/// # Errors
///
/// - [`SearchError::InvalidPolicy`] / [`SearchError::UnsupportedCapability`]
///   before any adapter or oracle call.
/// - [`SearchError::AdapterContractViolation`] if the adapter breaks its
///   contract mid-run; the run is aborted.
/// - [`SearchError::StateEncoding`] if a state cannot be fingerprinted.
pub fn search<T: TaskAdapter>(
    root: T::State,
    goal: &T::Goal,
    task: &T,
    oracle: &dyn ScoringOracle<T::State, T::Action, T::Goal>,
    policy: &BeamPolicyV1,
) -> Result<SearchResult<T::State, T::Action>, SearchError> {
    search_with_backoff(root, goal, task, oracle, policy, &ThreadSleep)
}

/// [`search`] with an explicit retry [`Backoff`].
///
/// # Errors
///
/// Same as [`search`].
pub fn search_with_backoff<T: TaskAdapter>(
    root: T::State,
    goal: &T::Goal,
    task: &T,
    oracle: &dyn ScoringOracle<T::State, T::Action, T::Goal>,
    policy: &BeamPolicyV1,
    backoff: &dyn Backoff,
) -> Result<SearchResult<T::State, T::Action>, SearchError> {
    policy.validate()?;
    if policy.use_ranking && !policy.batch_ranking && !oracle.supports_ranking() {
        return Err(SearchError::UnsupportedCapability {
            capability: "rank_actions",
        });
    }
    if policy.batch_ranking && !oracle.supports_batch_ranking() {
        return Err(SearchError::UnsupportedCapability {
            capability: "rank_batch",
        });
    }
    if policy.use_evaluation && !oracle.supports_evaluation() {
        return Err(SearchError::UnsupportedCapability {
            capability: "evaluate_batch",
        });
    }

    let policy_digest = policy.digest()?;
    let root_fingerprint = state_fingerprint(&root).map_err(encoding_error)?;

    let run = SearchRun {
        expander: Expander {
            task,
            goal,
            oracle: GuardedOracle::new(oracle, &policy.retry, backoff),
            policy,
        },
        policy,
        visited: VisitedIndex::new(),
        expanded: HashSet::new(),
        pool: BackupPool::new(policy.backup_pool_size),
        next_node_id: 1,
        rounds: Vec::new(),
        degradations: Vec::new(),
        oracle_calls: 0,
        oracle_retries: 0,
        replenishments: 0,
        beam_high_water: 1,
        root_fingerprint: root_fingerprint.hex_digest().to_string(),
        policy_digest: policy_digest.as_str().to_string(),
    };
    run.execute(SearchNode::root(root))
}

fn encoding_error(e: beamline_kernel::proof::canon::CanonError) -> SearchError {
    SearchError::StateEncoding {
        detail: e.to_string(),
    }
}

/// Adapter-side work for one beam node. Shared read-only across rayon
/// workers when expansion is parallel.
struct Expander<'a, T: TaskAdapter> {
    task: &'a T,
    goal: &'a T::Goal,
    oracle: GuardedOracle<'a, T::State, T::Action, T::Goal>,
    policy: &'a BeamPolicyV1,
}

struct RankingReport {
    attempts: u32,
    batch_len: u64,
    degradation: Option<DegradationKindV1>,
}

struct NodeExpansion<S, A> {
    successors: Vec<(A, S)>,
    dead_end: bool,
    capped: bool,
    ranking: Option<RankingReport>,
}

impl<S, A> NodeExpansion<S, A> {
    fn dead_end() -> Self {
        Self {
            successors: Vec::new(),
            dead_end: true,
            capped: false,
            ranking: None,
        }
    }
}

impl<T: TaskAdapter> Expander<'_, T> {
    fn expand_node(
        &self,
        node: &SearchNode<T::State, T::Action>,
    ) -> Result<NodeExpansion<T::State, T::Action>, AdapterViolationV1> {
        let actions = self.generate(node)?;
        if actions.is_empty() {
            return Ok(NodeExpansion::dead_end());
        }
        let (ordered, ranking) = if self.policy.use_ranking {
            let (ordered, report) = self.rank(node, actions);
            (ordered, Some(report))
        } else {
            (actions, None)
        };
        self.apply_all(node, ordered, ranking)
    }

    fn generate(
        &self,
        node: &SearchNode<T::State, T::Action>,
    ) -> Result<Vec<T::Action>, AdapterViolationV1> {
        catch_unwind(AssertUnwindSafe(|| self.task.generate_actions(&node.state))).map_err(|_| {
            AdapterViolationV1::Panicked {
                stage: AdapterStageV1::GenerateActions,
                node_id: node.node_id,
            }
        })
    }

    /// Per-node ranking. On failure the generated order is kept.
    fn rank(
        &self,
        node: &SearchNode<T::State, T::Action>,
        actions: Vec<T::Action>,
    ) -> (Vec<T::Action>, RankingReport) {
        let history = limit_history(&node.history, self.policy.history_limit);
        let context = OracleContext::new(&node.path, &history);
        let call = self.oracle.rank(&node.state, &actions, &context, self.goal);
        let batch_len = actions.len() as u64;
        match call.result {
            Ok(ranked) => (
                ranked,
                RankingReport {
                    attempts: call.attempts,
                    batch_len,
                    degradation: None,
                },
            ),
            Err(kind) => (
                actions,
                RankingReport {
                    attempts: call.attempts,
                    batch_len,
                    degradation: Some(kind),
                },
            ),
        }
    }

    /// Cap `ordered` and apply what is left. An empty list is a dead end.
    fn apply_all(
        &self,
        node: &SearchNode<T::State, T::Action>,
        mut ordered: Vec<T::Action>,
        ranking: Option<RankingReport>,
    ) -> Result<NodeExpansion<T::State, T::Action>, AdapterViolationV1> {
        if ordered.is_empty() {
            return Ok(NodeExpansion::dead_end());
        }
        let mut capped = false;
        if let Some(limit) = self.policy.per_node_expansion_limit {
            if ordered.len() > limit {
                ordered.truncate(limit);
                capped = true;
            }
        }

        let mut successors = Vec::with_capacity(ordered.len());
        for action in ordered {
            let applied = catch_unwind(AssertUnwindSafe(|| self.task.apply(&node.state, &action)))
                .map_err(|_| AdapterViolationV1::Panicked {
                    stage: AdapterStageV1::Apply,
                    node_id: node.node_id,
                })?;
            let next = applied.map_err(|e| AdapterViolationV1::InvalidAction {
                node_id: node.node_id,
                detail: e.to_string(),
            })?;
            successors.push((action, next));
        }

        Ok(NodeExpansion {
            successors,
            dead_end: false,
            capped,
            ranking,
        })
    }

    /// `is_goal` with a confirming re-check on a positive answer.
    fn goal_test(&self, state: &T::State, node_id: u64) -> Result<bool, AdapterViolationV1> {
        let test = || {
            catch_unwind(AssertUnwindSafe(|| self.task.is_goal(state, self.goal))).map_err(|_| {
                AdapterViolationV1::Panicked {
                    stage: AdapterStageV1::IsGoal,
                    node_id,
                }
            })
        };
        if !test()? {
            return Ok(false);
        }
        if test()? {
            Ok(true)
        } else {
            Err(AdapterViolationV1::NondeterministicGoal { node_id })
        }
    }
}

/// An admitted successor waiting to be scored.
struct Candidate<S, A> {
    node_id: u64,
    parent_id: u64,
    depth: u32,
    path: Vec<A>,
    state: S,
    /// The parent's evaluation history.
    history: Vec<EvaluationRecordV1>,
}

impl<S, A> Candidate<S, A> {
    fn into_node(self, score: Option<Score>, score_source: ScoreSourceV1) -> SearchNode<S, A> {
        let mut history = self.history;
        if let (ScoreSourceV1::Oracle, Some(score)) = (score_source, score) {
            history.push(EvaluationRecordV1 {
                node_id: self.node_id,
                depth: self.depth,
                score,
            });
        }
        SearchNode {
            node_id: self.node_id,
            parent_id: Some(self.parent_id),
            state: self.state,
            path: self.path,
            depth: self.depth,
            score,
            score_source,
            history,
        }
    }
}

enum RoundOutcome<S, A> {
    Goal(SearchNode<S, A>),
    Continue(Beam<S, A>),
    Exhausted,
}

/// Everything one run owns.
struct SearchRun<'a, T: TaskAdapter> {
    expander: Expander<'a, T>,
    policy: &'a BeamPolicyV1,
    visited: VisitedIndex<T::State>,
    expanded: HashSet<T::State>,
    pool: BackupPool<T::State, T::Action>,
    next_node_id: u64,
    rounds: Vec<RoundEventV1>,
    degradations: Vec<DegradationV1>,
    oracle_calls: u64,
    oracle_retries: u64,
    replenishments: u64,
    beam_high_water: usize,
    root_fingerprint: String,
    policy_digest: String,
}

impl<T: TaskAdapter> SearchRun<'_, T> {
    fn execute(
        mut self,
        root: SearchNode<T::State, T::Action>,
    ) -> Result<SearchResult<T::State, T::Action>, SearchError> {
        if self.expander.goal_test(&root.state, root.node_id)? {
            let termination = TerminationReasonV1::GoalReached {
                node_id: root.node_id,
                depth: 0,
            };
            return Ok(self.finish(
                SearchOutcomeV1::Found { path: Vec::new() },
                Some(root),
                termination,
            ));
        }

        self.visited.admit(&root.state, 0);
        let mut beam = Beam::seed(root, self.policy.beam_width);

        for round in 0..self.policy.max_depth {
            match self.round(round, &beam)? {
                RoundOutcome::Goal(node) => {
                    let termination = TerminationReasonV1::GoalReached {
                        node_id: node.node_id,
                        depth: node.depth,
                    };
                    let path = node.path.clone();
                    return Ok(self.finish(SearchOutcomeV1::Found { path }, Some(node), termination));
                }
                RoundOutcome::Continue(next) => beam = next,
                RoundOutcome::Exhausted => {
                    return Ok(self.finish(
                        SearchOutcomeV1::Exhausted,
                        None,
                        TerminationReasonV1::Exhausted { round },
                    ));
                }
            }
        }

        let max_depth = self.policy.max_depth;
        Ok(self.finish(
            SearchOutcomeV1::DepthLimitReached,
            None,
            TerminationReasonV1::DepthLimitReached { max_depth },
        ))
    }

    fn round(
        &mut self,
        round: u32,
        beam: &Beam<T::State, T::Action>,
    ) -> Result<RoundOutcome<T::State, T::Action>, SearchError> {
        let mut event = RoundEventV1 {
            round,
            beam: beam
                .nodes()
                .iter()
                .map(NodeSummaryV1::of)
                .collect::<Result<_, _>>()
                .map_err(encoding_error)?,
            candidates_generated: 0,
            duplicates_suppressed: 0,
            dead_end_node_ids: Vec::new(),
            expansion_cap_hits: 0,
            candidates_scored: 0,
            candidates_excluded: 0,
            next_beam_len: 0,
            backup_pool_len: 0,
            replenishment: None,
        };
        for node in beam.nodes() {
            self.expanded.insert(node.state.clone());
        }

        let mut candidates = Vec::new();
        if let Some(goal) = self.expand_beam(round, beam, &mut event, &mut candidates)? {
            self.rounds.push(event);
            return Ok(RoundOutcome::Goal(goal));
        }

        let scored = self.score(round, candidates, &mut event);
        let (mut next, overflow) = Beam::select(scored, self.policy.beam_width);
        event.next_beam_len = next.len() as u64;
        self.pool.absorb(overflow);

        if next.is_empty() && !self.pool.is_empty() {
            let expanded = &self.expanded;
            let visited = &self.visited;
            // Eligible: never expanded, and not superseded by a shallower
            // rediscovery of the same state.
            let (pulled, stale) = self.pool.take_best(self.policy.beam_width, |n| {
                !expanded.contains(&n.state) && visited.depth_of(&n.state) == Some(n.depth)
            });
            event.replenishment = Some(ReplenishEventV1 {
                pulled_node_ids: pulled.iter().map(|n| n.node_id).collect(),
                stale_dropped: stale as u64,
            });
            if !pulled.is_empty() {
                self.replenishments += 1;
                next = Beam::recovered(pulled, self.policy.beam_width);
            }
        }

        event.backup_pool_len = self.pool.len() as u64;
        self.rounds.push(event);
        self.beam_high_water = self.beam_high_water.max(next.len());

        if next.is_empty() {
            Ok(RoundOutcome::Exhausted)
        } else {
            Ok(RoundOutcome::Continue(next))
        }
    }

    /// Expand every beam node in beam order and integrate the results.
    /// Stops at the first goal.
    fn expand_beam(
        &mut self,
        round: u32,
        beam: &Beam<T::State, T::Action>,
        event: &mut RoundEventV1,
        candidates: &mut Vec<Candidate<T::State, T::Action>>,
    ) -> Result<Option<SearchNode<T::State, T::Action>>, SearchError> {
        if self.policy.batch_ranking {
            let ordered = self.rank_beam(round, beam)?;
            if self.policy.parallel_expansion {
                let expander = &self.expander;
                let expansions: Vec<_> = beam
                    .nodes()
                    .par_iter()
                    .zip(ordered.into_par_iter())
                    .map(|(node, actions)| expander.apply_all(node, actions, None))
                    .collect();
                return self.integrate_all(round, beam, expansions, event, candidates);
            }
            for (parent, actions) in beam.nodes().iter().zip(ordered) {
                let expansion = self.expander.apply_all(parent, actions, None)?;
                if let Some(goal) = self.integrate(round, parent, expansion, event, candidates)? {
                    return Ok(Some(goal));
                }
            }
        } else if self.policy.parallel_expansion {
            let expander = &self.expander;
            let expansions: Vec<_> = beam
                .nodes()
                .par_iter()
                .map(|node| expander.expand_node(node))
                .collect();
            return self.integrate_all(round, beam, expansions, event, candidates);
        } else {
            for parent in beam.nodes() {
                let expansion = self.expander.expand_node(parent)?;
                if let Some(goal) = self.integrate(round, parent, expansion, event, candidates)? {
                    return Ok(Some(goal));
                }
            }
        }
        Ok(None)
    }

    fn integrate_all(
        &mut self,
        round: u32,
        beam: &Beam<T::State, T::Action>,
        expansions: Vec<Result<NodeExpansion<T::State, T::Action>, AdapterViolationV1>>,
        event: &mut RoundEventV1,
        candidates: &mut Vec<Candidate<T::State, T::Action>>,
    ) -> Result<Option<SearchNode<T::State, T::Action>>, SearchError> {
        for (parent, expansion) in beam.nodes().iter().zip(expansions) {
            if let Some(goal) = self.integrate(round, parent, expansion?, event, candidates)? {
                return Ok(Some(goal));
            }
        }
        Ok(None)
    }

    /// Generate every beam node's actions, then order them all with one
    /// `rank_batch` call. Nodes without actions are left out of the request
    /// and come back empty. On failure every list keeps its generated order.
    fn rank_beam(
        &mut self,
        round: u32,
        beam: &Beam<T::State, T::Action>,
    ) -> Result<Vec<Vec<T::Action>>, SearchError> {
        let expander = &self.expander;
        let mut actions: Vec<Vec<T::Action>> = if self.policy.parallel_expansion {
            let generated: Vec<_> = beam
                .nodes()
                .par_iter()
                .map(|node| expander.generate(node))
                .collect();
            generated.into_iter().collect::<Result<_, _>>()?
        } else {
            beam.nodes()
                .iter()
                .map(|node| expander.generate(node))
                .collect::<Result<_, _>>()?
        };
        let batch_len = actions.iter().filter(|a| !a.is_empty()).count() as u64;
        if batch_len == 0 {
            return Ok(actions);
        }

        let histories: Vec<_> = beam
            .nodes()
            .iter()
            .map(|node| limit_history(&node.history, self.policy.history_limit))
            .collect();
        let call = {
            let requests: Vec<RankRequest<'_, T::State, T::Action>> = beam
                .nodes()
                .iter()
                .zip(&actions)
                .zip(&histories)
                .filter(|((_, list), _)| !list.is_empty())
                .map(|((node, list), history)| RankRequest {
                    state: &node.state,
                    actions: list,
                    context: OracleContext::new(&node.path, history),
                })
                .collect();
            self.expander.oracle.rank_batch(&requests, self.expander.goal)
        };
        self.oracle_calls += u64::from(call.attempts);
        self.oracle_retries += u64::from(call.retries());

        match call.result {
            Ok(rankings) => {
                let mut rankings = rankings.into_iter();
                for list in actions.iter_mut().filter(|a| !a.is_empty()) {
                    if let Some(ranked) = rankings.next() {
                        *list = ranked;
                    }
                }
            }
            Err(kind) => self.degradations.push(DegradationV1 {
                round,
                stage: OracleStageV1::RankBatch,
                node_id: None,
                batch_len,
                attempts: call.attempts,
                kind,
                fallback: FallbackAppliedV1::OriginalOrder,
            }),
        }
        Ok(actions)
    }

    /// Fold one node's expansion into the round: ranking bookkeeping,
    /// dedup, id assignment, goal check. Returns the goal node if found.
    fn integrate(
        &mut self,
        round: u32,
        parent: &SearchNode<T::State, T::Action>,
        expansion: NodeExpansion<T::State, T::Action>,
        event: &mut RoundEventV1,
        candidates: &mut Vec<Candidate<T::State, T::Action>>,
    ) -> Result<Option<SearchNode<T::State, T::Action>>, SearchError> {
        if let Some(report) = expansion.ranking {
            self.oracle_calls += u64::from(report.attempts);
            self.oracle_retries += u64::from(report.attempts.saturating_sub(1));
            if let Some(kind) = report.degradation {
                self.degradations.push(DegradationV1 {
                    round,
                    stage: OracleStageV1::Rank,
                    node_id: Some(parent.node_id),
                    batch_len: report.batch_len,
                    attempts: report.attempts,
                    kind,
                    fallback: FallbackAppliedV1::OriginalOrder,
                });
            }
        }
        if expansion.dead_end {
            event.dead_end_node_ids.push(parent.node_id);
            return Ok(None);
        }
        if expansion.capped {
            event.expansion_cap_hits += 1;
        }

        let depth = parent.depth + 1;
        for (action, state) in expansion.successors {
            event.candidates_generated += 1;
            if !self.visited.admit(&state, depth) {
                event.duplicates_suppressed += 1;
                continue;
            }
            let node_id = self.next_node_id;
            self.next_node_id += 1;

            let mut path = parent.path.clone();
            path.push(action);
            let candidate = Candidate {
                node_id,
                parent_id: parent.node_id,
                depth,
                path,
                state,
                history: parent.history.clone(),
            };
            if self.expander.goal_test(&candidate.state, node_id)? {
                return Ok(Some(candidate.into_node(None, ScoreSourceV1::Unscored)));
            }
            candidates.push(candidate);
        }
        Ok(None)
    }

    /// Batch-score admitted candidates, applying the fallback to failed
    /// batches.
    fn score(
        &mut self,
        round: u32,
        candidates: Vec<Candidate<T::State, T::Action>>,
        event: &mut RoundEventV1,
    ) -> Vec<SearchNode<T::State, T::Action>> {
        if !self.policy.use_evaluation {
            return candidates
                .into_iter()
                .map(|c| c.into_node(None, ScoreSourceV1::Unscored))
                .collect();
        }

        let chunk = self
            .policy
            .max_batch_size
            .unwrap_or(candidates.len())
            .max(1);
        let mut nodes = Vec::with_capacity(candidates.len());
        let mut remaining = candidates.into_iter().peekable();
        while remaining.peek().is_some() {
            let batch: Vec<_> = remaining.by_ref().take(chunk).collect();
            let states: Vec<T::State> = batch.iter().map(|c| c.state.clone()).collect();
            let call = {
                let histories: Vec<_> = batch
                    .iter()
                    .map(|c| limit_history(&c.history, self.policy.history_limit))
                    .collect();
                let contexts: Vec<_> = batch
                    .iter()
                    .zip(&histories)
                    .map(|(c, history)| OracleContext::new(&c.path, history))
                    .collect();
                self.expander.oracle.evaluate(&states, &contexts, self.expander.goal)
            };
            self.oracle_calls += u64::from(call.attempts);
            self.oracle_retries += u64::from(call.retries());

            match call.result {
                Ok(scores) => {
                    event.candidates_scored += batch.len() as u64;
                    nodes.extend(
                        batch
                            .into_iter()
                            .zip(scores)
                            .map(|(c, s)| c.into_node(Some(s), ScoreSourceV1::Oracle)),
                    );
                }
                Err(kind) => {
                    let fallback = match self.policy.fallback {
                        FallbackPolicyV1::NeutralScore => {
                            nodes.extend(batch.into_iter().map(|c| {
                                c.into_node(Some(Score::MIN), ScoreSourceV1::Fallback)
                            }));
                            FallbackAppliedV1::NeutralScore
                        }
                        FallbackPolicyV1::Exclude => {
                            event.candidates_excluded += batch.len() as u64;
                            FallbackAppliedV1::Excluded
                        }
                    };
                    self.degradations.push(DegradationV1 {
                        round,
                        stage: OracleStageV1::Evaluate,
                        node_id: None,
                        batch_len: states.len() as u64,
                        attempts: call.attempts,
                        kind,
                        fallback,
                    });
                }
            }
        }
        nodes
    }

    fn finish(
        self,
        outcome: SearchOutcomeV1<T::Action>,
        goal_node: Option<SearchNode<T::State, T::Action>>,
        termination: TerminationReasonV1,
    ) -> SearchResult<T::State, T::Action> {
        let metadata = TraceMetadataV1 {
            task_id: self.expander.task.task_id().to_string(),
            oracle_id: self.expander.oracle.oracle_id().to_string(),
            root_state_fingerprint: self.root_fingerprint,
            policy_digest: self.policy_digest,
            total_rounds: self.rounds.len() as u64,
            total_candidates_generated: self.rounds.iter().map(|r| r.candidates_generated).sum(),
            total_duplicates_suppressed: self
                .rounds
                .iter()
                .map(|r| r.duplicates_suppressed)
                .sum(),
            total_oracle_calls: self.oracle_calls,
            total_oracle_retries: self.oracle_retries,
            total_replenishments: self.replenishments,
            beam_high_water: self.beam_high_water as u64,
            backup_high_water: self.pool.high_water() as u64,
            termination,
        };
        SearchResult {
            outcome,
            goal_node,
            trace: SearchTraceV1 {
                rounds: self.rounds,
                degradations: self.degradations,
                metadata,
            },
        }
    }
}
