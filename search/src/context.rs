//! What an oracle sees about a candidate besides its state.
//!
//! Each node carries the accepted oracle scores along its path. Before a
//! call the engine trims that record with [`limit_history`] and hands the
//! oracle an [`OracleContext`] per state: the action path and the trimmed
//! evaluation history. Oracles that ignore context get the plain
//! `evaluate_batch` / `rank_actions` calls through the trait defaults.

use crate::node::Score;

/// Number of best and worst scores always kept by [`limit_history`].
pub const HISTORY_EXTREMES: usize = 3;

/// One accepted oracle score on the path to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationRecordV1 {
    pub node_id: u64,
    pub depth: u32,
    pub score: Score,
}

/// Per-state context passed alongside an oracle request.
#[derive(Debug)]
pub struct OracleContext<'a, A> {
    /// Actions from the root to the state under consideration.
    pub path: &'a [A],
    /// Accepted scores of the state's ancestors (and, when ranking, of the
    /// state itself), root first, already trimmed to the policy limit.
    pub history: &'a [EvaluationRecordV1],
}

impl<A> Clone for OracleContext<'_, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A> Copy for OracleContext<'_, A> {}

impl<'a, A> OracleContext<'a, A> {
    #[must_use]
    pub fn new(path: &'a [A], history: &'a [EvaluationRecordV1]) -> Self {
        Self { path, history }
    }

    /// No path, no history: what a context-free call sees.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            path: &[],
            history: &[],
        }
    }
}

/// One state's share of a batched ranking call.
#[derive(Debug)]
pub struct RankRequest<'a, S, A> {
    pub state: &'a S,
    pub actions: &'a [A],
    pub context: OracleContext<'a, A>,
}

/// Trim `history` to at most `limit` records, deterministically.
///
/// Up to [`HISTORY_EXTREMES`] best and as many worst scores are kept (never
/// more than half of `limit` each); the remaining slots go to the most
/// recent records. The result keeps path order. Equal scores prefer the
/// older record among the best and the newer one among the worst.
#[must_use]
pub fn limit_history(history: &[EvaluationRecordV1], limit: usize) -> Vec<EvaluationRecordV1> {
    if history.len() <= limit {
        return history.to_vec();
    }
    let extremes = HISTORY_EXTREMES.min(limit / 2);
    let mut by_score: Vec<usize> = (0..history.len()).collect();
    by_score.sort_by(|&a, &b| history[b].score.cmp(&history[a].score).then(a.cmp(&b)));

    let mut keep = vec![false; history.len()];
    for &i in by_score.iter().take(extremes) {
        keep[i] = true;
    }
    for &i in by_score.iter().rev().take(extremes) {
        keep[i] = true;
    }
    let mut remaining = limit - 2 * extremes;
    for i in (0..history.len()).rev() {
        if remaining == 0 {
            break;
        }
        if !keep[i] {
            keep[i] = true;
            remaining -= 1;
        }
    }

    history
        .iter()
        .zip(keep)
        .filter_map(|(record, kept)| kept.then_some(*record))
        .collect()
}
