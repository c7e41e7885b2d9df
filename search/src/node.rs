//! Search nodes, validated scores, and the beam ordering key.

use crate::context::EvaluationRecordV1;
use crate::oracle::ScoreSourceV1;

/// A score in `[0, 1]`.
///
/// Only constructible from finite in-range values, so every score that
/// reaches beam or pool ordering has already been validated. Ordered with
/// `f64::total_cmp`; `-0.0` is normalized to `0.0` so equality and ordering
/// agree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score(f64);

impl Score {
    /// Maximally unpromising. Also the neutral fallback value.
    pub const MIN: Score = Score(0.0);
    /// Goal-equivalent.
    pub const MAX: Score = Score(1.0);

    /// Validate a raw oracle value. Returns `None` for NaN, infinities, and
    /// anything outside `[0, 1]`.
    #[must_use]
    pub fn new(raw: f64) -> Option<Self> {
        if (0.0..=1.0).contains(&raw) {
            Some(Self(raw.abs()))
        } else {
            None
        }
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Integer micro-units (`round(score * 1e6)`), the form written to
    /// canonical JSON.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn micros(self) -> u64 {
        (self.0 * 1_000_000.0).round() as u64
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// An explored configuration plus the path that reached it.
///
/// Built once, after scoring, and never mutated.
#[derive(Debug, Clone)]
pub struct SearchNode<S, A> {
    /// Monotonic identifier; root is 0. Assigned in admission order.
    pub node_id: u64,
    /// Parent node ID (`None` for root).
    pub parent_id: Option<u64>,
    pub state: S,
    /// Actions from the root state to `state`.
    pub path: Vec<A>,
    /// Tree depth (root = 0), equal to `path.len()`.
    pub depth: u32,
    /// `None` when evaluation is disabled, for the root, and for goal nodes.
    pub score: Option<Score>,
    pub score_source: ScoreSourceV1,
    /// Oracle-accepted scores along the path, root first, this node's own
    /// included. Fallback scores are not recorded.
    pub history: Vec<EvaluationRecordV1>,
}

impl<S, A> SearchNode<S, A> {
    /// The initial node: depth 0, empty path, unscored.
    #[must_use]
    pub fn root(state: S) -> Self {
        Self {
            node_id: 0,
            parent_id: None,
            state,
            path: Vec::new(),
            depth: 0,
            score: None,
            score_source: ScoreSourceV1::Unscored,
            history: Vec::new(),
        }
    }

    #[must_use]
    pub fn key(&self) -> BeamKey {
        BeamKey::from(self)
    }
}

/// Ordering key shared by the beam and the backup pool.
///
/// Higher score first; scored nodes before unscored ones; ties broken by
/// lower `node_id`. Since IDs are assigned in admission order this is the
/// same order a stable descending sort by score produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeamKey {
    pub score: Option<Score>,
    pub node_id: u64,
}

impl PartialOrd for BeamKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BeamKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .score
            .cmp(&self.score)
            .then(self.node_id.cmp(&other.node_id))
    }
}

impl<S, A> From<&SearchNode<S, A>> for BeamKey {
    fn from(node: &SearchNode<S, A>) -> Self {
        Self {
            score: node.score,
            node_id: node.node_id,
        }
    }
}
