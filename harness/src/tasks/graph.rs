//! Explicit directed graph: states are vertices, actions are edges.
//!
//! Small, hand-written graphs make engine behavior easy to pin down in
//! tests (dead ends, duplicates, recovery from the backup pool).

use std::collections::{BTreeMap, BTreeSet};

use beamline_search::contract::{ApplyError, TaskAdapter};

#[derive(Debug, Clone)]
pub struct GraphTask {
    task_id: String,
    edges: BTreeMap<u32, Vec<u32>>,
}

impl GraphTask {
    #[must_use]
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            edges: BTreeMap::new(),
        }
    }

    /// Build from an edge list. Successor order follows list order.
    #[must_use]
    pub fn from_edges(task_id: impl Into<String>, edges: &[(u32, u32)]) -> Self {
        edges
            .iter()
            .fold(Self::new(task_id), |g, &(from, to)| g.edge(from, to))
    }

    #[must_use]
    pub fn edge(mut self, from: u32, to: u32) -> Self {
        self.edges.entry(from).or_default().push(to);
        self
    }

    #[must_use]
    pub fn successors(&self, vertex: u32) -> &[u32] {
        self.edges.get(&vertex).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Any vertex in the set is a goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalVertices(pub BTreeSet<u32>);

impl GoalVertices {
    #[must_use]
    pub fn single(vertex: u32) -> Self {
        Self(BTreeSet::from([vertex]))
    }
}

impl TaskAdapter for GraphTask {
    type State = u32;
    /// The destination vertex.
    type Action = u32;
    type Goal = GoalVertices;

    fn task_id(&self) -> &str {
        &self.task_id
    }

    fn generate_actions(&self, state: &u32) -> Vec<u32> {
        self.successors(*state).to_vec()
    }

    fn apply(&self, state: &u32, action: &u32) -> Result<u32, ApplyError> {
        if self.successors(*state).contains(action) {
            Ok(*action)
        } else {
            Err(ApplyError::InvalidAction {
                detail: format!("no edge {state} -> {action}"),
            })
        }
    }

    fn is_goal(&self, state: &u32, goal: &GoalVertices) -> bool {
        goal.0.contains(state)
    }
}
