//! Fixed score table.

use std::collections::HashMap;
use std::hash::Hash;

use beamline_search::oracle::{OracleError, ScoringOracle};

/// Looks each state up in a table; unknown states get `default`.
///
/// Values are returned as stored. Out-of-range entries are left for the
/// guard to reject, which makes this handy for exercising validation.
#[derive(Debug, Clone)]
pub struct TableOracle<S> {
    oracle_id: String,
    scores: HashMap<S, f64>,
    default: f64,
}

impl<S: Eq + Hash> TableOracle<S> {
    #[must_use]
    pub fn new(oracle_id: impl Into<String>, default: f64) -> Self {
        Self {
            oracle_id: oracle_id.into(),
            scores: HashMap::new(),
            default,
        }
    }

    #[must_use]
    pub fn with(mut self, state: S, score: f64) -> Self {
        self.scores.insert(state, score);
        self
    }
}

impl<S, A, G> ScoringOracle<S, A, G> for TableOracle<S>
where
    S: Eq + Hash + Send + Sync,
{
    fn oracle_id(&self) -> &str {
        &self.oracle_id
    }

    fn evaluate_batch(&self, states: &[S], _goal: &G) -> Result<Vec<f64>, OracleError> {
        Ok(states
            .iter()
            .map(|s| self.scores.get(s).copied().unwrap_or(self.default))
            .collect())
    }
}
