//! Seated-prefix heuristic for Tower of Hanoi.

use beamline_search::oracle::{OracleError, ScoringOracle};

use crate::tasks::hanoi::{HanoiMove, Peg, Towers};

/// Scores a state by how many of the goal's bottom disks already sit, in
/// order, on the target peg. Ranks moves by the score of the state they
/// produce; ties keep generation order.
#[derive(Debug, Clone, Copy)]
pub struct HanoiHeuristicOracle {
    target: Peg,
}

impl HanoiHeuristicOracle {
    #[must_use]
    pub fn new(target: Peg) -> Self {
        Self { target }
    }

    #[allow(clippy::cast_precision_loss)]
    fn score(&self, state: &Towers, goal: &Towers) -> f64 {
        let total = goal.peg(self.target).len();
        if total == 0 {
            return 1.0;
        }
        let seated = state
            .peg(self.target)
            .iter()
            .zip(goal.peg(self.target))
            .take_while(|(have, want)| have == want)
            .count();
        seated as f64 / total as f64
    }
}

impl ScoringOracle<Towers, HanoiMove, Towers> for HanoiHeuristicOracle {
    fn oracle_id(&self) -> &str {
        "hanoi_seated_prefix"
    }

    fn evaluate_batch(&self, states: &[Towers], goal: &Towers) -> Result<Vec<f64>, OracleError> {
        Ok(states.iter().map(|s| self.score(s, goal)).collect())
    }

    fn rank_actions(
        &self,
        state: &Towers,
        actions: &[HanoiMove],
        goal: &Towers,
    ) -> Result<Vec<HanoiMove>, OracleError> {
        let mut scored: Vec<(f64, HanoiMove)> = actions
            .iter()
            .map(|&mv| {
                let value = state.moved(mv).map_or(-1.0, |next| self.score(&next, goal));
                (value, mv)
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        Ok(scored.into_iter().map(|(_, mv)| mv).collect())
    }

    fn supports_ranking(&self) -> bool {
        true
    }
}
