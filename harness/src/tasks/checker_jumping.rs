//! One-piece checker jumping on a strip.
//!
//! The piece moves right only: a step into an adjacent empty cell, or a
//! jump over a single obstacle into the empty cell behind it.

use serde::{Deserialize, Serialize};

use beamline_search::contract::{ApplyError, TaskAdapter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cell {
    Empty,
    Obstacle,
    Piece,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Strip {
    cells: Vec<Cell>,
}

impl Strip {
    /// Parse `"P#.#."`: `P` piece, `#` obstacle, `.` empty.
    ///
    /// Returns `None` on an unknown symbol or unless exactly one piece is
    /// present.
    #[must_use]
    pub fn parse(layout: &str) -> Option<Self> {
        let cells = layout
            .chars()
            .map(|c| match c {
                'P' => Some(Cell::Piece),
                '#' => Some(Cell::Obstacle),
                '.' => Some(Cell::Empty),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?;
        let pieces = cells.iter().filter(|&&c| c == Cell::Piece).count();
        (pieces == 1).then_some(Self { cells })
    }

    /// A strip of `len` cells that is always solvable by jumping: the piece
    /// at 0 and obstacles at every odd index short of the last cell.
    #[must_use]
    pub fn solvable(len: usize) -> Self {
        let cells = (0..len)
            .map(|i| match i {
                0 => Cell::Piece,
                i if i % 2 == 1 && i + 1 < len => Cell::Obstacle,
                _ => Cell::Empty,
            })
            .collect();
        Self { cells }
    }

    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Index of the piece.
    #[must_use]
    pub fn piece(&self) -> Option<usize> {
        self.cells.iter().position(|&c| c == Cell::Piece)
    }

    fn cell(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    fn is_legal(&self, hop: Hop) -> bool {
        if self.piece() != Some(hop.from) {
            return false;
        }
        match hop.to.checked_sub(hop.from) {
            Some(1) => self.cell(hop.to) == Some(Cell::Empty),
            Some(2) => {
                self.cell(hop.from + 1) == Some(Cell::Obstacle)
                    && self.cell(hop.to) == Some(Cell::Empty)
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hop {
    pub from: usize,
    pub to: usize,
}

/// Bring the piece to `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReachCell {
    pub target: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CheckerJumping;

impl TaskAdapter for CheckerJumping {
    type State = Strip;
    type Action = Hop;
    type Goal = ReachCell;

    fn task_id(&self) -> &str {
        "checker_jumping"
    }

    fn generate_actions(&self, state: &Strip) -> Vec<Hop> {
        let Some(from) = state.piece() else {
            return Vec::new();
        };
        [1, 2]
            .into_iter()
            .map(|d| Hop { from, to: from + d })
            .filter(|&hop| state.is_legal(hop))
            .collect()
    }

    fn apply(&self, state: &Strip, action: &Hop) -> Result<Strip, ApplyError> {
        if !state.is_legal(*action) {
            return Err(ApplyError::InvalidAction {
                detail: format!("hop {} -> {} is not legal", action.from, action.to),
            });
        }
        let mut cells = state.cells.clone();
        cells[action.from] = Cell::Empty;
        cells[action.to] = Cell::Piece;
        Ok(Strip { cells })
    }

    fn is_goal(&self, state: &Strip, goal: &ReachCell) -> bool {
        state.piece() == Some(goal.target)
    }
}
