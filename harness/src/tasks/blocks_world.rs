//! Blocks World: rearrange lettered blocks stacked on a table.

use serde::{Deserialize, Serialize};

use beamline_search::contract::{ApplyError, TaskAdapter};

/// Stacks of blocks, each listed bottom to top.
///
/// Normalized on construction (empty stacks removed, stacks sorted) so two
/// arrangements that differ only in stack order compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Blocks {
    stacks: Vec<Vec<char>>,
}

impl Blocks {
    #[must_use]
    pub fn new(mut stacks: Vec<Vec<char>>) -> Self {
        stacks.retain(|s| !s.is_empty());
        stacks.sort();
        Self { stacks }
    }

    /// Parse `"AB C"`: stacks separated by spaces, each bottom to top.
    #[must_use]
    pub fn parse(layout: &str) -> Self {
        Self::new(
            layout
                .split_whitespace()
                .map(|s| s.chars().collect())
                .collect(),
        )
    }

    #[must_use]
    pub fn stacks(&self) -> &[Vec<char>] {
        &self.stacks
    }

    fn stack_topped_by(&self, block: char) -> Option<usize> {
        self.stacks.iter().position(|s| s.last() == Some(&block))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Table,
    Onto(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockMove {
    pub block: char,
    pub to: Destination,
}

/// Reach an exact target arrangement.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlocksWorld;

impl TaskAdapter for BlocksWorld {
    type State = Blocks;
    type Action = BlockMove;
    type Goal = Blocks;

    fn task_id(&self) -> &str {
        "blocks_world"
    }

    fn generate_actions(&self, state: &Blocks) -> Vec<BlockMove> {
        let mut moves = Vec::new();
        for (i, stack) in state.stacks.iter().enumerate() {
            let Some(&block) = stack.last() else {
                continue;
            };
            if stack.len() > 1 {
                moves.push(BlockMove {
                    block,
                    to: Destination::Table,
                });
            }
            for (j, other) in state.stacks.iter().enumerate() {
                if i == j {
                    continue;
                }
                if let Some(&under) = other.last() {
                    moves.push(BlockMove {
                        block,
                        to: Destination::Onto(under),
                    });
                }
            }
        }
        moves
    }

    fn apply(&self, state: &Blocks, action: &BlockMove) -> Result<Blocks, ApplyError> {
        let invalid = |why: &str| ApplyError::InvalidAction {
            detail: format!("cannot move {} to {:?}: {why}", action.block, action.to),
        };
        let from = state
            .stack_topped_by(action.block)
            .ok_or_else(|| invalid("block is not on top of a stack"))?;

        let mut stacks = state.stacks.clone();
        match action.to {
            Destination::Table => {
                if stacks[from].len() == 1 {
                    return Err(invalid("block is already alone on the table"));
                }
                stacks[from].pop();
                stacks.push(vec![action.block]);
            }
            Destination::Onto(under) => {
                let to = state
                    .stack_topped_by(under)
                    .filter(|&to| to != from)
                    .ok_or_else(|| invalid("target is not the top of another stack"))?;
                stacks[from].pop();
                stacks[to].push(action.block);
            }
        }
        Ok(Blocks::new(stacks))
    }

    fn is_goal(&self, state: &Blocks, goal: &Blocks) -> bool {
        state == goal
    }
}
