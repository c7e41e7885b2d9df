//! Tower of Hanoi: three pegs, disks numbered 1 (smallest) to n.

use serde::{Deserialize, Serialize};

use beamline_search::contract::{ApplyError, TaskAdapter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Peg {
    A,
    B,
    C,
}

impl Peg {
    pub const ALL: [Peg; 3] = [Peg::A, Peg::B, Peg::C];

    fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::C => 2,
        }
    }
}

/// Peg contents, each listed bottom to top.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Towers {
    pegs: [Vec<u8>; 3],
}

impl Towers {
    #[must_use]
    pub fn new(a: Vec<u8>, b: Vec<u8>, c: Vec<u8>) -> Self {
        Self { pegs: [a, b, c] }
    }

    /// All `disks` stacked largest-first on `peg`.
    #[must_use]
    pub fn stacked(disks: u8, peg: Peg) -> Self {
        let mut pegs: [Vec<u8>; 3] = Default::default();
        pegs[peg.index()] = (1..=disks).rev().collect();
        Self { pegs }
    }

    #[must_use]
    pub fn peg(&self, peg: Peg) -> &[u8] {
        &self.pegs[peg.index()]
    }

    #[must_use]
    pub fn top(&self, peg: Peg) -> Option<u8> {
        self.peg(peg).last().copied()
    }

    #[must_use]
    pub fn disk_count(&self) -> usize {
        self.pegs.iter().map(Vec::len).sum()
    }

    /// Whether `mv` is legal here: source non-empty, destination empty or
    /// topped by a larger disk.
    #[must_use]
    pub fn allows(&self, mv: HanoiMove) -> bool {
        if mv.from == mv.to {
            return false;
        }
        match (self.top(mv.from), self.top(mv.to)) {
            (Some(disk), Some(under)) => disk < under,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    /// The arrangement after `mv`, or `None` if the move is illegal.
    #[must_use]
    pub fn moved(&self, mv: HanoiMove) -> Option<Self> {
        if !self.allows(mv) {
            return None;
        }
        let mut next = self.clone();
        let disk = next.pegs[mv.from.index()].pop()?;
        next.pegs[mv.to.index()].push(disk);
        Some(next)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HanoiMove {
    pub from: Peg,
    pub to: Peg,
}

impl std::fmt::Display for HanoiMove {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}->{:?}", self.from, self.to)
    }
}

/// Move every disk from `source` to `target`.
#[derive(Debug, Clone)]
pub struct TowerOfHanoi {
    disks: u8,
    source: Peg,
    target: Peg,
}

impl TowerOfHanoi {
    /// `disks` disks from peg A to peg C.
    #[must_use]
    pub fn new(disks: u8) -> Self {
        Self {
            disks,
            source: Peg::A,
            target: Peg::C,
        }
    }

    #[must_use]
    pub fn initial_state(&self) -> Towers {
        Towers::stacked(self.disks, self.source)
    }

    #[must_use]
    pub fn goal_state(&self) -> Towers {
        Towers::stacked(self.disks, self.target)
    }

    #[must_use]
    pub fn target(&self) -> Peg {
        self.target
    }
}

impl TaskAdapter for TowerOfHanoi {
    type State = Towers;
    type Action = HanoiMove;
    type Goal = Towers;

    fn task_id(&self) -> &str {
        "tower_of_hanoi"
    }

    fn generate_actions(&self, state: &Towers) -> Vec<HanoiMove> {
        let mut moves = Vec::new();
        for from in Peg::ALL {
            for to in Peg::ALL {
                let mv = HanoiMove { from, to };
                if state.allows(mv) {
                    moves.push(mv);
                }
            }
        }
        moves
    }

    fn apply(&self, state: &Towers, action: &HanoiMove) -> Result<Towers, ApplyError> {
        state.moved(*action).ok_or_else(|| ApplyError::InvalidAction {
            detail: format!("{action} is not legal from {:?}", state.pegs),
        })
    }

    fn is_goal(&self, state: &Towers, goal: &Towers) -> bool {
        state == goal
    }
}
