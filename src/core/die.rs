/// Die models — explosive base dice under mutation and heroic bonus dice.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

use crate::schema::request::Direction;

#[derive(Debug, Error, PartialEq)]
pub enum DieError {
    #[error("heroic die result must be a finite whole number, got {0}")]
    InvalidResult(f64),
    #[error("heroic die index must be non-negative, got {0}")]
    NegativeIndex(i64),
}

/// Arena index of an [`ExplosiveDie`] inside one resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DieId(pub usize);

/// Whether a die result is the rolled base value or part of an explosion
/// chain produced by the external evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    Base,
    Chain,
}

impl Segment {
    /// Lowest value a heroic decrease may leave on this segment.
    pub fn floor(&self) -> u32 {
        match self {
            Self::Base => 1,
            Self::Chain => 0,
        }
    }
}

/// A bonus die rolled from the heroic pool. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawHeroDie")]
pub struct HeroDie {
    result: u32,
    index: usize,
}

#[derive(Deserialize)]
struct RawHeroDie {
    result: f64,
    index: i64,
}

impl TryFrom<RawHeroDie> for HeroDie {
    type Error = DieError;

    fn try_from(raw: RawHeroDie) -> Result<Self, Self::Error> {
        HeroDie::new(raw.result, raw.index)
    }
}

impl HeroDie {
    /// Build a heroic die from externally supplied values.
    ///
    /// Rejects non-finite, negative or fractional results and negative
    /// indexes instead of coercing them.
    pub fn new(result: f64, index: i64) -> Result<Self, DieError> {
        if !result.is_finite() || result < 0.0 || result.fract() != 0.0 || result > f64::from(u32::MAX) {
            return Err(DieError::InvalidResult(result));
        }
        let index = usize::try_from(index).map_err(|_| DieError::NegativeIndex(index))?;
        Ok(Self {
            result: result as u32,
            index,
        })
    }

    /// Build a pool from plain values, indexed by position.
    pub fn pool(values: &[u32]) -> Result<Vec<HeroDie>, DieError> {
        values
            .iter()
            .zip(0i64..)
            .map(|(&value, index)| HeroDie::new(f64::from(value), index))
            .collect()
    }

    pub fn result(&self) -> u32 {
        self.result
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl PartialOrd for HeroDie {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeroDie {
    fn cmp(&self, other: &Self) -> Ordering {
        self.result
            .cmp(&other.result)
            .then(self.index.cmp(&other.index))
    }
}

/// One die result eligible for heroic enhancement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplosiveDie {
    /// Position of the owning die term among the roll's die terms. Dice
    /// sharing a `die_index` form one keep-rule group.
    pub die_index: usize,
    /// Position of this result inside its die term.
    pub result_index: usize,
    pub faces: u32,
    pub original: u32,
    pub modified: u32,
    pub segment: Segment,
    pub heroic_allocated: Vec<HeroDie>,
    pub explosion_chain: Vec<u32>,
    #[serde(default)]
    chain_finished: bool,
}

impl ExplosiveDie {
    pub fn new(die_index: usize, result_index: usize, faces: u32, original: u32, segment: Segment) -> Self {
        Self {
            die_index,
            result_index,
            faces,
            original,
            modified: original,
            segment,
            heroic_allocated: Vec::new(),
            explosion_chain: Vec::new(),
            chain_finished: false,
        }
    }

    pub fn floor(&self) -> u32 {
        self.segment.floor()
    }

    /// How far this die can still move in `direction`.
    pub fn needed(&self, direction: Direction) -> u32 {
        match direction {
            Direction::Increase => self.faces.saturating_sub(self.modified),
            Direction::Decrease => self.modified.saturating_sub(self.floor()),
        }
    }

    /// Move the die by `delta` in `direction`, clamped to `[floor, faces]`.
    /// Returns the amount actually applied.
    pub fn apply_heroic(&mut self, delta: u32, direction: Direction) -> u32 {
        let before = self.modified;
        self.modified = match direction {
            Direction::Increase => before.saturating_add(delta).min(self.faces),
            Direction::Decrease if before <= self.floor() => before,
            Direction::Decrease => before.saturating_sub(delta).max(self.floor()),
        };
        before.abs_diff(self.modified)
    }

    /// True when heroic dice pushed this die from below its cap onto it.
    pub fn reached_cap(&self) -> bool {
        self.original < self.faces && self.modified == self.faces
    }

    pub fn can_explode(&self) -> bool {
        !self.chain_finished
    }

    pub(crate) fn finish_chain(&mut self) {
        self.chain_finished = true;
    }

    pub fn exploded(&self) -> bool {
        !self.explosion_chain.is_empty()
    }

    pub fn chain_total(&self) -> i64 {
        self.explosion_chain.iter().map(|&v| i64::from(v)).sum()
    }

    /// The die's contribution: capped face value plus its chain.
    pub fn total(&self) -> i64 {
        i64::from(self.modified.min(self.faces)) + self.chain_total()
    }
}
