/// Injected dice services — the random source and the animation hook.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiceServiceError {
    #[error("dice roller failed: {0}")]
    Roller(String),
    #[error("scripted roller ran out of values")]
    Exhausted,
    #[error("a die needs at least one face")]
    NoFaces,
    #[error("dice animation failed: {0}")]
    Animation(String),
}

/// Source of single die rolls.
#[async_trait]
pub trait DiceRoller: Send {
    async fn roll_die(&mut self, faces: u32) -> Result<u32, DiceServiceError>;
}

/// Presentation hook shown each batch of freshly rolled values.
#[async_trait]
pub trait DiceAnimator: Send {
    async fn show(&mut self, values: &[u32]) -> Result<(), DiceServiceError>;
}

/// Uniform rolls from a seeded `StdRng`. Same seed, same rolls.
#[derive(Debug, Clone)]
pub struct SeededRoller {
    rng: StdRng,
}

impl SeededRoller {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

#[async_trait]
impl DiceRoller for SeededRoller {
    async fn roll_die(&mut self, faces: u32) -> Result<u32, DiceServiceError> {
        if faces == 0 {
            return Err(DiceServiceError::NoFaces);
        }
        Ok(self.rng.gen_range(1..=faces))
    }
}

/// Replays a fixed list of values regardless of face count.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRoller {
    values: VecDeque<u32>,
}

impl ScriptedRoller {
    pub fn new(values: &[u32]) -> Self {
        Self {
            values: values.iter().copied().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

#[async_trait]
impl DiceRoller for ScriptedRoller {
    async fn roll_die(&mut self, _faces: u32) -> Result<u32, DiceServiceError> {
        self.values.pop_front().ok_or(DiceServiceError::Exhausted)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAnimator;

#[async_trait]
impl DiceAnimator for NoopAnimator {
    async fn show(&mut self, _values: &[u32]) -> Result<(), DiceServiceError> {
        Ok(())
    }
}
