use serde::{Deserialize, Serialize};

use super::keep_rule::KeepRule;
use super::roll::Roll;

/// Which way heroic dice push the kept result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Increase,
    Decrease,
}

impl Direction {
    /// Returns the tag string for this direction (e.g., "direction:increase").
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Increase => "direction:increase",
            Self::Decrease => "direction:decrease",
        }
    }
}

/// Everything the caller hands the engine for one heroic resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeroicRequest {
    pub roll: Roll,
    /// Number of heroic dice to roll and spend. The caller checks this
    /// against its available pool before asking.
    pub quantity: u32,
    /// `None` means a plain formula with no kh/kl pool.
    #[serde(default)]
    pub keep_rule: Option<KeepRule>,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub allow_explosions: bool,
}

impl HeroicRequest {
    pub fn new(roll: Roll, quantity: u32) -> Self {
        Self {
            roll,
            quantity,
            keep_rule: None,
            direction: Direction::Increase,
            allow_explosions: false,
        }
    }

    pub fn keep(mut self, rule: KeepRule) -> Self {
        self.keep_rule = Some(rule);
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn explode(mut self, allow: bool) -> Self {
        self.allow_explosions = allow;
        self
    }
}
