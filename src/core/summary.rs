/// Renderable breakdown of a resolution for chat cards or terminals.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::die::DieId;
use crate::core::pipeline::Resolution;
use crate::schema::request::Direction;

/// One explosive die as it ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DieLine {
    pub faces: u32,
    pub die_index: usize,
    pub result_index: usize,
    pub original: u32,
    pub modified: u32,
    pub heroic: Vec<u32>,
    pub chain: Vec<u32>,
    pub kept: bool,
    pub total: i64,
}

impl DieLine {
    pub fn exploded(&self) -> bool {
        !self.chain.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionSummary {
    pub direction: Direction,
    pub dice: Vec<DieLine>,
    pub other_dice: Vec<String>,
    pub heroic_results: Vec<u32>,
    pub unspent: Vec<u32>,
    pub explosion_count: usize,
    pub dice_total: i64,
    pub multiplier: String,
    pub modifier: String,
    pub flat_bonus: i64,
    pub total: i64,
}

impl ResolutionSummary {
    pub fn from_resolution(resolution: &Resolution) -> Self {
        let dice = resolution
            .explosive_dice
            .iter()
            .enumerate()
            .map(|(i, die)| DieLine {
                faces: die.faces,
                die_index: die.die_index,
                result_index: die.result_index,
                original: die.original,
                modified: die.modified,
                heroic: die.heroic_allocated.iter().map(|h| h.result()).collect(),
                chain: die.explosion_chain.clone(),
                kept: resolution.is_kept(DieId(i)),
                total: die.total(),
            })
            .collect();

        Self {
            direction: resolution.direction,
            dice,
            other_dice: resolution
                .non_explosive_dice
                .iter()
                .map(|d| d.to_string())
                .collect(),
            heroic_results: resolution
                .allocation
                .heroic_results
                .iter()
                .map(|h| h.result())
                .collect(),
            unspent: resolution
                .allocation
                .unspent
                .iter()
                .map(|h| h.result())
                .collect(),
            explosion_count: resolution.explosion_count,
            dice_total: resolution.dice_total,
            multiplier: resolution.multiplier.clone(),
            modifier: resolution.modifier.formula.clone(),
            flat_bonus: resolution.flat_bonus,
            total: resolution.total,
        }
    }

    pub fn exploded_dice(&self) -> impl Iterator<Item = &DieLine> {
        self.dice.iter().filter(|line| line.exploded())
    }
}

impl fmt::Display for ResolutionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.direction {
            Direction::Increase => "raised",
            Direction::Decrease => "lowered",
        };
        writeln!(f, "Heroic dice {:?} ({})", self.heroic_results, verb)?;

        for line in &self.dice {
            write!(
                f,
                "  d{} [{}.{}] {}",
                line.faces, line.die_index, line.result_index, line.original
            )?;
            if line.modified != line.original {
                write!(f, " -> {} heroic {:?}", line.modified, line.heroic)?;
            }
            if line.exploded() {
                write!(f, " exploded {:?}", line.chain)?;
            }
            let mark = if line.kept { "kept" } else { "dropped" };
            writeln!(f, " = {} ({})", line.total, mark)?;
        }
        for other in &self.other_dice {
            writeln!(f, "  {}", other)?;
        }

        if !self.unspent.is_empty() {
            writeln!(f, "Unspent: {:?}", self.unspent)?;
        }
        if self.explosion_count > 0 {
            writeln!(f, "Explosions: {}", self.explosion_count)?;
        }
        write!(f, "Dice {}{}", self.dice_total, self.multiplier)?;
        if !self.modifier.is_empty() {
            write!(f, " [{}]", self.modifier)?;
        }
        if self.flat_bonus != 0 {
            write!(f, " {:+} heroic", self.flat_bonus)?;
        }
        write!(f, " = {}", self.total)
    }
}
