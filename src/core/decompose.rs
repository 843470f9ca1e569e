/// Roll decomposition — split evaluated terms into explosive dice, other
/// dice and the flat modifier.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::die::{ExplosiveDie, Segment};
use crate::schema::roll::{DieTerm, Operator, Roll, RollTerm};

/// Flat terms of a formula. Never touched by heroic dice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifier {
    /// The flat part of the formula as written, e.g. "*2+3".
    pub formula: String,
    /// Signed sum of the additive numeric terms.
    pub result: i64,
    /// Product of every numeric term preceded by `*`.
    pub multiplier: Option<i64>,
}

impl Modifier {
    pub fn factor(&self) -> i64 {
        self.multiplier.unwrap_or(1)
    }

    /// The multiplier as it appears in a formula ("*2"), or empty.
    pub fn multiplier_label(&self) -> String {
        self.multiplier.map(|m| format!("*{}", m)).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decomposition {
    pub modifier: Modifier,
    pub explosive_dice: Vec<ExplosiveDie>,
    pub non_explosive_dice: Vec<DieTerm>,
}

impl Decomposition {
    /// Sum of every die that heroic dice cannot touch.
    pub fn non_explosive_total(&self) -> i64 {
        self.non_explosive_dice.iter().map(DieTerm::sum).sum()
    }
}

pub struct RollDecomposer;

impl RollDecomposer {
    /// Walk the roll once, left to right.
    ///
    /// The first die term fixes the target face count. Only dice with that
    /// face count become explosive dice; each die term is its own group.
    pub fn decompose(roll: &Roll) -> Decomposition {
        let mut modifier = Modifier::default();
        let mut explosive_dice = Vec::new();
        let mut non_explosive_dice = Vec::new();
        let mut target_faces: Option<u32> = None;
        let mut pending: Option<Operator> = None;
        let mut die_index = 0usize;

        for term in &roll.terms {
            match term {
                RollTerm::Operator(op) => pending = Some(*op),
                RollTerm::Numeric(value) => {
                    match pending {
                        Some(Operator::Multiply) => {
                            modifier.multiplier = Some(modifier.factor() * value);
                        }
                        Some(Operator::Subtract) => modifier.result -= value,
                        Some(Operator::Add) | None => modifier.result += value,
                    }
                    let symbol = pending.map(|op| op.symbol()).unwrap_or("+");
                    modifier.formula.push_str(&format!("{}{}", symbol, value));
                    pending = None;
                }
                RollTerm::Die(die) => {
                    if matches!(pending, Some(Operator::Subtract | Operator::Multiply)) {
                        warn!(
                            "die term {} follows '{}'; treating it as additive",
                            die,
                            pending.map(|op| op.symbol()).unwrap_or_default()
                        );
                    }
                    let target = *target_faces.get_or_insert(die.faces);
                    if die.faces == target {
                        explosive_dice.extend(split_term(die, die_index));
                        die_index += 1;
                    } else {
                        non_explosive_dice.push(die.clone());
                    }
                    pending = None;
                }
            }
        }

        Decomposition {
            modifier,
            explosive_dice,
            non_explosive_dice,
        }
    }
}

/// One explosive die per result. A result after an exploded one is a chain
/// segment; an exploded result already finished its chain.
fn split_term(die: &DieTerm, die_index: usize) -> Vec<ExplosiveDie> {
    let mut previous_exploded = false;
    die.results
        .iter()
        .enumerate()
        .map(|(result_index, r)| {
            let segment = if previous_exploded {
                Segment::Chain
            } else {
                Segment::Base
            };
            previous_exploded = r.exploded;
            let mut explosive = ExplosiveDie::new(die_index, result_index, die.faces, r.result, segment);
            if r.exploded {
                explosive.finish_chain();
            }
            explosive
        })
        .collect()
}
