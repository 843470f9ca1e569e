use serde::{Deserialize, Serialize};
use std::fmt;

/// An arithmetic operator between roll terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
}

impl Operator {
    /// Returns the formula symbol for this operator (e.g., "+").
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
        }
    }
}

/// One face result of an evaluated die term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DieResult {
    pub result: u32,
    /// True when this result triggered a reroll during the external
    /// evaluation. The result that follows it is an explosion-chain segment.
    #[serde(default)]
    pub exploded: bool,
}

impl DieResult {
    pub fn new(result: u32) -> Self {
        Self {
            result,
            exploded: false,
        }
    }

    pub fn exploded(result: u32) -> Self {
        Self {
            result,
            exploded: true,
        }
    }
}

/// A rolled die term such as `2d8` together with its results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DieTerm {
    pub faces: u32,
    pub results: Vec<DieResult>,
}

impl DieTerm {
    pub fn new(faces: u32, results: &[u32]) -> Self {
        Self {
            faces,
            results: results.iter().copied().map(DieResult::new).collect(),
        }
    }

    /// Sum of every face result in this term.
    pub fn sum(&self) -> i64 {
        self.results.iter().map(|r| i64::from(r.result)).sum()
    }
}

impl fmt::Display for DieTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<String> = self.results.iter().map(|r| r.result.to_string()).collect();
        write!(
            f,
            "{}d{}[{}]",
            self.results.len(),
            self.faces,
            values.join(",")
        )
    }
}

/// A single term of an evaluated roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RollTerm {
    Die(DieTerm),
    Numeric(i64),
    Operator(Operator),
}

impl RollTerm {
    pub fn dice(faces: u32, results: &[u32]) -> Self {
        Self::Die(DieTerm::new(faces, results))
    }

    pub fn number(value: i64) -> Self {
        Self::Numeric(value)
    }

    pub fn op(operator: Operator) -> Self {
        Self::Operator(operator)
    }
}

/// An evaluated roll, as produced by the host's dice evaluator.
///
/// The engine never re-parses formulas: it only walks these terms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roll {
    pub terms: Vec<RollTerm>,
}

impl Roll {
    pub fn new(terms: Vec<RollTerm>) -> Self {
        Self { terms }
    }

    /// Iterate the die terms in formula order.
    pub fn die_terms(&self) -> impl Iterator<Item = &DieTerm> {
        self.terms.iter().filter_map(|term| match term {
            RollTerm::Die(die) => Some(die),
            _ => None,
        })
    }
}

impl fmt::Display for Roll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for term in &self.terms {
            match term {
                RollTerm::Die(die) => write!(f, "{}", die)?,
                RollTerm::Numeric(n) => write!(f, "{}", n)?,
                RollTerm::Operator(op) => write!(f, " {} ", op.symbol())?,
            }
        }
        Ok(())
    }
}
