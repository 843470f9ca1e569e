use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeepRuleError {
    #[error("unknown keep rule '{0}': expected kh or kl")]
    UnknownKind(String),
    #[error("invalid keep count '{0}'")]
    InvalidCount(String),
}

/// Which end of the sorted group totals a keep-rule selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeepKind {
    /// `kh` — keep the highest totals.
    Highest,
    /// `kl` — keep the lowest totals.
    Lowest,
}

impl KeepKind {
    /// Returns the formula suffix for this kind (e.g., "kh").
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Highest => "kh",
            Self::Lowest => "kl",
        }
    }
}

/// Selects `count` group totals from the highest or lowest end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeepRule {
    pub kind: KeepKind,
    pub count: usize,
}

impl KeepRule {
    pub fn highest(count: usize) -> Self {
        Self {
            kind: KeepKind::Highest,
            count,
        }
    }

    pub fn lowest(count: usize) -> Self {
        Self {
            kind: KeepKind::Lowest,
            count,
        }
    }

    /// Rank `totals` by this rule and return the positions of the kept ones,
    /// best first. Equal totals keep the earlier position first.
    pub fn select(&self, totals: &[i64]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..totals.len()).collect();
        match self.kind {
            KeepKind::Highest => {
                order.sort_by(|&a, &b| totals[b].cmp(&totals[a]).then(a.cmp(&b)))
            }
            KeepKind::Lowest => order.sort_by(|&a, &b| totals[a].cmp(&totals[b]).then(a.cmp(&b))),
        }
        order.truncate(self.count.min(totals.len()));
        order
    }
}

impl FromStr for KeepRule {
    type Err = KeepRuleError;

    /// Parse `kh`, `kl`, `kh2`, `kl3`. A missing count means 1.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let (kind, rest) = if let Some(rest) = s.strip_prefix("kh") {
            (KeepKind::Highest, rest)
        } else if let Some(rest) = s.strip_prefix("kl") {
            (KeepKind::Lowest, rest)
        } else {
            return Err(KeepRuleError::UnknownKind(s));
        };

        let count = if rest.is_empty() {
            1
        } else {
            rest.parse::<usize>()
                .map_err(|_| KeepRuleError::InvalidCount(rest.to_string()))?
        };

        Ok(Self { kind, count })
    }
}

impl fmt::Display for KeepRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.tag(), self.count)
    }
}
