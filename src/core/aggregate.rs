/// Result aggregation — keep-rule, multiplier and flat modifier.

use serde::{Deserialize, Serialize};

use crate::core::allocator::Allocation;
use crate::core::decompose::Modifier;
use crate::core::die::{DieId, ExplosiveDie};
use crate::core::groups::group_dice;
use crate::schema::keep_rule::KeepRule;
use crate::schema::request::Direction;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    pub total: i64,
    /// Kept groups plus non-explosive dice, before the multiplier.
    pub dice_total: i64,
    pub kept_dice: Vec<DieId>,
    /// Unspent heroic pool applied flat when no keep-rule exists.
    pub flat_bonus: i64,
}

pub struct ResultAggregator {
    keep_rule: Option<KeepRule>,
    direction: Direction,
}

impl ResultAggregator {
    pub fn new(keep_rule: Option<KeepRule>, direction: Direction) -> Self {
        Self {
            keep_rule,
            direction,
        }
    }

    /// `total = dice_total * multiplier + modifier + flat bonus`.
    ///
    /// The multiplier never touches the modifier or the flat bonus.
    pub fn aggregate(
        &self,
        dice: &[ExplosiveDie],
        non_explosive_total: i64,
        modifier: &Modifier,
        allocation: &Allocation,
    ) -> Aggregate {
        let groups = group_dice(dice);
        let totals: Vec<i64> = groups.iter().map(|g| g.resolved_total(dice)).collect();

        let kept_groups = match self.keep_rule {
            Some(rule) => rule.select(&totals),
            None => (0..groups.len()).collect(),
        };

        let kept_total: i64 = kept_groups.iter().map(|&g| totals[g]).sum();
        let mut kept_dice: Vec<DieId> = kept_groups
            .iter()
            .flat_map(|&g| groups[g].members.iter().copied())
            .collect();
        kept_dice.sort_unstable();

        let dice_total = kept_total + non_explosive_total;

        let flat_bonus = match (self.keep_rule, self.direction) {
            (Some(_), _) => 0,
            (None, Direction::Increase) => allocation.unspent_total(),
            (None, Direction::Decrease) => {
                let floor: i64 = dice.iter().map(|d| i64::from(d.floor())).sum();
                -allocation.unspent_total().min((kept_total - floor).max(0))
            }
        };

        Aggregate {
            total: dice_total * modifier.factor() + modifier.result + flat_bonus,
            dice_total,
            kept_dice,
            flat_bonus,
        }
    }
}
