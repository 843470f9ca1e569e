/// Keep-rule groups — dice sharing a die term are kept or dropped together.

use crate::core::die::{DieId, ExplosiveDie};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceGroup {
    pub die_index: usize,
    pub members: Vec<DieId>,
}

impl DiceGroup {
    /// Sum of the members' current face values, chains excluded.
    pub fn modified_total(&self, dice: &[ExplosiveDie]) -> i64 {
        self.members
            .iter()
            .map(|id| i64::from(dice[id.0].modified))
            .sum()
    }

    /// Sum of the members' full contributions, chains included.
    pub fn resolved_total(&self, dice: &[ExplosiveDie]) -> i64 {
        self.members.iter().map(|id| dice[id.0].total()).sum()
    }
}

/// Group dice by `die_index`, in order of first appearance.
pub fn group_dice(dice: &[ExplosiveDie]) -> Vec<DiceGroup> {
    let mut groups: Vec<DiceGroup> = Vec::new();
    for (i, die) in dice.iter().enumerate() {
        match groups.iter_mut().find(|g| g.die_index == die.die_index) {
            Some(group) => group.members.push(DieId(i)),
            None => groups.push(DiceGroup {
                die_index: die.die_index,
                members: vec![DieId(i)],
            }),
        }
    }
    groups
}
