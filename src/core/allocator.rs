/// Heroic dice allocation — decide which explosive die receives which
/// heroic die so the keep-rule selects the best (or worst) possible value.

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::die::{DieId, ExplosiveDie, HeroDie};
use crate::core::groups::{group_dice, DiceGroup};
use crate::schema::keep_rule::{KeepKind, KeepRule};
use crate::schema::request::Direction;

/// Largest pool the subset search accepts by default.
pub const DEFAULT_MAX_POOL: usize = 20;

/// Hard upper bound on any configured pool size.
pub const POOL_CEILING: usize = 24;

/// Memoized states the kept-total search may visit.
const SEARCH_BUDGET: usize = 200_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocationError {
    #[error("heroic pool of {size} dice exceeds the search bound of {max}")]
    PoolTooLarge { size: usize, max: usize },
}

/// Outcome of one allocation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allocation {
    /// Heroic dice spent on each explosive die, in the order applied.
    pub distribution: FxHashMap<DieId, Vec<HeroDie>>,
    /// Dice pushed onto their maximum face by heroic dice.
    pub explosion_count: usize,
    /// Pool indexes spliced out into an allocation, in spending order.
    pub used_hero_indexes: Vec<usize>,
    pub keep_rule: Option<KeepRule>,
    /// The whole rolled pool, in roll order.
    pub heroic_results: Vec<HeroDie>,
    /// Pool dice nobody received, in roll order.
    pub unspent: Vec<HeroDie>,
    /// The die designated as kept when no keep-rule applies.
    pub kept: Option<DieId>,
}

impl Allocation {
    pub fn allocated_to(&self, id: DieId) -> &[HeroDie] {
        self.distribution.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn unspent_total(&self) -> i64 {
        self.unspent.iter().map(|d| i64::from(d.result())).sum()
    }
}

/// Which group the spending loops aim at next.
#[derive(Debug, Clone, Copy)]
enum Target {
    Lowest,
    Highest,
    Kept(KeepRule),
}

#[derive(Debug, Clone, Copy)]
pub struct HeroDiceAllocator {
    direction: Direction,
    keep_rule: Option<KeepRule>,
    max_pool: usize,
    explosions: bool,
}

impl HeroDiceAllocator {
    pub fn new(direction: Direction, keep_rule: Option<KeepRule>) -> Self {
        Self {
            direction,
            keep_rule,
            max_pool: DEFAULT_MAX_POOL,
            explosions: false,
        }
    }

    /// Capped dice will be rerolled afterwards.
    pub fn with_explosions(mut self, explosions: bool) -> Self {
        self.explosions = explosions;
        self
    }

    /// Never above [`POOL_CEILING`].
    pub fn with_max_pool(mut self, max_pool: usize) -> Self {
        self.max_pool = max_pool.min(POOL_CEILING);
        self
    }

    /// Spend `pool` on `dice`, mutating the dice in place.
    ///
    /// Strategy by keep-rule and direction:
    /// - kh increase, or no keep-rule: exact match, best fit, then the
    ///   cheapest combination, die by die in order of remaining room.
    /// - kl increase: keep raising the lowest group.
    /// - kh decrease: keep lowering the highest group.
    /// - kl decrease: keep lowering the lowest kept group, never a dropped one.
    ///
    /// With explosions on, kh increase runs the phases over the groups that
    /// can still reach the kept totals, capping dice so they reroll. Every
    /// other keep-rule case keeps the greedy result only when a bounded
    /// exhaustive search cannot find a better kept total for the same pool.
    pub fn allocate(
        &self,
        dice: &mut [ExplosiveDie],
        pool: &[HeroDie],
    ) -> Result<Allocation, AllocationError> {
        if pool.len() > self.max_pool {
            return Err(AllocationError::PoolTooLarge {
                size: pool.len(),
                max: self.max_pool,
            });
        }

        let mut ledger = Ledger::new(pool);
        let groups = group_dice(dice);
        let mut kept = None;

        match self.keep_rule {
            None => {
                kept = designate_kept(dice);
                if let Some(id) = kept {
                    debug!("no keep rule; designated {:?} as kept", id);
                    self.fill_by_phases(dice, vec![id], &mut ledger);
                }
            }
            Some(rule)
                if self.explosions
                    && rule.kind == KeepKind::Highest
                    && self.direction == Direction::Increase =>
            {
                let targets = self.reachable_targets(dice, &groups, rule, &ledger.pool);
                self.fill_by_phases(dice, targets, &mut ledger);
            }
            Some(rule) => {
                let mut greedy = dice.to_vec();
                let mut greedy_ledger = Ledger::new(pool);
                self.run_strategy(rule, &mut greedy, &groups, &mut greedy_ledger);

                let objective = Objective {
                    rule,
                    direction: self.direction,
                    groups: &groups,
                };
                let greedy_score = objective.score(&greedy);

                match OptimalSearch::new(&objective, dice, &ledger.pool).run() {
                    Some(plan) if objective.better(plan.score, greedy_score) => {
                        debug!(
                            "greedy {} kept total {} beaten by {}",
                            rule, greedy_score, plan.score
                        );
                        ledger.apply_plan(dice, &plan.targets, self.direction);
                    }
                    outcome => {
                        if outcome.is_none() {
                            warn!(
                                "allocation search passed {} states; keeping the greedy result",
                                SEARCH_BUDGET
                            );
                        }
                        dice.clone_from_slice(&greedy);
                        ledger = greedy_ledger;
                    }
                }
            }
        }

        let explosion_count = match self.direction {
            Direction::Increase => dice.iter().filter(|d| d.reached_cap()).count(),
            Direction::Decrease => 0,
        };

        let mut unspent = ledger.pool;
        unspent.sort_by_key(HeroDie::index);

        Ok(Allocation {
            distribution: ledger.distribution,
            explosion_count,
            used_hero_indexes: ledger.used,
            keep_rule: self.keep_rule,
            heroic_results: pool.to_vec(),
            unspent,
            kept,
        })
    }

    fn run_strategy(
        &self,
        rule: KeepRule,
        dice: &mut [ExplosiveDie],
        groups: &[DiceGroup],
        ledger: &mut Ledger,
    ) {
        match (rule.kind, self.direction) {
            (KeepKind::Highest, Direction::Increase) => {
                let all = (0..dice.len()).map(DieId).collect();
                self.fill_by_phases(dice, all, ledger);
            }
            (KeepKind::Lowest, Direction::Increase) => {
                self.spend_on_targets(dice, groups, ledger, Target::Lowest)
            }
            (KeepKind::Highest, Direction::Decrease) => {
                self.spend_on_targets(dice, groups, ledger, Target::Highest)
            }
            (KeepKind::Lowest, Direction::Decrease) => {
                self.spend_on_targets(dice, groups, ledger, Target::Kept(rule))
            }
        }
    }

    fn fill_by_phases(&self, dice: &mut [ExplosiveDie], mut order: Vec<DieId>, ledger: &mut Ledger) {
        let direction = self.direction;
        order.sort_by(|a, b| {
            dice[b.0]
                .needed(direction)
                .cmp(&dice[a.0].needed(direction))
                .then(a.0.cmp(&b.0))
        });

        for id in order {
            if ledger.pool.is_empty() {
                break;
            }
            let needed = dice[id.0].needed(direction);
            if needed == 0 {
                continue;
            }

            let picks = if let Some(pos) = ledger.exact(needed) {
                debug!("{:?}: exact match for {}", id, needed);
                vec![pos]
            } else if let Some(pos) = ledger.best_fit(needed) {
                debug!("{:?}: best fit {} for {}", id, ledger.pool[pos].result(), needed);
                vec![pos]
            } else if let Some(subset) = cheapest_combination(&ledger.pool, needed) {
                debug!("{:?}: combination of {} dice for {}", id, subset.len(), needed);
                subset
            } else {
                debug!("{:?}: no placement for {}; left unmodified", id, needed);
                continue;
            };

            ledger.commit(dice, id, &picks, direction);
        }
    }

    fn spend_on_targets(
        &self,
        dice: &mut [ExplosiveDie],
        groups: &[DiceGroup],
        ledger: &mut Ledger,
        target: Target,
    ) {
        while !ledger.pool.is_empty() {
            let Some(group) = self.target_group(dice, groups, target) else {
                break;
            };
            let Some(id) = self.roomiest_member(dice, &groups[group]) else {
                break;
            };
            let room = dice[id.0].needed(self.direction);
            let Some(pos) = ledger.largest_within(room).or_else(|| ledger.smallest()) else {
                break;
            };
            debug!(
                "{:?} target group {}: spending {} (room {})",
                target,
                groups[group].die_index,
                ledger.pool[pos].result(),
                room
            );
            ledger.commit(dice, id, &[pos], self.direction);
        }
    }

    /// Members of the `rule.count` groups with the highest reachable totals,
    /// a group's reach being its total plus its room, capped by the pool.
    fn reachable_targets(
        &self,
        dice: &[ExplosiveDie],
        groups: &[DiceGroup],
        rule: KeepRule,
        pool: &[HeroDie],
    ) -> Vec<DieId> {
        let pool_total: i64 = pool.iter().map(|h| i64::from(h.result())).sum();
        let reach: Vec<i64> = groups
            .iter()
            .map(|g| {
                let room: i64 = g
                    .members
                    .iter()
                    .map(|id| i64::from(dice[id.0].needed(self.direction)))
                    .sum();
                g.modified_total(dice) + room.min(pool_total)
            })
            .collect();

        let mut order = self.rank_groups(dice, groups, KeepKind::Highest);
        order.sort_by(|&a, &b| reach[b].cmp(&reach[a]));
        order.truncate(rule.count);
        order
            .into_iter()
            .flat_map(|g| groups[g].members.iter().copied())
            .collect()
    }

    /// First group in target order that can still move.
    fn target_group(&self, dice: &[ExplosiveDie], groups: &[DiceGroup], target: Target) -> Option<usize> {
        let order = match target {
            Target::Lowest => self.rank_groups(dice, groups, KeepKind::Lowest),
            Target::Highest => self.rank_groups(dice, groups, KeepKind::Highest),
            Target::Kept(rule) => {
                let mut kept = self.rank_groups(dice, groups, rule.kind);
                kept.truncate(rule.count);
                kept
            }
        };
        order.into_iter().find(|&g| {
            groups[g]
                .members
                .iter()
                .any(|id| dice[id.0].needed(self.direction) > 0)
        })
    }

    /// Groups ordered by current total from the `kind` end. Equal totals go
    /// to the group with more room left, then the lower sorted face values.
    /// Position only separates groups holding the same values.
    fn rank_groups(&self, dice: &[ExplosiveDie], groups: &[DiceGroup], kind: KeepKind) -> Vec<usize> {
        let keys: Vec<(i64, u32, Vec<u32>)> = groups
            .iter()
            .map(|g| {
                let room: u32 = g.members.iter().map(|id| dice[id.0].needed(self.direction)).sum();
                let mut values: Vec<u32> = g.members.iter().map(|id| dice[id.0].modified).collect();
                values.sort_unstable();
                (g.modified_total(dice), room, values)
            })
            .collect();

        let mut order: Vec<usize> = (0..groups.len()).collect();
        order.sort_by(|&a, &b| {
            let (total_a, room_a, values_a) = &keys[a];
            let (total_b, room_b, values_b) = &keys[b];
            let by_total = match kind {
                KeepKind::Highest => total_b.cmp(total_a),
                KeepKind::Lowest => total_a.cmp(total_b),
            };
            by_total
                .then(room_b.cmp(room_a))
                .then(values_a.cmp(values_b))
                .then(a.cmp(&b))
        });
        order
    }

    /// Member with the most room left; earliest on ties.
    fn roomiest_member(&self, dice: &[ExplosiveDie], group: &DiceGroup) -> Option<DieId> {
        group
            .members
            .iter()
            .copied()
            .filter(|id| dice[id.0].needed(self.direction) > 0)
            .max_by(|a, b| {
                dice[a.0]
                    .needed(self.direction)
                    .cmp(&dice[b.0].needed(self.direction))
                    .then(b.0.cmp(&a.0))
            })
    }
}

/// Highest original value; earliest on ties.
fn designate_kept(dice: &[ExplosiveDie]) -> Option<DieId> {
    dice.iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| a.original.cmp(&b.original).then(ib.cmp(ia)))
        .map(|(i, _)| DieId(i))
}

/// Remaining pool plus everything already handed out.
///
/// The pool is kept sorted by value descending, lower index first on ties.
struct Ledger {
    pool: Vec<HeroDie>,
    used: Vec<usize>,
    distribution: FxHashMap<DieId, Vec<HeroDie>>,
}

impl Ledger {
    fn new(pool: &[HeroDie]) -> Self {
        let mut ledger = Self {
            pool: pool.to_vec(),
            used: Vec::new(),
            distribution: FxHashMap::default(),
        };
        ledger.sort_pool();
        ledger
    }

    fn sort_pool(&mut self) {
        self.pool.sort_by(|a, b| {
            b.result()
                .cmp(&a.result())
                .then(a.index().cmp(&b.index()))
        });
    }

    fn exact(&self, needed: u32) -> Option<usize> {
        self.pool.iter().position(|d| d.result() == needed)
    }

    /// Smallest value that still covers `needed`.
    fn best_fit(&self, needed: u32) -> Option<usize> {
        let value = self
            .pool
            .iter()
            .map(HeroDie::result)
            .filter(|&v| v >= needed)
            .min()?;
        self.pool.iter().position(|d| d.result() == value)
    }

    /// Largest value that does not overflow `room`.
    fn largest_within(&self, room: u32) -> Option<usize> {
        self.pool.iter().position(|d| d.result() <= room)
    }

    fn smallest(&self) -> Option<usize> {
        let value = self.pool.iter().map(HeroDie::result).min()?;
        self.pool.iter().position(|d| d.result() == value)
    }

    /// Commit a search plan: `targets[pos]` names the die that receives the
    /// pool die at `pos` of the sorted pool, if any.
    fn apply_plan(&mut self, dice: &mut [ExplosiveDie], targets: &[Option<DieId>], direction: Direction) {
        let planned: Vec<(DieId, usize)> = targets
            .iter()
            .zip(&self.pool)
            .filter_map(|(target, hero)| target.map(|id| (id, hero.index())))
            .collect();

        for id in (0..dice.len()).map(DieId) {
            let picks: Vec<usize> = planned
                .iter()
                .filter(|(target, _)| *target == id)
                .filter_map(|&(_, index)| self.pool.iter().position(|h| h.index() == index))
                .collect();
            if !picks.is_empty() {
                self.commit(dice, id, &picks, direction);
            }
        }
    }

    fn commit(&mut self, dice: &mut [ExplosiveDie], id: DieId, picks: &[usize], direction: Direction) {
        let mut positions = picks.to_vec();
        positions.sort_unstable_by(|a, b| b.cmp(a));
        let mut spent: Vec<HeroDie> = positions.into_iter().map(|p| self.pool.remove(p)).collect();
        spent.sort_by(|a, b| {
            b.result()
                .cmp(&a.result())
                .then(a.index().cmp(&b.index()))
        });

        let die = &mut dice[id.0];
        for hero in spent {
            let applied = die.apply_heroic(hero.result(), direction);
            debug!(
                "heroic die #{} ({}) -> {:?}: applied {}, now {}",
                hero.index(),
                hero.result(),
                id,
                applied,
                die.modified
            );
            die.heroic_allocated.push(hero);
            self.used.push(hero.index());
            self.distribution.entry(id).or_default().push(hero);
        }
    }
}

/// Kept total of the group totals under one keep-rule and direction.
struct Objective<'a> {
    rule: KeepRule,
    direction: Direction,
    groups: &'a [DiceGroup],
}

impl Objective<'_> {
    fn score(&self, dice: &[ExplosiveDie]) -> i64 {
        let values: Vec<u32> = dice.iter().map(|d| d.modified).collect();
        self.score_values(&values)
    }

    fn score_values(&self, modified: &[u32]) -> i64 {
        let totals: Vec<i64> = self
            .groups
            .iter()
            .map(|g| g.members.iter().map(|id| i64::from(modified[id.0])).sum())
            .collect();
        self.rule.select(&totals).iter().map(|&g| totals[g]).sum()
    }

    /// Increase wants a larger kept total, decrease a smaller one.
    fn better(&self, a: i64, b: i64) -> bool {
        match self.direction {
            Direction::Increase => a > b,
            Direction::Decrease => a < b,
        }
    }
}

struct Plan {
    score: i64,
    targets: Vec<Option<DieId>>,
}

/// Exhaustive search over where each pool die goes, memoized on the dice
/// values left after the first `pos` pool dice. Gives up past
/// [`SEARCH_BUDGET`] states.
struct OptimalSearch<'a> {
    objective: &'a Objective<'a>,
    pool: Vec<u32>,
    faces: Vec<u32>,
    floors: Vec<u32>,
    start: Vec<u32>,
    memo: FxHashMap<(usize, Vec<u32>), i64>,
    exhausted: bool,
}

impl<'a> OptimalSearch<'a> {
    fn new(objective: &'a Objective<'a>, dice: &[ExplosiveDie], pool: &[HeroDie]) -> Self {
        Self {
            objective,
            pool: pool.iter().map(HeroDie::result).collect(),
            faces: dice.iter().map(|d| d.faces).collect(),
            floors: dice.iter().map(ExplosiveDie::floor).collect(),
            start: dice.iter().map(|d| d.modified).collect(),
            memo: FxHashMap::default(),
            exhausted: false,
        }
    }

    fn run(mut self) -> Option<Plan> {
        let mut modified = self.start.clone();
        let score = self.best(0, &mut modified);
        if self.exhausted {
            return None;
        }

        let mut targets = Vec::with_capacity(self.pool.len());
        for pos in 0..self.pool.len() {
            let goal = self.best(pos, &mut modified);
            let mut choice = None;
            if self.best(pos + 1, &mut modified) != goal {
                for die in 0..modified.len() {
                    let before = modified[die];
                    let after = self.step(die, before, self.pool[pos]);
                    if after == before {
                        continue;
                    }
                    modified[die] = after;
                    if self.best(pos + 1, &mut modified) == goal {
                        choice = Some(DieId(die));
                        break;
                    }
                    modified[die] = before;
                }
            }
            targets.push(choice);
        }
        if self.exhausted {
            return None;
        }
        Some(Plan { score, targets })
    }

    fn step(&self, die: usize, value: u32, delta: u32) -> u32 {
        match self.objective.direction {
            Direction::Increase => value.saturating_add(delta).min(self.faces[die]),
            Direction::Decrease if value <= self.floors[die] => value,
            Direction::Decrease => value.saturating_sub(delta).max(self.floors[die]),
        }
    }

    fn best(&mut self, pos: usize, modified: &mut Vec<u32>) -> i64 {
        if pos == self.pool.len() || self.exhausted {
            return self.objective.score_values(modified);
        }
        let key = (pos, modified.clone());
        if let Some(&score) = self.memo.get(&key) {
            return score;
        }
        if self.memo.len() >= SEARCH_BUDGET {
            self.exhausted = true;
            return self.objective.score_values(modified);
        }

        // Leaving the die unspent is always an option.
        let mut best = self.best(pos + 1, modified);
        for die in 0..modified.len() {
            let before = modified[die];
            let after = self.step(die, before, self.pool[pos]);
            if after == before {
                continue;
            }
            modified[die] = after;
            let score = self.best(pos + 1, modified);
            modified[die] = before;
            if self.objective.better(score, best) {
                best = score;
            }
        }

        self.memo.insert(key, best);
        best
    }
}

struct BestSubset {
    count: usize,
    waste: u64,
    positions: Vec<usize>,
}

/// Depth-first search over `pool` positions for a subset whose sum covers
/// `needed`, preferring fewer dice and then less waste.
///
/// A branch stops as soon as its sum covers `needed`, when the rest of the
/// pool cannot cover it, or when it can no longer beat the best count.
fn cheapest_combination(pool: &[HeroDie], needed: u32) -> Option<Vec<usize>> {
    let values: Vec<u64> = pool.iter().map(|d| u64::from(d.result())).collect();
    let mut suffix = vec![0u64; values.len() + 1];
    for i in (0..values.len()).rev() {
        suffix[i] = suffix[i + 1] + values[i];
    }

    // Fewest dice any cover can use: the largest values first.
    let mut sorted = values.clone();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    let mut running = 0;
    let fewest = sorted
        .iter()
        .position(|&v| {
            running += v;
            running >= u64::from(needed)
        })
        .map_or(usize::MAX, |i| i + 1);

    let mut search = SubsetSearch {
        values: &values,
        suffix: &suffix,
        needed: u64::from(needed),
        fewest,
        chosen: Vec::new(),
        best: None,
        done: false,
    };
    search.explore(0, 0);
    search.best.map(|best| best.positions)
}

struct SubsetSearch<'a> {
    values: &'a [u64],
    suffix: &'a [u64],
    needed: u64,
    fewest: usize,
    chosen: Vec<usize>,
    best: Option<BestSubset>,
    done: bool,
}

impl SubsetSearch<'_> {
    fn explore(&mut self, start: usize, sum: u64) {
        if self.done {
            return;
        }
        if sum >= self.needed {
            let count = self.chosen.len();
            let waste = sum - self.needed;
            let better = match &self.best {
                None => true,
                Some(best) => (count, waste) < (best.count, best.waste),
            };
            if better {
                self.done = waste == 0 && count == self.fewest;
                self.best = Some(BestSubset {
                    count,
                    waste,
                    positions: self.chosen.clone(),
                });
            }
            return;
        }

        if sum + self.suffix[start] < self.needed {
            return;
        }
        if let Some(best) = &self.best {
            if self.chosen.len() + 1 > best.count {
                return;
            }
        }

        for i in start..self.values.len() {
            self.chosen.push(i);
            self.explore(i + 1, sum + self.values[i]);
            self.chosen.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::die::Segment;

    fn d20s(values: &[u32]) -> Vec<ExplosiveDie> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| ExplosiveDie::new(i, 0, 20, v, Segment::Base))
            .collect()
    }

    fn modified(dice: &[ExplosiveDie]) -> Vec<u32> {
        dice.iter().map(|d| d.modified).collect()
    }

    fn kh_up() -> HeroDiceAllocator {
        HeroDiceAllocator::new(Direction::Increase, Some(KeepRule::highest(1)))
    }

    #[test]
    fn exact_match_beats_best_fit() {
        let mut dice = d20s(&[17]);
        let pool = HeroDie::pool(&[4, 3]).unwrap();
        let allocation = kh_up().allocate(&mut dice, &pool).unwrap();
        assert_eq!(dice[0].modified, 20);
        assert_eq!(allocation.used_hero_indexes, vec![1]);
        assert_eq!(allocation.unspent, vec![pool[0]]);
        assert_eq!(allocation.explosion_count, 1);
    }

    #[test]
    fn best_fit_takes_smallest_covering_value() {
        let mut dice = d20s(&[17]);
        let pool = HeroDie::pool(&[6, 5, 1]).unwrap();
        let allocation = kh_up().allocate(&mut dice, &pool).unwrap();
        assert_eq!(allocation.allocated_to(DieId(0)), &[pool[1]]);
        assert_eq!(dice[0].modified, 20);
    }

    #[test]
    fn combination_prefers_fewer_dice() {
        let mut dice = d20s(&[2]);
        let pool = HeroDie::pool(&[10, 9, 5, 4]).unwrap();
        let allocation = kh_up().allocate(&mut dice, &pool).unwrap();
        assert_eq!(allocation.used_hero_indexes, vec![0, 1]);
        assert_eq!(dice[0].modified, 20);
    }

    #[test]
    fn combination_prefers_less_waste_at_equal_count() {
        let mut dice = d20s(&[6]);
        let pool = HeroDie::pool(&[10, 5, 4]).unwrap();
        let allocation = kh_up().allocate(&mut dice, &pool).unwrap();
        assert_eq!(allocation.used_hero_indexes, vec![0, 2]);
        assert_eq!(allocation.unspent, vec![pool[1]]);
    }

    #[test]
    fn unplaceable_die_is_skipped() {
        let mut dice = d20s(&[2, 17]);
        let pool = HeroDie::pool(&[3, 4]).unwrap();
        let allocation = kh_up().allocate(&mut dice, &pool).unwrap();
        assert_eq!(modified(&dice), vec![2, 20]);
        assert_eq!(allocation.used_hero_indexes, vec![0]);
        assert_eq!(allocation.unspent_total(), 4);
    }

    #[test]
    fn most_room_is_served_first() {
        let mut dice: Vec<ExplosiveDie> = [3, 2]
            .iter()
            .enumerate()
            .map(|(i, &v)| ExplosiveDie::new(0, i, 4, v, Segment::Base))
            .collect();
        let pool = HeroDie::pool(&[2]).unwrap();
        let allocation = kh_up().allocate(&mut dice, &pool).unwrap();
        assert_eq!(modified(&dice), vec![3, 4]);
        assert_eq!(allocation.allocated_to(DieId(1)).len(), 1);
    }

    #[test]
    fn kl_increase_raises_the_lowest() {
        let mut dice = d20s(&[4, 9, 12]);
        let pool = HeroDie::pool(&[3, 5, 6]).unwrap();
        let allocator = HeroDiceAllocator::new(Direction::Increase, Some(KeepRule::lowest(1)));
        let allocation = allocator.allocate(&mut dice, &pool).unwrap();
        assert_eq!(modified(&dice), vec![13, 14, 12]);
        assert_eq!(allocation.used_hero_indexes, vec![2, 1, 0]);
        assert_eq!(allocation.explosion_count, 0);
    }

    #[test]
    fn kl_increase_overflows_when_nothing_fits() {
        let mut dice = d20s(&[18, 19]);
        let pool = HeroDie::pool(&[5]).unwrap();
        let allocator = HeroDiceAllocator::new(Direction::Increase, Some(KeepRule::lowest(1)));
        let allocation = allocator.allocate(&mut dice, &pool).unwrap();
        assert_eq!(modified(&dice), vec![20, 19]);
        assert_eq!(allocation.explosion_count, 1);
    }

    #[test]
    fn kh_decrease_lowers_the_highest() {
        let mut dice = d20s(&[18, 11]);
        let pool = HeroDie::pool(&[4, 4]).unwrap();
        let allocator = HeroDiceAllocator::new(Direction::Decrease, Some(KeepRule::highest(1)));
        allocator.allocate(&mut dice, &pool).unwrap();
        assert_eq!(modified(&dice), vec![10, 11]);
    }

    #[test]
    fn kl_decrease_never_touches_dropped_group() {
        let mut dice = d20s(&[5, 13]);
        let pool = HeroDie::pool(&[9, 3, 2]).unwrap();
        let allocator = HeroDiceAllocator::new(Direction::Decrease, Some(KeepRule::lowest(1)));
        let allocation = allocator.allocate(&mut dice, &pool).unwrap();
        assert_eq!(modified(&dice), vec![1, 13]);
        assert_eq!(allocation.used_hero_indexes, vec![1, 2]);
        assert_eq!(allocation.unspent, vec![pool[0]]);
        assert!(allocation.allocated_to(DieId(1)).is_empty());
    }

    #[test]
    fn fallback_targets_highest_original() {
        let mut dice = d20s(&[8, 17]);
        let pool = HeroDie::pool(&[2]).unwrap();
        let allocator = HeroDiceAllocator::new(Direction::Increase, None);
        let allocation = allocator.allocate(&mut dice, &pool).unwrap();
        assert_eq!(allocation.kept, Some(DieId(1)));
        assert_eq!(modified(&dice), vec![8, 17]);
        assert_eq!(allocation.unspent_total(), 2);
    }

    #[test]
    fn fallback_decrease_mirrors_phases() {
        let mut dice = d20s(&[17]);
        let pool = HeroDie::pool(&[16]).unwrap();
        let allocator = HeroDiceAllocator::new(Direction::Decrease, None);
        let allocation = allocator.allocate(&mut dice, &pool).unwrap();
        assert_eq!(dice[0].modified, 1);
        assert_eq!(allocation.used_hero_indexes, vec![0]);
        assert_eq!(allocation.explosion_count, 0);
    }

    #[test]
    fn pool_bound_is_enforced() {
        let mut dice = d20s(&[10]);
        let pool = HeroDie::pool(&[1, 2, 3]).unwrap();
        let result = kh_up().with_max_pool(2).allocate(&mut dice, &pool);
        assert_eq!(
            result,
            Err(AllocationError::PoolTooLarge { size: 3, max: 2 })
        );
        assert_eq!(dice[0].modified, 10);
    }

    #[test]
    fn each_heroic_die_used_once() {
        let mut dice = d20s(&[3, 9, 14, 18]);
        let pool = HeroDie::pool(&[6, 6, 5, 2, 1, 4]).unwrap();
        let allocation = kh_up().allocate(&mut dice, &pool).unwrap();

        let mut used = allocation.used_hero_indexes.clone();
        used.sort_unstable();
        used.dedup();
        assert_eq!(used.len(), allocation.used_hero_indexes.len());

        let distributed: usize = allocation.distribution.values().map(Vec::len).sum();
        assert_eq!(distributed, used.len());
        assert_eq!(distributed + allocation.unspent.len(), pool.len());

        for die in &dice {
            assert!(die.modified <= die.faces);
            assert!(die.modified >= die.original);
        }
    }

    #[test]
    fn empty_pool_changes_nothing() {
        let mut dice = d20s(&[3, 9]);
        let allocation = kh_up().allocate(&mut dice, &[]).unwrap();
        assert_eq!(modified(&dice), vec![3, 9]);
        assert!(allocation.distribution.is_empty());
        assert_eq!(allocation.explosion_count, 0);
    }

    fn grouped(faces: u32, groups: &[&[u32]]) -> Vec<ExplosiveDie> {
        groups
            .iter()
            .enumerate()
            .flat_map(|(g, &values)| {
                values
                    .iter()
                    .enumerate()
                    .map(move |(i, &v)| ExplosiveDie::new(g, i, faces, v, Segment::Base))
            })
            .collect()
    }

    #[test]
    fn kh_increase_spends_on_group_it_keeps() {
        let mut dice = grouped(8, &[&[6, 5], &[1, 1]]);
        let pool = HeroDie::pool(&[2, 5]).unwrap();
        let allocation = kh_up().allocate(&mut dice, &pool).unwrap();
        assert_eq!(modified(&dice), vec![8, 8, 1, 1]);
        assert_eq!(allocation.used_hero_indexes.len(), 2);
        assert!(allocation.unspent.is_empty());
    }

    #[test]
    fn kh_increase_partial_raise_beats_skipping() {
        let mut dice = d20s(&[12, 7]);
        let pool = HeroDie::pool(&[3]).unwrap();
        kh_up().allocate(&mut dice, &pool).unwrap();
        assert_eq!(modified(&dice), vec![15, 7]);
    }

    #[test]
    fn tied_groups_pick_same_total_in_any_order() {
        let allocator = HeroDiceAllocator::new(Direction::Decrease, Some(KeepRule::lowest(1)));
        let kept_total = |groups: &[&[u32]]| {
            let mut dice = grouped(8, groups);
            let pool = HeroDie::pool(&[1, 5]).unwrap();
            allocator.allocate(&mut dice, &pool).unwrap();
            group_dice(&dice)
                .iter()
                .map(|g| g.modified_total(&dice))
                .min()
                .unwrap()
        };
        assert_eq!(kept_total(&[&[2, 3], &[1, 4], &[7, 5]]), 2);
        assert_eq!(kept_total(&[&[5, 7], &[4, 1], &[3, 2]]), 2);
    }

    #[test]
    fn exploding_kh_caps_roomiest_die() {
        let mut dice = grouped(8, &[&[6, 5], &[1, 1]]);
        let pool = HeroDie::pool(&[6, 3]).unwrap();
        let allocator = HeroDiceAllocator::new(Direction::Increase, Some(KeepRule::highest(2)))
            .with_explosions(true);
        let allocation = allocator.allocate(&mut dice, &pool).unwrap();
        assert_eq!(modified(&dice), vec![6, 5, 8, 1]);
        assert_eq!(allocation.allocated_to(DieId(2)).len(), 2);
    }

    #[test]
    fn kh_increase_without_explosions_spreads_pool() {
        let mut dice = grouped(8, &[&[6, 5], &[1, 1]]);
        let pool = HeroDie::pool(&[6, 3]).unwrap();
        let allocator = HeroDiceAllocator::new(Direction::Increase, Some(KeepRule::highest(2)));
        allocator.allocate(&mut dice, &pool).unwrap();
        assert_eq!(modified(&dice).iter().sum::<u32>(), 22);
    }

    #[test]
    fn exploding_kh_skips_unreachable_group() {
        let mut dice = grouped(8, &[&[6, 5], &[1, 1]]);
        let pool = HeroDie::pool(&[2, 5]).unwrap();
        let allocator = HeroDiceAllocator::new(Direction::Increase, Some(KeepRule::highest(1)))
            .with_explosions(true);
        let allocation = allocator.allocate(&mut dice, &pool).unwrap();
        assert_eq!(modified(&dice), vec![8, 8, 1, 1]);
        assert_eq!(allocation.explosion_count, 2);
    }

    #[test]
    fn configured_pool_bound_is_capped() {
        let mut dice = d20s(&[10]);
        let values = vec![1; POOL_CEILING + 1];
        let pool = HeroDie::pool(&values).unwrap();
        let result = kh_up().with_max_pool(100).allocate(&mut dice, &pool);
        assert_eq!(
            result,
            Err(AllocationError::PoolTooLarge {
                size: POOL_CEILING + 1,
                max: POOL_CEILING
            })
        );
    }

    #[test]
    fn combination_stops_at_first_perfect_cover() {
        let pool = HeroDie::pool(&[1; 20]).unwrap();
        let subset = cheapest_combination(&pool, 19).unwrap();
        assert_eq!(subset.len(), 19);
        assert_eq!(subset, (0..19).collect::<Vec<_>>());
    }
}
