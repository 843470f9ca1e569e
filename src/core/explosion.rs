/// Explosion chains — reroll dice that heroic dice pushed onto their
/// maximum face, for as long as the rerolls keep hitting it.

use tracing::{debug, warn};

use crate::core::die::ExplosiveDie;
use crate::core::random::{DiceAnimator, DiceRoller, DiceServiceError};

pub const DEFAULT_MAX_CHAIN: usize = 32;

#[derive(Debug, Clone, Copy)]
pub struct ExplosionResolver {
    max_chain: usize,
}

impl Default for ExplosionResolver {
    fn default() -> Self {
        Self {
            max_chain: DEFAULT_MAX_CHAIN,
        }
    }
}

impl ExplosionResolver {
    pub fn new(max_chain: usize) -> Self {
        Self { max_chain }
    }

    /// Run every eligible chain to completion, one die at a time.
    /// Returns how many dice exploded.
    ///
    /// Any roller or animator failure aborts the whole pass.
    pub async fn resolve(
        &self,
        dice: &mut [ExplosiveDie],
        roller: &mut dyn DiceRoller,
        animator: &mut dyn DiceAnimator,
    ) -> Result<usize, DiceServiceError> {
        let mut exploded = 0;

        for die in dice.iter_mut() {
            if !die.reached_cap() || !die.can_explode() {
                continue;
            }

            loop {
                let value = roller.roll_die(die.faces).await?;
                animator.show(&[value]).await?;
                die.explosion_chain.push(value);
                debug!(
                    "d{} (term {}, result {}) exploded into {}",
                    die.faces, die.die_index, die.result_index, value
                );

                if value != die.faces {
                    break;
                }
                if die.explosion_chain.len() >= self.max_chain {
                    warn!(
                        "explosion chain on d{} stopped at {} rerolls",
                        die.faces, self.max_chain
                    );
                    break;
                }
            }

            die.finish_chain();
            exploded += 1;
        }

        Ok(exploded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::die::Segment;
    use crate::core::random::{NoopAnimator, ScriptedRoller};
    use crate::schema::request::Direction;

    fn capped_d6() -> ExplosiveDie {
        let mut die = ExplosiveDie::new(0, 0, 6, 4, Segment::Base);
        die.apply_heroic(2, Direction::Increase);
        die
    }

    #[tokio::test]
    async fn chain_continues_while_max() {
        let mut dice = vec![capped_d6()];
        let mut roller = ScriptedRoller::new(&[6, 6, 2]);
        let count = ExplosionResolver::default()
            .resolve(&mut dice, &mut roller, &mut NoopAnimator)
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(dice[0].explosion_chain, vec![6, 6, 2]);
        assert_eq!(dice[0].total(), 20);
        assert!(!dice[0].can_explode());
    }

    #[tokio::test]
    async fn natural_maximum_does_not_explode_again() {
        let mut dice = vec![ExplosiveDie::new(0, 0, 6, 6, Segment::Base)];
        let mut roller = ScriptedRoller::new(&[]);
        let count = ExplosionResolver::default()
            .resolve(&mut dice, &mut roller, &mut NoopAnimator)
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert!(dice[0].explosion_chain.is_empty());
    }

    #[tokio::test]
    async fn chains_run_one_die_at_a_time() {
        let mut dice = vec![capped_d6(), ExplosiveDie::new(1, 0, 6, 3, Segment::Base), capped_d6()];
        let mut roller = ScriptedRoller::new(&[6, 1, 5]);
        let count = ExplosionResolver::default()
            .resolve(&mut dice, &mut roller, &mut NoopAnimator)
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(dice[0].explosion_chain, vec![6, 1]);
        assert!(dice[1].explosion_chain.is_empty());
        assert_eq!(dice[2].explosion_chain, vec![5]);
    }

    #[tokio::test]
    async fn chain_length_is_capped() {
        let mut dice = vec![capped_d6()];
        let mut roller = ScriptedRoller::new(&[6; 10]);
        ExplosionResolver::new(3)
            .resolve(&mut dice, &mut roller, &mut NoopAnimator)
            .await
            .unwrap();
        assert_eq!(dice[0].explosion_chain.len(), 3);
    }

    #[tokio::test]
    async fn roller_failure_aborts() {
        let mut dice = vec![capped_d6()];
        let mut roller = ScriptedRoller::new(&[6]);
        let result = ExplosionResolver::default()
            .resolve(&mut dice, &mut roller, &mut NoopAnimator)
            .await;
        assert_eq!(result, Err(DiceServiceError::Exhausted));
    }
}
