/// The heroic resolution pipeline: Roll → Total orchestration.
///
/// Wires together decomposition, heroic pool rolling, allocation,
/// explosion chains and aggregation.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::aggregate::ResultAggregator;
use crate::core::allocator::{Allocation, AllocationError, HeroDiceAllocator};
use crate::core::config::{ConfigError, EngineConfig};
use crate::core::decompose::{Modifier, RollDecomposer};
use crate::core::die::{DieError, DieId, ExplosiveDie, HeroDie};
use crate::core::explosion::ExplosionResolver;
use crate::core::random::{DiceAnimator, DiceRoller, DiceServiceError, NoopAnimator, SeededRoller};
use crate::core::summary::ResolutionSummary;
use crate::schema::request::{Direction, HeroicRequest};
use crate::schema::roll::DieTerm;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("heroic die error: {0}")]
    Die(#[from] DieError),
    #[error("allocation error: {0}")]
    Allocation(#[from] AllocationError),
    #[error("dice service error: {0}")]
    Service(#[from] DiceServiceError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// The caller's stock of heroic dice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HeroicCounter {
    available: u32,
}

impl HeroicCounter {
    pub fn new(available: u32) -> Self {
        Self { available }
    }

    pub fn available(&self) -> u32 {
        self.available
    }

    /// Remove `quantity` dice, never going below zero. Returns what is left.
    pub fn spend(&mut self, quantity: u32) -> u32 {
        self.available = self.available.saturating_sub(quantity);
        self.available
    }
}

/// Everything one resolution produced.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub total: i64,
    pub dice_total: i64,
    pub kept_dice: Vec<DieId>,
    pub explosive_dice: Vec<ExplosiveDie>,
    pub non_explosive_dice: Vec<DieTerm>,
    pub modifier: Modifier,
    pub multiplier: String,
    /// Unspent heroic pool applied flat (no keep-rule only).
    pub flat_bonus: i64,
    pub allocation: Allocation,
    pub direction: Direction,
    pub explosion_count: usize,
}

impl Resolution {
    pub fn is_kept(&self, id: DieId) -> bool {
        self.kept_dice.contains(&id)
    }

    pub fn summary(&self) -> ResolutionSummary {
        ResolutionSummary::from_resolution(self)
    }
}

/// The top-level heroic dice engine. Built via `HeroicEngine::builder()`.
pub struct HeroicEngine {
    roller: Box<dyn DiceRoller>,
    animator: Box<dyn DiceAnimator>,
    config: EngineConfig,
}

/// Builder for constructing a `HeroicEngine`.
pub struct HeroicEngineBuilder {
    seed: u64,
    config_path: Option<String>,
    /// Directly provided config (for testing without files).
    config: Option<EngineConfig>,
    roller: Option<Box<dyn DiceRoller>>,
    animator: Option<Box<dyn DiceAnimator>>,
}

impl HeroicEngine {
    pub fn builder() -> HeroicEngineBuilder {
        HeroicEngineBuilder {
            seed: 0,
            config_path: None,
            config: None,
            roller: None,
            animator: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolve one heroic request.
    ///
    /// The counter is only charged once every stage succeeded; any failure
    /// returns the error and leaves it untouched.
    pub async fn resolve(
        &mut self,
        request: &HeroicRequest,
        counter: &mut HeroicCounter,
    ) -> Result<Resolution, EngineError> {
        // 1. Decompose
        let decomposition = RollDecomposer::decompose(&request.roll);
        let non_explosive_total = decomposition.non_explosive_total();
        let modifier = decomposition.modifier;
        let non_explosive_dice = decomposition.non_explosive_dice;
        let mut dice = decomposition.explosive_dice;
        info!(
            "decomposed {}: {} explosive dice, {} other dice terms, modifier '{}'",
            request.roll,
            dice.len(),
            non_explosive_dice.len(),
            modifier.formula
        );

        // 2. Roll the heroic pool
        let pool = self.roll_heroic_pool(request.quantity).await?;

        // 3. Allocate
        let explosions = request.allow_explosions && request.direction == Direction::Increase;
        let allocation = HeroDiceAllocator::new(request.direction, request.keep_rule)
            .with_max_pool(self.config.max_heroic_pool)
            .with_explosions(explosions)
            .allocate(&mut dice, &pool)?;
        info!(
            "allocated {} of {} heroic dice ({})",
            allocation.used_hero_indexes.len(),
            pool.len(),
            request.direction.tag()
        );

        // 4. Explode
        let mut explosion_count = 0;
        if explosions {
            explosion_count = ExplosionResolver::new(self.config.max_chain_length)
                .resolve(&mut dice, self.roller.as_mut(), self.animator.as_mut())
                .await?;
            info!("{} dice exploded", explosion_count);
        }

        // 5. Aggregate
        let aggregate = ResultAggregator::new(request.keep_rule, request.direction).aggregate(
            &dice,
            non_explosive_total,
            &modifier,
            &allocation,
        );

        let remaining = counter.spend(request.quantity);
        info!(
            "heroic total {} (dice {}); {} heroic dice left",
            aggregate.total, aggregate.dice_total, remaining
        );

        Ok(Resolution {
            total: aggregate.total,
            dice_total: aggregate.dice_total,
            kept_dice: aggregate.kept_dice,
            explosive_dice: dice,
            non_explosive_dice,
            multiplier: modifier.multiplier_label(),
            modifier,
            flat_bonus: aggregate.flat_bonus,
            allocation,
            direction: request.direction,
            explosion_count,
        })
    }

    async fn roll_heroic_pool(&mut self, quantity: u32) -> Result<Vec<HeroDie>, EngineError> {
        if quantity as usize > self.config.max_heroic_pool {
            return Err(AllocationError::PoolTooLarge {
                size: quantity as usize,
                max: self.config.max_heroic_pool,
            }
            .into());
        }

        let mut values = Vec::with_capacity(quantity as usize);
        for _ in 0..quantity {
            values.push(self.roller.roll_die(self.config.heroic_die_faces).await?);
        }
        if !values.is_empty() {
            self.animator.show(&values).await?;
        }
        debug!("heroic pool rolled: {:?}", values);

        let pool = values
            .iter()
            .zip(0i64..)
            .map(|(&value, index)| HeroDie::new(f64::from(value), index))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pool)
    }
}

impl HeroicEngineBuilder {
    /// Seed for the default roller. Ignored when a roller is provided.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn config_path(mut self, path: &str) -> Self {
        self.config_path = Some(path.to_string());
        self
    }

    /// Provide the config directly (for testing without files).
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_roller(mut self, roller: impl DiceRoller + 'static) -> Self {
        self.roller = Some(Box::new(roller));
        self
    }

    pub fn with_animator(mut self, animator: impl DiceAnimator + 'static) -> Self {
        self.animator = Some(Box::new(animator));
        self
    }

    pub fn build(self) -> Result<HeroicEngine, EngineError> {
        // A config file overrides a directly provided config
        let config = match self.config_path {
            Some(ref path) => EngineConfig::load_from_ron(Path::new(path))?,
            None => {
                let config = self.config.unwrap_or_default();
                config.validate()?;
                config
            }
        };

        let seed = self.seed;
        Ok(HeroicEngine {
            roller: self
                .roller
                .unwrap_or_else(|| Box::new(SeededRoller::new(seed))),
            animator: self.animator.unwrap_or_else(|| Box::new(NoopAnimator)),
            config,
        })
    }
}
