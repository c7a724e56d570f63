//! Growth and tier state machine
//!
//! Turns a consumption into points and area-additive growth, and decides
//! when the player moves up a tier. Tier progression is a per-level strategy
//! ([`TierProgression`]); so is whether progression reads the visual size or
//! a separate internal track ([`SizeTracking`]).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::registry::EntityInstance;
use crate::consts::{DECAY_BASE, FALLBACK_ITEM_SIZE, THRESHOLD_EPSILON};
use crate::level::{LevelConfig, SizeTracking, TierProgression};

/// What the state machine needs to know about an eaten thing
#[derive(Debug, Clone, Copy)]
pub struct ConsumedItem<'a> {
    pub item_type: &'a str,
    /// Missing tier falls back to the default tier density
    pub tier: Option<u32>,
    pub value: Option<u32>,
    pub logical_size: Option<f64>,
}

impl<'a> From<&'a EntityInstance> for ConsumedItem<'a> {
    fn from(entity: &'a EntityInstance) -> Self {
        Self {
            item_type: &entity.item_type,
            tier: Some(entity.tier),
            value: entity.value,
            logical_size: Some(entity.logical_size),
        }
    }
}

/// Result of one consumption
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Consumption {
    pub points: u32,
    /// (from, to) when this consumption moved the player up
    pub tier_advance: Option<(u32, u32)>,
}

/// The player's logical growth state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    pub current_tier: u32,
    pub consumed_in_tier: u32,
    pub total_consumed: u32,
    /// Size used for eat/avoid comparisons
    pub size: f64,
    /// Tier-progression size; equals `size` under shared tracking
    pub internal_size: f64,
    /// Consumption count per item type, for diminishing returns
    pub consumed_type_counts: BTreeMap<String, u32>,
}

impl PlayerState {
    pub fn new(config: &LevelConfig) -> Self {
        let size = config.player.initial_size;
        Self {
            current_tier: 1,
            consumed_in_tier: 0,
            total_consumed: 0,
            size,
            internal_size: size,
            consumed_type_counts: BTreeMap::new(),
        }
    }

    /// Size that drives tier progression
    pub fn progression_size(&self) -> f64 {
        self.internal_size
    }

    /// Eat something: score it, grow, and advance tier if earned
    pub fn consume(&mut self, item: &ConsumedItem<'_>, config: &LevelConfig) -> Consumption {
        let count = self
            .consumed_type_counts
            .entry(item.item_type.to_string())
            .or_insert(0);
        *count += 1;
        let n = *count;

        let density = match item.tier {
            Some(tier) => config.tier_density(tier),
            None => {
                log::warn!("Consumed `{}` with no tier, using default density", item.item_type);
                crate::consts::DEFAULT_TIER_DENSITY
            }
        };
        let points = score_item(config, item.value, n, density);

        let item_size = item.logical_size.unwrap_or(FALLBACK_ITEM_SIZE);
        self.size = grow(self.size, item_size, config.player.growth_factor);
        self.internal_size = match config.rules.size_tracking {
            SizeTracking::Shared => self.size,
            SizeTracking::Separate => grow(
                self.internal_size,
                item_size,
                config.player.tier_growth_factor(),
            ),
        };

        self.consumed_in_tier += 1;
        self.total_consumed += 1;

        let new_tier = self.calculate_tier(config);
        let tier_advance = if new_tier > self.current_tier {
            let from = self.current_tier;
            self.advance_tier(new_tier);
            Some((from, new_tier))
        } else {
            None
        };

        log::debug!(
            "Ate {} (#{}) for {} pts, size {:.2}, progression {:.2}",
            item.item_type,
            n,
            points,
            self.size,
            self.internal_size
        );

        Consumption {
            points,
            tier_advance,
        }
    }

    /// Tier the player has earned under the level's progression rule
    ///
    /// Never lower than the current tier.
    pub fn calculate_tier(&self, config: &LevelConfig) -> u32 {
        let max_tier = config.max_tier();
        let earned = match config.rules.tier_progression {
            TierProgression::Quota => {
                if self.current_tier < max_tier
                    && self.consumed_in_tier >= config.quota(self.current_tier)
                {
                    self.current_tier + 1
                } else {
                    self.current_tier
                }
            }
            TierProgression::AreaThreshold => {
                let progression = self.progression_size();
                let mut reached = 1;
                for def in &config.tiers {
                    if progression >= config.tier_threshold(def.tier) - THRESHOLD_EPSILON {
                        reached = def.tier;
                    } else {
                        break;
                    }
                }
                reached
            }
        };
        earned.max(self.current_tier)
    }

    fn advance_tier(&mut self, new_tier: u32) {
        self.current_tier = new_tier;
        self.consumed_in_tier = 0;
    }

    /// Fraction of the way through the current tier, in [0, 1]
    pub fn progress(&self, config: &LevelConfig) -> f64 {
        let fraction = match config.rules.tier_progression {
            TierProgression::Quota => {
                let quota = config.quota(self.current_tier);
                if quota == 0 {
                    1.0
                } else {
                    self.consumed_in_tier as f64 / quota as f64
                }
            }
            TierProgression::AreaThreshold => {
                let tier = self.current_tier;
                let start = config.tier_threshold(tier);
                let next = if tier < config.max_tier() {
                    config.tier_threshold(tier + 1)
                } else {
                    config.completion_size()
                };
                let span = next - start;
                if span <= 0.0 {
                    1.0
                } else {
                    (self.progression_size() - start) / span
                }
            }
        };
        fraction.clamp(0.0, 1.0)
    }

    /// Flat hazard penalty; the caller deducts it from the score
    pub fn take_damage(&self, config: &LevelConfig) -> u32 {
        config.scoring.hazard_penalty
    }

    /// Tiers whose entities may currently be eaten
    pub fn consumable_tiers(&self, config: &LevelConfig) -> BTreeSet<u32> {
        config
            .rules
            .consumable_window
            .tiers(self.current_tier, config.max_tier())
    }

    /// On the last tier with its bar full
    ///
    /// Under area progression the bar counts as full within the same
    /// epsilon as tier thresholds, matching the winnability target.
    pub fn has_completed(&self, config: &LevelConfig) -> bool {
        if self.current_tier != config.max_tier() {
            return false;
        }
        match config.rules.tier_progression {
            TierProgression::Quota => self.progress(config) >= 1.0,
            TierProgression::AreaThreshold => {
                self.progression_size() >= config.completion_size() - THRESHOLD_EPSILON
            }
        }
    }
}

/// Points for the `n`th consumption of a type
///
/// `0.9^((n-1)/density)` decay on the item's base value, floored at the
/// minimum and never above the maximum.
pub fn score_item(config: &LevelConfig, value: Option<u32>, n: u32, density: u32) -> u32 {
    let scoring = &config.scoring;
    let base = value
        .unwrap_or(scoring.max_points_per_item)
        .min(scoring.max_points_per_item);
    let density = density.max(1) as f64;
    let decay = DECAY_BASE.powf(n.saturating_sub(1) as f64 / density);
    let points = (base as f64 * decay).floor() as u32;
    points.max(scoring.min_points_per_item)
}

/// Area-additive growth: sqrt(size^2 + item^2 * factor)
#[inline]
pub fn grow(size: f64, item_size: f64, factor: f64) -> f64 {
    (crate::area(size) + crate::area(item_size) * factor).sqrt()
}
