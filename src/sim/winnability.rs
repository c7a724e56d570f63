//! Winnability oracle
//!
//! Read-only forward simulation over a snapshot of the remaining supply,
//! answering "can the player still finish this level?". Counts every
//! remaining entity, active or not.

use std::collections::{BTreeMap, BTreeSet};

use super::growth::PlayerState;
use super::registry::{EntityKind, EntityRegistry};
use crate::area;
use crate::consts::THRESHOLD_EPSILON;
use crate::level::{LevelConfig, TierProgression};

/// Remaining supply of one tier
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TierSupply {
    pub edibles: u32,
    pub hazards: u32,
    /// Sum of squared logical sizes (edibles and hazards)
    pub area: f64,
}

/// Snapshot of what is left to eat, by tier
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    tiers: BTreeMap<u32, TierSupply>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the live registry
    pub fn from_registry(registry: &EntityRegistry) -> Self {
        let mut inventory = Self::new();
        for entity in registry.iter() {
            let supply = inventory.tiers.entry(entity.tier).or_default();
            match entity.kind {
                EntityKind::Edible => supply.edibles += 1,
                EntityKind::Hazard => supply.hazards += 1,
            }
            supply.area += area(entity.logical_size);
        }
        inventory
    }

    /// Add the configured roster of tiers that have not been spawned yet
    ///
    /// Unspawned instances count at their archetype's average size.
    pub fn with_unspawned(mut self, config: &LevelConfig, spawned: &BTreeSet<u32>) -> Self {
        for tier in 1..=config.max_tier() {
            if spawned.contains(&tier) {
                continue;
            }
            for archetype in config.archetypes(tier) {
                let supply = self.tiers.entry(tier).or_default();
                if archetype.is_hazard {
                    supply.hazards += archetype.count;
                } else {
                    supply.edibles += archetype.count;
                }
                supply.area += archetype.count as f64 * area(archetype.size_spec(tier).average());
            }
        }
        self
    }

    pub fn set(&mut self, tier: u32, supply: TierSupply) {
        self.tiers.insert(tier, supply);
    }

    pub fn supply(&self, tier: u32) -> TierSupply {
        self.tiers.get(&tier).copied().unwrap_or_default()
    }

    /// Sum of squared sizes across every tier
    pub fn total_area(&self) -> f64 {
        self.tiers.values().map(|s| s.area).sum()
    }
}

/// Can the level still be completed from this state?
pub fn is_winnable(config: &LevelConfig, player: &PlayerState, inventory: &Inventory) -> bool {
    match config.rules.tier_progression {
        TierProgression::Quota => quota_feasible(
            config,
            player.current_tier,
            player.consumed_in_tier,
            inventory,
        ),
        TierProgression::AreaThreshold => {
            area_feasible(config, player.progression_size(), inventory)
        }
    }
}

/// Discrete quota simulation
///
/// Each tier's quota is filled first from the previous tier's leftovers
/// (edibles, then hazards, which are edible once the player is a tier
/// ahead), then from the tier's own edibles. Own-tier hazards only count on
/// the final tier. The previous tier's remainder is discarded afterwards.
pub fn quota_feasible(
    config: &LevelConfig,
    current_tier: u32,
    consumed_in_tier: u32,
    inventory: &Inventory,
) -> bool {
    let max_tier = config.max_tier();
    let mut stock = inventory.tiers.clone();

    for tier in current_tier..=max_tier {
        let already = if tier == current_tier {
            consumed_in_tier
        } else {
            0
        };
        let mut needed = config.quota(tier).saturating_sub(already);

        if let Some(previous) = stock.get_mut(&(tier - 1)) {
            take(&mut previous.edibles, &mut needed);
            take(&mut previous.hazards, &mut needed);
        }
        if let Some(own) = stock.get_mut(&tier) {
            take(&mut own.edibles, &mut needed);
            if tier == max_tier {
                take(&mut own.hazards, &mut needed);
            }
        }
        if needed > 0 {
            log::debug!("Quota for tier {} short by {}", tier, needed);
            return false;
        }

        stock.remove(&(tier - 1));
    }
    true
}

/// Continuous area check: current area plus everything left must fill the
/// final tier's bar, which is also where the level is won
pub fn area_feasible(config: &LevelConfig, progression_size: f64, inventory: &Inventory) -> bool {
    let current = area(progression_size);
    let target = area(config.completion_size() - THRESHOLD_EPSILON);
    let potential = inventory.total_area() * config.progression_growth_factor();
    current + potential >= target
}

fn take(stock: &mut u32, needed: &mut u32) {
    let n = (*stock).min(*needed);
    *stock -= n;
    *needed -= n;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::registry::tests::make_entity;
    use glam::Vec2;

    fn edibles(counts: &[u32]) -> Inventory {
        let mut inventory = Inventory::new();
        for (i, &edibles) in counts.iter().enumerate() {
            inventory.set(
                i as u32 + 1,
                TierSupply {
                    edibles,
                    hazards: 0,
                    area: 0.0,
                },
            );
        }
        inventory
    }

    fn quota_level() -> LevelConfig {
        LevelConfig::micro_world().unwrap()
    }

    #[test]
    fn test_sufficient_supply_is_winnable() {
        let config = quota_level();
        assert!(quota_feasible(&config, 1, 0, &edibles(&[30, 25, 25, 25, 25])));
        assert!(quota_feasible(&config, 1, 0, &edibles(&[30, 30, 30, 30, 30])));
    }

    #[test]
    fn test_final_tier_short_is_unwinnable() {
        let config = quota_level();
        // Tier 5 needs 30; tier 4 leftovers plus tier 5 give at most 15
        assert!(!quota_feasible(&config, 1, 0, &edibles(&[50, 50, 50, 10, 5])));
    }

    #[test]
    fn test_early_shortfall() {
        let config = quota_level();
        assert!(!quota_feasible(&config, 1, 0, &edibles(&[5, 100])));
    }

    #[test]
    fn test_despawned_tiers_are_lost() {
        let config = quota_level();
        // Tier 3 surplus can't help tier 5: it is gone once tier 4 is done
        assert!(quota_feasible(&config, 1, 0, &edibles(&[10, 40, 20, 5, 100])));
        assert!(!quota_feasible(&config, 1, 0, &edibles(&[10, 15, 100, 0, 25])));
    }

    #[test]
    fn test_mid_level_state() {
        let config = quota_level();
        // At tier 5 with 25 eaten, 5 more needed
        let mut inventory = Inventory::new();
        inventory.set(5, TierSupply { edibles: 5, hazards: 0, area: 0.0 });
        assert!(quota_feasible(&config, 5, 25, &inventory));
        assert!(!quota_feasible(&config, 5, 24, &inventory));
        // Already complete
        assert!(quota_feasible(&config, 5, 30, &Inventory::new()));
    }

    #[test]
    fn test_hazards_count_when_edible() {
        let config = quota_level();
        // Tier 5 needs 30: 25 own edibles plus 5 tier-4 hazards
        assert!(!quota_feasible(&config, 1, 0, &edibles(&[10, 15, 20, 25, 25])));
        let mut inventory = edibles(&[10, 15, 20, 25, 25]);
        inventory.set(4, TierSupply { edibles: 25, hazards: 5, area: 0.0 });
        assert!(quota_feasible(&config, 1, 0, &inventory));

        // Own-tier hazards don't count below the final tier
        let mut inventory = edibles(&[10, 15, 20, 25, 30]);
        inventory.set(4, TierSupply { edibles: 20, hazards: 5, area: 0.0 });
        assert!(!quota_feasible(&config, 1, 0, &inventory));

        // ...but do on it
        let mut inventory = edibles(&[10, 15, 20, 25, 25]);
        inventory.set(5, TierSupply { edibles: 25, hazards: 5, area: 0.0 });
        assert!(quota_feasible(&config, 1, 0, &inventory));
    }

    #[test]
    fn test_inactive_entities_still_count() {
        let config = quota_level();
        let mut registry = EntityRegistry::new();
        for (tier, count) in [(1, 30), (2, 25), (3, 25), (4, 25), (5, 25)] {
            for _ in 0..count {
                let id = make_entity(&mut registry, tier, EntityKind::Edible, 5.0, Vec2::ZERO);
                registry.get_mut(id).unwrap().active = false;
            }
        }
        let player = PlayerState::new(&config);
        assert!(is_winnable(&config, &player, &Inventory::from_registry(&registry)));
    }

    fn area_level() -> LevelConfig {
        LevelConfig::from_json(
            r#"{
                "player": { "initial_size": 10, "growth_factor": 0.1, "tier_growth_factor": 0.5 },
                "rules": { "tier_progression": "area_threshold", "size_tracking": "separate" },
                "tiers": [ { "tier": 1, "threshold": 10 }, { "tier": 2, "threshold": 20 } ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_area_feasibility() {
        let config = area_level();
        // The final bar fills at 20 + (20 - 10) = 30, within 0.1:
        // 29.9^2 - 100 = 794.01 of progression area; factor 0.5 -> 1588.02 raw
        assert_eq!(config.completion_size(), 30.0);
        let mut registry = EntityRegistry::new();
        for _ in 0..16 {
            make_entity(&mut registry, 1, EntityKind::Edible, 10.0, Vec2::ZERO);
        }
        let inventory = Inventory::from_registry(&registry);
        assert_eq!(inventory.total_area(), 1600.0);
        assert!(area_feasible(&config, 10.0, &inventory));

        let short = registry.iter().next().map(|e| e.id).unwrap();
        registry.remove(short);
        assert!(!area_feasible(&config, 10.0, &Inventory::from_registry(&registry)));
        // Reaching the last threshold is not enough on its own
        assert!(!area_feasible(&config, 20.0, &Inventory::new()));
        assert!(area_feasible(&config, 30.0, &Inventory::new()));
    }

    #[test]
    fn test_unspawned_roster_uses_average_size() {
        let config = LevelConfig::pond().unwrap();
        let spawned = BTreeSet::from([1, 2]);
        let inventory = Inventory::new().with_unspawned(&config, &spawned);
        assert_eq!(inventory.supply(1), TierSupply::default());
        let tier3 = inventory.supply(3);
        assert_eq!(tier3.edibles, 12);
        assert_eq!(tier3.hazards, 2);
        // 12 minnows at avg 11, 2 pike at 24
        assert!((tier3.area - (12.0 * 121.0 + 2.0 * 576.0)).abs() < 1e-9);
    }
}
