//! Visibility window policy
//!
//! Which entities are interactable is a pure function of the player's tier
//! and the entity's tier and kind. The same window decides what may be
//! eaten, so the two can never disagree.

use std::collections::BTreeSet;

use super::registry::{EntityKind, EntityRegistry};
use crate::level::ConsumableWindow;

impl ConsumableWindow {
    /// Inclusive tier bounds around `current`, before clipping to the level
    fn bounds(&self, current: u32) -> (u32, u32) {
        let low = current.saturating_sub(1).max(1);
        let high = match self {
            ConsumableWindow::TwoTier => current,
            ConsumableWindow::ThreeTier => current + 1,
        };
        (low, high)
    }

    /// Tiers inside the window around `current`, clipped to `1..=max_tier`
    pub fn tiers(&self, current: u32, max_tier: u32) -> BTreeSet<u32> {
        let (low, high) = self.bounds(current);
        (low..=high.min(max_tier)).collect()
    }

    pub fn contains(&self, current: u32, tier: u32) -> bool {
        let (low, high) = self.bounds(current);
        (low..=high).contains(&tier)
    }
}

/// Whether an entity of `tier` and `kind` is active while the player is at `current`
///
/// Hazards are never active at tier 1.
pub fn is_active(window: ConsumableWindow, current: u32, tier: u32, kind: EntityKind) -> bool {
    if kind == EntityKind::Hazard && current == 1 {
        return false;
    }
    window.contains(current, tier)
}

/// Recompute every entity's active flag; returns how many are active
pub fn refresh(registry: &mut EntityRegistry, window: ConsumableWindow, current: u32) -> usize {
    let mut active = 0;
    for entity in registry.iter_mut() {
        entity.active = is_active(window, current, entity.tier, entity.kind);
        if entity.active {
            active += 1;
        }
    }
    active
}

/// Tiers that hold at least one active entity
pub fn active_tiers(registry: &EntityRegistry) -> BTreeSet<u32> {
    registry.iter().filter(|e| e.active).map(|e| e.tier).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::LevelConfig;
    use crate::sim::growth::PlayerState;
    use crate::sim::registry::tests::make_entity;
    use glam::Vec2;

    fn populated() -> EntityRegistry {
        let mut registry = EntityRegistry::new();
        for tier in 1..=5 {
            for _ in 0..3 {
                make_entity(&mut registry, tier, EntityKind::Edible, 1.0, Vec2::ZERO);
            }
            if tier >= 2 {
                make_entity(&mut registry, tier, EntityKind::Hazard, 1.0, Vec2::ZERO);
            }
        }
        registry
    }

    fn active_set(registry: &EntityRegistry, kind: EntityKind) -> BTreeSet<u32> {
        registry
            .iter()
            .filter(|e| e.kind == kind && e.active)
            .map(|e| e.tier)
            .collect()
    }

    #[test]
    fn test_window_tiers() {
        let three = ConsumableWindow::ThreeTier;
        assert_eq!(three.tiers(1, 5), BTreeSet::from([1, 2]));
        assert_eq!(three.tiers(3, 5), BTreeSet::from([2, 3, 4]));
        assert_eq!(three.tiers(5, 5), BTreeSet::from([4, 5]));
        let two = ConsumableWindow::TwoTier;
        assert_eq!(two.tiers(1, 5), BTreeSet::from([1]));
        assert_eq!(two.tiers(4, 5), BTreeSet::from([3, 4]));
    }

    #[test]
    fn test_tier_one_suppresses_hazards() {
        let mut registry = populated();
        refresh(&mut registry, ConsumableWindow::ThreeTier, 1);
        assert_eq!(active_set(&registry, EntityKind::Edible), BTreeSet::from([1, 2]));
        assert!(active_set(&registry, EntityKind::Hazard).is_empty());
    }

    #[test]
    fn test_visibility_at_tier_two_and_three() {
        let mut registry = populated();
        refresh(&mut registry, ConsumableWindow::ThreeTier, 2);
        assert_eq!(active_set(&registry, EntityKind::Edible), BTreeSet::from([1, 2, 3]));
        assert_eq!(active_set(&registry, EntityKind::Hazard), BTreeSet::from([2, 3]));

        refresh(&mut registry, ConsumableWindow::ThreeTier, 3);
        assert_eq!(active_set(&registry, EntityKind::Edible), BTreeSet::from([2, 3, 4]));
        assert_eq!(active_set(&registry, EntityKind::Hazard), BTreeSet::from([2, 3, 4]));
    }

    #[test]
    fn test_consumable_tiers_match_visibility() {
        for window in [ConsumableWindow::TwoTier, ConsumableWindow::ThreeTier] {
            let mut config = LevelConfig::micro_world().unwrap();
            config.rules.consumable_window = window;
            for tier in 1..=config.max_tier() {
                let mut player = PlayerState::new(&config);
                player.current_tier = tier;
                let mut registry = populated();
                refresh(&mut registry, window, tier);
                assert_eq!(
                    player.consumable_tiers(&config),
                    active_tiers(&registry),
                    "window {:?} at tier {}",
                    window,
                    tier
                );
            }
        }
    }

    #[test]
    fn test_refresh_counts_active() {
        let mut registry = populated();
        // Tier 1, three-tier window: 3 + 3 edibles, no hazards
        assert_eq!(refresh(&mut registry, ConsumableWindow::ThreeTier, 1), 6);
        // Tier 5, two-tier window: tiers 4 and 5, 4 each
        assert_eq!(refresh(&mut registry, ConsumableWindow::TwoTier, 5), 8);
    }
}
