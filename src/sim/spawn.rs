//! Entity spawning
//!
//! Instances are rolled from the level roster with a PCG stream seeded from
//! the run seed and the tier, so a level + seed always yields the same
//! registry regardless of when a tier gets spawned.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::registry::{ArchetypeRef, EntityInstance, EntityKind, EntityRegistry};
use crate::consts::SPAWN_MARGIN;
use crate::level::{LevelConfig, SpawnMode};

/// Deterministic RNG for one tier of one run
pub fn tier_rng(seed: u64, tier: u32) -> Pcg32 {
    let tier_seed = (tier as u64)
        .wrapping_mul(2654435761)
        .wrapping_add(seed);
    Pcg32::seed_from_u64(tier_seed)
}

/// Spawn every archetype instance configured for `tier`; returns the count
pub fn spawn_tier(
    registry: &mut EntityRegistry,
    config: &LevelConfig,
    tier: u32,
    seed: u64,
) -> usize {
    let mut rng = tier_rng(seed, tier);
    let mut spawned = 0;

    for (index, archetype) in config.archetypes(tier).iter().enumerate() {
        let size_spec = archetype.size_spec(tier);
        for _ in 0..archetype.count {
            let logical_size = size_spec.resolve(&mut rng);
            let pos = random_position(&mut rng, config);
            let id = registry.next_entity_id();
            registry.insert(EntityInstance {
                id,
                tier,
                archetype: ArchetypeRef { tier, index },
                kind: if archetype.is_hazard {
                    EntityKind::Hazard
                } else {
                    EntityKind::Edible
                },
                item_type: archetype.item_type.clone(),
                value: archetype.value,
                shape: archetype.shape,
                color: archetype.color,
                logical_size,
                pos,
                active: false,
            });
            spawned += 1;
        }
    }

    log::debug!("Spawned {} entities for tier {}", spawned, tier);
    spawned
}

/// Tiers that should exist while the player is at `current_tier`
pub fn tiers_to_spawn(config: &LevelConfig, current_tier: u32) -> std::ops::RangeInclusive<u32> {
    match config.rules.spawn_mode {
        SpawnMode::AllAtStart => 1..=config.max_tier(),
        SpawnMode::PerTier => 1..=(current_tier + 1).min(config.max_tier()),
    }
}

/// Uniform position inside the world, away from the edges
fn random_position<R: Rng>(rng: &mut R, config: &LevelConfig) -> Vec2 {
    let axis = |rng: &mut R, extent: f32| {
        let lo = SPAWN_MARGIN.min(extent / 2.0);
        let hi = (extent - SPAWN_MARGIN).max(lo);
        if hi > lo { rng.random_range(lo..=hi) } else { lo }
    };
    let x = axis(&mut *rng, config.world.width);
    let y = axis(&mut *rng, config.world.height);
    Vec2::new(x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_tier_matches_roster() {
        let config = LevelConfig::micro_world().unwrap();
        let mut registry = EntityRegistry::new();
        assert_eq!(spawn_tier(&mut registry, &config, 2, 42), 28);
        assert_eq!(registry.count(2, EntityKind::Edible), 25);
        assert_eq!(registry.count(2, EntityKind::Hazard), 3);

        for entity in registry.iter() {
            assert_eq!(entity.tier, 2);
            let archetype = &config.archetypes(2)[entity.archetype.index];
            assert_eq!(archetype.item_type, entity.item_type);
            if entity.is_hazard() {
                assert_eq!(entity.logical_size, 25.0);
            } else {
                assert!((12.0..=16.0).contains(&entity.logical_size));
            }
            let max = Vec2::new(config.world.width, config.world.height) - SPAWN_MARGIN;
            assert!(entity.pos.cmpge(Vec2::splat(SPAWN_MARGIN)).all());
            assert!(entity.pos.cmple(max).all());
        }
    }

    #[test]
    fn test_spawn_is_deterministic() {
        let config = LevelConfig::micro_world().unwrap();
        let mut a = EntityRegistry::new();
        let mut b = EntityRegistry::new();
        spawn_tier(&mut a, &config, 3, 7);
        spawn_tier(&mut b, &config, 3, 7);
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.logical_size, y.logical_size);
            assert_eq!(x.pos, y.pos);
        }

        let mut c = EntityRegistry::new();
        spawn_tier(&mut c, &config, 3, 8);
        assert!(a.iter().zip(c.iter()).any(|(x, y)| x.pos != y.pos));
    }

    #[test]
    fn test_tiers_to_spawn() {
        let config = LevelConfig::micro_world().unwrap();
        assert_eq!(tiers_to_spawn(&config, 1), 1..=5);
        let pond = LevelConfig::pond().unwrap();
        assert_eq!(tiers_to_spawn(&pond, 1), 1..=2);
        assert_eq!(tiers_to_spawn(&pond, 3), 1..=3);
    }

    #[test]
    fn test_tiny_world_positions() {
        let mut config = LevelConfig::micro_world().unwrap();
        config.world.width = 40.0;
        config.world.height = 40.0;
        let mut registry = EntityRegistry::new();
        spawn_tier(&mut registry, &config, 1, 1);
        assert!(registry.iter().all(|e| e.pos == Vec2::new(20.0, 20.0)));
    }
}
