//! Per-frame engine tick
//!
//! The scene layer reports positions; the tick resolves at most one mouth
//! consumption, then hazard contacts, and returns what happened. Nothing here
//! reads a clock.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::registry::EntityId;
use super::resolver::{self, HazardAction};
use super::state::{EngineState, LevelPhase};
use crate::level::HazardResolution;

/// Positions reported by the scene layer for a single tick
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickInput {
    pub player_pos: Vec2,
    pub mouth_pos: Vec2,
    /// Entities that moved since the last tick; unknown ids are ignored
    #[serde(default)]
    pub entity_positions: Vec<(EntityId, Vec2)>,
}

/// How a hazard contact was resolved
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HazardOutcome {
    Consumed { points: u32 },
    Damaged { penalty: u32, knockback: Vec2 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HazardEvent {
    pub hazard_id: EntityId,
    pub outcome: HazardOutcome,
}

/// What one tick did
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickOutcome {
    /// Edible eaten by the mouth this tick
    pub consumed: Option<EntityId>,
    pub hazard_events: Vec<HazardEvent>,
    pub score_delta: i64,
    /// New tier, if the player advanced during this tick
    pub tier_advanced: Option<u32>,
}

impl TickOutcome {
    /// Sum of knockback impulses from this tick's hazard hits
    pub fn knockback(&self) -> Vec2 {
        self.hazard_events
            .iter()
            .map(|e| match e.outcome {
                HazardOutcome::Damaged { knockback, .. } => knockback,
                HazardOutcome::Consumed { .. } => Vec2::ZERO,
            })
            .sum()
    }

    pub fn was_hit(&self) -> bool {
        self.hazard_events
            .iter()
            .any(|e| matches!(e.outcome, HazardOutcome::Damaged { .. }))
    }
}

/// Advance the engine by one frame
pub fn tick(state: &mut EngineState, input: &TickInput) -> TickOutcome {
    let mut outcome = TickOutcome::default();
    // Frozen once won
    if state.phase == LevelPhase::Won {
        return outcome;
    }

    state.time_ticks += 1;
    state.player_pos = input.player_pos;
    for &(id, pos) in &input.entity_positions {
        state.registry.set_position(id, pos);
    }

    let score_before = state.score;
    let tier_before = state.player.current_tier;

    // Mouth: at most one item per tick
    let consumable = state.consumable_tiers();
    let edible = resolver::find_edible(
        &state.registry,
        &consumable,
        input.mouth_pos,
        state.player.size,
    );
    outcome.consumed = edible.filter(|&id| state.consume(id).is_some());

    // Body: hazards, re-checked one by one since eating can change the tier
    if state.phase != LevelPhase::Won {
        let contacts =
            resolver::hazard_contacts(&state.registry, input.player_pos, state.player.size);
        for hazard_id in contacts {
            let Some(hazard) = state.registry.get(hazard_id) else {
                continue;
            };
            let Some(action) =
                resolver::resolve_hazard(hazard, input.player_pos, state.player.size)
            else {
                continue;
            };
            let resolved = match action {
                HazardAction::Eat => state
                    .consume(hazard_id)
                    .map(|points| HazardOutcome::Consumed { points }),
                HazardAction::Hurt { knockback } => Some(HazardOutcome::Damaged {
                    penalty: state.take_damage(hazard_id, knockback),
                    knockback,
                }),
            };
            let Some(resolved) = resolved else {
                continue;
            };
            outcome.hazard_events.push(HazardEvent {
                hazard_id,
                outcome: resolved,
            });

            if state.config.rules.hazard_resolution == HazardResolution::First || state.is_won() {
                break;
            }
        }
    }

    outcome.score_delta = state.score - score_before;
    if state.player.current_tier > tier_before {
        outcome.tier_advanced = Some(state.player.current_tier);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autopilot::Autopilot;
    use crate::level::{LevelConfig, SizeTracking};
    use crate::sim::registry::EntityKind;
    use crate::sim::resolver::mouth_position;
    use crate::consts::MOUTH_REACH;
    use crate::sim::state::GameEvent;
    use crate::view::ViewTransform;
    use proptest::prelude::*;

    fn at(pos: Vec2) -> TickInput {
        TickInput {
            player_pos: pos,
            mouth_pos: pos,
            entity_positions: Vec::new(),
        }
    }

    /// Fresh micro world with every entity moved off-screen
    fn cleared(config: LevelConfig) -> EngineState {
        let mut state = EngineState::init_level(config, 1);
        let far = Vec2::splat(-10_000.0);
        for entity in state.registry.iter_mut() {
            entity.pos = far;
        }
        state
    }

    fn ids_in(state: &EngineState, tier: u32, kind: EntityKind, n: usize) -> Vec<EntityId> {
        state
            .registry
            .tier_entities(tier)
            .iter()
            .filter(|e| e.kind == kind)
            .take(n)
            .map(|e| e.id)
            .collect()
    }

    #[test]
    fn test_at_most_one_consumption_per_tick() {
        let mut state = cleared(LevelConfig::micro_world().unwrap());
        let spot = Vec2::new(400.0, 400.0);
        let ids = ids_in(&state, 1, EntityKind::Edible, 3);
        for &id in &ids {
            state.registry.set_position(id, spot);
        }

        let outcome = tick(&mut state, &at(spot));
        assert_eq!(outcome.consumed, Some(ids[0]));
        assert_eq!(outcome.score_delta, 80);
        assert_eq!(state.player.total_consumed, 1);

        let outcome = tick(&mut state, &at(spot));
        assert_eq!(outcome.consumed, Some(ids[1]));
        assert_eq!(state.player.total_consumed, 2);
    }

    #[test]
    fn test_entity_positions_are_applied() {
        let mut state = cleared(LevelConfig::micro_world().unwrap());
        let id = ids_in(&state, 1, EntityKind::Edible, 1)[0];
        let spot = Vec2::new(100.0, 100.0);
        assert_eq!(tick(&mut state, &at(spot)).consumed, None);

        let input = TickInput {
            entity_positions: vec![(id, spot), (424242, spot)],
            ..at(spot)
        };
        assert_eq!(tick(&mut state, &input).consumed, Some(id));
        assert_eq!(state.time_ticks, 2);
    }

    /// Tier 3 player surrounded by two tier-3 hazards bigger than it
    fn hazard_setup(mode: HazardResolution) -> (EngineState, Vec<EntityId>, Vec2) {
        let mut config = LevelConfig::micro_world().unwrap();
        config.rules.hazard_resolution = mode;
        let mut state = cleared(config);
        state.player.current_tier = 3;
        let window = state.config.rules.consumable_window;
        crate::sim::visibility::refresh(&mut state.registry, window, 3);

        let player = Vec2::new(600.0, 600.0);
        let hazards = ids_in(&state, 3, EntityKind::Hazard, 2);
        state.registry.set_position(hazards[0], player + Vec2::new(-30.0, 0.0));
        state.registry.set_position(hazards[1], player + Vec2::new(0.0, 30.0));
        (state, hazards, player)
    }

    #[test]
    fn test_hazard_mode_all() {
        let (mut state, hazards, player) = hazard_setup(HazardResolution::All);
        let outcome = tick(&mut state, &at(player));
        assert_eq!(outcome.hazard_events.len(), 2);
        assert_eq!(outcome.score_delta, -160);
        assert!(outcome.was_hit());
        assert_eq!(outcome.hazard_events[0].hazard_id, hazards[0]);
        // Hazards are untouched by damage
        assert!(state.registry.contains(hazards[0]));

        // Pushed away from both: +x from the first, -y from the second
        let push = outcome.knockback();
        assert!(push.x > 0.0 && push.y < 0.0);
    }

    #[test]
    fn test_hazard_mode_first() {
        let (mut state, hazards, player) = hazard_setup(HazardResolution::First);
        let outcome = tick(&mut state, &at(player));
        assert_eq!(outcome.hazard_events.len(), 1);
        assert_eq!(outcome.hazard_events[0].hazard_id, hazards[0]);
        assert_eq!(outcome.score_delta, -80);
        match outcome.hazard_events[0].outcome {
            HazardOutcome::Damaged { penalty, knockback } => {
                assert_eq!(penalty, 80);
                assert!(knockback.x > 0.0 && knockback.y.abs() < 1e-3);
            }
            other => panic!("expected damage, got {:?}", other),
        }
    }

    #[test]
    fn test_smaller_hazard_is_eaten() {
        let (mut state, hazards, player) = hazard_setup(HazardResolution::All);
        state.player.size = 40.0;
        let outcome = tick(&mut state, &at(player));
        assert_eq!(outcome.hazard_events.len(), 2);
        assert!(outcome
            .hazard_events
            .iter()
            .all(|e| matches!(e.outcome, HazardOutcome::Consumed { .. })));
        assert!(!state.registry.contains(hazards[0]));
        assert!(outcome.score_delta > 0);
        let events = state.drain_events();
        assert!(events.iter().any(|e| matches!(e, GameEvent::ItemConsumed { hazard: true, .. })));
    }

    #[test]
    fn test_no_hazards_at_tier_one() {
        let mut state = cleared(LevelConfig::micro_world().unwrap());
        let player = Vec2::new(300.0, 300.0);
        for id in ids_in(&state, 2, EntityKind::Hazard, 3) {
            state.registry.set_position(id, player);
        }
        let outcome = tick(&mut state, &at(player));
        assert!(outcome.hazard_events.is_empty());
        assert_eq!(state.score, 0);
    }

    #[test]
    fn test_tick_reports_tier_advance() {
        let mut state = cleared(LevelConfig::micro_world().unwrap());
        let spot = Vec2::new(200.0, 200.0);
        let ids = ids_in(&state, 1, EntityKind::Edible, 10);
        let mut advanced = Vec::new();
        for id in ids {
            let input = TickInput {
                entity_positions: vec![(id, spot)],
                ..at(spot)
            };
            let outcome = tick(&mut state, &input);
            assert_eq!(outcome.consumed, Some(id));
            advanced.push(outcome.tier_advanced);
        }
        assert!(advanced[..9].iter().all(Option::is_none));
        assert_eq!(advanced[9], Some(2));
    }

    #[test]
    fn test_won_engine_ignores_ticks() {
        let mut state = cleared(LevelConfig::micro_world().unwrap());
        state.phase = LevelPhase::Won;
        let id = ids_in(&state, 1, EntityKind::Edible, 1)[0];
        let spot = Vec2::new(50.0, 50.0);
        state.registry.set_position(id, spot);
        let outcome = tick(&mut state, &at(spot));
        assert_eq!(outcome, TickOutcome::default());
        assert_eq!(state.time_ticks, 0);
    }

    /// Feed the autopilot's target straight into the tick until the level ends
    fn play_out(config: LevelConfig, seed: u64) -> EngineState {
        let mut state = EngineState::init_level(config, seed);
        let autopilot = Autopilot::default();
        for _ in 0..2_000 {
            if state.is_won() {
                break;
            }
            let Some(target) = autopilot.choose_target(&state) else {
                break;
            };
            let pos = state.registry.get(target).map(|e| e.pos).unwrap();
            tick(&mut state, &at(pos));
        }
        state
    }

    #[test]
    fn test_micro_world_playthrough() {
        let mut state = play_out(LevelConfig::micro_world().unwrap(), 2024);
        assert!(
            state.is_won(),
            "stuck at tier {} ({} in tier)",
            state.current_tier(),
            state.player.consumed_in_tier
        );
        assert_eq!(state.current_tier(), 5);
        assert!(state.player.total_consumed >= 100);

        let events = state.drain_events();
        let advances: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                GameEvent::TierAdvanced { to, .. } => Some(*to),
                _ => None,
            })
            .collect();
        assert_eq!(advances, vec![2, 3, 4, 5]);
        assert!(matches!(events.last(), Some(GameEvent::LevelWon { .. })));
    }

    #[test]
    fn test_pond_playthrough() {
        let state = play_out(LevelConfig::pond().unwrap(), 99);
        assert!(state.is_won(), "stuck at tier {}", state.current_tier());
        assert_eq!(state.current_tier(), 3);
        assert!(state.player.internal_size > state.player.size);
    }

    #[test]
    fn test_shared_tracking_playthrough() {
        let mut config = LevelConfig::pond().unwrap();
        config.rules.size_tracking = SizeTracking::Shared;
        config.player.growth_factor = 0.5;
        let state = play_out(config, 5);
        assert!(state.is_won());
        assert_eq!(state.player.internal_size, state.player.size);
    }

    proptest! {
        #[test]
        fn prop_view_scale_never_reaches_the_rules(scale in 0.1f64..10.0, seed in 0u64..1_000) {
            let mut state = EngineState::init_level(LevelConfig::micro_world().unwrap(), seed);
            let mut view = ViewTransform::for_level(&state.config);
            view.current_scale *= scale;
            let far = Vec2::splat(-10_000.0);

            for _ in 0..30 {
                if state.is_won() {
                    break;
                }
                let size = state.player.size;
                let Some((target, target_pos, target_size)) = state
                    .registry
                    .iter()
                    .find(|e| e.active && e.kind == EntityKind::Edible && size > e.logical_size)
                    .map(|e| (e.id, e.pos, e.logical_size))
                else {
                    break;
                };
                let others: Vec<_> = state
                    .registry
                    .iter()
                    .filter(|e| e.id != target)
                    .map(|e| (e.id, far))
                    .collect();

                let logical_reach = size * MOUTH_REACH + target_size;
                let drawn_reach =
                    view.visual_size(size) * MOUTH_REACH + view.visual_size(target_size);
                let expected_reach = logical_reach * view.current_scale;
                prop_assert!((drawn_reach - expected_reach).abs() < 1e-6 * drawn_reach);

                // Just out of logical reach: no bite, however the sprites overlap
                let miss = target_pos + Vec2::X * (logical_reach * 1.01 + 0.01) as f32;
                let input = TickInput {
                    player_pos: miss,
                    mouth_pos: miss,
                    entity_positions: others.clone(),
                };
                let outcome = tick(&mut state, &input);
                prop_assert_eq!(outcome.consumed, None);
                prop_assert!(state.registry.contains(target));

                // Just inside: eaten, however far apart the sprites are drawn
                let bite = target_pos + Vec2::X * (logical_reach * 0.98) as f32;
                let input = TickInput {
                    player_pos: bite,
                    mouth_pos: bite,
                    entity_positions: others,
                };
                let outcome = tick(&mut state, &input);
                prop_assert_eq!(outcome.consumed, Some(target));

                for event in state.drain_events() {
                    if let GameEvent::TierAdvanced { from, to } = event {
                        view.on_tier_advanced(&state.config, from, to);
                    }
                }
            }

            // Rebases telescope to threshold(1) / threshold(current)
            let tier = state.current_tier();
            let expected =
                scale * state.config.tier_threshold(1) / state.config.tier_threshold(tier);
            prop_assert!((view.current_scale - expected).abs() < 1e-9 * expected);
            prop_assert_eq!(view.zoom, state.config.tier(tier).and_then(|t| t.zoom).unwrap_or(1.0));
        }

        #[test]
        fn prop_mouth_follows_facing(
            x in -500.0f32..500.0,
            y in -500.0f32..500.0,
            angle in 0.0f32..6.28,
        ) {
            let facing = crate::direction_from_angle(angle);
            let mouth = mouth_position(Vec2::new(x, y), facing, 20.0, 0.7);
            prop_assert!((mouth.distance(Vec2::new(x, y)) - 14.0).abs() < 1e-3);
        }
    }
}
