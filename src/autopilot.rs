//! Autopilot for the headless driver and demo mode
//!
//! Greedy: go for the edible that will be despawned soonest (lowest tier,
//! then nearest), and bend the path away from hazards that would hurt.

use glam::Vec2;

use crate::level::WorldBounds;
use crate::sim::{EngineState, EntityId, EntityInstance};

/// Knockback velocity keeps this fraction of itself each tick
const KNOCKBACK_DECAY: f32 = 0.9;

#[derive(Debug, Clone, Copy)]
pub struct Autopilot {
    /// Extra clearance kept from dangerous hazards
    pub danger_margin: f32,
    /// Strength of hazard repulsion relative to target attraction
    pub avoid_weight: f32,
}

impl Default for Autopilot {
    fn default() -> Self {
        Self {
            danger_margin: 40.0,
            avoid_weight: 2.0,
        }
    }
}

impl Autopilot {
    /// Best entity to eat next, if any is both active and smaller
    pub fn choose_target(&self, state: &EngineState) -> Option<EntityId> {
        let player = state.player_pos;
        let size = state.player.size;
        state
            .registry
            .iter()
            .filter(|e| e.active && size > e.logical_size)
            .min_by(|a, b| {
                a.tier.cmp(&b.tier).then_with(|| {
                    a.pos
                        .distance_squared(player)
                        .partial_cmp(&b.pos.distance_squared(player))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
            })
            .map(|e| e.id)
    }

    /// Unit steering direction for this tick (zero when there's nothing to do)
    pub fn steer(&self, state: &EngineState) -> Vec2 {
        let player = state.player_pos;
        let toward = self
            .choose_target(state)
            .and_then(|id| state.registry.get(id))
            .map(|target| (target.pos - player).normalize_or_zero())
            .unwrap_or(Vec2::ZERO);

        let mut avoid = Vec2::ZERO;
        for hazard in state.registry.iter().filter(|e| self.is_dangerous(state, e)) {
            let away = player - hazard.pos;
            let reach = (state.player.size + hazard.logical_size) as f32 + self.danger_margin;
            let dist = away.length();
            if dist >= reach || dist <= f32::EPSILON {
                continue;
            }
            let push = away / dist * (1.0 - dist / reach) * self.avoid_weight;
            // Slide around the hazard instead of stalling head-on
            let mut tangent = push.perp();
            if tangent.dot(toward) < 0.0 {
                tangent = -tangent;
            }
            avoid += push + tangent * 0.5;
        }

        (toward + avoid).normalize_or_zero()
    }

    fn is_dangerous(&self, state: &EngineState, entity: &EntityInstance) -> bool {
        entity.active && entity.is_hazard() && entity.logical_size >= state.player.size
    }
}

/// Player motion for drivers that don't have a physics engine
#[derive(Debug, Clone, Copy)]
pub struct Body {
    pub pos: Vec2,
    pub facing: Vec2,
    /// Decaying impulse from hazard hits
    pub knockback: Vec2,
}

impl Body {
    pub fn new(pos: Vec2) -> Self {
        Self {
            pos,
            facing: Vec2::X,
            knockback: Vec2::ZERO,
        }
    }

    /// Move along `direction` at `speed`, plus any knockback, inside the world
    pub fn step(&mut self, direction: Vec2, speed: f32, dt: f32, world: &WorldBounds) {
        if direction != Vec2::ZERO {
            self.facing = direction.normalize_or_zero();
        }
        self.pos += (direction * speed + self.knockback) * dt;
        self.pos = self
            .pos
            .clamp(Vec2::ZERO, Vec2::new(world.width, world.height));

        self.knockback *= KNOCKBACK_DECAY;
        if self.knockback.length_squared() < 1.0 {
            self.knockback = Vec2::ZERO;
        }
    }

    pub fn push(&mut self, impulse: Vec2) {
        self.knockback += impulse;
    }
}
