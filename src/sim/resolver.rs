//! Collision and consumption resolver
//!
//! Pure queries over the registry: which edible the mouth reaches this tick,
//! and which hazards the body touches. Every comparison uses logical sizes;
//! any presentation scale stays out of here.

use std::collections::BTreeSet;

use glam::Vec2;

use super::registry::{EntityId, EntityInstance, EntityKind, EntityRegistry};
use crate::consts::{KNOCKBACK_SPEED, MOUTH_REACH};
use crate::{angle_between, direction_from_angle};

/// What a hazard contact resolves to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HazardAction {
    /// Player is bigger: eat it like an item
    Eat,
    /// Player is not bigger: take the penalty and get pushed away
    Hurt { knockback: Vec2 },
}

/// Mouth point in front of the player
///
/// A zero facing puts the mouth at the player's center.
#[inline]
pub fn mouth_position(player_pos: Vec2, facing: Vec2, size: f64, mouth_offset: f32) -> Vec2 {
    player_pos + facing.normalize_or_zero() * (size as f32 * mouth_offset)
}

/// Can the mouth take a bite of this entity?
#[inline]
pub fn in_mouth_reach(mouth: Vec2, player_size: f64, entity: &EntityInstance) -> bool {
    let distance = mouth.distance(entity.pos) as f64;
    distance < player_size * MOUTH_REACH + entity.logical_size && player_size > entity.logical_size
}

/// Does the player's body overlap this entity?
#[inline]
pub fn in_contact(player_pos: Vec2, player_size: f64, entity: &EntityInstance) -> bool {
    (player_pos.distance(entity.pos) as f64) < player_size + entity.logical_size
}

/// First edible the mouth reaches, scanning consumable tiers low to high
/// and each tier by id
///
/// Returns at most one id per call.
pub fn find_edible(
    registry: &EntityRegistry,
    consumable: &BTreeSet<u32>,
    mouth: Vec2,
    player_size: f64,
) -> Option<EntityId> {
    consumable.iter().find_map(|&tier| {
        registry
            .tier_entities(tier)
            .iter()
            .filter(|e| e.active && e.kind == EntityKind::Edible)
            .find(|e| in_mouth_reach(mouth, player_size, e))
            .map(|e| e.id)
    })
}

/// Active hazards touching the player, in registry order
pub fn hazard_contacts(
    registry: &EntityRegistry,
    player_pos: Vec2,
    player_size: f64,
) -> Vec<EntityId> {
    registry
        .iter()
        .filter(|e| e.active && e.is_hazard())
        .filter(|e| in_contact(player_pos, player_size, e))
        .map(|e| e.id)
        .collect()
}

/// Decide a hazard contact against the player's current size
///
/// `None` if the hazard is inactive or no longer touching.
pub fn resolve_hazard(
    hazard: &EntityInstance,
    player_pos: Vec2,
    player_size: f64,
) -> Option<HazardAction> {
    if !hazard.active || !hazard.is_hazard() || !in_contact(player_pos, player_size, hazard) {
        return None;
    }
    if player_size > hazard.logical_size {
        Some(HazardAction::Eat)
    } else {
        Some(HazardAction::Hurt {
            knockback: knockback(hazard.pos, player_pos),
        })
    }
}

/// Fixed-magnitude impulse along the hazard -> player direction
pub fn knockback(hazard_pos: Vec2, player_pos: Vec2) -> Vec2 {
    direction_from_angle(angle_between(hazard_pos, player_pos)) * KNOCKBACK_SPEED
}
