//! Entity registry
//!
//! Owns every spawned edible and hazard instance, partitioned by tier. Each
//! tier's list is kept sorted by id so iteration order is deterministic.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::level::Shape;

pub type EntityId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Edible,
    Hazard,
}

/// Points back at the archetype an instance was spawned from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchetypeRef {
    pub tier: u32,
    pub index: usize,
}

/// A concrete spawned entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityInstance {
    pub id: EntityId,
    /// Fixed at spawn; never changes
    pub tier: u32,
    pub archetype: ArchetypeRef,
    pub kind: EntityKind,
    /// Archetype `type`, the key for diminishing returns
    pub item_type: String,
    pub value: Option<u32>,
    pub shape: Shape,
    pub color: Option<u32>,
    /// Unscaled size used by every game rule; resolved once at spawn
    pub logical_size: f64,
    pub pos: Vec2,
    /// Inside the visibility window (interactable this tier)
    pub active: bool,
}

impl EntityInstance {
    pub fn is_hazard(&self) -> bool {
        self.kind == EntityKind::Hazard
    }
}

/// All live entities, by tier
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityRegistry {
    tiers: BTreeMap<u32, Vec<EntityInstance>>,
    /// Reverse lookup: id -> tier
    index: BTreeMap<EntityId, u32>,
    next_id: EntityId,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            tiers: BTreeMap::new(),
            index: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Add an instance; ids must come from `next_entity_id`
    pub fn insert(&mut self, entity: EntityInstance) {
        self.index.insert(entity.id, entity.tier);
        let list = self.tiers.entry(entity.tier).or_default();
        let pos = list.partition_point(|e| e.id < entity.id);
        list.insert(pos, entity);
    }

    /// Permanently remove an entity
    pub fn remove(&mut self, id: EntityId) -> Option<EntityInstance> {
        let tier = self.index.remove(&id)?;
        let list = self.tiers.get_mut(&tier)?;
        let pos = list.binary_search_by_key(&id, |e| e.id).ok()?;
        let entity = list.remove(pos);
        if list.is_empty() {
            self.tiers.remove(&tier);
        }
        Some(entity)
    }

    pub fn get(&self, id: EntityId) -> Option<&EntityInstance> {
        let tier = self.index.get(&id)?;
        let list = self.tiers.get(tier)?;
        list.binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|i| &list[i])
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut EntityInstance> {
        let tier = self.index.get(&id)?;
        let list = self.tiers.get_mut(tier)?;
        let i = list.binary_search_by_key(&id, |e| e.id).ok()?;
        Some(&mut list[i])
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    /// Update a position reported by the scene layer; unknown ids are ignored
    pub fn set_position(&mut self, id: EntityId, pos: Vec2) {
        if let Some(entity) = self.get_mut(id) {
            entity.pos = pos;
        }
    }

    /// Entities of one tier, sorted by id
    pub fn tier_entities(&self, tier: u32) -> &[EntityInstance] {
        self.tiers.get(&tier).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Tiers that currently hold at least one entity
    pub fn tiers(&self) -> impl Iterator<Item = u32> + '_ {
        self.tiers.keys().copied()
    }

    /// Every entity, by tier then id
    pub fn iter(&self) -> impl Iterator<Item = &EntityInstance> {
        self.tiers.values().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut EntityInstance> {
        self.tiers.values_mut().flatten()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Count of one kind in a tier
    pub fn count(&self, tier: u32, kind: EntityKind) -> u32 {
        self.tier_entities(tier)
            .iter()
            .filter(|e| e.kind == kind)
            .count() as u32
    }

    /// Remove every entity of a tier, returning how many were dropped
    pub fn despawn_tier(&mut self, tier: u32) -> usize {
        let Some(list) = self.tiers.remove(&tier) else {
            return 0;
        };
        for entity in &list {
            self.index.remove(&entity.id);
        }
        list.len()
    }
}
