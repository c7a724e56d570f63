//! Engine state and level lifecycle
//!
//! Everything one level run owns lives here: the immutable config, the
//! player's growth state, the entity registry, score and phase. Tier advances
//! are applied synchronously inside `consume`, so by the time it returns the
//! registry, visibility flags and winnability verdict already reflect the new
//! tier.

use std::collections::BTreeSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::growth::{ConsumedItem, PlayerState};
use super::registry::{EntityId, EntityRegistry};
use super::spawn::{spawn_tier, tiers_to_spawn};
use super::visibility;
use super::winnability::{self, Inventory};
use crate::level::LevelConfig;
use crate::rating::{LevelResult, star_rating};

/// Where the level run stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelPhase {
    /// Normal play
    Playing,
    /// Final tier completed; the engine is frozen
    Won,
    /// Remaining supply can't reach the final target. Ticks still run; the
    /// collaborator decides whether to halt.
    Unwinnable,
}

/// Notifications for the presentation layer, drained once per frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    TierAdvanced {
        from: u32,
        to: u32,
    },
    ItemConsumed {
        id: EntityId,
        item_type: String,
        tier: u32,
        points: u32,
        hazard: bool,
    },
    HazardHit {
        id: EntityId,
        penalty: u32,
        knockback: Vec2,
    },
    EntitiesDespawned {
        tier: u32,
        count: usize,
    },
    LevelWon {
        score: i64,
        stars: u8,
    },
    LevelUnwinnable,
}

/// Complete state of one level run (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineState {
    pub config: LevelConfig,
    /// Run seed; with the config, fully determines the spawned registry
    pub seed: u64,
    pub player: PlayerState,
    pub registry: EntityRegistry,
    /// Can go negative from hazard penalties
    pub score: i64,
    pub phase: LevelPhase,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Last reported player position
    pub player_pos: Vec2,
    /// Tiers already spawned (including since-despawned ones)
    spawned_tiers: BTreeSet<u32>,
    #[serde(skip)]
    events: Vec<GameEvent>,
}

impl EngineState {
    /// Start a fresh run of `config`
    pub fn init_level(config: LevelConfig, seed: u64) -> Self {
        let player = PlayerState::new(&config);
        let player_pos = Vec2::new(config.world.width / 2.0, config.world.height / 2.0);
        let mut state = Self {
            config,
            seed,
            player,
            registry: EntityRegistry::new(),
            score: 0,
            phase: LevelPhase::Playing,
            time_ticks: 0,
            player_pos,
            spawned_tiers: BTreeSet::new(),
            events: Vec::new(),
        };

        state.spawn_pending();
        state.refresh_visibility();
        log::info!(
            "Level '{}' started: {} tiers, {} entities, seed {}",
            state.config.name,
            state.config.max_tier(),
            state.registry.len(),
            seed
        );
        state.check_winnable();
        state
    }

    /// Eat an entity by id
    ///
    /// Returns `None` (and changes nothing) unless the entity exists, is
    /// active and the level isn't already won.
    pub fn consume(&mut self, id: EntityId) -> Option<u32> {
        if self.phase == LevelPhase::Won {
            return None;
        }
        if !self.registry.get(id).is_some_and(|e| e.active) {
            return None;
        }
        let entity = self.registry.remove(id)?;

        let result = self.player.consume(&ConsumedItem::from(&entity), &self.config);
        self.score += result.points as i64;
        self.events.push(GameEvent::ItemConsumed {
            id,
            item_type: entity.item_type.clone(),
            tier: entity.tier,
            points: result.points,
            hazard: entity.is_hazard(),
        });

        match result.tier_advance {
            Some((from, to)) => self.on_tier_advanced(from, to),
            None => self.check_winnable(),
        }
        self.check_complete();
        Some(result.points)
    }

    /// Apply a hazard hit: deduct the flat penalty and report the knockback
    pub fn take_damage(&mut self, id: EntityId, knockback: Vec2) -> u32 {
        let penalty = self.player.take_damage(&self.config);
        self.score -= penalty as i64;
        self.events.push(GameEvent::HazardHit {
            id,
            penalty,
            knockback,
        });
        log::debug!("Hazard {} hit for -{}, score {}", id, penalty, self.score);
        penalty
    }

    fn on_tier_advanced(&mut self, from: u32, to: u32) {
        log::info!(
            "Tier {} -> {} ({}) at score {}",
            from,
            to,
            self.config.tier(to).map(|t| t.name.as_str()).unwrap_or(""),
            self.score
        );
        self.events.push(GameEvent::TierAdvanced { from, to });

        // Entities only live for two advances past their tier
        let stale: Vec<u32> = self.registry.tiers().filter(|&t| t + 2 <= to).collect();
        for tier in stale {
            let count = self.registry.despawn_tier(tier);
            log::debug!("Despawned {} entities of tier {}", count, tier);
            self.events.push(GameEvent::EntitiesDespawned { tier, count });
        }

        self.spawn_pending();
        self.refresh_visibility();
        self.check_winnable();
    }

    /// Spawn every tier the spawn mode wants present that hasn't been yet
    fn spawn_pending(&mut self) {
        let current = self.player.current_tier;
        for tier in tiers_to_spawn(&self.config, current) {
            if !self.spawned_tiers.insert(tier) {
                continue;
            }
            // Tiers skipped by a multi-tier jump would be despawned immediately
            if tier + 2 > current {
                spawn_tier(&mut self.registry, &self.config, tier, self.seed);
            }
        }
    }

    fn refresh_visibility(&mut self) {
        let active = visibility::refresh(
            &mut self.registry,
            self.config.rules.consumable_window,
            self.player.current_tier,
        );
        log::debug!("{} of {} entities active", active, self.registry.len());
    }

    fn check_winnable(&mut self) {
        if self.phase != LevelPhase::Playing || self.is_winnable() {
            return;
        }
        log::info!(
            "Level '{}' can no longer be completed (tier {}, {} in tier)",
            self.config.name,
            self.player.current_tier,
            self.player.consumed_in_tier
        );
        self.phase = LevelPhase::Unwinnable;
        self.events.push(GameEvent::LevelUnwinnable);
    }

    fn check_complete(&mut self) {
        if self.phase == LevelPhase::Won || !self.player.has_completed(&self.config) {
            return;
        }
        let stars = self.stars();
        log::info!("Level '{}' won: score {}, {} stars", self.config.name, self.score, stars);
        self.phase = LevelPhase::Won;
        self.events.push(GameEvent::LevelWon {
            score: self.score,
            stars,
        });
    }

    /// Can the level still be completed from here?
    ///
    /// Counts everything left in the registry plus any tier not spawned yet.
    pub fn is_winnable(&self) -> bool {
        let inventory = Inventory::from_registry(&self.registry)
            .with_unspawned(&self.config, &self.spawned_tiers);
        winnability::is_winnable(&self.config, &self.player, &inventory)
    }

    /// Progress through the current tier, in [0, 1]
    pub fn progress(&self) -> f64 {
        self.player.progress(&self.config)
    }

    pub fn current_tier(&self) -> u32 {
        self.player.current_tier
    }

    pub fn consumable_tiers(&self) -> BTreeSet<u32> {
        self.player.consumable_tiers(&self.config)
    }

    pub fn stars(&self) -> u8 {
        star_rating(self.score, &self.config.stars)
    }

    pub fn is_won(&self) -> bool {
        self.phase == LevelPhase::Won
    }

    /// Take all events queued since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Snapshot for the end-of-level screen
    pub fn result(&self, elapsed_secs: f64) -> LevelResult {
        LevelResult {
            score: self.score,
            stars: self.stars(),
            elapsed_secs,
            total_consumed: self.player.total_consumed,
            final_tier: self.player.current_tier,
        }
    }
}
