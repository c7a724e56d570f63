//! Level configuration
//!
//! A level is an immutable, data-driven document: size tiers, scoring
//! constants, player tuning, the rule strategies in force, and the roster of
//! entity archetypes per tier. Every optional field falls back to the
//! constants in [`crate::consts`].

use std::collections::BTreeMap;
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

/// Built-in level: five quota tiers, everything spawned up front
pub const MICRO_WORLD_JSON: &str = include_str!("../levels/micro_world.json");
/// Built-in level: area thresholds, dual size tracks, lazy spawning
pub const POND_JSON: &str = include_str!("../levels/pond.json");

/// Errors that can occur when loading a level
#[derive(Debug, Error)]
pub enum LevelError {
    /// JSON parsing failed
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("level must define at least one size tier")]
    NoTiers,
    #[error("size tier {found} is out of order, expected tier {expected}")]
    TierOrder { expected: u32, found: u32 },
    #[error("tier {0} has no quota but the level uses quota progression")]
    MissingQuota(u32),
    #[error("entities are configured for tier {0}, which is not a size tier")]
    UnknownTier(u32),
    #[error("entity `{item_type}` in tier {tier} has an inverted size range")]
    InvertedRange { tier: u32, item_type: String },
    #[error("growth factor must be non-negative, got {0}")]
    NegativeGrowth(f64),
}

/// How the player moves from one tier to the next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierProgression {
    /// Advance after eating a fixed number of items in the current tier
    #[default]
    Quota,
    /// Advance when progression size crosses the tier's threshold
    AreaThreshold,
}

/// Which tiers, relative to the player's, are consumable and visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumableWindow {
    /// {N-1, N}
    TwoTier,
    /// {N-1, N, N+1}
    #[default]
    ThreeTier,
}

/// How many hazard contacts resolve per tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardResolution {
    #[default]
    All,
    First,
}

/// Whether tier progression follows the visual size or its own track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeTracking {
    /// Progression reads `size`
    #[default]
    Shared,
    /// Progression reads `internal_size`, grown with `tier_growth_factor`
    Separate,
}

/// When entity instances are created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnMode {
    #[default]
    AllAtStart,
    /// Tiers 1..=N+1 exist at any time; later tiers spawn on tier advance
    PerTier,
}

/// Rule strategies selected per level
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub tier_progression: TierProgression,
    pub consumable_window: ConsumableWindow,
    pub hazard_resolution: HazardResolution,
    pub size_tracking: SizeTracking,
    pub spawn_mode: SpawnMode,
}

/// One size tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierDef {
    pub tier: u32,
    /// Items to eat in this tier before advancing (quota progression)
    #[serde(default)]
    pub quota: Option<u32>,
    /// Absolute progression size at which this tier is reached
    #[serde(default)]
    pub threshold: Option<f64>,
    /// Legacy threshold multiplier on initial size, used when `threshold` is absent
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_color")]
    pub color: u32,
    /// Camera zoom while in this tier (presentation only)
    #[serde(default)]
    pub zoom: Option<f32>,
}

fn default_scale() -> f64 {
    1.0
}

fn default_color() -> u32 {
    0xFFFFFF
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub max_points_per_item: u32,
    pub min_points_per_item: u32,
    pub hazard_penalty: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            max_points_per_item: MAX_POINTS_PER_ITEM,
            min_points_per_item: MIN_POINTS_PER_ITEM,
            hazard_penalty: HAZARD_PENALTY,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct StarThresholds {
    pub one: i64,
    pub two: i64,
    pub three: i64,
}

impl Default for StarThresholds {
    fn default() -> Self {
        Self {
            one: ONE_STAR,
            two: TWO_STAR,
            three: THREE_STAR,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub initial_size: f64,
    pub growth_factor: f64,
    /// Growth factor for the separate progression track; defaults to `growth_factor`
    pub tier_growth_factor: Option<f64>,
    pub speed: f32,
    pub mouth_offset: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            initial_size: INITIAL_SIZE,
            growth_factor: GROWTH_FACTOR,
            tier_growth_factor: None,
            speed: PLAYER_SPEED,
            mouth_offset: MOUTH_OFFSET,
        }
    }
}

impl PlayerConfig {
    pub fn tier_growth_factor(&self) -> f64 {
        self.tier_growth_factor.unwrap_or(self.growth_factor)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldBounds {
    pub width: f32,
    pub height: f32,
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self {
            width: WORLD_WIDTH,
            height: WORLD_HEIGHT,
        }
    }
}

/// Entity size: fixed, or a whole number rolled once per instance from an
/// inclusive range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SizeSpec {
    Scalar(f64),
    Range([f64; 2]),
}

impl SizeSpec {
    /// Resolve to a concrete logical size for one spawned instance
    pub fn resolve<R: Rng>(&self, rng: &mut R) -> f64 {
        match *self {
            SizeSpec::Scalar(s) => s,
            SizeSpec::Range([lo, hi]) => {
                let (min, max) = (lo.ceil() as i64, hi.floor() as i64);
                if max >= min {
                    rng.random_range(min..=max) as f64
                } else {
                    lo
                }
            }
        }
    }

    /// Expected size, for instances that don't exist yet
    pub fn average(&self) -> f64 {
        match *self {
            SizeSpec::Scalar(s) => s,
            SizeSpec::Range([lo, hi]) => (lo + hi) / 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    #[default]
    Circle,
    Square,
    Triangle,
}

/// A kind of thing that can be spawned in a tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityArchetype {
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default = "default_count")]
    pub count: u32,
    /// Base score; items without one score `max_points_per_item`
    #[serde(default)]
    pub value: Option<u32>,
    #[serde(default)]
    pub shape: Shape,
    #[serde(default)]
    pub is_hazard: bool,
    #[serde(default)]
    pub size: Option<SizeSpec>,
    #[serde(default)]
    pub color: Option<u32>,
}

fn default_count() -> u32 {
    1
}

impl EntityArchetype {
    /// Size spec, or the per-tier fallback when none is configured
    pub fn size_spec(&self, tier: u32) -> SizeSpec {
        self.size.unwrap_or_else(|| {
            let fallback = if self.is_hazard {
                15.0 + tier as f64 * 5.0
            } else {
                8.0 + tier as f64 * 3.0
            };
            SizeSpec::Scalar(fallback)
        })
    }
}

/// Complete, immutable description of one level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelConfig {
    #[serde(default)]
    pub name: String,
    pub tiers: Vec<TierDef>,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub stars: StarThresholds,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub world: WorldBounds,
    #[serde(default)]
    pub rules: RulesConfig,
    /// Archetype roster keyed by tier
    #[serde(default)]
    pub entities: BTreeMap<u32, Vec<EntityArchetype>>,
}

impl LevelConfig {
    /// Parse and validate a level from JSON
    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        let config: LevelConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a level from a JSON file on disk
    pub fn from_file(path: &Path) -> Result<Self, LevelError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// The classic five-tier level
    pub fn micro_world() -> Result<Self, LevelError> {
        Self::from_json(MICRO_WORLD_JSON)
    }

    /// Area-threshold level with lazy spawning
    pub fn pond() -> Result<Self, LevelError> {
        Self::from_json(POND_JSON)
    }

    /// Check the structural rules a level must satisfy
    pub fn validate(&self) -> Result<(), LevelError> {
        if self.tiers.is_empty() {
            return Err(LevelError::NoTiers);
        }
        for (i, def) in self.tiers.iter().enumerate() {
            let expected = i as u32 + 1;
            if def.tier != expected {
                return Err(LevelError::TierOrder {
                    expected,
                    found: def.tier,
                });
            }
            if self.rules.tier_progression == TierProgression::Quota && def.quota.is_none() {
                return Err(LevelError::MissingQuota(def.tier));
            }
        }
        for factor in [self.player.growth_factor, self.player.tier_growth_factor()] {
            if factor < 0.0 {
                return Err(LevelError::NegativeGrowth(factor));
            }
        }
        for (&tier, archetypes) in &self.entities {
            if tier == 0 || tier > self.max_tier() {
                return Err(LevelError::UnknownTier(tier));
            }
            for archetype in archetypes {
                if let Some(SizeSpec::Range([lo, hi])) = archetype.size {
                    if hi < lo {
                        return Err(LevelError::InvertedRange {
                            tier,
                            item_type: archetype.item_type.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Highest tier number
    pub fn max_tier(&self) -> u32 {
        self.tiers.len() as u32
    }

    pub fn tier(&self, tier: u32) -> Option<&TierDef> {
        tier.checked_sub(1)
            .and_then(|i| self.tiers.get(i as usize))
    }

    /// Archetypes configured for a tier (empty if none)
    pub fn archetypes(&self, tier: u32) -> &[EntityArchetype] {
        self.entities.get(&tier).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total configured instance count of a tier, falling back to the default density
    pub fn tier_density(&self, tier: u32) -> u32 {
        let sum: u32 = self.archetypes(tier).iter().map(|a| a.count).sum();
        if sum == 0 { DEFAULT_TIER_DENSITY } else { sum }
    }

    /// Progression size at which a tier starts
    pub fn tier_threshold(&self, tier: u32) -> f64 {
        match self.tier(tier) {
            Some(TierDef {
                threshold: Some(t), ..
            }) => *t,
            Some(def) => self.player.initial_size * def.scale,
            None => self.player.initial_size,
        }
    }

    /// Progression size at which the final tier's bar is full
    ///
    /// The last tier has no successor, so its span repeats the previous
    /// step (or half the initial size on a single-tier level).
    pub fn completion_size(&self) -> f64 {
        let last = self.max_tier();
        let start = self.tier_threshold(last);
        let previous = if last > 1 {
            self.tier_threshold(last - 1)
        } else {
            self.player.initial_size * 0.5
        };
        start + (start - previous)
    }

    /// Items needed to leave a tier under quota progression
    pub fn quota(&self, tier: u32) -> u32 {
        self.tier(tier)
            .and_then(|def| def.quota)
            .unwrap_or(DEFAULT_TIER_DENSITY)
    }

    /// Growth factor applied to the size that drives tier progression
    pub fn progression_growth_factor(&self) -> f64 {
        match self.rules.size_tracking {
            SizeTracking::Shared => self.player.growth_factor,
            SizeTracking::Separate => self.player.tier_growth_factor(),
        }
    }
}
