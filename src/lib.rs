//! Gobble - a grow-by-eating arcade game
//!
//! Core modules:
//! - `level`: Data-driven level configuration (tiers, scoring, entity roster)
//! - `sim`: Deterministic rule engine (growth, tiers, visibility, winnability, collisions)
//! - `rating`: Star rating for finished levels
//! - `view`: Presentation-side transforms (camera zoom, visual re-baselining)
//! - `autopilot`: Greedy steering bot for the headless driver
//! - `web`: wasm-bindgen facade for the browser build

pub mod autopilot;
pub mod level;
pub mod rating;
pub mod sim;
pub mod view;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use level::{LevelConfig, LevelError};
pub use rating::{LevelResult, star_rating};
pub use sim::{EngineState, TickInput, TickOutcome, tick};

use glam::Vec2;

/// Fallback constants used when a level leaves a field out
pub mod consts {
    /// Points for an item with no configured value
    pub const MAX_POINTS_PER_ITEM: u32 = 80;
    /// Floor for diminishing returns
    pub const MIN_POINTS_PER_ITEM: u32 = 1;
    /// Score deducted per hazard contact
    pub const HAZARD_PENALTY: u32 = 80;

    /// Player defaults
    pub const INITIAL_SIZE: f64 = 20.0;
    pub const GROWTH_FACTOR: f64 = 0.1;
    pub const PLAYER_SPEED: f32 = 200.0;
    /// Mouth distance from player center, as a fraction of player radius
    pub const MOUTH_OFFSET: f32 = 0.7;

    /// Per-type diminishing returns base (0.9^((n-1)/density))
    pub const DECAY_BASE: f64 = 0.9;
    /// Tier density when a tier has no configured roster
    pub const DEFAULT_TIER_DENSITY: u32 = 10;
    /// Slack when comparing progression size to a tier threshold
    pub const THRESHOLD_EPSILON: f64 = 0.1;
    /// Logical size assumed for an item with no size at all
    pub const FALLBACK_ITEM_SIZE: f64 = 10.0;

    /// Mouth reach: item is eaten when within player_radius * MOUTH_REACH + item_radius
    pub const MOUTH_REACH: f64 = 0.5;
    /// Knockback speed applied away from a hazard on damage
    pub const KNOCKBACK_SPEED: f32 = 300.0;

    /// Fixed frame step for drivers without a real clock
    pub const SIM_DT: f32 = 1.0 / 60.0;

    /// World defaults
    pub const WORLD_WIDTH: f32 = 1600.0;
    pub const WORLD_HEIGHT: f32 = 1200.0;
    /// Entities never spawn closer than this to the world edge
    pub const SPAWN_MARGIN: f32 = 50.0;

    /// Star thresholds
    pub const ONE_STAR: i64 = 500;
    pub const TWO_STAR: i64 = 1500;
    pub const THREE_STAR: i64 = 3000;
}

/// Angle (radians) of the vector pointing from `from` to `to`
#[inline]
pub fn angle_between(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    d.y.atan2(d.x)
}

/// Unit vector for an angle in radians
#[inline]
pub fn direction_from_angle(theta: f32) -> Vec2 {
    Vec2::new(theta.cos(), theta.sin())
}

/// Area of a disc of the given radius, without the pi factor
///
/// All growth math is area-additive, and pi cancels everywhere it appears.
#[inline]
pub fn area(size: f64) -> f64 {
    size * size
}
