//! Deterministic rule engine
//!
//! All gameplay rules live here. This module must stay pure and deterministic:
//! - Seeded RNG only
//! - Stable iteration order (by tier, then entity ID)
//! - Logical sizes only; no rendering or platform dependencies

pub mod growth;
pub mod registry;
pub mod resolver;
pub mod spawn;
pub mod state;
pub mod tick;
pub mod visibility;
pub mod winnability;

pub use growth::{ConsumedItem, Consumption, PlayerState, grow, score_item};
pub use registry::{EntityId, EntityInstance, EntityKind, EntityRegistry};
pub use resolver::{HazardAction, mouth_position};
pub use state::{EngineState, GameEvent, LevelPhase};
pub use tick::{HazardEvent, HazardOutcome, TickInput, TickOutcome, tick};
pub use winnability::{Inventory, TierSupply, is_winnable};
