//! Presentation-side view transform
//!
//! Re-baselines visual sizes on tier advance so rendered sprites stay in a
//! comfortable range, and tracks the per-tier camera zoom. The rule engine
//! never reads any of this; it works on logical sizes only.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::level::LevelConfig;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    /// Cumulative re-baseline multiplier applied to every logical size
    pub current_scale: f64,
    /// Camera zoom (1.0 = whole viewport shows `view_extent` units)
    pub zoom: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewTransform {
    pub fn new() -> Self {
        Self {
            current_scale: 1.0,
            zoom: 1.0,
        }
    }

    /// Starting view for a level (tier 1's zoom)
    pub fn for_level(config: &LevelConfig) -> Self {
        Self {
            current_scale: 1.0,
            zoom: tier_zoom(config, 1),
        }
    }

    /// Shrink the visual baseline by the ratio of the two tier thresholds
    /// and switch to the new tier's zoom
    ///
    /// Does nothing unless `to` is above `from`. Rebases compose, so a jump
    /// over several tiers can be applied in one call.
    pub fn on_tier_advanced(&mut self, config: &LevelConfig, from: u32, to: u32) {
        if to <= from {
            return;
        }
        let old = config.tier_threshold(from);
        let new = config.tier_threshold(to);
        if old > 0.0 && new > 0.0 {
            self.current_scale *= old / new;
        }
        self.zoom = tier_zoom(config, to);
        log::debug!(
            "View rebased for tier {}: scale {:.3}, zoom {:.2}",
            to,
            self.current_scale,
            self.zoom
        );
    }

    /// Rendered size of a logical size
    #[inline]
    pub fn visual_size(&self, logical: f64) -> f64 {
        logical * self.current_scale
    }

    /// Convert world coordinates to normalized device coordinates
    ///
    /// The camera is centered on `center` and shows `view_extent` world units
    /// across the shorter viewport axis at zoom 1.0.
    pub fn world_to_ndc(
        &self,
        pos: Vec2,
        center: Vec2,
        viewport: (u32, u32),
        view_extent: f32,
    ) -> Vec2 {
        let (w, h) = viewport;
        let aspect = w.max(1) as f32 / h.max(1) as f32;
        let scale = 2.0 * self.zoom / view_extent.max(1.0);
        let rel = (pos - center) * scale;

        if aspect > 1.0 {
            // Wider than tall
            Vec2::new(rel.x / aspect, rel.y)
        } else {
            // Taller than wide
            Vec2::new(rel.x, rel.y * aspect)
        }
    }
}

fn tier_zoom(config: &LevelConfig, tier: u32) -> f32 {
    config.tier(tier).and_then(|t| t.zoom).unwrap_or(1.0)
}
