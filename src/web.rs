//! Browser bindings
//!
//! A thin wasm-bindgen wrapper over [`EngineState`]. Structured data crosses
//! the boundary as JSON strings; the JS scene owns rendering and input.

use glam::Vec2;
use wasm_bindgen::prelude::*;

use crate::level::LevelConfig;
use crate::sim::{EngineState, EntityInstance, TickInput, tick};
use crate::view::ViewTransform;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        // Already initialised by an earlier module instance
        return;
    }
    log::info!("Gobble engine loaded");
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// One level run, owned by the JS scene
#[wasm_bindgen]
pub struct WebEngine {
    state: EngineState,
    view: ViewTransform,
}

#[wasm_bindgen]
impl WebEngine {
    /// Start a level from its JSON document
    #[wasm_bindgen(constructor)]
    pub fn new(level_json: &str, seed: f64) -> Result<WebEngine, JsValue> {
        let config = LevelConfig::from_json(level_json).map_err(js_err)?;
        Ok(Self::start_level(config, seed))
    }

    /// Start one of the built-in levels (`micro_world` or `pond`)
    pub fn builtin(name: &str, seed: f64) -> Result<WebEngine, JsValue> {
        let config = match name {
            "micro_world" => LevelConfig::micro_world(),
            "pond" => LevelConfig::pond(),
            other => return Err(JsValue::from_str(&format!("unknown level '{}'", other))),
        }
        .map_err(js_err)?;
        Ok(Self::start_level(config, seed))
    }

    fn start_level(config: LevelConfig, seed: f64) -> WebEngine {
        let view = ViewTransform::for_level(&config);
        WebEngine {
            state: EngineState::init_level(config, seed.max(0.0) as u64),
            view,
        }
    }

    /// Rebase the view if the player moved up since `tier_before`
    fn sync_view(&mut self, tier_before: u32) {
        let tier = self.state.current_tier();
        self.view.on_tier_advanced(&self.state.config, tier_before, tier);
    }

    /// Run one tick; `input_json` is a serialized `TickInput`
    pub fn tick(&mut self, input_json: &str) -> Result<String, JsValue> {
        let input: TickInput = serde_json::from_str(input_json).map_err(js_err)?;
        let tier_before = self.state.current_tier();
        let outcome = tick(&mut self.state, &input);
        self.sync_view(tier_before);
        serde_json::to_string(&outcome).map_err(js_err)
    }

    pub fn consume(&mut self, id: u32) -> Option<u32> {
        let tier_before = self.state.current_tier();
        let points = self.state.consume(id);
        self.sync_view(tier_before);
        points
    }

    /// Multiplier from logical to rendered sizes
    pub fn current_scale(&self) -> f64 {
        self.view.current_scale
    }

    /// Camera zoom for the current tier
    pub fn zoom(&self) -> f32 {
        self.view.zoom
    }

    pub fn visual_size(&self, logical: f64) -> f64 {
        self.view.visual_size(logical)
    }

    /// World point to NDC `[x, y]` for a camera centered on `(cx, cy)`
    #[allow(clippy::too_many_arguments)]
    pub fn world_to_ndc(
        &self,
        x: f32,
        y: f32,
        cx: f32,
        cy: f32,
        width: u32,
        height: u32,
        view_extent: f32,
    ) -> Vec<f32> {
        let ndc = self.view.world_to_ndc(
            Vec2::new(x, y),
            Vec2::new(cx, cy),
            (width, height),
            view_extent,
        );
        vec![ndc.x, ndc.y]
    }

    pub fn progress(&self) -> f64 {
        self.state.progress()
    }

    pub fn current_tier(&self) -> u32 {
        self.state.current_tier()
    }

    pub fn consumable_tiers(&self) -> Vec<u32> {
        self.state.consumable_tiers().into_iter().collect()
    }

    pub fn is_winnable(&self) -> bool {
        self.state.is_winnable()
    }

    pub fn score(&self) -> f64 {
        self.state.score as f64
    }

    pub fn player_size(&self) -> f64 {
        self.state.player.size
    }

    /// `Playing`, `Won` or `Unwinnable`
    pub fn phase(&self) -> String {
        format!("{:?}", self.state.phase)
    }

    /// Every live entity, with its active flag
    pub fn entities_json(&self) -> Result<String, JsValue> {
        let entities: Vec<&EntityInstance> = self.state.registry.iter().collect();
        serde_json::to_string(&entities).map_err(js_err)
    }

    /// Events queued since the last call
    pub fn drain_events_json(&mut self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state.drain_events()).map_err(js_err)
    }

    pub fn result_json(&self, elapsed_secs: f64) -> Result<String, JsValue> {
        serde_json::to_string(&self.state.result(elapsed_secs)).map_err(js_err)
    }
}
