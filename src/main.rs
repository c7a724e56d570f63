//! Gobble headless driver
//!
//! Plays a level with the autopilot at a fixed frame step and prints the
//! result. Usage: `gobble [micro_world|pond|<level.json>] [seed] [max_secs]`

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::path::Path;

    use gobble::autopilot::{Autopilot, Body};
    use gobble::consts::SIM_DT;
    use gobble::sim::{EngineState, GameEvent, LevelPhase, TickInput, mouth_position, tick};
    use gobble::view::ViewTransform;
    use gobble::{LevelConfig, LevelError};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let level = args.get(1).map(String::as_str).unwrap_or("micro_world");
    let seed: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(12345);
    let max_secs: f32 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(600.0);

    let config: Result<LevelConfig, LevelError> = match level {
        "micro_world" => LevelConfig::micro_world(),
        "pond" => LevelConfig::pond(),
        path => LevelConfig::from_file(Path::new(path)),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load level '{}': {}", level, e);
            std::process::exit(1);
        }
    };

    let mut view = ViewTransform::for_level(&config);
    let mut state = EngineState::init_level(config, seed);
    let autopilot = Autopilot::default();
    let mut body = Body::new(state.player_pos);
    let max_frames = (max_secs / SIM_DT) as u64;
    let mut frames = 0u64;

    while frames < max_frames {
        frames += 1;

        let direction = autopilot.steer(&state);
        body.step(direction, state.config.player.speed, SIM_DT, &state.config.world);
        let mouth = mouth_position(
            body.pos,
            body.facing,
            state.player.size,
            state.config.player.mouth_offset,
        );
        let outcome = tick(
            &mut state,
            &TickInput {
                player_pos: body.pos,
                mouth_pos: mouth,
                entity_positions: Vec::new(),
            },
        );
        body.push(outcome.knockback());

        for event in state.drain_events() {
            match event {
                GameEvent::TierAdvanced { from, to } => {
                    view.on_tier_advanced(&state.config, from, to);
                    log::info!(
                        "[{:.1}s] tier {} -> {}, view {:.2}x (player {:.1} drawn {:.1}) zoom {:.2}",
                        frames as f32 * SIM_DT,
                        from,
                        to,
                        view.current_scale,
                        state.player.size,
                        view.visual_size(state.player.size),
                        view.zoom
                    )
                }
                GameEvent::HazardHit { penalty, .. } => {
                    log::debug!("[{:.1}s] hit! -{}", frames as f32 * SIM_DT, penalty)
                }
                GameEvent::LevelUnwinnable => {
                    log::warn!("Level became unwinnable at {:.1}s", frames as f32 * SIM_DT)
                }
                other => log::trace!("{:?}", other),
            }
        }

        match state.phase {
            LevelPhase::Won => break,
            // A real front end would show a blocking message here
            LevelPhase::Unwinnable => break,
            LevelPhase::Playing => {}
        }
    }

    let result = state.result(frames as f64 * SIM_DT as f64);
    println!(
        "{}: {:?} after {} | score {} | {} stars | tier {}/{} | {} eaten",
        state.config.name,
        state.phase,
        result.elapsed_display(),
        result.score,
        result.stars,
        result.final_tier,
        state.config.max_tier(),
        result.total_consumed
    );
    match serde_json::to_string_pretty(&result) {
        Ok(json) => println!("{}", json),
        Err(e) => log::error!("Failed to serialize result: {}", e),
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is `gobble::web::start`, this is just to satisfy the compiler
}
