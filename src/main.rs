//! Loop Racer headless runner
//!
//! Runs one race to the finish at 60 frames per second of simulated wall time
//! and prints the snapshot as JSON.
//!
//! Usage: `loop-racer [config.json]`

#[cfg(not(target_arch = "wasm32"))]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use loop_racer::{ManualClock, RaceConfig, RaceEngine, RaceSeed};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading race config from {}", path);
            RaceConfig::from_json(&std::fs::read_to_string(&path)?)?
        }
        None => RaceConfig {
            seed: RaceSeed::Number(rand::random()),
            ..Default::default()
        },
    };

    let clock = ManualClock::new();
    let mut engine = RaceEngine::new(&config, clock.clone())?;
    engine.on_finish(|results| {
        if let Some(winner) = results.first() {
            log::info!("Winner: car {}", winner.participant_id);
        }
    });

    // An hour of race time is far beyond any sane lap target
    const FRAME_MS: f64 = 1000.0 / 60.0;
    const MAX_FRAMES: u32 = 60 * 60 * 60;

    engine.start();
    let mut frames = 0;
    while !engine.is_finished() && frames < MAX_FRAMES {
        clock.advance(FRAME_MS);
        engine.frame();
        frames += 1;
    }
    if !engine.is_finished() {
        log::warn!("Stopped after {} frames without a finish", frames);
    }

    println!("{}", engine.snapshot().to_json()?);
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Embedders drive `RaceEngine` directly; there is no standalone wasm binary
}
