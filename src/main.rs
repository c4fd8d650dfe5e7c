use anyhow::{Context, Result};
use glam::Vec3;
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;
use std::{
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

use blokstream::{
    config::{default_config_path, EngineConfig},
    engine::VoxelEngine,
};

/// Blocks per second the simulated observer walks east.
const WALK_SPEED: f32 = 24.0;
const RUN_TIME: Duration = Duration::from_secs(10);
const TICK: Duration = Duration::from_millis(50);

fn main() -> Result<()> {
    SimpleLogger::new().with_level(LevelFilter::Info).init()?;
    info!("Initializing blokstream...");

    let path = match std::env::args().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => default_config_path()?,
    };
    let config = EngineConfig::load_or_create(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    info!("Loaded config from {}", path.display());

    let surface = config.chunksys.chunk_height as f32 * 0.75;
    let mut engine = VoxelEngine::new(config)?;
    engine.spawn(Vec3::new(0.0, surface, 0.0));
    engine.start()?;

    let started = Instant::now();
    let mut last = started;
    while started.elapsed() < RUN_TIME {
        thread::sleep(TICK);
        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f32();
        last = now;

        let mut player = engine.player();
        player.velocity = Vec3::new(WALK_SPEED, 0.0, 0.0);
        player.advance(dt);
        engine.set_player_position(player.position);

        let stats = engine.get_stats();
        info!(
            "pos=({:.1}, {:.1}) chunk={:?} cached={} generated={} ready={} queued={}/{} failures={}",
            player.position.x,
            player.position.z,
            stats.center,
            stats.cached_chunks,
            stats.generated_chunks,
            stats.ready_chunks,
            stats.builder.pending_generation,
            stats.builder.pending_building,
            stats.builder.failures,
        );
    }

    engine.stop();
    info!("Final stats: {:?}", engine.get_stats());
    Ok(())
}
