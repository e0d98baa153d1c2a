//! Headless streaming demo: walk an observer across an asteroid world,
//! edit a block, leave the spawn area far enough to page it out, then
//! return so it restores from disk.
//!
//! Pass a TOML config path as the first argument to override defaults.
//! Logging follows RUST_LOG (try RUST_LOG=asteroid_engine=info).

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use asteroid_engine::{
    BlockId, ChunkPos, HostEvent, RecordingProxyHost, StreamingScheduler, VoxelPos, WorldConfig,
};

const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

fn main() -> Result<()> {
    env_logger::init();

    let mut config = match std::env::args().nth(1) {
        Some(path) => WorldConfig::from_toml_file(Path::new(&path))?,
        None => {
            let mut config = WorldConfig::default();
            config.save_dir = std::env::temp_dir().join("asteroid-walk-save");
            config
        }
    };
    if config.seed.is_none() {
        config.seed = Some(1337);
    }

    println!("Asteroid Engine - Streaming Walk");
    println!("================================");
    println!(
        "world: {} sectors/axis, {} chunks/sector, {}x{} voxel chunks",
        config.world_size, config.sector_size, config.chunk_width, config.chunk_height
    );
    println!("save dir: {}", config.save_dir.display());

    let spawn = config.spawn_chunk();
    let chunk_width = config.chunk_width;
    let chunk_height = config.chunk_height;
    let mut scheduler = StreamingScheduler::new(config)?;
    let mut host = RecordingProxyHost::new();

    println!("\n1. Initial generation at spawn {:?}", spawn);
    println!("----------------------------------------");
    if !scheduler.settle(&mut host, spawn, SETTLE_TIMEOUT) {
        anyhow::bail!("initial generation did not settle in time");
    }
    report_step(&mut host, &scheduler, spawn);

    println!("\n2. Block edit");
    println!("-------------");
    let target = VoxelPos::new(
        spawn.x * chunk_width + chunk_width / 2,
        chunk_height / 2,
        spawn.z * chunk_width + chunk_width / 2,
    );
    let before = scheduler.map().block_at(target);
    if scheduler.apply_edit(&mut host, target, BlockId::ROCK) {
        println!("placed rock at {:?} (was {})", target, before);
    }
    let remeshes = host
        .take_events()
        .iter()
        .filter(|e| matches!(e, HostEvent::Uploaded { .. }))
        .count();
    println!("edit triggered {} mesh uploads", remeshes);

    println!("\n3. Walking east until spawn pages out");
    println!("-------------------------------------");
    let mut observer = spawn;
    for step in 1..=12 {
        observer = observer.offset(1, 0);
        if !scheduler.settle(&mut host, observer, SETTLE_TIMEOUT) {
            anyhow::bail!("streaming did not settle at step {}", step);
        }
        report_step(&mut host, &scheduler, observer);
        if scheduler.map().chunk(spawn).is_none() {
            println!("spawn chunk {:?} paged out after step {}", spawn, step);
            break;
        }
    }

    println!("\n4. Walking back to spawn");
    println!("------------------------");
    while observer != spawn {
        observer = observer.offset(-1, 0);
        if !scheduler.settle(&mut host, observer, SETTLE_TIMEOUT) {
            anyhow::bail!("streaming did not settle while returning");
        }
    }
    report_step(&mut host, &scheduler, observer);
    let restored = scheduler.map().block_at(target);
    println!(
        "block at {:?} after round trip: {} (edit {})",
        target,
        restored,
        if restored == BlockId::ROCK { "persisted" } else { "lost" }
    );

    println!("\n5. Shutdown");
    println!("-----------");
    let stats = scheduler.shutdown(&mut host, SETTLE_TIMEOUT);
    println!(
        "generated {} chunks (avg {:?}), loaded {} sectors, saved {} sectors",
        stats.chunks_generated,
        stats.average_generation_time(),
        stats.sectors_loaded,
        stats.sectors_saved
    );
    println!("proxies left alive: {}", host.live_proxies());
    Ok(())
}

fn report_step(host: &mut RecordingProxyHost, scheduler: &StreamingScheduler, observer: ChunkPos) {
    let events = host.take_events();
    let created = events
        .iter()
        .filter(|e| matches!(e, HostEvent::Created { .. }))
        .count();
    let destroyed = events
        .iter()
        .filter(|e| matches!(e, HostEvent::Destroyed { .. }))
        .count();
    println!(
        "observer {:?}: {} active chunks, {} sectors resident, +{} proxies, -{} proxies",
        observer,
        scheduler.active_chunks(),
        scheduler.map().sector_count(),
        created,
        destroyed
    );
}
