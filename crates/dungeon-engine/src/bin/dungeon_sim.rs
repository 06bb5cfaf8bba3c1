//! dungeon-sim - headless dungeon simulation.
//!
//! Runs the default systems on a built-in level with one hero and a number
//! of seeded monsters, optionally resuming from and writing save files.
//!
//! ```text
//! dungeon-sim --ticks 300 --monsters 5 --save run.json
//! dungeon-sim --load run.json --ticks 100
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use dungeon_engine::prelude::*;

const LEVEL: &str = "\
##############
#....#.......#
#....#...O...#
#....D.......#
#....#...#####
#....#.......#
#............E
##############";

const HERO_TEXTURE: &str = "character/knight";
const MONSTER_TEXTURE: &str = "character/monster/imp";

#[derive(Parser)]
#[command(name = "dungeon-sim")]
#[command(about = "Headless dungeon simulation", long_about = None)]
#[command(version)]
struct Cli {
    /// Engine configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Ticks to simulate
    #[arg(long, default_value_t = 300)]
    ticks: u64,

    /// Monsters to spawn in a new game
    #[arg(long, default_value_t = 3)]
    monsters: usize,

    /// Write a save file when the run ends
    #[arg(long)]
    save: Option<PathBuf>,

    /// Resume from a save file instead of starting a new game
    #[arg(long)]
    load: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let seed = config.seed;
    let mut dungeon =
        Dungeon::with_default_systems(config).context("failed to start the engine")?;

    let level = GridLevel::parse(LEVEL).context("built-in level is malformed")?;
    let spawn_points = level.accessible_points();
    dungeon.set_level(level);

    match &cli.load {
        Some(path) => dungeon.load_from_file(path)?,
        None => spawn_party(&mut dungeon, &spawn_points, seed, cli.monsters),
    }

    for _ in 0..cli.ticks {
        if let Some(hero_id) = dungeon_engine::ai::hero(dungeon.registry()) {
            use_skill(dungeon.registry_mut(), hero_id, 0);
        }
        dungeon.tick();
    }

    let hero_health = dungeon_engine::ai::hero(dungeon.registry())
        .and_then(|id| dungeon.registry().get::<HealthComponent>(id))
        .map(HealthComponent::current_health);
    info!(
        ticks = dungeon.tick_count(),
        live = dungeon.registry().live_count(),
        hero_health = ?hero_health,
        "simulation finished"
    );
    let diagnostics = dungeon.systems().last_diagnostics();
    for (kind, elapsed) in &diagnostics.system_times {
        info!(system = %kind, elapsed_us = elapsed.as_micros() as u64, "last tick");
    }

    if let Some(path) = &cli.save {
        dungeon.save_to_file(path)?;
        info!(path = %path.display(), "save written");
    }
    Ok(())
}

/// Hero on the first open tile, monsters spread over the rest.
fn spawn_party(dungeon: &mut Dungeon, points: &[Point], seed: u64, monsters: usize) {
    let Some((&hero_at, rest)) = points.split_first() else {
        return;
    };
    let mut factory = EntityFactory::new(seed);
    factory.create_hero(dungeon.registry_mut(), hero_at, HERO_TEXTURE);
    if rest.is_empty() {
        return;
    }
    let stride = (rest.len() / monsters.max(1)).max(1);
    for i in 0..monsters {
        let at = rest[rest.len() - 1 - (i * stride) % rest.len()];
        factory.create_monster(dungeon.registry_mut(), at, MONSTER_TEXTURE);
    }
}
