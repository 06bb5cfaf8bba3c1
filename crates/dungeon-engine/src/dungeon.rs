//! The simulation driver.
//!
//! A [`Dungeon`] owns everything one running game needs: the entity
//! registry, the ordered systems, the loaded level, the seeded rng and the
//! tick counter. [`tick`](Dungeon::tick) advances the simulation by one
//! frame; save and load live in [`snapshot`](crate::snapshot).

use rand::SeedableRng;
use rand_pcg::Pcg32;
use tracing::{debug, info};

use dungeon_ecs::registry::FrameReport;

use crate::components::Registry;
use crate::config::{self, ConfigError, EngineConfig};
use crate::level::TileLevel;
use crate::savegame::SaveStateCodec;
use crate::systems::{
    AiSystem, AnimationSystem, HealthSystem, SkillSystem, TickContext, VelocitySystem,
};
use crate::tick::SystemController;

/// The rng for tick `ticks` of a game seeded with `seed`. Every random
/// decision made during a tick is a function of the seed and the tick
/// number alone.
pub(crate) fn rng_for(seed: u64, ticks: u64) -> Pcg32 {
    Pcg32::seed_from_u64(seed ^ ticks.wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

pub struct Dungeon {
    config: EngineConfig,
    registry: Registry,
    systems: SystemController,
    level: Option<Box<dyn TileLevel>>,
    rng: Pcg32,
    tick_counter: u64,
    codec: SaveStateCodec,
}

impl Dungeon {
    /// A dungeon with no systems registered.
    ///
    /// Installs the configured frame rate process-wide.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid or another frame rate is
    /// already installed.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.install()?;
        info!(
            frame_rate = config.frame_rate,
            seed = config.seed,
            "dungeon created"
        );
        Ok(Self {
            rng: rng_for(config.seed, 0),
            codec: SaveStateCodec::new(config.resource_root.clone()),
            config,
            registry: Registry::new(),
            systems: SystemController::new(),
            level: None,
            tick_counter: 0,
        })
    }

    /// A dungeon running the AI, velocity, skill, health and animation
    /// systems, in that order.
    pub fn with_default_systems(config: EngineConfig) -> Result<Self, ConfigError> {
        let mut dungeon = Self::new(config)?;
        dungeon.systems.add(AiSystem::new());
        dungeon.systems.add(VelocitySystem::new());
        dungeon.systems.add(SkillSystem::new());
        dungeon.systems.add(HealthSystem::new());
        dungeon.systems.add(AnimationSystem::new());
        Ok(dungeon)
    }

    /// Advance the simulation by one tick.
    pub fn tick(&mut self) -> FrameReport {
        self.rng = rng_for(self.config.seed, self.tick_counter);
        let mut ctx = TickContext {
            tick: self.tick_counter,
            frame_rate: config::frame_rate(),
            level: self.level.as_deref(),
            rng: &mut self.rng,
        };
        let frame = self.systems.update(&mut self.registry, &mut ctx);
        self.tick_counter += 1;
        frame
    }

    pub fn run_ticks(&mut self, n: u64) {
        for _ in 0..n {
            self.tick();
        }
        debug!(ticks = n, total = self.tick_counter, "ran ticks");
    }

    // -- accessors ----------------------------------------------------------

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn systems(&self) -> &SystemController {
        &self.systems
    }

    pub fn systems_mut(&mut self) -> &mut SystemController {
        &mut self.systems
    }

    pub fn level(&self) -> Option<&dyn TileLevel> {
        self.level.as_deref()
    }

    /// Load a level. Tile paths in later loads are resolved against it.
    pub fn set_level(&mut self, level: impl TileLevel + 'static) {
        self.level = Some(Box::new(level));
    }

    pub fn clear_level(&mut self) -> Option<Box<dyn TileLevel>> {
        self.level.take()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn codec(&self) -> &SaveStateCodec {
        &self.codec
    }

    /// Register game-specific strategy classes here before loading saves
    /// that use them.
    pub fn codec_mut(&mut self) -> &mut SaveStateCodec {
        &mut self.codec
    }

    // -- used by snapshot ---------------------------------------------------

    pub(crate) fn replace_state(&mut self, registry: Registry, tick_counter: u64, seed: u64) {
        self.registry = registry;
        self.tick_counter = tick_counter;
        self.config.seed = seed;
    }
}

impl std::fmt::Debug for Dungeon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dungeon")
            .field("tick_counter", &self.tick_counter)
            .field("entities", &self.registry.len())
            .field("systems", &self.systems)
            .field("level_loaded", &self.level.is_some())
            .finish()
    }
}
