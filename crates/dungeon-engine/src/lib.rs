//! Dungeon Engine -- entity-component runtime for a tile-based dungeon game.
//!
//! This crate builds on [`dungeon_ecs`] to provide the game simulation: the
//! component family, AI strategies, skills, the per-tick systems and the
//! [`Dungeon`](dungeon::Dungeon) driver that runs them at a fixed frame rate,
//! plus whole-game save and load through the [`SaveStateCodec`](savegame::SaveStateCodec).
//!
//! # Quick Start
//!
//! ```
//! use dungeon_engine::prelude::*;
//!
//! let mut dungeon = Dungeon::with_default_systems(EngineConfig::default()).unwrap();
//! let hero = dungeon.registry_mut().spawn([
//!     Component::from(PositionComponent::new(1.0, 1.0)),
//!     PlayableComponent::default().into(),
//! ]);
//!
//! // Spawned entities become visible at the next frame boundary.
//! assert!(!dungeon.registry().is_live(hero));
//! dungeon.run_ticks(10);
//! assert!(dungeon.registry().is_live(hero));
//! assert_eq!(dungeon.tick_count(), 10);
//! ```

#![deny(unsafe_code)]

pub mod ai;
pub mod animation;
pub mod combat;
pub mod components;
pub mod config;
pub mod dungeon;
pub mod factory;
pub mod level;
pub mod savegame;
pub mod skill;
pub mod snapshot;
pub mod systems;
pub mod tick;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the ECS crate for convenience.
pub use dungeon_ecs;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use dungeon_ecs::prelude::*;

    pub use crate::ai::{
        AiContext, CollideAi, FightBehavior, IdleBehavior, RadiusWalk, RangeTransition,
        SelfDefendTransition, SkillAi, StandStill, Transition,
    };
    pub use crate::animation::{Animation, AnimationSnapshot};
    pub use crate::combat::{Damage, DamageType, FnOnDeath, NoOpOnDeath, OnDeath};
    pub use crate::components::{
        AiComponent, AnimationComponent, Component, ComponentKind, Facing, HealthComponent,
        HitboxComponent, PlayableComponent, PositionComponent, Registry, SkillComponent,
        VelocityComponent,
    };
    pub use crate::config::{EngineConfig, DEFAULT_FRAME_RATE};
    pub use crate::dungeon::Dungeon;
    pub use crate::factory::EntityFactory;
    pub use crate::level::{GridLevel, LevelElement, Point, Tile, TileLevel, TilePath};
    pub use crate::savegame::{
        LoadContext, ObjectNode, Persist, SaveError, SaveKind, SaveStateCodec,
    };
    pub use crate::skill::{use_skill, DamageBurst, FnSkillEffect, Skill, SkillEffect, SkillUse};
    pub use crate::snapshot::{EntityRecord, SaveGame, SAVE_FORMAT_VERSION};
    pub use crate::systems::{
        AiSystem, AnimationSystem, HealthSystem, SkillSystem, System, SystemKind, TickContext,
        VelocitySystem,
    };
    pub use crate::tick::{SystemController, TickDiagnostics};
}
