//! Whole-game save and load with BLAKE3 integrity hashing.
//!
//! Provides [`SaveGame`] -- the persisted document: registry layout, every
//! entity's components as codec [`ObjectNode`]s, tick metadata, and a BLAKE3
//! hex digest of all of it.
//!
//! # Usage
//!
//! ```
//! use dungeon_engine::prelude::*;
//!
//! let mut dungeon = Dungeon::with_default_systems(EngineConfig::default()).unwrap();
//! dungeon.registry_mut().spawn([Component::from(PositionComponent::new(2.0, 3.0))]);
//! dungeon.run_ticks(5);
//!
//! let save = dungeon.save().unwrap();
//! assert_eq!(save.tick_counter, 5);
//! assert_eq!(save.hash.len(), 64);
//!
//! dungeon.run_ticks(5);
//! dungeon.load(&save).unwrap();
//! assert_eq!(dungeon.tick_count(), 5);
//! ```
//!
//! # What Is NOT Saved
//!
//! - **Systems** -- they are code. Loading keeps the registered ones.
//! - **The level** -- it must be loaded before [`Dungeon::load`] runs, since
//!   saved tile paths are resolved against it.
//! - **Closure strategies** ([`FnOnDeath`](crate::combat::FnOnDeath),
//!   [`FnSkillEffect`](crate::skill::FnSkillEffect)) -- saving an entity
//!   that holds one fails with [`SaveError::NotSerializable`].

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use dungeon_ecs::entity::{Entity, EntityId};
use dungeon_ecs::snapshot::RegistryLayout;

use crate::components::{Component, Registry};
use crate::config;
use crate::dungeon::Dungeon;
use crate::savegame::{failure, LoadContext, ObjectNode, Persist, SaveError};

/// Format version written into every save.
pub const SAVE_FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// One entity: its id and its component nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityId,
    pub components: Vec<ObjectNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveGame {
    pub version: u32,
    /// Ticks completed when the save was taken.
    pub tick_counter: u64,
    /// Frame rate the save was taken at. Cooldowns and walk breaks are
    /// stored in ticks, so a save only loads at the same rate.
    pub frame_rate: u32,
    pub seed: u64,
    pub layout: RegistryLayout,
    /// Entities in id order.
    pub entities: Vec<EntityRecord>,
    /// BLAKE3 hex digest of every other field.
    pub hash: String,
}

impl SaveGame {
    /// Recompute the digest from the document's content.
    pub fn compute_hash(&self) -> Result<String, SaveError> {
        #[derive(Serialize)]
        struct HashableState<'a> {
            version: u32,
            tick_counter: u64,
            frame_rate: u32,
            seed: u64,
            layout: &'a RegistryLayout,
            entities: &'a [EntityRecord],
        }

        let hashable = HashableState {
            version: self.version,
            tick_counter: self.tick_counter,
            frame_rate: self.frame_rate,
            seed: self.seed,
            layout: &self.layout,
            entities: &self.entities,
        };
        let json_bytes = serde_json::to_vec(&hashable)?;
        Ok(blake3::hash(&json_bytes).to_hex().to_string())
    }

    /// Check the recorded digest.
    pub fn verify(&self) -> Result<(), SaveError> {
        let recomputed = self.compute_hash()?;
        if recomputed != self.hash {
            return Err(SaveError::HashMismatch {
                recorded: self.hash.clone(),
                recomputed,
            });
        }
        Ok(())
    }

    pub fn to_json_string(&self) -> Result<String, SaveError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self, SaveError> {
        Ok(serde_json::from_str(json)?)
    }
}

// ---------------------------------------------------------------------------
// Dungeon save/load
// ---------------------------------------------------------------------------

impl Dungeon {
    /// Capture the whole game.
    ///
    /// Every component is encoded even after a failure, so the log names all
    /// offending objects; the first error is returned.
    pub fn save(&self) -> Result<SaveGame, SaveError> {
        let codec = self.codec();
        let mut first_error = None;
        let mut entities = Vec::with_capacity(self.registry().len());

        for entity in self.registry().entities() {
            let mut components = Vec::with_capacity(entity.component_count());
            for component in entity.components() {
                match codec.encode_component(component) {
                    Ok(node) => components.push(node),
                    Err(err) => {
                        warn!(
                            entity = %entity.id(),
                            class = component.as_persist().class(),
                            error = %err,
                            "component could not be saved"
                        );
                        first_error.get_or_insert(err);
                    }
                }
            }
            entities.push(EntityRecord {
                id: entity.id(),
                components,
            });
        }

        if let Some(err) = first_error {
            return Err(err);
        }

        let mut save = SaveGame {
            version: SAVE_FORMAT_VERSION,
            tick_counter: self.tick_count(),
            frame_rate: config::frame_rate(),
            seed: self.config().seed,
            layout: self.registry().layout(),
            entities,
            hash: String::new(),
        };
        save.hash = save.compute_hash()?;
        info!(
            tick = save.tick_counter,
            entities = save.entities.len(),
            "game saved"
        );
        Ok(save)
    }

    /// Replace the running game with `save`.
    ///
    /// Everything is decoded into a fresh registry first; the live state is
    /// only replaced once the whole document has been accepted. On error
    /// the dungeon is unchanged. The saved seed replaces the configured one,
    /// so the game continues with the rng it was saved with.
    pub fn load(&mut self, save: &SaveGame) -> Result<(), SaveError> {
        if save.version != SAVE_FORMAT_VERSION {
            return Err(SaveError::UnsupportedVersion {
                found: save.version,
                expected: SAVE_FORMAT_VERSION,
            });
        }
        let current = config::frame_rate();
        if save.frame_rate != current {
            return Err(SaveError::FrameRateMismatch {
                saved: save.frame_rate,
                current,
            });
        }
        save.verify()?;

        let ctx = LoadContext {
            codec: self.codec(),
            level: self.level(),
        };
        let mut staged = Vec::with_capacity(save.entities.len());
        for record in &save.entities {
            let mut entity: Entity<Component> = Entity::new(record.id);
            for node in &record.components {
                if entity.insert(ctx.codec.decode_component(node, &ctx)?).is_some() {
                    return Err(failure(
                        &node.class,
                        format!("entity {} holds two {} nodes", record.id, node.class),
                    ));
                }
            }
            staged.push(entity);
        }
        let registry = Registry::restore(save.layout.clone(), staged)?;

        self.replace_state(registry, save.tick_counter, save.seed);
        info!(
            tick = save.tick_counter,
            seed = save.seed,
            entities = save.entities.len(),
            "game loaded"
        );
        Ok(())
    }

    /// Save to a JSON file.
    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let save = self.save().context("failed to capture game state")?;
        let json = save.to_json_string()?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write save file {}", path.display()))?;
        Ok(())
    }

    /// Load from a JSON file written by [`save_to_file`](Self::save_to_file).
    pub fn load_from_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read save file {}", path.display()))?;
        let save = SaveGame::from_json_str(&json)
            .with_context(|| format!("{} is not a save file", path.display()))?;
        self.load(&save)
            .with_context(|| format!("failed to load {}", path.display()))?;
        Ok(())
    }
}
