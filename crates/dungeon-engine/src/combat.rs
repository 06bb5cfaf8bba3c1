//! Damage values and death handlers.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use dungeon_ecs::entity::EntityId;

use crate::components::Registry;
use crate::savegame::{not_serializable, LoadContext, Persist, SaveError, SaveKind, SaveStateCodec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DamageType {
    Physical,
    Magic,
    Fire,
}

/// One hit, queued on the target's health until the next health pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Damage {
    pub amount: i32,
    pub damage_type: DamageType,
    /// The entity that dealt the damage, if any.
    pub cause: Option<EntityId>,
}

impl Damage {
    pub fn new(amount: i32, damage_type: DamageType, cause: Option<EntityId>) -> Self {
        Self {
            amount,
            damage_type,
            cause,
        }
    }
}

// ---------------------------------------------------------------------------
// Death handlers
// ---------------------------------------------------------------------------

/// Runs once when an entity's health drops to zero, before it is queued for
/// removal. The entity's own health component is detached while it runs.
pub trait OnDeath: Persist + fmt::Debug {
    fn on_death(&mut self, registry: &mut Registry, entity: EntityId);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoOpOnDeath;

impl NoOpOnDeath {
    pub const CLASS: &'static str = "NoOpOnDeath";
}

impl OnDeath for NoOpOnDeath {
    fn on_death(&mut self, _registry: &mut Registry, _entity: EntityId) {}
}

impl Persist for NoOpOnDeath {
    fn class(&self) -> &'static str {
        Self::CLASS
    }

    fn save(&self, _codec: &SaveStateCodec) -> Result<Value, SaveError> {
        Ok(json!({}))
    }

    fn load(&mut self, _data: &Value, _ctx: &LoadContext<'_>) -> Result<(), SaveError> {
        Ok(())
    }
}

type DeathFn = Box<dyn FnMut(&mut Registry, EntityId)>;

/// A closure handler. Closures cannot be saved, so a game holding one is
/// not serializable.
pub struct FnOnDeath(DeathFn);

impl FnOnDeath {
    pub const CLASS: &'static str = "FnOnDeath";

    pub fn new(f: impl FnMut(&mut Registry, EntityId) + 'static) -> Self {
        Self(Box::new(f))
    }
}

impl fmt::Debug for FnOnDeath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnOnDeath(..)")
    }
}

impl OnDeath for FnOnDeath {
    fn on_death(&mut self, registry: &mut Registry, entity: EntityId) {
        (self.0)(registry, entity)
    }
}

impl Persist for FnOnDeath {
    fn class(&self) -> &'static str {
        Self::CLASS
    }

    fn save_kind(&self) -> Option<SaveKind> {
        None
    }

    fn save(&self, _codec: &SaveStateCodec) -> Result<Value, SaveError> {
        Err(not_serializable(Self::CLASS))
    }

    fn load(&mut self, _data: &Value, _ctx: &LoadContext<'_>) -> Result<(), SaveError> {
        Err(not_serializable(Self::CLASS))
    }
}
