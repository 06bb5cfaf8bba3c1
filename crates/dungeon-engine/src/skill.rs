//! Cooldown-gated skills.
//!
//! A [`Skill`] wraps a [`SkillEffect`] with a cooldown. Cooldowns are
//! counted in ticks: executing a skill sets its remaining cooldown to
//! `base_cool_down_seconds * frame_rate`, and the skill system takes one tick
//! off every frame. Wall-clock time plays no part.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::trace;

use dungeon_ecs::entity::EntityId;

use crate::combat::{Damage, DamageType};
use crate::components::{ComponentKind, HealthComponent, PositionComponent, Registry, SkillComponent};
use crate::config;
use crate::savegame::{
    field, not_serializable, read_field, read_record, record, LoadContext, ObjectNode, Persist,
    SaveError, SaveKind, SaveStateCodec,
};

/// What a skill does when it fires.
pub trait SkillEffect: Persist + fmt::Debug {
    fn apply(&mut self, registry: &mut Registry, caster: EntityId);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillUse {
    Executed,
    /// Nothing happened; the skill is still cooling down.
    CoolingDown { remaining_ticks: u32 },
}

#[derive(Debug)]
pub struct Skill {
    effect: Box<dyn SkillEffect>,
    base_cool_down_seconds: f32,
    cool_down_ticks: u32,
}

impl Skill {
    pub const CLASS: &'static str = "Skill";

    pub fn new(effect: Box<dyn SkillEffect>, base_cool_down_seconds: f32) -> Self {
        Self {
            effect,
            base_cool_down_seconds,
            cool_down_ticks: 0,
        }
    }

    /// Fire the effect on behalf of `caster` unless the skill is cooling down.
    pub fn execute(&mut self, registry: &mut Registry, caster: EntityId) -> SkillUse {
        if self.is_on_cool_down() {
            return SkillUse::CoolingDown {
                remaining_ticks: self.cool_down_ticks,
            };
        }
        self.effect.apply(registry, caster);
        self.cool_down_ticks = config::seconds_to_ticks(self.base_cool_down_seconds);
        trace!(
            caster = %caster,
            effect = self.effect.class(),
            cool_down_ticks = self.cool_down_ticks,
            "skill executed"
        );
        SkillUse::Executed
    }

    pub fn is_on_cool_down(&self) -> bool {
        self.cool_down_ticks > 0
    }

    /// Take one tick off the cooldown, stopping at zero.
    pub fn reduce_cool_down(&mut self) {
        self.cool_down_ticks = self.cool_down_ticks.saturating_sub(1);
    }

    pub fn remaining_cool_down(&self) -> u32 {
        self.cool_down_ticks
    }

    pub fn base_cool_down_seconds(&self) -> f32 {
        self.base_cool_down_seconds
    }

    pub fn effect(&self) -> &dyn SkillEffect {
        self.effect.as_ref()
    }
}

impl Default for Skill {
    fn default() -> Self {
        Self::new(Box::new(DamageBurst::default()), 1.0)
    }
}

impl Persist for Skill {
    fn class(&self) -> &'static str {
        Self::CLASS
    }

    fn save(&self, codec: &SaveStateCodec) -> Result<Value, SaveError> {
        Ok(json!({
            "effect": codec.encode(self.effect.as_ref())?.to_value()?,
            "baseCoolDownSeconds": self.base_cool_down_seconds,
            "coolDownTicks": self.cool_down_ticks,
        }))
    }

    fn load(&mut self, data: &Value, ctx: &LoadContext<'_>) -> Result<(), SaveError> {
        let effect = ObjectNode::from_value(Self::CLASS, field(Self::CLASS, data, "effect")?)?;
        self.effect = ctx.codec.skill_effects().decode(&effect, ctx)?;
        self.base_cool_down_seconds = read_field(Self::CLASS, data, "baseCoolDownSeconds")?;
        self.cool_down_ticks = read_field(Self::CLASS, data, "coolDownTicks")?;
        Ok(())
    }
}

/// Execute skill `index` of `entity`'s skill component.
///
/// The skill component is detached while the effect runs, so the effect may
/// freely touch the caster. Returns `None` if the entity has no such skill.
pub fn use_skill(registry: &mut Registry, entity: EntityId, index: usize) -> Option<SkillUse> {
    registry
        .with_detached::<SkillComponent, _>(entity, |registry, skills| {
            skills
                .skills
                .get_mut(index)
                .map(|skill| skill.execute(registry, entity))
        })
        .flatten()
}

// ---------------------------------------------------------------------------
// Effects
// ---------------------------------------------------------------------------

/// Damage every other entity with health within `range` of the caster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageBurst {
    pub amount: i32,
    pub damage_type: DamageType,
    pub range: f32,
}

impl DamageBurst {
    pub const CLASS: &'static str = "DamageBurst";

    pub fn new(amount: i32, damage_type: DamageType, range: f32) -> Self {
        Self {
            amount,
            damage_type,
            range,
        }
    }
}

impl Default for DamageBurst {
    fn default() -> Self {
        Self::new(5, DamageType::Physical, 1.5)
    }
}

impl SkillEffect for DamageBurst {
    fn apply(&mut self, registry: &mut Registry, caster: EntityId) {
        let Some(origin) = registry.get::<PositionComponent>(caster).copied() else {
            return;
        };
        let targets: Vec<EntityId> = registry
            .entities_with(&[ComponentKind::Health, ComponentKind::Position])
            .filter(|e| e.id() != caster)
            .filter(|e| {
                e.get::<PositionComponent>()
                    .is_some_and(|p| p.distance(&origin) <= self.range)
            })
            .map(|e| e.id())
            .collect();

        for target in targets {
            if let Some(health) = registry.get_mut::<HealthComponent>(target) {
                health.receive_hit(Damage::new(self.amount, self.damage_type, Some(caster)));
            }
        }
    }
}

impl Persist for DamageBurst {
    fn class(&self) -> &'static str {
        Self::CLASS
    }

    fn save(&self, _codec: &SaveStateCodec) -> Result<Value, SaveError> {
        record(self)
    }

    fn load(&mut self, data: &Value, _ctx: &LoadContext<'_>) -> Result<(), SaveError> {
        *self = read_record(Self::CLASS, data)?;
        Ok(())
    }
}

type EffectFn = Box<dyn FnMut(&mut Registry, EntityId)>;

/// A closure effect. Not serializable.
pub struct FnSkillEffect(EffectFn);

impl FnSkillEffect {
    pub const CLASS: &'static str = "FnSkillEffect";

    pub fn new(f: impl FnMut(&mut Registry, EntityId) + 'static) -> Self {
        Self(Box::new(f))
    }
}

impl fmt::Debug for FnSkillEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnSkillEffect(..)")
    }
}

impl SkillEffect for FnSkillEffect {
    fn apply(&mut self, registry: &mut Registry, caster: EntityId) {
        (self.0)(registry, caster)
    }
}

impl Persist for FnSkillEffect {
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
