//! Save records of the engine's components.

use serde_json::{json, Value};

use dungeon_ecs::entity::EntityId;

use crate::components::{
    AiComponent, AnimationComponent, Component, Facing, HealthComponent, HitboxComponent,
    PlayableComponent, PositionComponent, SkillComponent, VelocityComponent,
};
use crate::skill::Skill;

use super::{
    construct, failure, field, read_field, read_record, record, LoadContext, ObjectNode, Persist,
    SaveError, SaveKind, SaveStateCodec,
};

const POSITION: &str = "PositionComponent";
const VELOCITY: &str = "VelocityComponent";
const HITBOX: &str = "HitboxComponent";
const HEALTH: &str = "HealthComponent";
const AI: &str = "AiComponent";
const SKILL: &str = "SkillComponent";
const ANIMATION: &str = "AnimationComponent";
const PLAYABLE: &str = "PlayableComponent";

impl Component {
    /// The component as its serialization capability.
    pub fn as_persist(&self) -> &dyn Persist {
        match self {
            Component::Position(c) => c,
            Component::Velocity(c) => c,
            Component::Hitbox(c) => c,
            Component::Health(c) => c,
            Component::Ai(c) => c,
            Component::Skill(c) => c,
            Component::Animation(c) => c,
            Component::Playable(c) => c,
        }
    }
}

impl SaveStateCodec {
    pub fn encode_component(&self, component: &Component) -> Result<ObjectNode, SaveError> {
        self.encode(component.as_persist())
    }

    /// Rebuild a component from its node. The class name selects the type.
    pub fn decode_component(
        &self,
        node: &ObjectNode,
        ctx: &LoadContext<'_>,
    ) -> Result<Component, SaveError> {
        let data = node.payload()?;
        let component = match node.class.as_str() {
            POSITION => construct::<PositionComponent>(&data, ctx)?.into(),
            VELOCITY => construct::<VelocityComponent>(&data, ctx)?.into(),
            HITBOX => construct::<HitboxComponent>(&data, ctx)?.into(),
            HEALTH => construct::<HealthComponent>(&data, ctx)?.into(),
            AI => construct::<AiComponent>(&data, ctx)?.into(),
            SKILL => construct::<SkillComponent>(&data, ctx)?.into(),
            ANIMATION => construct::<AnimationComponent>(&data, ctx)?.into(),
            PLAYABLE => construct::<PlayableComponent>(&data, ctx)?.into(),
            other => return Err(failure(other, "not a component class")),
        };
        Ok(component)
    }
}

/// Decode a strategy node embedded under `name` in `owner`'s record.
fn embedded_node(owner: &str, data: &Value, name: &str) -> Result<ObjectNode, SaveError> {
    ObjectNode::from_value(owner, field(owner, data, name)?)
}

// ---------------------------------------------------------------------------
// Plain records
// ---------------------------------------------------------------------------

impl Persist for PositionComponent {
    fn class(&self) -> &'static str {
        POSITION
    }

    fn save(&self, _codec: &SaveStateCodec) -> Result<Value, SaveError> {
        record(self)
    }

    fn load(&mut self, data: &Value, _ctx: &LoadContext<'_>) -> Result<(), SaveError> {
        *self = read_record(POSITION, data)?;
        Ok(())
    }
}

/// Stored as an opaque blob.
impl Persist for HitboxComponent {
    fn class(&self) -> &'static str {
        HITBOX
    }

    fn save_kind(&self) -> Option<SaveKind> {
        Some(SaveKind::Opaque)
    }

    fn save(&self, _codec: &SaveStateCodec) -> Result<Value, SaveError> {
        record(self)
    }

    fn load(&mut self, data: &Value, _ctx: &LoadContext<'_>) -> Result<(), SaveError> {
        *self = read_record(HITBOX, data)?;
        Ok(())
    }
}

impl Persist for PlayableComponent {
    fn class(&self) -> &'static str {
        PLAYABLE
    }

    fn save(&self, _codec: &SaveStateCodec) -> Result<Value, SaveError> {
        record(self)
    }

    fn load(&mut self, data: &Value, _ctx: &LoadContext<'_>) -> Result<(), SaveError> {
        *self = read_record(PLAYABLE, data)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Records with animations
// ---------------------------------------------------------------------------

impl Persist for VelocityComponent {
    fn class(&self) -> &'static str {
        VELOCITY
    }

    fn save(&self, codec: &SaveStateCodec) -> Result<Value, SaveError> {
        Ok(json!({
            "xVelocity": self.x_velocity,
            "yVelocity": self.y_velocity,
            "currentXVelocity": self.current_x_velocity,
            "currentYVelocity": self.current_y_velocity,
            "moveLeftAnimation": codec.encode_animation(&self.move_left_animation)?,
            "moveRightAnimation": codec.encode_animation(&self.move_right_animation)?,
        }))
    }

    fn load(&mut self, data: &Value, ctx: &LoadContext<'_>) -> Result<(), SaveError> {
        self.x_velocity = read_field(VELOCITY, data, "xVelocity")?;
        self.y_velocity = read_field(VELOCITY, data, "yVelocity")?;
        self.current_x_velocity = read_field(VELOCITY, data, "currentXVelocity")?;
        self.current_y_velocity = read_field(VELOCITY, data, "currentYVelocity")?;
        self.move_left_animation = ctx
            .codec
            .decode_animation(field(VELOCITY, data, "moveLeftAnimation")?)?;
        self.move_right_animation = ctx
            .codec
            .decode_animation(field(VELOCITY, data, "moveRightAnimation")?)?;
        Ok(())
    }
}

impl Persist for AnimationComponent {
    fn class(&self) -> &'static str {
        ANIMATION
    }

    fn save(&self, codec: &SaveStateCodec) -> Result<Value, SaveError> {
        Ok(json!({
            "idleLeft": codec.encode_animation(&self.idle_left)?,
            "idleRight": codec.encode_animation(&self.idle_right)?,
            "current": codec.encode_animation(&self.current)?,
            "facing": self.facing,
        }))
    }

    fn load(&mut self, data: &Value, ctx: &LoadContext<'_>) -> Result<(), SaveError> {
        let codec = ctx.codec;
        self.idle_left = codec.decode_animation(field(ANIMATION, data, "idleLeft")?)?;
        self.idle_right = codec.decode_animation(field(ANIMATION, data, "idleRight")?)?;
        self.current = codec.decode_animation(field(ANIMATION, data, "current")?)?;
        self.facing = read_field::<Facing>(ANIMATION, data, "facing")?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Records with strategies
// ---------------------------------------------------------------------------

impl Persist for HealthComponent {
    fn class(&self) -> &'static str {
        HEALTH
    }

    fn save(&self, codec: &SaveStateCodec) -> Result<Value, SaveError> {
        let pending: Vec<Value> = self
            .pending_damage
            .iter()
            .map(|d| codec.encode_damage(d))
            .collect();
        Ok(json!({
            "currentHealth": self.current_health,
            "maximalHealth": self.maximal_health,
            "pendingDamage": pending,
            "lastCause": self.last_cause.map(EntityId::to_raw),
            "onDeath": codec.encode(self.on_death.as_ref())?.to_value()?,
            "hitAnimation": codec.encode_animation(&self.hit_animation)?,
            "dieAnimation": codec.encode_animation(&self.die_animation)?,
        }))
    }

    fn load(&mut self, data: &Value, ctx: &LoadContext<'_>) -> Result<(), SaveError> {
        let codec = ctx.codec;
        self.current_health = read_field(HEALTH, data, "currentHealth")?;
        self.maximal_health = read_field(HEALTH, data, "maximalHealth")?;

        let pending = field(HEALTH, data, "pendingDamage")?
            .as_array()
            .ok_or_else(|| failure(HEALTH, "`pendingDamage` is not an array"))?;
        self.pending_damage = pending
            .iter()
            .map(|d| codec.decode_damage(d))
            .collect::<Result<_, _>>()?;

        let last_cause: Option<u64> = read_field(HEALTH, data, "lastCause")?;
        self.last_cause = last_cause.map(EntityId::from_raw);

        let on_death = embedded_node(HEALTH, data, "onDeath")?;
        self.on_death = codec.death_handlers().decode(&on_death, ctx)?;
        self.hit_animation = codec.decode_animation(field(HEALTH, data, "hitAnimation")?)?;
        self.die_animation = codec.decode_animation(field(HEALTH, data, "dieAnimation")?)?;
        Ok(())
    }
}

impl Persist for AiComponent {
    fn class(&self) -> &'static str {
        AI
    }

    fn save(&self, codec: &SaveStateCodec) -> Result<Value, SaveError> {
        Ok(json!({
            "fight": codec.encode(self.fight.as_ref())?.to_value()?,
            "idle": codec.encode(self.idle.as_ref())?.to_value()?,
            "transition": codec.encode(self.transition.as_ref())?.to_value()?,
        }))
    }

    fn load(&mut self, data: &Value, ctx: &LoadContext<'_>) -> Result<(), SaveError> {
        let codec = ctx.codec;
        self.fight = codec
            .fight_behaviors()
            .decode(&embedded_node(AI, data, "fight")?, ctx)?;
        self.idle = codec
            .idle_behaviors()
            .decode(&embedded_node(AI, data, "idle")?, ctx)?;
        self.transition = codec
            .transitions()
            .decode(&embedded_node(AI, data, "transition")?, ctx)?;
        Ok(())
    }
}

impl Persist for SkillComponent {
    fn class(&self) -> &'static str {
        SKILL
    }

    fn save(&self, codec: &SaveStateCodec) -> Result<Value, SaveError> {
        let skills = self
            .skills
            .iter()
            .map(|skill| codec.encode(skill)?.to_value())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(json!({ "skills": skills }))
    }

    fn load(&mut self, data: &Value, ctx: &LoadContext<'_>) -> Result<(), SaveError> {
        let nodes = field(SKILL, data, "skills")?
            .as_array()
            .ok_or_else(|| failure(SKILL, "`skills` is not an array"))?;
        let mut skills = Vec::with_capacity(nodes.len());
        for node in nodes {
            let node = ObjectNode::from_value(SKILL, node)?;
            if node.class != Skill::CLASS {
                return Err(failure(SKILL, format!("unexpected skill class {}", node.class)));
            }
            skills.push(construct::<Skill>(&node.payload()?, ctx)?);
        }
        self.skills = skills;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
