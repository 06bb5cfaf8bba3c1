//! AI strategies: how a monster fights, how it idles, and when it switches.
//!
//! Each strategy family is a trait so games can add their own; the concrete
//! strategies here are registered with the save codec under their class
//! names. Strategies steer by setting the current velocity on the entity's
//! [`VelocityComponent`]; the velocity system does the actual moving.

use std::fmt;

use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use dungeon_ecs::entity::{Entity, EntityId};

use crate::components::{
    ComponentKind, HealthComponent, PlayableComponent, PositionComponent, Registry,
    VelocityComponent,
};
use crate::config;
use crate::level::{Point, TileLevel, TilePath};
use crate::savegame::{
    field, read_field, read_record, record, LoadContext, Persist, SaveError, SaveStateCodec,
};
use crate::skill::use_skill;

/// How close counts as having reached a waypoint.
const ARRIVAL_EPSILON: f32 = 0.05;

/// What strategies get to work with on each call.
pub struct AiContext<'a> {
    pub registry: &'a mut Registry,
    pub level: Option<&'a dyn TileLevel>,
    pub rng: &'a mut Pcg32,
}

pub trait FightBehavior: Persist + fmt::Debug {
    fn fight(&mut self, ctx: &mut AiContext<'_>, entity: EntityId);
}

pub trait IdleBehavior: Persist + fmt::Debug {
    fn idle(&mut self, ctx: &mut AiContext<'_>, entity: EntityId);
}

/// Decides each tick whether the entity fights or idles.
pub trait Transition: Persist + fmt::Debug {
    fn is_in_fight_mode(&mut self, registry: &Registry, entity: EntityId) -> bool;
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The first live playable entity with a position.
pub fn hero(registry: &Registry) -> Option<EntityId> {
    registry
        .entities_with(&[ComponentKind::Playable, ComponentKind::Position])
        .find(|e| e.get::<PlayableComponent>().is_some_and(|p| p.playable))
        .map(Entity::id)
}

pub fn position_of(registry: &Registry, entity: EntityId) -> Option<PositionComponent> {
    registry.get::<PositionComponent>(entity).copied()
}

/// Distance from `entity` to the hero, if both have positions.
pub fn distance_to_hero(registry: &Registry, entity: EntityId) -> Option<f32> {
    let hero_id = hero(registry)?;
    Some(position_of(registry, entity)?.distance(&position_of(registry, hero_id)?))
}

/// Set `entity`'s current velocity towards `target`.
///
/// Each axis moves at the configured speed, or slower on the last step so the
/// entity lands on the target instead of overshooting it.
pub fn steer_towards(registry: &mut Registry, entity: EntityId, target: PositionComponent) {
    let Some(position) = position_of(registry, entity) else {
        return;
    };
    let Some(velocity) = registry.get_mut::<VelocityComponent>(entity) else {
        return;
    };
    let dt = config::frame_duration();
    velocity.current_x_velocity = axis_velocity(target.x - position.x, velocity.x_velocity, dt);
    velocity.current_y_velocity = axis_velocity(target.y - position.y, velocity.y_velocity, dt);
}

fn axis_velocity(delta: f32, speed: f32, dt: f32) -> f32 {
    if delta.abs() < f32::EPSILON {
        return 0.0;
    }
    delta.signum() * speed.min(delta.abs() / dt)
}

/// Steer along `path` from waypoint `*index`. Returns `true` once the last
/// waypoint has been reached.
pub fn follow_path(
    registry: &mut Registry,
    entity: EntityId,
    path: &TilePath,
    index: &mut usize,
) -> bool {
    let Some(position) = position_of(registry, entity) else {
        return true;
    };
    while let Some(tile) = path.get(*index) {
        let waypoint = PositionComponent::at(tile.point());
        let arrived = (waypoint.x - position.x).abs() < ARRIVAL_EPSILON
            && (waypoint.y - position.y).abs() < ARRIVAL_EPSILON;
        if !arrived {
            steer_towards(registry, entity, waypoint);
            return false;
        }
        *index += 1;
    }
    true
}

// ---------------------------------------------------------------------------
// Fight behaviours
// ---------------------------------------------------------------------------

/// Chase the hero: straight at it inside `rush_range`, otherwise along a
/// level path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollideAi {
    pub rush_range: f32,
}

impl CollideAi {
    pub const CLASS: &'static str = "CollideAi";

    pub fn new(rush_range: f32) -> Self {
        Self { rush_range }
    }
}

impl Default for CollideAi {
    fn default() -> Self {
        Self::new(2.0)
    }
}

impl FightBehavior for CollideAi {
    fn fight(&mut self, ctx: &mut AiContext<'_>, entity: EntityId) {
        let Some(hero_id) = hero(ctx.registry) else {
            return;
        };
        let (Some(me), Some(target)) = (
            position_of(ctx.registry, entity),
            position_of(ctx.registry, hero_id),
        ) else {
            return;
        };

        if me.distance(&target) > self.rush_range {
            let next = ctx
                .level
                .and_then(|level| level.find_path(me.tile_point(), target.tile_point()))
                .and_then(|path| path.get(1).map(|tile| tile.point()));
            if let Some(next) = next {
                steer_towards(ctx.registry, entity, PositionComponent::at(next));
                return;
            }
        }
        steer_towards(ctx.registry, entity, target);
    }
}

impl Persist for CollideAi {
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

/// Use a skill from the entity's skill component once the hero is within
/// `attack_range`; approach it otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillAi {
    pub skill_index: usize,
    pub attack_range: f32,
}

impl SkillAi {
    pub const CLASS: &'static str = "SkillAi";

    pub fn new(skill_index: usize, attack_range: f32) -> Self {
        Self {
            skill_index,
            attack_range,
        }
    }
}

impl Default for SkillAi {
    fn default() -> Self {
        Self::new(0, 1.0)
    }
}

impl FightBehavior for SkillAi {
    fn fight(&mut self, ctx: &mut AiContext<'_>, entity: EntityId) {
        let Some(hero_id) = hero(ctx.registry) else {
            return;
        };
        let (Some(me), Some(target)) = (
            position_of(ctx.registry, entity),
            position_of(ctx.registry, hero_id),
        ) else {
            return;
        };
        if me.distance(&target) <= self.attack_range {
            use_skill(ctx.registry, entity, self.skill_index);
        } else {
            steer_towards(ctx.registry, entity, target);
        }
    }
}

impl Persist for SkillAi {
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

// ---------------------------------------------------------------------------
// Idle behaviours
// ---------------------------------------------------------------------------

/// Walk to a random accessible tile within `radius`, rest for
/// `break_ticks`, repeat.
#[derive(Debug, Clone, PartialEq)]
pub struct RadiusWalk {
    pub radius: f32,
    pub break_ticks: u32,
    ticks_waited: u32,
    path: Option<TilePath>,
    path_index: usize,
}

impl RadiusWalk {
    pub const CLASS: &'static str = "RadiusWalk";

    /// `break_seconds` is converted to ticks at the current frame rate.
    pub fn new(radius: f32, break_seconds: u32) -> Self {
        Self {
            radius,
            break_ticks: break_seconds.saturating_mul(config::frame_rate()),
            ticks_waited: 0,
            path: None,
            path_index: 0,
        }
    }

    /// The walk in progress, if any.
    pub fn path(&self) -> Option<&TilePath> {
        self.path.as_ref()
    }

    fn pick_path(&mut self, ctx: &mut AiContext<'_>, origin: Point) {
        let Some(level) = ctx.level else {
            return;
        };
        let mut candidates = level.accessible_in_radius(origin, self.radius);
        candidates.retain(|p| *p != origin);
        if candidates.is_empty() {
            return;
        }
        let target = candidates[ctx.rng.gen_range(0..candidates.len())];
        self.path = level.find_path(origin, target);
        self.path_index = 0;
    }
}

impl Default for RadiusWalk {
    fn default() -> Self {
        Self::new(5.0, 2)
    }
}

impl IdleBehavior for RadiusWalk {
    fn idle(&mut self, ctx: &mut AiContext<'_>, entity: EntityId) {
        if self.path.is_none() {
            if self.ticks_waited < self.break_ticks {
                self.ticks_waited += 1;
                return;
            }
            self.ticks_waited = 0;
            let Some(origin) = position_of(ctx.registry, entity) else {
                return;
            };
            self.pick_path(ctx, origin.tile_point());
        }

        let finished = match &self.path {
            Some(path) => follow_path(ctx.registry, entity, path, &mut self.path_index),
            None => false,
        };
        if finished {
            self.path = None;
        }
    }
}

impl Persist for RadiusWalk {
    fn class(&self) -> &'static str {
        Self::CLASS
    }

    fn save(&self, codec: &SaveStateCodec) -> Result<Value, SaveError> {
        Ok(json!({
            "radius": self.radius,
            "breakTicks": self.break_ticks,
            "ticksWaited": self.ticks_waited,
            "path": codec.encode_tile_path(self.path.as_ref()),
            "pathIndex": self.path_index,
        }))
    }

    fn load(&mut self, data: &Value, ctx: &LoadContext<'_>) -> Result<(), SaveError> {
        self.radius = read_field(Self::CLASS, data, "radius")?;
        self.break_ticks = read_field(Self::CLASS, data, "breakTicks")?;
        self.ticks_waited = read_field(Self::CLASS, data, "ticksWaited")?;
        self.path = ctx
            .codec
            .decode_tile_path(field(Self::CLASS, data, "path")?, ctx.level)?;
        self.path_index = read_field(Self::CLASS, data, "pathIndex")?;
        Ok(())
    }
}

/// Do nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StandStill;

impl StandStill {
    pub const CLASS: &'static str = "StandStill";
}

impl IdleBehavior for StandStill {
    fn idle(&mut self, _ctx: &mut AiContext<'_>, _entity: EntityId) {}
}

impl Persist for StandStill {
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

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// Fight while the hero is within `range`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeTransition {
    pub range: f32,
}

impl RangeTransition {
    pub const CLASS: &'static str = "RangeTransition";

    pub fn new(range: f32) -> Self {
        Self { range }
    }
}

impl Default for RangeTransition {
    fn default() -> Self {
        Self::new(5.0)
    }
}

impl Transition for RangeTransition {
    fn is_in_fight_mode(&mut self, registry: &Registry, entity: EntityId) -> bool {
        distance_to_hero(registry, entity).is_some_and(|d| d <= self.range)
    }
}

impl Persist for RangeTransition {
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

/// Fight once the entity has taken any damage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelfDefendTransition;

impl SelfDefendTransition {
    pub const CLASS: &'static str = "SelfDefendTransition";
}

impl Transition for SelfDefendTransition {
    fn is_in_fight_mode(&mut self, registry: &Registry, entity: EntityId) -> bool {
        registry
            .get::<HealthComponent>(entity)
            .is_some_and(|h| h.current_health() < h.maximal_health())
    }
}

impl Persist for SelfDefendTransition {
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

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
