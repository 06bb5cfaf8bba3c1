//! The save-state codec.
//!
//! [`SaveStateCodec`] turns [`Persist`] objects into [`ObjectNode`]s and
//! back, and provides dedicated encoders for the engine value types that are
//! embedded inside records rather than stored as nodes of their own:
//!
//! | value       | record                                                          |
//! |-------------|-----------------------------------------------------------------|
//! | `Animation` | `frames`, `duration`, `currentFrameIndex`, `frameTimeCounter`    |
//! | `Damage`    | `damageAmount`, `damageType`, `entity`                          |
//! | `Point`     | `x`, `y`                                                        |
//! | `TilePath`  | `class`, `geneticType`, `nodes` (points), or `null`             |

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tracing::warn;

use dungeon_ecs::entity::EntityId;

use crate::ai::{
    CollideAi, FightBehavior, IdleBehavior, RadiusWalk, RangeTransition, SelfDefendTransition,
    SkillAi, StandStill, Transition,
};
use crate::animation::{Animation, AnimationSnapshot};
use crate::combat::{Damage, DamageType, NoOpOnDeath, OnDeath};
use crate::level::{Point, TileLevel, TilePath};
use crate::skill::{DamageBurst, SkillEffect};

use super::{
    construct, failure, read_field, read_record, record, LoadContext, ObjectNode, Persist,
    SaveError, SaveKind,
};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

const TILE_PATH_CLASS: &str = "TilePath";
const TILE_CLASS: &str = "Tile";

// ---------------------------------------------------------------------------
// ClassRegistry
// ---------------------------------------------------------------------------

type Constructor<F> = Box<dyn Fn(&Value, &LoadContext<'_>) -> Result<Box<F>, SaveError>>;

/// Maps class names to constructors for one behaviour family.
pub struct ClassRegistry<F: ?Sized> {
    constructors: HashMap<&'static str, Constructor<F>>,
}

impl<F: ?Sized> ClassRegistry<F> {
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register `class`. A later registration of the same name wins.
    pub fn register(
        &mut self,
        class: &'static str,
        constructor: impl Fn(&Value, &LoadContext<'_>) -> Result<Box<F>, SaveError> + 'static,
    ) {
        self.constructors.insert(class, Box::new(constructor));
    }

    pub fn contains(&self, class: &str) -> bool {
        self.constructors.contains_key(class)
    }

    /// Build the object a node describes.
    pub fn decode(&self, node: &ObjectNode, ctx: &LoadContext<'_>) -> Result<Box<F>, SaveError> {
        let constructor = self
            .constructors
            .get(node.class.as_str())
            .ok_or_else(|| failure(&node.class, "class is not registered"))?;
        constructor(&node.payload()?, ctx)
    }
}

impl<F: ?Sized> Default for ClassRegistry<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> fmt::Debug for ClassRegistry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut classes: Vec<&str> = self.constructors.keys().copied().collect();
        classes.sort_unstable();
        f.debug_struct("ClassRegistry").field("classes", &classes).finish()
    }
}

/// Register `$ty` (built with `Default` + `Persist::load`) as a `$family`.
macro_rules! register {
    ($registry:expr, $family:path, $ty:ty) => {
        $registry.register(<$ty>::CLASS, |data, ctx| {
            let object: Box<dyn $family> = Box::new(construct::<$ty>(data, ctx)?);
            Ok(object)
        })
    };
}

// ---------------------------------------------------------------------------
// SaveStateCodec
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct SaveStateCodec {
    resource_root: PathBuf,
    fight_behaviors: ClassRegistry<dyn FightBehavior>,
    idle_behaviors: ClassRegistry<dyn IdleBehavior>,
    transitions: ClassRegistry<dyn Transition>,
    death_handlers: ClassRegistry<dyn OnDeath>,
    skill_effects: ClassRegistry<dyn SkillEffect>,
}

impl SaveStateCodec {
    /// A codec that knows every built-in strategy class.
    pub fn new(resource_root: impl Into<PathBuf>) -> Self {
        let mut codec = Self::empty(resource_root);

        register!(codec.fight_behaviors, FightBehavior, CollideAi);
        register!(codec.fight_behaviors, FightBehavior, SkillAi);
        register!(codec.idle_behaviors, IdleBehavior, RadiusWalk);
        register!(codec.idle_behaviors, IdleBehavior, StandStill);
        register!(codec.transitions, Transition, RangeTransition);
        register!(codec.transitions, Transition, SelfDefendTransition);
        register!(codec.death_handlers, OnDeath, NoOpOnDeath);
        register!(codec.skill_effects, SkillEffect, DamageBurst);

        codec
    }

    /// A codec with no strategy classes registered.
    pub fn empty(resource_root: impl Into<PathBuf>) -> Self {
        Self {
            resource_root: resource_root.into(),
            fight_behaviors: ClassRegistry::new(),
            idle_behaviors: ClassRegistry::new(),
            transitions: ClassRegistry::new(),
            death_handlers: ClassRegistry::new(),
            skill_effects: ClassRegistry::new(),
        }
    }

    pub fn resource_root(&self) -> &Path {
        &self.resource_root
    }

    pub fn fight_behaviors(&self) -> &ClassRegistry<dyn FightBehavior> {
        &self.fight_behaviors
    }

    pub fn fight_behaviors_mut(&mut self) -> &mut ClassRegistry<dyn FightBehavior> {
        &mut self.fight_behaviors
    }

    pub fn idle_behaviors(&self) -> &ClassRegistry<dyn IdleBehavior> {
        &self.idle_behaviors
    }

    pub fn idle_behaviors_mut(&mut self) -> &mut ClassRegistry<dyn IdleBehavior> {
        &mut self.idle_behaviors
    }

    pub fn transitions(&self) -> &ClassRegistry<dyn Transition> {
        &self.transitions
    }

    pub fn transitions_mut(&mut self) -> &mut ClassRegistry<dyn Transition> {
        &mut self.transitions
    }

    pub fn death_handlers(&self) -> &ClassRegistry<dyn OnDeath> {
        &self.death_handlers
    }

    pub fn death_handlers_mut(&mut self) -> &mut ClassRegistry<dyn OnDeath> {
        &mut self.death_handlers
    }

    pub fn skill_effects(&self) -> &ClassRegistry<dyn SkillEffect> {
        &self.skill_effects
    }

    pub fn skill_effects_mut(&mut self) -> &mut ClassRegistry<dyn SkillEffect> {
        &mut self.skill_effects
    }

    // -- objects ------------------------------------------------------------

    /// Encode one object.
    ///
    /// # Errors
    ///
    /// [`SaveError::NotSerializable`] if the object declares no save kind,
    /// or whatever its [`Persist::save`] reports.
    pub fn encode<P: Persist + ?Sized>(&self, object: &P) -> Result<ObjectNode, SaveError> {
        let class = object.class();
        let kind = object.save_kind().ok_or_else(|| SaveError::NotSerializable {
            class: class.to_owned(),
        })?;
        let record = object.save(self)?;
        let data = match kind {
            SaveKind::SelfDescribing => record,
            SaveKind::Opaque => Value::String(STANDARD.encode(serde_json::to_vec(&record)?)),
        };
        Ok(ObjectNode {
            class: class.to_owned(),
            kind,
            data,
        })
    }

    /// Encode each object independently. A failure affects only its own slot.
    pub fn encode_batch(&self, objects: &[&dyn Persist]) -> Vec<Result<ObjectNode, SaveError>> {
        objects
            .iter()
            .map(|object| {
                let result = self.encode(*object);
                if let Err(err) = &result {
                    warn!(class = object.class(), error = %err, "object skipped in batch encode");
                }
                result
            })
            .collect()
    }

    // -- animation ----------------------------------------------------------

    pub fn encode_animation(&self, animation: &Animation) -> Result<Value, SaveError> {
        record(&animation.snapshot(&self.resource_root))
    }

    pub fn decode_animation(&self, data: &Value) -> Result<Animation, SaveError> {
        let snapshot: AnimationSnapshot = read_record("Animation", data)?;
        Animation::from_snapshot(snapshot).map_err(|e| failure("Animation", e.to_string()))
    }

    // -- damage -------------------------------------------------------------

    /// Encode a damage value. The causing entity is written as its raw id.
    pub fn encode_damage(&self, damage: &Damage) -> Value {
        json!({
            "damageAmount": damage.amount,
            "damageType": damage.damage_type,
            "entity": damage.cause.map(EntityId::to_raw),
        })
    }

    /// Decode a damage value. The causing entity comes back as the same
    /// handle; entity ids survive a save/load round trip unchanged.
    pub fn decode_damage(&self, data: &Value) -> Result<Damage, SaveError> {
        let amount: i32 = read_field("Damage", data, "damageAmount")?;
        let damage_type: DamageType = read_field("Damage", data, "damageType")?;
        let cause: Option<u64> = read_field("Damage", data, "entity")?;
        Ok(Damage::new(amount, damage_type, cause.map(EntityId::from_raw)))
    }

    // -- points and paths ---------------------------------------------------

    pub fn encode_point(&self, point: Point) -> Value {
        json!({ "x": point.x, "y": point.y })
    }

    pub fn decode_point(&self, data: &Value) -> Result<Point, SaveError> {
        Ok(Point::new(
            read_field("Point", data, "x")?,
            read_field("Point", data, "y")?,
        ))
    }

    /// Encode a path as its points; `None` becomes `null`.
    pub fn encode_tile_path(&self, path: Option<&TilePath>) -> Value {
        match path {
            None => Value::Null,
            Some(path) => json!({
                "class": TILE_PATH_CLASS,
                "geneticType": TILE_CLASS,
                "nodes": path.points().map(|p| self.encode_point(p)).collect::<Vec<_>>(),
            }),
        }
    }

    /// Decode a path against the loaded level.
    ///
    /// # Errors
    ///
    /// [`SaveError::DeserializationFailure`] if a non-null path is decoded
    /// without a level, or names a point the level has no tile for.
    pub fn decode_tile_path(
        &self,
        data: &Value,
        level: Option<&dyn TileLevel>,
    ) -> Result<Option<TilePath>, SaveError> {
        if data.is_null() {
            return Ok(None);
        }
        let level = level.ok_or_else(|| {
            failure(TILE_PATH_CLASS, "a level must be loaded before decoding a tile path")
        })?;
        let nodes = data
            .get("nodes")
            .and_then(Value::as_array)
            .ok_or_else(|| failure(TILE_PATH_CLASS, "missing `nodes` array"))?;

        let mut tiles = Vec::with_capacity(nodes.len());
        for node in nodes {
            let point = self.decode_point(node)?;
            let tile = level
                .tile_at(point)
                .ok_or_else(|| failure(TILE_PATH_CLASS, format!("no tile at {point}")))?;
            tiles.push(tile.clone());
        }
        Ok(Some(TilePath::new(tiles)))
    }
}

impl Default for SaveStateCodec {
    fn default() -> Self {
        Self::new(PathBuf::new())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::GridLevel;

    fn ctx<'a>(codec: &'a SaveStateCodec, level: Option<&'a dyn TileLevel>) -> LoadContext<'a> {
        LoadContext { codec, level }
    }

    #[test]
    fn damage_keeps_cause_handle() {
        let codec = SaveStateCodec::default();
        let damage = Damage::new(7, DamageType::Fire, Some(EntityId::new(3, 2)));
        let data = codec.encode_damage(&damage);
        assert_eq!(data["damageType"], "FIRE");
        assert_eq!(codec.decode_damage(&data).unwrap(), damage);

        let anonymous = Damage::new(1, DamageType::Magic, None);
        let data = codec.encode_damage(&anonymous);
        assert!(data["entity"].is_null());
        assert_eq!(codec.decode_damage(&data).unwrap(), anonymous);
    }

    #[test]
    fn registered_strategy_decodes_by_class() {
        let codec = SaveStateCodec::default();
        let node = codec.encode(&CollideAi::new(1.25)).unwrap();
        assert_eq!(node.class, "CollideAi");
        assert_eq!(node.kind, SaveKind::SelfDescribing);

        let decoded = codec.fight_behaviors().decode(&node, &ctx(&codec, None)).unwrap();
        assert_eq!(decoded.class(), "CollideAi");
        assert_eq!(decoded.save(&codec).unwrap(), json!({ "rushRange": 1.25 }));
    }

    #[test]
    fn empty_codec_rejects_builtin_classes() {
        let full = SaveStateCodec::default();
        let empty = SaveStateCodec::empty("");
        let node = full.encode(&StandStill).unwrap();
        let err = empty.idle_behaviors().decode(&node, &ctx(&empty, None)).unwrap_err();
        assert!(matches!(err, SaveError::DeserializationFailure { class, .. } if class == "StandStill"));
    }

    #[test]
    fn tile_path_decodes_against_level() {
        let codec = SaveStateCodec::default();
        let level = GridLevel::parse("....\n....").unwrap();
        let path = level.find_path(Point::new(0, 0), Point::new(3, 1)).unwrap();

        let data = codec.encode_tile_path(Some(&path));
        assert_eq!(data["class"], "TilePath");
        assert_eq!(data["geneticType"], "Tile");
        let decoded = codec.decode_tile_path(&data, Some(&level)).unwrap();
        assert_eq!(decoded.as_ref(), Some(&path));

        assert_eq!(codec.encode_tile_path(None), Value::Null);
        assert_eq!(codec.decode_tile_path(&Value::Null, None).unwrap(), None);
    }

    #[test]
    fn tile_path_rejects_points_outside_level() {
        let codec = SaveStateCodec::default();
        let level = GridLevel::parse("..").unwrap();
        let data = json!({ "class": "TilePath", "geneticType": "Tile", "nodes": [{ "x": 5, "y": 5 }] });
        let err = codec.decode_tile_path(&data, Some(&level)).unwrap_err();
        assert!(matches!(err, SaveError::DeserializationFailure { .. }));
    }
}
