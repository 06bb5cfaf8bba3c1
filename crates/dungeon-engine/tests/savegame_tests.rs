//! SaveStateCodec tests: value encoders, node kinds, error isolation.

use std::path::Path;

use serde_json::{json, Value};

use dungeon_engine::prelude::*;

fn codec() -> SaveStateCodec {
    SaveStateCodec::new("/game/assets")
}

#[test]
fn point_round_trip() {
    let codec = codec();
    let data = codec.encode_point(Point::new(3, 7));
    assert_eq!(data, json!({ "x": 3, "y": 7 }));
    assert_eq!(codec.decode_point(&data).unwrap(), Point::new(3, 7));
}

#[test]
fn animation_round_trip_keeps_playback_state() {
    let codec = codec();
    let mut animation =
        Animation::new(vec!["a.png".to_owned(), "b.png".to_owned()], 100).unwrap();
    for _ in 0..142 {
        animation.next_frame_path();
    }
    assert_eq!(animation.current_frame_index(), 1);
    assert_eq!(animation.frame_time_counter(), 42);

    let data = codec.encode_animation(&animation).unwrap();
    assert_eq!(
        data,
        json!({
            "frames": ["a.png", "b.png"],
            "duration": 100,
            "currentFrameIndex": 1,
            "frameTimeCounter": 42,
        })
    );

    let decoded = codec.decode_animation(&data).unwrap();
    assert_eq!(decoded.frames(), ["a.png", "b.png"]);
    assert_eq!(decoded.frame_time(), 100);
    assert_eq!(decoded.current_frame_index(), 1);
    assert_eq!(decoded.frame_time_counter(), 42);
}

#[test]
fn animation_frames_are_saved_relative_to_resource_root() {
    let codec = codec();
    let animation = Animation::new(
        vec![
            "/game/assets/character/knight/idle_0.png".to_owned(),
            "elsewhere/idle_1.png".to_owned(),
        ],
        5,
    )
    .unwrap();
    let data = codec.encode_animation(&animation).unwrap();
    assert_eq!(
        data["frames"],
        json!(["character/knight/idle_0.png", "elsewhere/idle_1.png"])
    );
    assert_eq!(codec.resource_root(), Path::new("/game/assets"));
}

#[test]
fn corrupt_animation_snapshot_is_rejected() {
    let codec = codec();
    let data = json!({
        "frames": ["a.png"],
        "duration": 10,
        "currentFrameIndex": 3,
        "frameTimeCounter": 0,
    });
    let err = codec.decode_animation(&data).unwrap_err();
    assert!(matches!(err, SaveError::DeserializationFailure { .. }));
}

#[test]
fn damage_round_trip_keeps_entity_link() {
    let codec = codec();
    let attacker = EntityId::new(12, 3);
    let damage = Damage::new(9, DamageType::Magic, Some(attacker));

    let data = codec.encode_damage(&damage);
    assert_eq!(data["damageAmount"], 9);
    assert_eq!(data["damageType"], "MAGIC");
    assert_eq!(data["entity"], attacker.to_raw());
    assert_eq!(codec.decode_damage(&data).unwrap(), damage);
}

#[test]
fn batch_failure_does_not_affect_siblings() {
    let codec = codec();
    let position = PositionComponent::new(1.0, 2.0);
    let closure_effect = FnSkillEffect::new(|_, _| {});
    let burst = DamageBurst::default();
    let objects: [&dyn Persist; 3] = [&position, &closure_effect, &burst];

    let results = codec.encode_batch(&objects);
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().data, json!({ "x": 1.0, "y": 2.0 }));
    assert!(matches!(
        &results[1],
        Err(SaveError::NotSerializable { class }) if class == "FnSkillEffect"
    ));
    assert_eq!(results[2].as_ref().unwrap().class, "DamageBurst");
}

#[test]
fn node_layout_names_class_type_and_data() {
    let codec = codec();
    let node = codec
        .encode_component(&PositionComponent::new(0.5, 1.5).into())
        .unwrap();
    assert_eq!(
        node.to_value().unwrap(),
        json!({
            "class": "PositionComponent",
            "type": "self-describing",
            "data": { "x": 0.5, "y": 1.5 },
        })
    );
}

#[test]
fn opaque_node_holds_base64_record() {
    let codec = codec();
    let node = codec
        .encode_component(&HitboxComponent::new(0.0, 0.0, 1.0, 1.0).into())
        .unwrap();
    let value = node.to_value().unwrap();
    assert_eq!(value["type"], "opaque");
    assert!(value["data"].is_string());
    assert_eq!(
        node.payload().unwrap(),
        json!({ "offsetX": 0.0, "offsetY": 0.0, "width": 1.0, "height": 1.0 })
    );
}

#[test]
fn corrupt_opaque_blob_fails_to_decode() {
    let codec = codec();
    let node = ObjectNode {
        class: "HitboxComponent".to_owned(),
        kind: SaveKind::Opaque,
        data: Value::String("not base64!".to_owned()),
    };
    let ctx = LoadContext {
        codec: &codec,
        level: None,
    };
    let err = codec.decode_component(&node, &ctx).unwrap_err();
    assert!(matches!(err, SaveError::DeserializationFailure { class, .. } if class == "HitboxComponent"));
}

#[test]
fn unregistered_strategy_class_fails_to_decode() {
    let codec = codec();
    let ai = AiComponent::new(
        Box::new(SkillAi::new(0, 1.0)),
        Box::new(StandStill),
        Box::new(SelfDefendTransition),
    );
    let node = codec.encode_component(&ai.into()).unwrap();

    let mut data = node.data.clone();
    data["fight"]["class"] = json!("TeleportAi");
    let tampered = ObjectNode { data, ..node };
    let ctx = LoadContext {
        codec: &codec,
        level: None,
    };
    let err = codec.decode_component(&tampered, &ctx).unwrap_err();
    assert!(matches!(err, SaveError::DeserializationFailure { class, .. } if class == "TeleportAi"));
}

#[test]
fn custom_strategy_class_can_be_registered() {
    #[derive(Debug, Default)]
    struct Sleep {
        ticks: u32,
    }

    impl Persist for Sleep {
        fn class(&self) -> &'static str {
            "Sleep"
        }

        fn save(&self, _codec: &SaveStateCodec) -> Result<Value, SaveError> {
            Ok(json!({ "ticks": self.ticks }))
        }

        fn load(&mut self, data: &Value, _ctx: &LoadContext<'_>) -> Result<(), SaveError> {
            self.ticks = data["ticks"].as_u64().unwrap_or(0) as u32;
            Ok(())
        }
    }

    impl IdleBehavior for Sleep {
        fn idle(&mut self, _ctx: &mut AiContext<'_>, _entity: EntityId) {
            self.ticks += 1;
        }
    }

    let mut codec = codec();
    codec.idle_behaviors_mut().register("Sleep", |data, ctx| {
        let mut sleep = Sleep::default();
        sleep.load(data, ctx)?;
        let idle: Box<dyn IdleBehavior> = Box::new(sleep);
        Ok(idle)
    });
    assert!(codec.idle_behaviors().contains("Sleep"));

    let node = codec.encode(&Sleep { ticks: 4 }).unwrap();
    let ctx = LoadContext {
        codec: &codec,
        level: None,
    };
    let decoded = codec.idle_behaviors().decode(&node, &ctx).unwrap();
    assert_eq!(decoded.save(&codec).unwrap(), json!({ "ticks": 4 }));
}

#[test]
fn tile_path_needs_a_loaded_level() {
    let codec = codec();
    let level = GridLevel::parse("...\n...").unwrap();
    let path = level.find_path(Point::new(0, 0), Point::new(2, 1)).unwrap();
    let data = codec.encode_tile_path(Some(&path));
    assert_eq!(data["nodes"][0], json!({ "x": 0, "y": 0 }));

    let err = codec.decode_tile_path(&data, None).unwrap_err();
    assert!(matches!(err, SaveError::DeserializationFailure { class, .. } if class == "TilePath"));

    let decoded = codec.decode_tile_path(&data, Some(&level)).unwrap().unwrap();
    assert_eq!(decoded, path);
}

#[test]
fn radius_walk_path_survives_encoding() {
    let codec = codec();
    let level = GridLevel::parse("....\n....\n....").unwrap();
    let mut registry = Registry::new();
    let e = registry.spawn([
        Component::from(PositionComponent::new(1.0, 1.0)),
        VelocityComponent::new(3.0, 3.0, Animation::default(), Animation::default()).into(),
    ]);
    let mut rng = <rand_pcg::Pcg32 as rand::SeedableRng>::seed_from_u64(3);
    let mut walk = RadiusWalk::new(2.0, 0);
    let mut ctx = AiContext {
        registry: &mut registry,
        level: Some(&level),
        rng: &mut rng,
    };
    walk.idle(&mut ctx, e);
    let planned = walk.path().cloned().expect("walk planned");

    let node = codec.encode(&walk).unwrap();
    let load = LoadContext {
        codec: &codec,
        level: Some(&level),
    };
    let decoded = codec.idle_behaviors().decode(&node, &load).unwrap();
    assert_eq!(decoded.save(&codec).unwrap()["path"], codec.encode_tile_path(Some(&planned)));

    let no_level = LoadContext {
        codec: &codec,
        level: None,
    };
    assert!(codec.idle_behaviors().decode(&node, &no_level).is_err());
}
