//! Whole-game save/load tests: round trip, determinism, all-or-nothing load.

use dungeon_engine::prelude::*;

const LEVEL: &str = "\
##########
#........#
#..####..#
#........#
##########";

fn populated_dungeon() -> Dungeon {
    seeded_dungeon(11)
}

fn seeded_dungeon(seed: u64) -> Dungeon {
    let mut dungeon = Dungeon::with_default_systems(EngineConfig {
        seed,
        ..EngineConfig::default()
    })
    .unwrap();
    dungeon.set_level(GridLevel::parse(LEVEL).unwrap());

    let mut factory = EntityFactory::new(seed);
    factory.create_hero(dungeon.registry_mut(), Point::new(1, 1), "hero");
    for at in [Point::new(8, 3), Point::new(7, 1), Point::new(4, 3)] {
        factory.create_monster(dungeon.registry_mut(), at, "imp");
    }
    dungeon
}

/// Every entity's components, as saved.
fn state_of(dungeon: &Dungeon) -> Vec<EntityRecord> {
    dungeon.save().unwrap().entities
}

#[test]
fn save_then_load_restores_identical_state() {
    let mut dungeon = populated_dungeon();
    dungeon.run_ticks(40);
    let save = dungeon.save().unwrap();
    let before = state_of(&dungeon);

    dungeon.run_ticks(25);
    assert_ne!(state_of(&dungeon), before);

    dungeon.load(&save).unwrap();
    assert_eq!(dungeon.tick_count(), 40);
    assert_eq!(state_of(&dungeon), before);
    assert_eq!(dungeon.registry().layout(), save.layout);
}

#[test]
fn loaded_game_continues_like_the_original() {
    let mut original = populated_dungeon();
    original.run_ticks(30);
    let save = original.save().unwrap();

    let mut resumed = populated_dungeon();
    resumed.load(&save).unwrap();

    original.run_ticks(50);
    resumed.run_ticks(50);
    assert_eq!(state_of(&original), state_of(&resumed));
}

#[test]
fn loaded_game_keeps_the_saved_seed() {
    let mut original = populated_dungeon();
    original.run_ticks(30);
    let save = original.save().unwrap();

    let mut resumed = seeded_dungeon(999);
    resumed.load(&save).unwrap();
    assert_eq!(resumed.config().seed, 11);

    original.run_ticks(200);
    resumed.run_ticks(200);
    assert_eq!(state_of(&original), state_of(&resumed));
}

#[test]
fn pending_queues_survive_a_save() {
    let mut dungeon = populated_dungeon();
    dungeon.tick();
    let fresh = dungeon
        .registry_mut()
        .spawn([Component::from(PositionComponent::new(2.0, 2.0))]);
    let doomed = dungeon.registry().live_ids().next().unwrap();
    dungeon.registry_mut().remove_entity(doomed);

    let save = dungeon.save().unwrap();
    let mut other = populated_dungeon();
    other.load(&save).unwrap();

    assert!(other.registry().is_pending_add(fresh));
    assert!(other.registry().is_pending_remove(doomed));
    let report = other.tick();
    assert_eq!((report.added, report.removed), (1, 1));
}

#[test]
fn corrupt_save_leaves_game_untouched() {
    let mut dungeon = populated_dungeon();
    dungeon.run_ticks(10);
    let mut save = dungeon.save().unwrap();
    dungeon.run_ticks(5);
    let before = state_of(&dungeon);

    save.entities[0].components[0].data = serde_json::json!({ "x": "nope" });
    let err = dungeon.load(&save).unwrap_err();
    assert!(matches!(err, SaveError::HashMismatch { .. }));

    // A consistent hash over an undecodable component fails during staging.
    save.hash = save.compute_hash().unwrap();
    let err = dungeon.load(&save).unwrap_err();
    assert!(matches!(err, SaveError::DeserializationFailure { .. }));

    assert_eq!(dungeon.tick_count(), 15);
    assert_eq!(state_of(&dungeon), before);
}

#[test]
fn inconsistent_layout_is_rejected() {
    let mut dungeon = populated_dungeon();
    dungeon.tick();
    let mut save = dungeon.save().unwrap();
    save.entities.pop();
    save.hash = save.compute_hash().unwrap();

    let err = dungeon.load(&save).unwrap_err();
    assert!(matches!(err, SaveError::Layout(_)));
    assert_eq!(dungeon.registry().len(), 4);
}

#[test]
fn closure_strategies_block_saving() {
    let mut dungeon = populated_dungeon();
    let hero = dungeon.registry().entities()[0].id();
    dungeon
        .registry_mut()
        .get_mut::<HealthComponent>(hero)
        .unwrap()
        .on_death = Box::new(FnOnDeath::new(|_, _| {}));

    let err = dungeon.save().unwrap_err();
    assert!(matches!(err, SaveError::NotSerializable { class } if class == "FnOnDeath"));
}

#[test]
fn save_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slot1.json");

    let mut dungeon = populated_dungeon();
    dungeon.run_ticks(20);
    dungeon.save_to_file(&path).unwrap();
    let before = state_of(&dungeon);

    let mut loaded = populated_dungeon();
    loaded.load_from_file(&path).unwrap();
    assert_eq!(loaded.tick_count(), 20);
    assert_eq!(state_of(&loaded), before);

    let text = std::fs::read_to_string(&path).unwrap();
    let parsed = SaveGame::from_json_str(&text).unwrap();
    assert_eq!(parsed.version, SAVE_FORMAT_VERSION);
    assert_eq!(parsed.hash.len(), 64);
}

#[test]
fn missing_save_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let mut dungeon = populated_dungeon();

    let err = dungeon.load_from_file(&path).unwrap_err();
    assert!(format!("{err:#}").contains("absent.json"));
}
