//! Frame rate tests. They live in their own binary because the rate is fixed
//! once per process; every test here runs at 60 ticks per second.

use dungeon_engine::config::{self, ConfigError};
use dungeon_engine::prelude::*;

const RATE: u32 = 60;

fn at_sixty() -> EngineConfig {
    config::init_frame_rate(RATE).unwrap();
    EngineConfig {
        frame_rate: RATE,
        ..EngineConfig::default()
    }
}

#[test]
fn installed_rate_is_used_for_conversions() {
    at_sixty();
    assert_eq!(config::frame_rate(), RATE);
    assert_eq!(config::seconds_to_ticks(1.5), 90);
    assert!((config::frame_duration() - 1.0 / 60.0).abs() < 1e-9);
}

#[test]
fn another_rate_cannot_be_installed() {
    at_sixty();
    let err = config::init_frame_rate(30).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::FrameRateAlreadySet {
            current: RATE,
            requested: 30
        }
    ));

    let err = Dungeon::new(EngineConfig::default()).unwrap_err();
    assert!(matches!(err, ConfigError::FrameRateAlreadySet { .. }));
}

#[test]
fn cooldown_scales_with_frame_rate() {
    let mut dungeon = Dungeon::new(at_sixty()).unwrap();
    let mut skill = Skill::new(Box::new(DamageBurst::default()), 0.5);

    assert_eq!(skill.execute(dungeon.registry_mut(), EntityId::new(0, 0)), SkillUse::Executed);
    assert_eq!(skill.remaining_cool_down(), 30);
}

#[test]
fn save_from_another_rate_is_rejected() {
    let mut dungeon = Dungeon::new(at_sixty()).unwrap();
    dungeon
        .registry_mut()
        .spawn([Component::from(PositionComponent::new(1.0, 1.0))]);
    dungeon.tick();

    let mut save = dungeon.save().unwrap();
    assert_eq!(save.frame_rate, RATE);
    save.frame_rate = 30;
    save.hash = save.compute_hash().unwrap();

    let err = dungeon.load(&save).unwrap_err();
    assert!(matches!(
        err,
        SaveError::FrameRateMismatch {
            saved: 30,
            current: RATE
        }
    ));
    assert_eq!(dungeon.tick_count(), 1);
}
