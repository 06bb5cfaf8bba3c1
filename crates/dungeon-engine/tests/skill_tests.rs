//! Skill cooldown tests.
//!
//! Cooldowns count ticks, not wall-clock time: a skill with a two second
//! base cooldown at 30 ticks per second stays unusable for 60 reductions.

use std::cell::Cell;
use std::rc::Rc;

use dungeon_engine::prelude::*;

fn counting_skill(base_cool_down_seconds: f32) -> (Skill, Rc<Cell<u32>>) {
    let count = Rc::new(Cell::new(0));
    let fired = Rc::clone(&count);
    let effect = FnSkillEffect::new(move |_, _| fired.set(fired.get() + 1));
    (Skill::new(Box::new(effect), base_cool_down_seconds), count)
}

#[test]
fn two_second_cooldown_lasts_sixty_ticks() {
    let mut registry = Registry::new();
    let caster = registry.create_entity();
    let (mut skill, fired) = counting_skill(2.0);

    assert_eq!(skill.execute(&mut registry, caster), SkillUse::Executed);
    assert_eq!(fired.get(), 1);

    assert_eq!(
        skill.execute(&mut registry, caster),
        SkillUse::CoolingDown { remaining_ticks: 60 }
    );
    assert_eq!(fired.get(), 1);

    for _ in 0..60 {
        assert!(skill.is_on_cool_down());
        skill.reduce_cool_down();
    }
    assert!(!skill.is_on_cool_down());

    assert_eq!(skill.execute(&mut registry, caster), SkillUse::Executed);
    assert_eq!(fired.get(), 2);
}

#[test]
fn reduce_cool_down_stops_at_zero() {
    let (mut skill, _) = counting_skill(1.0);
    skill.reduce_cool_down();
    skill.reduce_cool_down();
    assert_eq!(skill.remaining_cool_down(), 0);
}

#[test]
fn skill_system_ticks_every_skill() {
    let mut dungeon = Dungeon::with_default_systems(EngineConfig::default()).unwrap();
    let (slow, _) = counting_skill(1.0);
    let (fast, _) = counting_skill(0.5);
    let caster = dungeon
        .registry_mut()
        .spawn([Component::from(SkillComponent::new(vec![slow, fast]))]);
    dungeon.tick();

    assert_eq!(use_skill(dungeon.registry_mut(), caster, 0), Some(SkillUse::Executed));
    assert_eq!(use_skill(dungeon.registry_mut(), caster, 1), Some(SkillUse::Executed));
    dungeon.run_ticks(15);

    let skills = dungeon.registry().get::<SkillComponent>(caster).unwrap().skills();
    assert_eq!(skills[0].remaining_cool_down(), 15);
    assert_eq!(skills[1].remaining_cool_down(), 0);
    assert!(!skills[1].is_on_cool_down());
}

#[test]
fn use_skill_without_such_skill_is_none() {
    let mut registry = Registry::new();
    let plain = registry.spawn([Component::from(PositionComponent::new(0.0, 0.0))]);
    assert_eq!(use_skill(&mut registry, plain, 0), None);

    let (skill, _) = counting_skill(1.0);
    let caster = registry.spawn([Component::from(SkillComponent::new(vec![skill]))]);
    assert_eq!(use_skill(&mut registry, caster, 3), None);
    assert!(registry.get::<SkillComponent>(caster).is_some());
}

#[test]
fn damage_burst_hits_only_entities_in_range() {
    let mut dungeon = Dungeon::with_default_systems(EngineConfig::default()).unwrap();
    let burst = Skill::new(Box::new(DamageBurst::new(4, DamageType::Fire, 1.5)), 1.0);
    let caster = dungeon.registry_mut().spawn([
        Component::from(PositionComponent::new(0.0, 0.0)),
        SkillComponent::new(vec![burst]).into(),
        HealthComponent::default().into(),
    ]);
    let near = dungeon.registry_mut().spawn([
        Component::from(PositionComponent::new(1.0, 0.0)),
        HealthComponent::new(10, Box::new(NoOpOnDeath), Animation::default(), Animation::default())
            .into(),
    ]);
    let far = dungeon.registry_mut().spawn([
        Component::from(PositionComponent::new(5.0, 5.0)),
        HealthComponent::new(10, Box::new(NoOpOnDeath), Animation::default(), Animation::default())
            .into(),
    ]);
    dungeon.tick();

    assert_eq!(use_skill(dungeon.registry_mut(), caster, 0), Some(SkillUse::Executed));
    let pending = dungeon.registry().get::<HealthComponent>(near).unwrap().pending_damage();
    assert_eq!(pending, &[Damage::new(4, DamageType::Fire, Some(caster))]);

    dungeon.tick();
    let registry = dungeon.registry();
    assert_eq!(registry.get::<HealthComponent>(near).unwrap().current_health(), 6);
    assert_eq!(registry.get::<HealthComponent>(near).unwrap().last_cause(), Some(caster));
    assert_eq!(registry.get::<HealthComponent>(far).unwrap().current_health(), 10);
    assert_eq!(registry.get::<HealthComponent>(caster).unwrap().current_health(), 1);
}
