//! SystemController tests: ordering, frame boundaries, replacement.
//!
//! Structural changes made by a system are queued; the entity they concern
//! keeps its visibility for the rest of the tick and flips at the next
//! frame boundary.

use std::cell::RefCell;
use std::rc::Rc;

use dungeon_engine::prelude::*;

// ---------------------------------------------------------------------------
// Test systems
// ---------------------------------------------------------------------------

struct FnSystem<F> {
    name: &'static str,
    f: F,
}

impl<F> System for FnSystem<F>
where
    F: FnMut(&mut Registry, &mut TickContext<'_>),
{
    fn kind(&self) -> SystemKind {
        SystemKind::Custom(self.name)
    }

    fn update(&mut self, registry: &mut Registry, ctx: &mut TickContext<'_>) {
        (self.f)(registry, ctx);
    }
}

fn system<F>(name: &'static str, f: F) -> FnSystem<F>
where
    F: FnMut(&mut Registry, &mut TickContext<'_>) + 'static,
{
    FnSystem { name, f }
}

type Log<T> = Rc<RefCell<Vec<T>>>;

/// A system that records how many live entities have a position.
fn position_counter(log: &Log<usize>) -> impl System {
    let log = Rc::clone(log);
    system("counter", move |registry, _| {
        log.borrow_mut()
            .push(registry.ids_with(&[ComponentKind::Position]).len());
    })
}

fn bare_dungeon() -> Dungeon {
    Dungeon::new(EngineConfig::default()).unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn systems_run_in_registration_order() {
    let mut dungeon = bare_dungeon();
    let log: Log<&'static str> = Rc::default();
    for name in ["first", "second", "third"] {
        let log = Rc::clone(&log);
        dungeon
            .systems_mut()
            .add(system(name, move |_, _| log.borrow_mut().push(name)));
    }

    dungeon.run_ticks(2);
    assert_eq!(
        *log.borrow(),
        vec!["first", "second", "third", "first", "second", "third"]
    );
}

#[test]
fn entity_spawned_by_a_system_is_visible_from_the_next_tick() {
    let mut dungeon = bare_dungeon();
    let counts: Log<usize> = Rc::default();

    dungeon.systems_mut().add(system("spawner", |registry, ctx| {
        if ctx.tick == 0 {
            registry.spawn([Component::from(PositionComponent::new(0.0, 0.0))]);
        }
    }));
    dungeon.systems_mut().add(position_counter(&counts));

    dungeon.run_ticks(3);
    assert_eq!(*counts.borrow(), vec![0, 1, 1]);
}

#[test]
fn entity_removed_mid_tick_stays_visible_until_the_next_tick() {
    let mut dungeon = bare_dungeon();
    let e = dungeon
        .registry_mut()
        .spawn([Component::from(PositionComponent::new(0.0, 0.0))]);
    let counts: Log<usize> = Rc::default();

    dungeon.systems_mut().add(system("remover", move |registry, ctx| {
        if ctx.tick == 1 {
            assert!(registry.remove_entity(e));
        }
    }));
    dungeon.systems_mut().add(position_counter(&counts));

    dungeon.run_ticks(3);
    assert_eq!(*counts.borrow(), vec![1, 1, 0]);
    assert!(!dungeon.registry().contains(e));
}

#[test]
fn second_system_of_a_kind_replaces_the_first_in_place() {
    let mut dungeon = bare_dungeon();
    let log: Log<&'static str> = Rc::default();

    let (l1, l2, l3) = (Rc::clone(&log), Rc::clone(&log), Rc::clone(&log));
    dungeon.systems_mut().add(system("a", move |_, _| l1.borrow_mut().push("old a")));
    dungeon.systems_mut().add(system("b", move |_, _| l2.borrow_mut().push("b")));
    let replaced = dungeon
        .systems_mut()
        .add(system("a", move |_, _| l3.borrow_mut().push("new a")));

    assert!(replaced.is_some());
    assert_eq!(
        dungeon.systems().kinds(),
        vec![SystemKind::Custom("a"), SystemKind::Custom("b")]
    );
    dungeon.tick();
    assert_eq!(*log.borrow(), vec!["new a", "b"]);
}

#[test]
fn removed_system_stops_running() {
    let mut dungeon = Dungeon::with_default_systems(EngineConfig::default()).unwrap();
    assert!(dungeon.systems().contains(SystemKind::Velocity));

    let removed = dungeon.systems_mut().remove(SystemKind::Velocity);
    assert_eq!(removed.map(|s| s.kind()), Some(SystemKind::Velocity));
    assert!(dungeon.systems_mut().remove(SystemKind::Velocity).is_none());
    assert_eq!(dungeon.systems().len(), 4);
}

#[test]
fn diagnostics_cover_every_system() {
    let mut dungeon = Dungeon::with_default_systems(EngineConfig::default()).unwrap();
    dungeon
        .registry_mut()
        .spawn([Component::from(PositionComponent::new(0.0, 0.0))]);
    dungeon.tick();

    let diagnostics = dungeon.systems().last_diagnostics();
    let kinds: Vec<SystemKind> = diagnostics.system_times.iter().map(|(k, _)| *k).collect();
    assert_eq!(kinds, dungeon.systems().kinds());
    assert_eq!(diagnostics.frame.added, 1);
    assert!(diagnostics.total_time >= diagnostics.system_times.iter().map(|(_, t)| *t).sum());
}

#[test]
fn tick_context_counts_completed_ticks() {
    let mut dungeon = bare_dungeon();
    let ticks: Log<u64> = Rc::default();
    let seen = Rc::clone(&ticks);
    dungeon.systems_mut().add(system("ticks", move |_, ctx| {
        assert_eq!(ctx.frame_rate, DEFAULT_FRAME_RATE);
        seen.borrow_mut().push(ctx.tick);
    }));

    dungeon.run_ticks(3);
    assert_eq!(*ticks.borrow(), vec![0, 1, 2]);
    assert_eq!(dungeon.tick_count(), 3);
}
