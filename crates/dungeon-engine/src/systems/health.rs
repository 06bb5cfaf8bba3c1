use tracing::debug;

use crate::components::{AnimationComponent, ComponentKind, HealthComponent, Registry};
use crate::systems::{System, SystemKind, TickContext};

/// Applies queued damage and handles death.
///
/// For each entity: all damage queued since the last pass is applied at
/// once, the hit animation plays if any landed, and then, exactly once, an
/// entity at zero health runs its death handler, switches to its die
/// animation and is queued for removal. Entities already queued for removal
/// are left alone.
#[derive(Debug, Default)]
pub struct HealthSystem;

impl HealthSystem {
    pub fn new() -> Self {
        Self
    }
}

impl System for HealthSystem {
    fn kind(&self) -> SystemKind {
        SystemKind::Health
    }

    fn update(&mut self, registry: &mut Registry, _ctx: &mut TickContext<'_>) {
        for id in registry.ids_with(&[ComponentKind::Health]) {
            if registry.is_pending_remove(id) {
                continue;
            }
            let Some(entity) = registry.entity_mut(id) else {
                continue;
            };
            let Some(health) = entity.get_mut::<HealthComponent>() else {
                continue;
            };

            let dealt = health.apply_pending_damage();
            let dead = health.is_dead();
            let animation = match (dead, dealt > 0) {
                (true, _) => Some(health.die_animation.clone()),
                (false, true) => Some(health.hit_animation.clone()),
                (false, false) => None,
            };
            if let (Some(animation), Some(anim)) = (animation, entity.get_mut::<AnimationComponent>()) {
                anim.set_current(animation);
            }

            if dead {
                debug!(entity = %id, damage = dealt, "entity died");
                registry.with_detached::<HealthComponent, _>(id, |registry, health| {
                    health.on_death.on_death(registry, id);
                });
                registry.remove_entity(id);
            }
        }
    }
}
