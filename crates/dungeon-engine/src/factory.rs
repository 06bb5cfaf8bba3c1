//! Seeded construction of heroes and monsters.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use tracing::debug;

use dungeon_ecs::entity::EntityId;

use crate::ai::{CollideAi, RadiusWalk, RangeTransition};
use crate::animation::{Animation, DEFAULT_FRAME_TIME};
use crate::combat::{DamageType, NoOpOnDeath};
use crate::components::{
    AiComponent, AnimationComponent, Component, HealthComponent, HitboxComponent,
    PlayableComponent, PositionComponent, Registry, SkillComponent, VelocityComponent,
};
use crate::config;
use crate::level::Point;
use crate::skill::{DamageBurst, Skill};

/// Hero movement per tick, in tiles.
const HERO_STEP: f32 = 0.3;
const HERO_HEALTH: i32 = 100;

/// A single-frame animation `<texture>/<name>.png`.
fn animation(texture: &str, name: &str) -> Animation {
    Animation::new(vec![format!("{texture}/{name}.png")], DEFAULT_FRAME_TIME)
        .unwrap_or_else(|_| Animation::missing_texture())
}

/// Builds entities with randomised stats from its own seeded rng.
#[derive(Debug, Clone)]
pub struct EntityFactory {
    rng: Pcg32,
}

impl EntityFactory {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Queue a hero at `at`. Skill 0 is a short-range damage burst.
    pub fn create_hero(&mut self, registry: &mut Registry, at: Point, texture: &str) -> EntityId {
        let speed = HERO_STEP * config::frame_rate() as f32;
        let burst = Skill::new(Box::new(DamageBurst::new(5, DamageType::Physical, 1.5)), 1.0);

        let id = registry.spawn([
            Component::from(PositionComponent::at(at)),
            VelocityComponent::new(
                speed,
                speed,
                animation(texture, "runLeft"),
                animation(texture, "runRight"),
            )
            .into(),
            HitboxComponent::default().into(),
            HealthComponent::new(
                HERO_HEALTH,
                Box::new(NoOpOnDeath),
                animation(texture, "hit"),
                animation(texture, "die"),
            )
            .into(),
            SkillComponent::new(vec![burst]).into(),
            AnimationComponent::new(animation(texture, "idleLeft"), animation(texture, "idleRight"))
                .into(),
            PlayableComponent::default().into(),
        ]);
        debug!(entity = %id, at = %at, "hero created");
        id
    }

    /// Queue a monster at `at`.
    ///
    /// Per-tick speeds of 0.1..0.3 tiles on each axis, 1..=20 health, a
    /// rush range below 1.5, fight range 2..4, and an idle walk within
    /// 1..10 tiles resting 2 or 3 seconds between walks.
    pub fn create_monster(&mut self, registry: &mut Registry, at: Point, texture: &str) -> EntityId {
        let frame_rate = config::frame_rate() as f32;
        let x_speed = self.rng.gen_range(0.1_f32..0.3) * frame_rate;
        let y_speed = self.rng.gen_range(0.1_f32..0.3) * frame_rate;
        let health = self.rng.gen_range(1..=20);
        let fight = CollideAi::new(self.rng.gen_range(0.0..1.5));
        let transition = RangeTransition::new(self.rng.gen_range(2.0..4.0));
        let idle = RadiusWalk::new(self.rng.gen_range(1.0..10.0), self.rng.gen_range(2..4));

        let id = registry.spawn([
            Component::from(PositionComponent::at(at)),
            VelocityComponent::new(
                x_speed,
                y_speed,
                animation(texture, "runLeft"),
                animation(texture, "runRight"),
            )
            .into(),
            HitboxComponent::default().into(),
            HealthComponent::new(
                health,
                Box::new(NoOpOnDeath),
                animation(texture, "idleLeft"),
                animation(texture, "idleRight"),
            )
            .into(),
            AiComponent::new(Box::new(fight), Box::new(idle), Box::new(transition)).into(),
            AnimationComponent::new(animation(texture, "idleLeft"), animation(texture, "idleRight"))
                .into(),
        ]);
        debug!(entity = %id, at = %at, health, "monster created");
        id
    }
}
