//! Per-tick systems.
//!
//! A system selects the entities carrying the components it needs and
//! advances their state. Entities missing a component are skipped, never
//! reported. Systems collect ids before mutating, so structural changes they
//! make land in the registry's pending queues and take effect next tick.

mod ai;
mod animation;
mod health;
mod skill;
mod velocity;

use std::fmt;

use rand_pcg::Pcg32;

use crate::components::Registry;
use crate::level::TileLevel;

pub use ai::AiSystem;
pub use animation::AnimationSystem;
pub use health::HealthSystem;
pub use skill::SkillSystem;
pub use velocity::VelocitySystem;

/// Identifies a system in the controller. At most one system per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemKind {
    Ai,
    Velocity,
    Skill,
    Health,
    Animation,
    /// A game-defined system.
    Custom(&'static str),
}

impl fmt::Display for SystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemKind::Ai => f.write_str("ai"),
            SystemKind::Velocity => f.write_str("velocity"),
            SystemKind::Skill => f.write_str("skill"),
            SystemKind::Health => f.write_str("health"),
            SystemKind::Animation => f.write_str("animation"),
            SystemKind::Custom(name) => f.write_str(name),
        }
    }
}

/// Per-tick state shared by every system.
pub struct TickContext<'a> {
    /// Ticks completed before this one.
    pub tick: u64,
    pub frame_rate: u32,
    pub level: Option<&'a dyn TileLevel>,
    pub rng: &'a mut Pcg32,
}

impl TickContext<'_> {
    /// Seconds simulated by one tick.
    pub fn frame_duration(&self) -> f32 {
        1.0 / self.frame_rate as f32
    }
}

pub trait System {
    fn kind(&self) -> SystemKind;

    fn update(&mut self, registry: &mut Registry, ctx: &mut TickContext<'_>);
}
