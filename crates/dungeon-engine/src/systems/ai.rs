use tracing::trace;

use crate::ai::AiContext;
use crate::components::{AiComponent, ComponentKind, Registry};
use crate::systems::{System, SystemKind, TickContext};

/// Runs each entity's fight or idle strategy, as chosen by its transition.
#[derive(Debug, Default)]
pub struct AiSystem;

impl AiSystem {
    pub fn new() -> Self {
        Self
    }
}

impl System for AiSystem {
    fn kind(&self) -> SystemKind {
        SystemKind::Ai
    }

    fn update(&mut self, registry: &mut Registry, ctx: &mut TickContext<'_>) {
        let level = ctx.level;
        for id in registry.ids_with(&[ComponentKind::Ai]) {
            registry.with_detached::<AiComponent, _>(id, |registry, ai| {
                let fighting = ai.transition.is_in_fight_mode(registry, id);
                trace!(entity = %id, fighting, "ai decision");
                let mut ai_ctx = AiContext {
                    registry,
                    level,
                    rng: &mut *ctx.rng,
                };
                if fighting {
                    ai.fight.fight(&mut ai_ctx, id);
                } else {
                    ai.idle.idle(&mut ai_ctx, id);
                }
            });
        }
    }
}
