use crate::components::{AnimationComponent, ComponentKind, Registry};
use crate::systems::{System, SystemKind, TickContext};

/// Advances every playing animation by one tick.
#[derive(Debug, Default)]
pub struct AnimationSystem;

impl AnimationSystem {
    pub fn new() -> Self {
        Self
    }
}

impl System for AnimationSystem {
    fn kind(&self) -> SystemKind {
        SystemKind::Animation
    }

    fn update(&mut self, registry: &mut Registry, _ctx: &mut TickContext<'_>) {
        for id in registry.ids_with(&[ComponentKind::Animation]) {
            if let Some(anim) = registry.get_mut::<AnimationComponent>(id) {
                anim.current_mut().next_frame_path();
            }
        }
    }
}
