use crate::components::{ComponentKind, Registry, SkillComponent};
use crate::systems::{System, SystemKind, TickContext};

/// Takes one tick off the cooldown of every skill.
#[derive(Debug, Default)]
pub struct SkillSystem;

impl SkillSystem {
    pub fn new() -> Self {
        Self
    }
}

impl System for SkillSystem {
    fn kind(&self) -> SystemKind {
        SystemKind::Skill
    }

    fn update(&mut self, registry: &mut Registry, _ctx: &mut TickContext<'_>) {
        for id in registry.ids_with(&[ComponentKind::Skill]) {
            if let Some(skills) = registry.get_mut::<SkillComponent>(id) {
                skills.skills_mut().iter_mut().for_each(|s| s.reduce_cool_down());
            }
        }
    }
}
