use tracing::trace;

use crate::components::{
    AnimationComponent, ComponentKind, Facing, PositionComponent, Registry, VelocityComponent,
};
use crate::systems::{System, SystemKind, TickContext};

/// Moves entities by their current velocity and turns their animation to
/// match the direction of travel.
///
/// With a level loaded, a move that would end on an inaccessible tile is
/// dropped. The current velocity is consumed either way.
#[derive(Debug, Default)]
pub struct VelocitySystem;

impl VelocitySystem {
    pub fn new() -> Self {
        Self
    }
}

impl System for VelocitySystem {
    fn kind(&self) -> SystemKind {
        SystemKind::Velocity
    }

    fn update(&mut self, registry: &mut Registry, ctx: &mut TickContext<'_>) {
        let dt = ctx.frame_duration();

        for id in registry.ids_with(&[ComponentKind::Position, ComponentKind::Velocity]) {
            let Some(entity) = registry.entity_mut(id) else {
                continue;
            };
            let Some(velocity) = entity.get_mut::<VelocityComponent>() else {
                continue;
            };
            let (vx, vy) = (velocity.current_x_velocity, velocity.current_y_velocity);
            velocity.current_x_velocity = 0.0;
            velocity.current_y_velocity = 0.0;
            let turn = match vx {
                v if v > 0.0 => Some((Facing::Right, velocity.move_right_animation.clone())),
                v if v < 0.0 => Some((Facing::Left, velocity.move_left_animation.clone())),
                _ => None,
            };

            if let Some(position) = entity.get_mut::<PositionComponent>() {
                let target = PositionComponent::new(position.x + vx * dt, position.y + vy * dt);
                let blocked = ctx
                    .level
                    .is_some_and(|level| !level.is_accessible(target.tile_point()));
                if blocked {
                    trace!(entity = %id, tile = %target.tile_point(), "move blocked");
                } else {
                    *position = target;
                }
            }

            if let (Some((facing, animation)), Some(anim)) =
                (turn, entity.get_mut::<AnimationComponent>())
            {
                anim.face(facing, &animation);
            }
        }
    }
}
