//! The dungeon's component family.
//!
//! Components are plain data plus small accessors. Behaviour that varies per
//! entity (AI strategies, death handlers, skill effects) lives in boxed
//! strategy objects stored inside the components; systems drive them.

use serde::{Deserialize, Serialize};

use dungeon_ecs::component::{ComponentFamily, ComponentVariant};
use dungeon_ecs::entity::EntityId;
use dungeon_ecs::registry::EntityRegistry;

use crate::ai::{CollideAi, FightBehavior, IdleBehavior, RadiusWalk, RangeTransition, Transition};
use crate::animation::Animation;
use crate::combat::{Damage, NoOpOnDeath, OnDeath};
use crate::level::Point;
use crate::skill::Skill;

/// The registry type every engine system works on.
pub type Registry = EntityRegistry<Component>;

// ---------------------------------------------------------------------------
// Family
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    Position,
    Velocity,
    Hitbox,
    Health,
    Ai,
    Skill,
    Animation,
    Playable,
}

#[derive(Debug)]
pub enum Component {
    Position(PositionComponent),
    Velocity(VelocityComponent),
    Hitbox(HitboxComponent),
    Health(HealthComponent),
    Ai(AiComponent),
    Skill(SkillComponent),
    Animation(AnimationComponent),
    Playable(PlayableComponent),
}

macro_rules! component_family {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        impl ComponentFamily for Component {
            type Kind = ComponentKind;

            fn kind(&self) -> ComponentKind {
                match self {
                    $(Component::$variant(_) => ComponentKind::$variant,)*
                }
            }
        }

        $(
            impl ComponentVariant<Component> for $ty {
                fn kind() -> ComponentKind {
                    ComponentKind::$variant
                }

                fn from_component(component: &Component) -> Option<&Self> {
                    match component {
                        Component::$variant(c) => Some(c),
                        _ => None,
                    }
                }

                fn from_component_mut(component: &mut Component) -> Option<&mut Self> {
                    match component {
                        Component::$variant(c) => Some(c),
                        _ => None,
                    }
                }

                fn from_owned(component: Component) -> Result<Self, Component> {
                    match component {
                        Component::$variant(c) => Ok(c),
                        other => Err(other),
                    }
                }

                fn into_component(self) -> Component {
                    Component::$variant(self)
                }
            }

            impl From<$ty> for Component {
                fn from(c: $ty) -> Self {
                    Component::$variant(c)
                }
            }
        )*
    };
}

component_family! {
    Position => PositionComponent,
    Velocity => VelocityComponent,
    Hitbox => HitboxComponent,
    Health => HealthComponent,
    Ai => AiComponent,
    Skill => SkillComponent,
    Animation => AnimationComponent,
    Playable => PlayableComponent,
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// World position. The tile an entity stands on is the floor of each axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionComponent {
    pub x: f32,
    pub y: f32,
}

impl PositionComponent {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn at(point: Point) -> Self {
        Self::new(point.x as f32, point.y as f32)
    }

    pub fn tile_point(&self) -> Point {
        Point::new(self.x.floor() as i32, self.y.floor() as i32)
    }

    pub fn distance(&self, other: &PositionComponent) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

// ---------------------------------------------------------------------------
// Velocity
// ---------------------------------------------------------------------------

/// Movement speed and the velocity requested for the current tick.
///
/// Speeds are in tiles per second. Positive current velocity moves right or
/// up, negative left or down. The velocity system consumes the current
/// velocity each tick and resets it to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityComponent {
    pub x_velocity: f32,
    pub y_velocity: f32,
    pub current_x_velocity: f32,
    pub current_y_velocity: f32,
    pub move_left_animation: Animation,
    pub move_right_animation: Animation,
}

impl VelocityComponent {
    pub fn new(
        x_velocity: f32,
        y_velocity: f32,
        move_left_animation: Animation,
        move_right_animation: Animation,
    ) -> Self {
        Self {
            x_velocity,
            y_velocity,
            current_x_velocity: 0.0,
            current_y_velocity: 0.0,
            move_left_animation,
            move_right_animation,
        }
    }

    pub fn is_moving(&self) -> bool {
        self.current_x_velocity != 0.0 || self.current_y_velocity != 0.0
    }
}

impl Default for VelocityComponent {
    fn default() -> Self {
        Self::new(
            0.0,
            0.0,
            Animation::missing_texture(),
            Animation::missing_texture(),
        )
    }
}

// ---------------------------------------------------------------------------
// Hitbox
// ---------------------------------------------------------------------------

/// An axis-aligned box relative to the entity's position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitboxComponent {
    pub offset_x: f32,
    pub offset_y: f32,
    pub width: f32,
    pub height: f32,
}

impl HitboxComponent {
    pub fn new(offset_x: f32, offset_y: f32, width: f32, height: f32) -> Self {
        Self {
            offset_x,
            offset_y,
            width,
            height,
        }
    }

    /// `(min_x, min_y, max_x, max_y)` at `position`.
    pub fn bounds(&self, position: &PositionComponent) -> (f32, f32, f32, f32) {
        let min_x = position.x + self.offset_x;
        let min_y = position.y + self.offset_y;
        (min_x, min_y, min_x + self.width, min_y + self.height)
    }

    pub fn intersects(
        &self,
        position: &PositionComponent,
        other: &HitboxComponent,
        other_position: &PositionComponent,
    ) -> bool {
        let (ax0, ay0, ax1, ay1) = self.bounds(position);
        let (bx0, by0, bx1, by1) = other.bounds(other_position);
        ax0 < bx1 && bx0 < ax1 && ay0 < by1 && by0 < ay1
    }
}

impl Default for HitboxComponent {
    fn default() -> Self {
        Self::new(0.25, 0.25, 0.5, 0.5)
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

pub struct HealthComponent {
    pub(crate) current_health: i32,
    pub(crate) maximal_health: i32,
    pub(crate) pending_damage: Vec<Damage>,
    pub(crate) last_cause: Option<EntityId>,
    pub on_death: Box<dyn OnDeath>,
    pub hit_animation: Animation,
    pub die_animation: Animation,
}

impl HealthComponent {
    pub fn new(
        maximal_health: i32,
        on_death: Box<dyn OnDeath>,
        hit_animation: Animation,
        die_animation: Animation,
    ) -> Self {
        Self {
            current_health: maximal_health,
            maximal_health,
            pending_damage: Vec::new(),
            last_cause: None,
            on_death,
            hit_animation,
            die_animation,
        }
    }

    /// Queue damage; it is applied by the next health pass.
    pub fn receive_hit(&mut self, damage: Damage) {
        self.pending_damage.push(damage);
    }

    pub fn pending_damage(&self) -> &[Damage] {
        &self.pending_damage
    }

    /// Apply all queued damage and return the total.
    pub fn apply_pending_damage(&mut self) -> i32 {
        let mut total: i32 = 0;
        for damage in self.pending_damage.drain(..) {
            total = total.saturating_add(damage.amount);
            if damage.cause.is_some() {
                self.last_cause = damage.cause;
            }
        }
        self.current_health = self.current_health.saturating_sub(total);
        total
    }

    pub fn current_health(&self) -> i32 {
        self.current_health
    }

    /// Set current health, capped at the maximum.
    pub fn set_current_health(&mut self, health: i32) {
        self.current_health = health.min(self.maximal_health);
    }

    pub fn maximal_health(&self) -> i32 {
        self.maximal_health
    }

    /// Change the maximum, lowering current health if it now exceeds it.
    pub fn set_maximal_health(&mut self, maximal_health: i32) {
        self.maximal_health = maximal_health;
        self.current_health = self.current_health.min(maximal_health);
    }

    /// The entity that dealt the most recent attributed damage.
    pub fn last_cause(&self) -> Option<EntityId> {
        self.last_cause
    }

    pub fn is_dead(&self) -> bool {
        self.current_health <= 0
    }
}

impl Default for HealthComponent {
    fn default() -> Self {
        Self::new(
            1,
            Box::new(NoOpOnDeath),
            Animation::missing_texture(),
            Animation::missing_texture(),
        )
    }
}

impl std::fmt::Debug for HealthComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthComponent")
            .field("current_health", &self.current_health)
            .field("maximal_health", &self.maximal_health)
            .field("pending_damage", &self.pending_damage.len())
            .field("on_death", &self.on_death)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// AI
// ---------------------------------------------------------------------------

/// Fight and idle strategies plus the predicate choosing between them.
#[derive(Debug)]
pub struct AiComponent {
    pub fight: Box<dyn FightBehavior>,
    pub idle: Box<dyn IdleBehavior>,
    pub transition: Box<dyn Transition>,
}

impl AiComponent {
    pub fn new(
        fight: Box<dyn FightBehavior>,
        idle: Box<dyn IdleBehavior>,
        transition: Box<dyn Transition>,
    ) -> Self {
        Self {
            fight,
            idle,
            transition,
        }
    }
}

impl Default for AiComponent {
    fn default() -> Self {
        Self::new(
            Box::new(CollideAi::new(2.0)),
            Box::new(RadiusWalk::new(5.0, 2)),
            Box::new(RangeTransition::new(5.0)),
        )
    }
}

// ---------------------------------------------------------------------------
// Skills
// ---------------------------------------------------------------------------

/// Skills in the order they were added.
#[derive(Debug, Default)]
pub struct SkillComponent {
    pub(crate) skills: Vec<Skill>,
}

impl SkillComponent {
    pub fn new(skills: Vec<Skill>) -> Self {
        Self { skills }
    }

    pub fn add_skill(&mut self, skill: Skill) {
        self.skills.push(skill);
    }

    pub fn skills(&self) -> &[Skill] {
        &self.skills
    }

    pub fn skills_mut(&mut self) -> &mut [Skill] {
        &mut self.skills
    }
}

// ---------------------------------------------------------------------------
// Animation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    #[default]
    Left,
    Right,
}

/// Idle animations plus whatever is playing now.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationComponent {
    pub idle_left: Animation,
    pub idle_right: Animation,
    pub(crate) current: Animation,
    pub(crate) facing: Facing,
}

impl AnimationComponent {
    /// Starts facing left, playing `idle_left`.
    pub fn new(idle_left: Animation, idle_right: Animation) -> Self {
        Self {
            current: idle_left.clone(),
            idle_left,
            idle_right,
            facing: Facing::Left,
        }
    }

    pub fn current(&self) -> &Animation {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut Animation {
        &mut self.current
    }

    pub fn set_current(&mut self, animation: Animation) {
        self.current = animation;
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    /// Turn to `facing` and start `animation`. Does nothing, and keeps the
    /// running animation, if already facing that way.
    pub fn face(&mut self, facing: Facing, animation: &Animation) -> bool {
        if self.facing == facing {
            return false;
        }
        self.facing = facing;
        self.current = animation.clone();
        true
    }
}

impl Default for AnimationComponent {
    fn default() -> Self {
        Self::new(Animation::missing_texture(), Animation::missing_texture())
    }
}

// ---------------------------------------------------------------------------
// Playable
// ---------------------------------------------------------------------------

/// Marks the hero. AI strategies chase the first playable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayableComponent {
    pub playable: bool,
}

impl Default for PlayableComponent {
    fn default() -> Self {
        Self { playable: true }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::DamageType;

    #[test]
    fn tile_point_floors_negative_coordinates() {
        assert_eq!(PositionComponent::new(2.9, 0.1).tile_point(), Point::new(2, 0));
        assert_eq!(PositionComponent::new(-0.5, 3.0).tile_point(), Point::new(-1, 3));
    }

    #[test]
    fn hitboxes_intersect_only_when_overlapping() {
        let hitbox = HitboxComponent::default();
        let a = PositionComponent::new(0.0, 0.0);
        let near = PositionComponent::new(0.4, 0.0);
        let far = PositionComponent::new(0.5, 0.0);
        assert!(hitbox.intersects(&a, &hitbox, &near));
        assert!(!hitbox.intersects(&a, &hitbox, &far));
    }

    #[test]
    fn pending_damage_applies_in_one_step() {
        let mut health = HealthComponent::default();
        health.set_maximal_health(10);
        health.set_current_health(10);
        let attacker = EntityId::new(4, 0);

        health.receive_hit(Damage::new(3, DamageType::Physical, None));
        health.receive_hit(Damage::new(4, DamageType::Fire, Some(attacker)));
        assert_eq!(health.current_health(), 10);

        assert_eq!(health.apply_pending_damage(), 7);
        assert_eq!(health.current_health(), 3);
        assert_eq!(health.last_cause(), Some(attacker));
        assert!(health.pending_damage().is_empty());
    }

    #[test]
    fn huge_damage_saturates_instead_of_wrapping() {
        let mut health = HealthComponent::default();
        health.receive_hit(Damage::new(i32::MAX, DamageType::Physical, None));
        health.receive_hit(Damage::new(i32::MAX, DamageType::Magic, None));

        assert_eq!(health.apply_pending_damage(), i32::MAX);
        assert!(health.current_health() <= 0);
    }

    #[test]
    fn current_health_is_capped_by_maximum() {
        let mut health = HealthComponent::default();
        health.set_maximal_health(5);
        health.set_current_health(50);
        assert_eq!(health.current_health(), 5);
        health.set_maximal_health(2);
        assert_eq!(health.current_health(), 2);
    }

    #[test]
    fn facing_change_swaps_animation_once() {
        let left = Animation::new(vec!["left.png".into()], 5).unwrap();
        let right = Animation::new(vec!["right.png".into()], 5).unwrap();
        let mut anim = AnimationComponent::new(left.clone(), right.clone());

        assert!(!anim.face(Facing::Left, &left));
        assert!(anim.face(Facing::Right, &right));
        assert_eq!(anim.current().current_frame_path(), "right.png");
        assert!(!anim.face(Facing::Right, &right));
    }

    #[test]
    fn typed_access_through_registry() {
        let mut registry = Registry::new();
        let e = registry.spawn([
            Component::from(PositionComponent::new(1.0, 2.0)),
            PlayableComponent::default().into(),
        ]);
        assert_eq!(registry.get::<PositionComponent>(e).unwrap().x, 1.0);
        assert!(registry.get::<VelocityComponent>(e).is_none());
        assert!(registry.entity(e).unwrap().has(ComponentKind::Playable));
    }
}
