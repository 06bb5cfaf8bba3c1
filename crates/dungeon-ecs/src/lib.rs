//! Dungeon ECS -- entity registry with frame-deferred structural changes.
//!
//! Entities own at most one component per kind from a closed, game-defined
//! component family. The [`EntityRegistry`](registry::EntityRegistry) buffers
//! additions and removals so that systems can create and destroy entities
//! while iterating; the buffered changes are applied once per tick by
//! [`begin_frame`](registry::EntityRegistry::begin_frame).
//!
//! # Quick Start
//!
//! ```
//! use dungeon_ecs::prelude::*;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
//! enum Kind { Position, Velocity }
//!
//! #[derive(Debug)]
//! enum Component { Position(f32, f32), Velocity(f32, f32) }
//!
//! impl ComponentFamily for Component {
//!     type Kind = Kind;
//!     fn kind(&self) -> Kind {
//!         match self {
//!             Component::Position(..) => Kind::Position,
//!             Component::Velocity(..) => Kind::Velocity,
//!         }
//!     }
//! }
//!
//! let mut registry = EntityRegistry::new();
//! let mover = registry.spawn([Component::Position(0.0, 0.0), Component::Velocity(1.0, 0.0)]);
//! registry.spawn([Component::Position(5.0, 5.0)]);
//! registry.begin_frame();
//!
//! let moving = registry.ids_with(&[Kind::Position, Kind::Velocity]);
//! assert_eq!(moving, vec![mover]);
//! ```

#![deny(unsafe_code)]

pub mod component;
pub mod entity;
pub mod query;
pub mod registry;
pub mod snapshot;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by registry operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// The entity does not exist (destroyed, stale generation, or never allocated).
    #[error("entity {entity:?} does not exist (stale or never allocated)")]
    StaleEntity { entity: entity::EntityId },

    /// An accessor required a component the entity does not carry.
    #[error("entity {entity:?} has no {kind} component")]
    MissingComponent {
        entity: entity::EntityId,
        kind: String,
    },

    /// A registry layout could not be restored.
    #[error("invalid registry snapshot: {details}")]
    InvalidSnapshot { details: String },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::component::{ComponentFamily, ComponentVariant};
    pub use crate::entity::{Entity, EntityAllocator, EntityId};
    pub use crate::query::EntitiesWith;
    pub use crate::registry::{EntityRegistry, FrameReport};
    pub use crate::snapshot::{AllocatorSnapshot, RegistryLayout};
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
