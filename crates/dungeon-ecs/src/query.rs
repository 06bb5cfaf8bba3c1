//! Lazy queries over live entities by component kind.
//!
//! [`EntityRegistry::entities_with`] yields every live entity carrying all of
//! the requested kinds. The iterator borrows the registry, so systems that
//! need to mutate collect the ids first:
//!
//! ```
//! use dungeon_ecs::prelude::*;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
//! enum Kind { Tag }
//!
//! #[derive(Debug)]
//! enum Component { Tag }
//!
//! impl ComponentFamily for Component {
//!     type Kind = Kind;
//!     fn kind(&self) -> Kind { Kind::Tag }
//! }
//!
//! let mut registry = EntityRegistry::<Component>::new();
//! let id = registry.spawn([Component::Tag]);
//! assert_eq!(registry.entities_with(&[Kind::Tag]).count(), 0);
//!
//! registry.begin_frame();
//! let ids: Vec<EntityId> = registry.entities_with(&[Kind::Tag]).map(|e| e.id()).collect();
//! assert_eq!(ids, vec![id]);
//! ```

use std::collections::btree_set;

use crate::component::ComponentFamily;
use crate::entity::{Entity, EntityId};
use crate::registry::EntityRegistry;

/// Iterator over live entities that carry every requested kind.
///
/// Cloning (or calling [`restart`](Self::restart)) gives an independent pass
/// over the live set as it is when the clone is made.
pub struct EntitiesWith<'r, 'q, C: ComponentFamily> {
    registry: &'r EntityRegistry<C>,
    kinds: &'q [C::Kind],
    live: btree_set::Iter<'r, EntityId>,
}

impl<'r, 'q, C: ComponentFamily> EntitiesWith<'r, 'q, C> {
    /// A fresh pass from the first live entity.
    pub fn restart(&self) -> Self {
        Self {
            registry: self.registry,
            kinds: self.kinds,
            live: self.registry.live.iter(),
        }
    }
}

impl<'r, 'q, C: ComponentFamily> Clone for EntitiesWith<'r, 'q, C> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry,
            kinds: self.kinds,
            live: self.live.clone(),
        }
    }
}

impl<'r, 'q, C: ComponentFamily> Iterator for EntitiesWith<'r, 'q, C> {
    type Item = &'r Entity<C>;

    fn next(&mut self) -> Option<Self::Item> {
        for id in self.live.by_ref() {
            if let Some(entity) = self.registry.entities.get(id) {
                if entity.has_all(self.kinds) {
                    return Some(entity);
                }
            }
        }
        None
    }
}

impl<C: ComponentFamily> EntityRegistry<C> {
    /// Live entities carrying every kind in `kinds`, in id order.
    ///
    /// An empty `kinds` slice matches every live entity.
    pub fn entities_with<'r, 'q>(&'r self, kinds: &'q [C::Kind]) -> EntitiesWith<'r, 'q, C> {
        EntitiesWith {
            registry: self,
            kinds,
            live: self.live.iter(),
        }
    }

    /// Ids of [`entities_with`](Self::entities_with), collected so the caller
    /// can mutate the registry while walking them.
    pub fn ids_with(&self, kinds: &[C::Kind]) -> Vec<EntityId> {
        self.entities_with(kinds).map(Entity::id).collect()
    }

    /// Every live id in order.
    pub fn live_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.live.iter().copied()
    }
}
