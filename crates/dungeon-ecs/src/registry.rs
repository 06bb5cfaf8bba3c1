//! The entity registry: live entities plus deferred add/remove queues.
//!
//! Structural changes never take effect while a system is iterating:
//!
//! - [`create_entity`](EntityRegistry::create_entity) allocates an id and
//!   queues the entity for addition. It is reachable by id immediately (so
//!   components can be attached) but invisible to queries until the next
//!   [`begin_frame`](EntityRegistry::begin_frame).
//! - [`remove_entity`](EntityRegistry::remove_entity) queues a removal. The
//!   entity stays visible for the rest of the current frame and is dropped,
//!   together with its components, at the next `begin_frame`.
//!
//! `begin_frame` must run exactly once per tick before any system.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, trace};

use crate::component::{ComponentFamily, ComponentVariant};
use crate::entity::{Entity, EntityAllocator, EntityId};
use crate::EcsError;

// ---------------------------------------------------------------------------
// FrameReport
// ---------------------------------------------------------------------------

/// What the last [`EntityRegistry::begin_frame`] applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Entities that became live.
    pub added: usize,
    /// Entities that were destroyed.
    pub removed: usize,
}

// ---------------------------------------------------------------------------
// EntityRegistry
// ---------------------------------------------------------------------------

/// Owns every entity and decides which of them systems can see.
pub struct EntityRegistry<C: ComponentFamily> {
    pub(crate) allocator: EntityAllocator,
    /// Every allocated entity: live ones and those waiting to be added.
    pub(crate) entities: HashMap<EntityId, Entity<C>>,
    /// Entities visible to queries. Ordered so iteration is deterministic.
    pub(crate) live: BTreeSet<EntityId>,
    pub(crate) pending_add: BTreeSet<EntityId>,
    pub(crate) pending_remove: BTreeSet<EntityId>,
}

impl<C: ComponentFamily> EntityRegistry<C> {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            allocator: EntityAllocator::new(),
            entities: HashMap::new(),
            live: BTreeSet::new(),
            pending_add: BTreeSet::new(),
            pending_remove: BTreeSet::new(),
        }
    }

    // -- structural changes -------------------------------------------------

    /// Create an empty entity and queue it for addition.
    pub fn create_entity(&mut self) -> EntityId {
        let id = self.allocator.allocate();
        self.entities.insert(id, Entity::new(id));
        self.pending_add.insert(id);
        trace!(entity = %id, "entity queued for addition");
        id
    }

    /// Create an entity with `components` attached and queue it for addition.
    pub fn spawn(&mut self, components: impl IntoIterator<Item = C>) -> EntityId {
        let id = self.create_entity();
        if let Some(entity) = self.entities.get_mut(&id) {
            for component in components {
                entity.insert(component);
            }
        }
        id
    }

    /// Queue `id` for removal at the next frame boundary.
    ///
    /// Returns `false` (and does nothing) if the entity does not exist or is
    /// already queued for removal.
    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        if !self.entities.contains_key(&id) {
            debug!(entity = %id, "remove_entity on unknown entity ignored");
            return false;
        }
        let queued = self.pending_remove.insert(id);
        if queued {
            trace!(entity = %id, "entity queued for removal");
        }
        queued
    }

    /// Apply queued additions and removals, then clear both queues.
    ///
    /// An entity queued for both addition and removal is destroyed without
    /// ever becoming live.
    pub fn begin_frame(&mut self) -> FrameReport {
        let mut report = FrameReport::default();

        for id in std::mem::take(&mut self.pending_add) {
            if self.pending_remove.contains(&id) {
                continue;
            }
            if self.live.insert(id) {
                report.added += 1;
            }
        }

        for id in std::mem::take(&mut self.pending_remove) {
            self.live.remove(&id);
            if self.entities.remove(&id).is_some() {
                self.allocator.deallocate(id);
                report.removed += 1;
            }
        }

        if report.added > 0 || report.removed > 0 {
            debug!(
                added = report.added,
                removed = report.removed,
                live = self.live.len(),
                "frame boundary applied"
            );
        }
        report
    }

    // -- state queries ------------------------------------------------------

    /// Whether `id` is visible to queries this frame.
    pub fn is_live(&self, id: EntityId) -> bool {
        self.live.contains(&id)
    }

    pub fn is_pending_add(&self, id: EntityId) -> bool {
        self.pending_add.contains(&id)
    }

    pub fn is_pending_remove(&self, id: EntityId) -> bool {
        self.pending_remove.contains(&id)
    }

    /// Whether `id` exists at all (live or waiting to be added).
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Number of entities visible to queries.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Number of existing entities, including pending additions.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Every existing entity in id order, live or pending.
    pub fn entities(&self) -> Vec<&Entity<C>> {
        let mut all: Vec<&Entity<C>> = self.entities.values().collect();
        all.sort_by_key(|e| e.id());
        all
    }

    // -- component access ---------------------------------------------------

    pub fn entity(&self, id: EntityId) -> Option<&Entity<C>> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity<C>> {
        self.entities.get_mut(&id)
    }

    pub fn get<T: ComponentVariant<C>>(&self, id: EntityId) -> Option<&T> {
        self.entities.get(&id).and_then(Entity::get::<T>)
    }

    pub fn get_mut<T: ComponentVariant<C>>(&mut self, id: EntityId) -> Option<&mut T> {
        self.entities.get_mut(&id).and_then(Entity::get_mut::<T>)
    }

    /// Typed access that fails loudly for a missing entity or component.
    pub fn require<T: ComponentVariant<C>>(&self, id: EntityId) -> Result<&T, EcsError> {
        self.entities
            .get(&id)
            .ok_or(EcsError::StaleEntity { entity: id })?
            .require::<T>()
    }

    /// Attach a component, replacing any existing one of the same kind.
    pub fn insert_component(&mut self, id: EntityId, component: C) -> Result<Option<C>, EcsError> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(EcsError::StaleEntity { entity: id })?;
        Ok(entity.insert(component))
    }

    pub fn remove_component(&mut self, id: EntityId, kind: C::Kind) -> Result<Option<C>, EcsError> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(EcsError::StaleEntity { entity: id })?;
        Ok(entity.remove(kind))
    }

    /// Run `f` with component `T` detached from entity `id`.
    ///
    /// Lets logic stored inside a component (AI strategies, death handlers,
    /// skill effects) mutate the registry, including the owning entity. While
    /// `f` runs the entity does not carry `T`. Afterwards the detached
    /// component is re-attached and replaces anything `f` attached under the
    /// same kind.
    ///
    /// Returns `None` if the entity or the component does not exist.
    pub fn with_detached<T, R>(
        &mut self,
        id: EntityId,
        f: impl FnOnce(&mut Self, &mut T) -> R,
    ) -> Option<R>
    where
        T: ComponentVariant<C>,
    {
        let mut component = self.entities.get_mut(&id)?.take::<T>()?;
        let result = f(self, &mut component);
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.insert(component.into_component());
        }
        Some(result)
    }
}

impl<C: ComponentFamily> Default for EntityRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ComponentFamily> std::fmt::Debug for EntityRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("entities", &self.entities.len())
            .field("live", &self.live.len())
            .field("pending_add", &self.pending_add.len())
            .field("pending_remove", &self.pending_remove.len())
            .finish()
    }
}
