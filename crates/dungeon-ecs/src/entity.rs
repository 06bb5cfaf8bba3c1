//! Entity handles, allocation, and per-entity component storage.
//!
//! An [`EntityId`] packs a *generation* counter in the high 32 bits and an
//! *index* in the low 32 bits. Recycling an index bumps its generation, so a
//! handle held by a component or a saved document can never silently alias a
//! newer entity.
//!
//! An [`Entity`] owns at most one component per kind. Components reach their
//! owner only through the entity's [`EntityId`]; nothing in a component keeps
//! an entity alive.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::component::{ComponentFamily, ComponentVariant};
use crate::EcsError;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// A generational entity handle.
///
/// Layout: `[generation: u32 | index: u32]`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Construct an `EntityId` from an index and generation.
    #[inline]
    pub fn new(index: u32, generation: u32) -> Self {
        Self((generation as u64) << 32 | index as u64)
    }

    /// The index portion (low 32 bits).
    #[inline]
    pub fn index(self) -> u32 {
        self.0 as u32
    }

    /// The generation portion (high 32 bits).
    #[inline]
    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Raw `u64` representation, as written into save documents.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    /// Reconstruct from a raw `u64`.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}v{})", self.index(), self.generation())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

/// Hands out [`EntityId`]s and recycles freed indices with a bumped generation.
///
/// Free indices are reused in FIFO order so a single hot slot does not burn
/// through its generation counter.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free_indices: VecDeque<u32>,
}

impl EntityAllocator {
    /// Create a new, empty allocator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh [`EntityId`], recycling a freed index when possible.
    pub fn allocate(&mut self) -> EntityId {
        if let Some(index) = self.free_indices.pop_front() {
            // Generation was already bumped when the slot was freed.
            self.alive[index as usize] = true;
            EntityId::new(index, self.generations[index as usize])
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            self.alive.push(true);
            EntityId::new(index, 0)
        }
    }

    /// Free `id`, invalidating every outstanding copy of it.
    ///
    /// Returns `false` if `id` was already dead or stale.
    pub fn deallocate(&mut self, id: EntityId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        let idx = id.index() as usize;
        self.alive[idx] = false;
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.free_indices.push_back(id.index());
        true
    }

    /// Whether `id` is allocated and its generation is current.
    pub fn is_alive(&self, id: EntityId) -> bool {
        let idx = id.index() as usize;
        idx < self.generations.len() && self.alive[idx] && self.generations[idx] == id.generation()
    }

    /// Number of allocated ids.
    pub fn alive_count(&self) -> usize {
        self.alive.iter().filter(|&&a| a).count()
    }

    /// Capture `(generations, alive, free_indices)` for a save document.
    pub fn snapshot_state(&self) -> (Vec<u32>, Vec<bool>, Vec<u32>) {
        let free: Vec<u32> = self.free_indices.iter().copied().collect();
        (self.generations.clone(), self.alive.clone(), free)
    }

    /// Rebuild an allocator from previously captured state.
    ///
    /// The caller is responsible for validating the vectors; see
    /// [`EntityRegistry::restore`](crate::registry::EntityRegistry::restore).
    pub fn restore_from_snapshot(
        generations: Vec<u32>,
        alive: Vec<bool>,
        free_indices: Vec<u32>,
    ) -> Self {
        Self {
            generations,
            alive,
            free_indices: VecDeque::from(free_indices),
        }
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// An identity plus its components, keyed by kind.
pub struct Entity<C: ComponentFamily> {
    id: EntityId,
    components: BTreeMap<C::Kind, C>,
}

impl<C: ComponentFamily> Entity<C> {
    /// An entity with no components.
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            components: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Attach `component`, returning the previous component of the same kind.
    pub fn insert(&mut self, component: C) -> Option<C> {
        self.components.insert(component.kind(), component)
    }

    /// Detach the component of `kind`.
    pub fn remove(&mut self, kind: C::Kind) -> Option<C> {
        self.components.remove(&kind)
    }

    pub fn has(&self, kind: C::Kind) -> bool {
        self.components.contains_key(&kind)
    }

    /// Whether every kind in `kinds` is attached.
    pub fn has_all(&self, kinds: &[C::Kind]) -> bool {
        kinds.iter().all(|kind| self.components.contains_key(kind))
    }

    /// Typed read access; `None` if the component is absent.
    pub fn get<T: ComponentVariant<C>>(&self) -> Option<&T> {
        self.components
            .get(&T::kind())
            .and_then(T::from_component)
    }

    /// Typed write access; `None` if the component is absent.
    pub fn get_mut<T: ComponentVariant<C>>(&mut self) -> Option<&mut T> {
        self.components
            .get_mut(&T::kind())
            .and_then(T::from_component_mut)
    }

    /// Typed read access that treats absence as an error.
    pub fn require<T: ComponentVariant<C>>(&self) -> Result<&T, EcsError> {
        let id = self.id;
        self.get::<T>().ok_or_else(|| EcsError::MissingComponent {
            entity: id,
            kind: format!("{:?}", T::kind()),
        })
    }

    /// Typed write access that treats absence as an error.
    pub fn require_mut<T: ComponentVariant<C>>(&mut self) -> Result<&mut T, EcsError> {
        let id = self.id;
        self.get_mut::<T>().ok_or_else(|| EcsError::MissingComponent {
            entity: id,
            kind: format!("{:?}", T::kind()),
        })
    }

    /// Detach and return the typed component.
    pub fn take<T: ComponentVariant<C>>(&mut self) -> Option<T> {
        let component = self.components.remove(&T::kind())?;
        match T::from_owned(component) {
            Ok(typed) => Some(typed),
            Err(component) => {
                // Kind said T but the variant disagreed; put it back untouched.
                self.components.insert(component.kind(), component);
                None
            }
        }
    }

    /// Attached components in kind order.
    pub fn components(&self) -> impl Iterator<Item = &C> {
        self.components.values()
    }

    /// Attached kinds in order.
    pub fn kinds(&self) -> impl Iterator<Item = C::Kind> + '_ {
        self.components.keys().copied()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}

impl<C: ComponentFamily> fmt::Debug for Entity<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("kinds", &self.components.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
