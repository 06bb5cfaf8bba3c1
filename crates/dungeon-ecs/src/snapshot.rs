//! Registry layout capture and validated restore.
//!
//! A [`RegistryLayout`] records everything about a registry except component
//! payloads: allocator generations, the free list, and the pending queues.
//! Component data is encoded by the game, which owns the component family.
//! [`EntityRegistry::restore`] then rebuilds a registry from a layout plus
//! already-decoded entities, keeping every entity id exactly as saved.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::component::ComponentFamily;
use crate::entity::{Entity, EntityAllocator, EntityId};
use crate::registry::EntityRegistry;
use crate::EcsError;

// ---------------------------------------------------------------------------
// Snapshot types
// ---------------------------------------------------------------------------

/// Serializable [`EntityAllocator`] state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatorSnapshot {
    /// Per-index generation counters.
    pub generations: Vec<u32>,
    /// Per-index alive flags.
    pub alive: Vec<bool>,
    /// Free-list indices in FIFO order.
    pub free_indices: Vec<u32>,
}

/// Registry structure without component payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryLayout {
    pub allocator: AllocatorSnapshot,
    /// Entities created since the last frame boundary.
    pub pending_add: Vec<EntityId>,
    /// Entities queued for removal at the next frame boundary.
    pub pending_remove: Vec<EntityId>,
}

fn invalid(details: String) -> EcsError {
    EcsError::InvalidSnapshot { details }
}

// ---------------------------------------------------------------------------
// Capture / restore
// ---------------------------------------------------------------------------

impl<C: ComponentFamily> EntityRegistry<C> {
    /// Capture the registry structure.
    pub fn layout(&self) -> RegistryLayout {
        let (generations, alive, free_indices) = self.allocator.snapshot_state();
        RegistryLayout {
            allocator: AllocatorSnapshot {
                generations,
                alive,
                free_indices,
            },
            pending_add: self.pending_add.iter().copied().collect(),
            pending_remove: self.pending_remove.iter().copied().collect(),
        }
    }

    /// Build a new registry from a layout and its decoded entities.
    ///
    /// Nothing is mutated on failure; callers swap the result in only once
    /// every entity has decoded.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidSnapshot`] if the allocator state is inconsistent,
    /// if allocated slots and `entities` do not correspond one-to-one, or if a
    /// pending queue names an entity that is not present.
    pub fn restore(layout: RegistryLayout, entities: Vec<Entity<C>>) -> Result<Self, EcsError> {
        let alloc = &layout.allocator;

        if alloc.generations.len() != alloc.alive.len() {
            return Err(invalid(format!(
                "allocator inconsistent: {} generations vs {} alive flags",
                alloc.generations.len(),
                alloc.alive.len()
            )));
        }

        let mut seen_free = HashSet::new();
        for &free_idx in &alloc.free_indices {
            let slot = free_idx as usize;
            if slot >= alloc.alive.len() {
                return Err(invalid(format!(
                    "free index {free_idx} out of bounds ({} slots)",
                    alloc.alive.len()
                )));
            }
            if alloc.alive[slot] {
                return Err(invalid(format!("free list contains live index {free_idx}")));
            }
            if !seen_free.insert(free_idx) {
                return Err(invalid(format!("free list contains duplicate index {free_idx}")));
            }
        }

        let mut by_id: HashMap<EntityId, Entity<C>> = HashMap::with_capacity(entities.len());
        for entity in entities {
            let id = entity.id();
            let slot = id.index() as usize;
            if slot >= alloc.alive.len() || !alloc.alive[slot] {
                return Err(invalid(format!("entity {id} occupies a slot marked dead")));
            }
            if alloc.generations[slot] != id.generation() {
                return Err(invalid(format!(
                    "entity {id} has generation {} but slot holds {}",
                    id.generation(),
                    alloc.generations[slot]
                )));
            }
            if by_id.insert(id, entity).is_some() {
                return Err(invalid(format!("entity {id} appears twice")));
            }
        }

        let alive_slots = alloc.alive.iter().filter(|&&a| a).count();
        if alive_slots != by_id.len() {
            return Err(invalid(format!(
                "{alive_slots} allocated slots but {} entities",
                by_id.len()
            )));
        }

        for id in layout.pending_add.iter().chain(&layout.pending_remove) {
            if !by_id.contains_key(id) {
                return Err(invalid(format!("pending queue names unknown entity {id}")));
            }
        }

        let pending_add: BTreeSet<EntityId> = layout.pending_add.into_iter().collect();
        let pending_remove: BTreeSet<EntityId> = layout.pending_remove.into_iter().collect();
        let live: BTreeSet<EntityId> = by_id
            .keys()
            .filter(|id| !pending_add.contains(id))
            .copied()
            .collect();

        Ok(Self {
            allocator: EntityAllocator::restore_from_snapshot(
                layout.allocator.generations,
                layout.allocator.alive,
                layout.allocator.free_indices,
            ),
            entities: by_id,
            live,
            pending_add,
            pending_remove,
        })
    }
}
