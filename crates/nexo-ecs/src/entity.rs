//! Entity identifiers and the entity manager.
//!
//! An [`Entity`] is a plain 32-bit id. Ids are unique among living entities
//! but are recycled after destruction, so a stale id may alias a newer entity.
//! The [`EntityManager`] owns the recycle pool, the living set, and the
//! per-entity [`Signature`].

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::signature::Signature;
use crate::sparse_set::SparseSet;
use crate::EcsError;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// Opaque entity identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity(u32);

impl Entity {
    /// Construct an entity from a raw id.
    #[inline]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw `u32` representation.
    #[inline]
    pub fn id(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EntityManager
// ---------------------------------------------------------------------------

/// Issues and recycles [`Entity`] ids and stores their signatures.
///
/// Destroyed ids go to the back of a FIFO queue and are reissued from the
/// front, so the least recently destroyed id is reused first.
#[derive(Debug)]
pub struct EntityManager {
    /// Upper bound on simultaneously living entities.
    max_entities: u32,
    /// Next never-issued id.
    next_id: u32,
    /// Recycle pool (FIFO).
    available: VecDeque<Entity>,
    /// Currently living entities.
    living: SparseSet,
    /// Indexed by entity id. Entries for dead ids are always empty.
    signatures: Vec<Signature>,
}

impl EntityManager {
    /// Create a manager that allows at most `max_entities` living entities.
    pub fn new(max_entities: u32) -> Self {
        Self {
            max_entities,
            next_id: 0,
            available: VecDeque::new(),
            living: SparseSet::new(),
            signatures: Vec::new(),
        }
    }

    /// Create a new entity with an empty signature.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::TooManyEntities`] if `max_entities` are alive.
    pub fn create_entity(&mut self) -> Result<Entity, EcsError> {
        if self.living.len() >= self.max_entities as usize {
            return Err(EcsError::TooManyEntities {
                max: self.max_entities,
            });
        }
        let entity = match self.available.pop_front() {
            Some(recycled) => recycled,
            None => {
                let fresh = Entity(self.next_id);
                self.next_id += 1;
                self.signatures.push(Signature::EMPTY);
                fresh
            }
        };
        self.living.insert(entity);
        Ok(entity)
    }

    /// Destroy `entity`, clearing its signature and recycling its id.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotAlive`] if `entity` is not living.
    pub fn destroy_entity(&mut self, entity: Entity) -> Result<(), EcsError> {
        if !self.living.remove(entity) {
            return Err(EcsError::EntityNotAlive { entity });
        }
        self.signatures[entity.index()] = Signature::EMPTY;
        self.available.push_back(entity);
        Ok(())
    }

    /// The signature of a living entity.
    pub fn signature(&self, entity: Entity) -> Result<Signature, EcsError> {
        self.ensure_alive(entity)?;
        Ok(self.signatures[entity.index()])
    }

    /// Replace the signature of a living entity.
    pub fn set_signature(&mut self, entity: Entity, signature: Signature) -> Result<(), EcsError> {
        self.ensure_alive(entity)?;
        self.signatures[entity.index()] = signature;
        Ok(())
    }

    /// Whether `entity` is currently living.
    #[inline]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.living.contains(entity)
    }

    /// Fails with [`EcsError::EntityNotAlive`] unless `entity` is living.
    #[inline]
    pub fn ensure_alive(&self, entity: Entity) -> Result<(), EcsError> {
        if self.is_alive(entity) {
            Ok(())
        } else {
            Err(EcsError::EntityNotAlive { entity })
        }
    }

    /// Number of living entities.
    #[inline]
    pub fn living_count(&self) -> usize {
        self.living.len()
    }

    /// All living entities, in no particular order.
    #[inline]
    pub fn living_entities(&self) -> &[Entity] {
        self.living.as_slice()
    }

    /// Configured living-entity limit.
    pub fn max_entities(&self) -> u32 {
        self.max_entities
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
