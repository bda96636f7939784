//! Dense entity set with O(1) insert, erase and membership.
//!
//! Used for each system's matched entity set and for the living-entity list.
//! Iteration walks a contiguous `Vec<Entity>`; order is insertion order until
//! an erase swaps the last entity into the freed position.

use crate::entity::Entity;

/// A sparse/dense set of [`Entity`] ids.
#[derive(Debug, Clone, Default)]
pub struct SparseSet {
    /// Packed members.
    dense: Vec<Entity>,
    /// Entity index -> position in `dense`.
    sparse: Vec<Option<u32>>,
}

impl SparseSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            dense: Vec::new(),
            sparse: Vec::new(),
        }
    }

    /// Insert `entity`. Returns `false` if it was already present.
    pub fn insert(&mut self, entity: Entity) -> bool {
        if self.contains(entity) {
            return false;
        }
        let idx = entity.index();
        if idx >= self.sparse.len() {
            self.sparse.resize(idx + 1, None);
        }
        self.sparse[idx] = Some(self.dense.len() as u32);
        self.dense.push(entity);
        true
    }

    /// Remove `entity`. Returns `false` if it was not present.
    pub fn remove(&mut self, entity: Entity) -> bool {
        let Some(pos) = self.position(entity) else {
            return false;
        };
        self.dense.swap_remove(pos);
        if let Some(&moved) = self.dense.get(pos) {
            self.sparse[moved.index()] = Some(pos as u32);
        }
        self.sparse[entity.index()] = None;
        true
    }

    /// Whether `entity` is a member.
    #[inline]
    pub fn contains(&self, entity: Entity) -> bool {
        self.position(entity).is_some()
    }

    #[inline]
    fn position(&self, entity: Entity) -> Option<usize> {
        self.sparse
            .get(entity.index())
            .copied()
            .flatten()
            .map(|p| p as usize)
    }

    /// Members as a contiguous slice.
    #[inline]
    pub fn as_slice(&self) -> &[Entity] {
        &self.dense
    }

    /// Iterate members.
    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.dense.iter()
    }

    /// Number of members.
    #[inline]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Whether the set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Replace the member order with `order`, which must hold exactly the
    /// current members.
    pub(crate) fn reorder(&mut self, order: Vec<Entity>) {
        debug_assert_eq!(order.len(), self.dense.len());
        for (pos, entity) in order.iter().enumerate() {
            self.sparse[entity.index()] = Some(pos as u32);
        }
        self.dense = order;
    }

    /// Remove every member.
    pub fn clear(&mut self) {
        self.dense.clear();
        self.sparse.clear();
    }
}

impl<'a> IntoIterator for &'a SparseSet {
    type Item = &'a Entity;
    type IntoIter = std::slice::Iter<'a, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
