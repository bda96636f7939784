//! Component types and dense per-type storage.
//!
//! Every component type gets one [`ComponentArray`]: a packed `Vec<T>` with a
//! parallel `Vec<Entity>` (slot -> entity) and a sparse entity -> slot map.
//! Removal swaps the last element into the freed slot, so storage never has
//! gaps and iteration is a linear scan.

use std::any::TypeId;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::entity::Entity;
use crate::signature::ComponentType;

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// Marker for types that can be stored as components.
///
/// Implemented for every `Clone + Serialize + DeserializeOwned + 'static`
/// type. `Clone` backs entity duplication; serde backs the type-erased
/// save/restore operations.
pub trait Component: Clone + Serialize + DeserializeOwned + 'static {}

impl<T> Component for T where T: Clone + Serialize + DeserializeOwned + 'static {}

// ---------------------------------------------------------------------------
// ComponentInfo
// ---------------------------------------------------------------------------

/// Metadata about a registered component type.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    /// Index assigned at registration time.
    pub component_type: ComponentType,
    /// Name supplied at registration (defaults to the Rust type name).
    pub name: String,
    /// `std::any::type_name::<T>()`
    pub type_name: &'static str,
    /// Rust `TypeId` for runtime type checking.
    pub type_id: TypeId,
    /// `std::mem::size_of::<T>()`
    pub size: usize,
    /// `std::mem::align_of::<T>()`
    pub align: usize,
}

impl ComponentInfo {
    pub(crate) fn of<T: 'static>(component_type: ComponentType, name: &str) -> Self {
        Self {
            component_type,
            name: name.to_owned(),
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
            size: std::mem::size_of::<T>(),
            align: std::mem::align_of::<T>(),
        }
    }
}

// ---------------------------------------------------------------------------
// ComponentArray
// ---------------------------------------------------------------------------

/// Densely packed storage for every instance of one component type.
pub struct ComponentArray<T> {
    /// Component values, packed.
    components: Vec<T>,
    /// Slot -> owning entity. Always the same length as `components`.
    dense: Vec<Entity>,
    /// Entity index -> slot.
    sparse: Vec<Option<u32>>,
}

impl<T> ComponentArray<T> {
    /// Create an empty array.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty array with room for `capacity` components.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            components: Vec::with_capacity(capacity),
            dense: Vec::with_capacity(capacity),
            sparse: Vec::with_capacity(capacity),
        }
    }

    /// Store `value` for `entity` in a new slot at the end of the array.
    ///
    /// Returns the value back if `entity` already owns a component here; the
    /// stored value is left untouched.
    pub fn insert(&mut self, entity: Entity, value: T) -> Result<(), T> {
        if self.contains(entity) {
            return Err(value);
        }
        let idx = entity.index();
        if idx >= self.sparse.len() {
            self.sparse.resize(idx + 1, None);
        }
        self.sparse[idx] = Some(self.components.len() as u32);
        self.dense.push(entity);
        self.components.push(value);
        Ok(())
    }

    /// Remove and return the component of `entity`.
    ///
    /// The last slot is moved into the freed slot; both index maps are
    /// updated before returning.
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let slot = self.slot_of(entity)?;
        let value = self.components.swap_remove(slot);
        self.dense.swap_remove(slot);
        if let Some(&moved) = self.dense.get(slot) {
            self.sparse[moved.index()] = Some(slot as u32);
        }
        self.sparse[entity.index()] = None;
        Some(value)
    }

    /// Drop the component of a destroyed entity, if it has one.
    pub fn entity_destroyed(&mut self, entity: Entity) {
        self.remove(entity);
    }

    /// Whether `entity` owns a component in this array.
    #[inline]
    pub fn contains(&self, entity: Entity) -> bool {
        self.slot_of(entity).is_some()
    }

    /// The dense slot holding `entity`'s component.
    #[inline]
    pub fn slot_of(&self, entity: Entity) -> Option<usize> {
        self.sparse
            .get(entity.index())
            .copied()
            .flatten()
            .map(|s| s as usize)
    }

    /// The entity owning the component at `slot`.
    #[inline]
    pub fn entity_at(&self, slot: usize) -> Option<Entity> {
        self.dense.get(slot).copied()
    }

    /// Shared access to `entity`'s component.
    #[inline]
    pub fn get(&self, entity: Entity) -> Option<&T> {
        let slot = self.slot_of(entity)?;
        self.components.get(slot)
    }

    /// Exclusive access to `entity`'s component.
    #[inline]
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        let slot = self.slot_of(entity)?;
        self.components.get_mut(slot)
    }

    /// Number of stored components.
    #[inline]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether no component is stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Owning entities, slot-aligned with [`components`](Self::components).
    #[inline]
    pub fn entities(&self) -> &[Entity] {
        &self.dense
    }

    /// All component values in slot order.
    #[inline]
    pub fn components(&self) -> &[T] {
        &self.components
    }

    /// All component values in slot order, mutably.
    #[inline]
    pub fn components_mut(&mut self) -> &mut [T] {
        &mut self.components
    }

    /// Iterate `(entity, &component)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> + '_ {
        self.dense.iter().copied().zip(self.components.iter())
    }

    /// Iterate `(entity, &mut component)` pairs in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> + '_ {
        self.dense.iter().copied().zip(self.components.iter_mut())
    }
}

impl<T: Clone> ComponentArray<T> {
    /// Copy `src`'s component into a new slot owned by `dst`.
    ///
    /// Returns `false` when `src` has no component or `dst` already has one.
    pub fn duplicate(&mut self, src: Entity, dst: Entity) -> bool {
        if self.contains(dst) {
            return false;
        }
        let Some(value) = self.get(src).cloned() else {
            return false;
        };
        self.insert(dst, value).is_ok()
    }
}

impl<T> Default for ComponentArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ComponentArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentArray")
            .field("type", &std::any::type_name::<T>())
            .field("len", &self.components.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Pos {
        x: f32,
        y: f32,
    }

    fn e(i: u32) -> Entity {
        Entity::new(i)
    }

    /// Both index maps are mutual inverses over the stored set.
    fn assert_dense<T>(array: &ComponentArray<T>) {
        assert_eq!(array.entities().len(), array.len());
        for (slot, &entity) in array.entities().iter().enumerate() {
            assert_eq!(array.slot_of(entity), Some(slot));
            assert_eq!(array.entity_at(slot), Some(entity));
        }
    }

    #[test]
    fn insert_and_get() {
        let mut arr = ComponentArray::new();
        arr.insert(e(4), Pos { x: 1.0, y: 2.0 }).unwrap();
        assert_eq!(arr.get(e(4)), Some(&Pos { x: 1.0, y: 2.0 }));
        assert_eq!(arr.get(e(3)), None);
        assert_eq!(arr.len(), 1);
        assert_dense(&arr);
    }

    #[test]
    fn second_insert_is_rejected_and_keeps_original() {
        let mut arr = ComponentArray::new();
        arr.insert(e(0), Pos { x: 1.0, y: 1.0 }).unwrap();
        let rejected = arr.insert(e(0), Pos { x: 9.0, y: 9.0 });
        assert_eq!(rejected, Err(Pos { x: 9.0, y: 9.0 }));
        assert_eq!(arr.get(e(0)), Some(&Pos { x: 1.0, y: 1.0 }));
        assert_eq!(arr.len(), 1);
    }

    #[test]
    fn remove_moves_last_into_slot() {
        let mut arr = ComponentArray::new();
        for i in 0..4 {
            arr.insert(e(i), Pos { x: i as f32, y: 0.0 }).unwrap();
        }
        let removed = arr.remove(e(1)).unwrap();
        assert_eq!(removed.x, 1.0);
        assert_eq!(arr.len(), 3);
        // Entity 3 now lives in slot 1.
        assert_eq!(arr.slot_of(e(3)), Some(1));
        assert_eq!(arr.get(e(3)).unwrap().x, 3.0);
        assert_dense(&arr);
    }

    #[test]
    fn remove_missing_returns_none() {
        let mut arr: ComponentArray<Pos> = ComponentArray::new();
        assert!(arr.remove(e(0)).is_none());
        arr.insert(e(1), Pos { x: 0.0, y: 0.0 }).unwrap();
        assert!(arr.remove(e(0)).is_none());
        assert!(arr.remove(e(1)).is_some());
        assert!(arr.remove(e(1)).is_none());
        assert!(arr.is_empty());
    }

    #[test]
    fn repeated_add_remove_keeps_maps_consistent() {
        let mut arr = ComponentArray::new();
        let mut owned: Vec<u32> = Vec::new();
        for round in 0..200u32 {
            let id = (round * 7) % 23;
            if owned.contains(&id) {
                arr.remove(e(id)).unwrap();
                owned.retain(|&o| o != id);
            } else {
                arr.insert(e(id), Pos { x: id as f32, y: round as f32 })
                    .unwrap();
                owned.push(id);
            }
            assert_eq!(arr.len(), owned.len());
            assert_dense(&arr);
            for &o in &owned {
                assert_eq!(arr.get(e(o)).unwrap().x, o as f32);
            }
        }
    }

    #[test]
    fn duplicate_copies_value() {
        let mut arr = ComponentArray::new();
        arr.insert(e(0), Pos { x: 5.0, y: 6.0 }).unwrap();
        assert!(arr.duplicate(e(0), e(1)));
        arr.get_mut(e(1)).unwrap().x = 100.0;
        assert_eq!(arr.get(e(0)).unwrap().x, 5.0);
        assert_eq!(arr.get(e(1)).unwrap().x, 100.0);
        assert!(!arr.duplicate(e(0), e(1)), "destination already owns one");
        assert!(!arr.duplicate(e(7), e(8)), "source has none");
    }

    #[test]
    fn iter_pairs_entities_with_values() {
        let mut arr = ComponentArray::new();
        arr.insert(e(2), Pos { x: 2.0, y: 0.0 }).unwrap();
        arr.insert(e(5), Pos { x: 5.0, y: 0.0 }).unwrap();
        for (entity, pos) in arr.iter_mut() {
            pos.y = entity.id() as f32 * 10.0;
        }
        let pairs: Vec<(u32, f32)> = arr.iter().map(|(en, p)| (en.id(), p.y)).collect();
        assert_eq!(pairs, vec![(2, 20.0), (5, 50.0)]);
    }
}
