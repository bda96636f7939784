//! Component groups: ordered entity sets that can be sorted and partitioned.
//!
//! A group is keyed by a [`GroupKey`]: the component types it owns plus the
//! component types it only reads. An entity is a member while its signature
//! contains both sets. Each owned type belongs to at most one group, so two
//! groups never fight over the order of the same component data.
//!
//! Membership is updated by the [`Coordinator`](crate::coordinator::Coordinator)
//! on every signature change. Any membership change invalidates the group's
//! sort and marks every cached partition dirty; the next
//! [`sort_by`](Group::sort_by) or partition request rebuilds lazily.

use std::any::{Any, TypeId};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::component::Component;
use crate::component_manager::ComponentManager;
use crate::entity::Entity;
use crate::signature::Signature;
use crate::sparse_set::SparseSet;
use crate::EcsError;

// ---------------------------------------------------------------------------
// Keys and results
// ---------------------------------------------------------------------------

/// Identity of a group: the owned and the non-owned component types.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub owned: Signature,
    pub non_owned: Signature,
}

impl GroupKey {
    /// Every component type a member must carry.
    pub fn required(&self) -> Signature {
        self.owned.union(&self.non_owned)
    }

    /// Whether an entity with `signature` belongs in the group.
    pub fn matches(&self, signature: &Signature) -> bool {
        signature.contains(&self.required())
    }
}

impl fmt::Debug for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupKey(owned={:?}, non_owned={:?})", self.owned, self.non_owned)
    }
}

/// Direction of [`Group::sort_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// A contiguous run of group members sharing one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition<K> {
    pub key: K,
    /// Index of the first member in [`Group::entities`].
    pub start: usize,
    pub count: usize,
}

/// Read-only view over a group's partitions, in ascending key order.
#[derive(Debug)]
pub struct PartitionView<'a, K> {
    partitions: &'a [Partition<K>],
    entities: &'a [Entity],
}

impl<'a, K: Ord> PartitionView<'a, K> {
    /// The partition for `key`, if any member has it.
    pub fn partition(&self, key: &K) -> Option<&'a Partition<K>> {
        let partitions = self.partitions;
        partitions
            .binary_search_by(|p| p.key.cmp(key))
            .ok()
            .map(|i| &partitions[i])
    }

    /// Members whose key is `key`; empty when no member has it.
    pub fn entities(&self, key: &K) -> &'a [Entity] {
        let entities = self.entities;
        match self.partition(key) {
            Some(p) => &entities[p.start..p.start + p.count],
            None => &[],
        }
    }

    /// Partition keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &'a K> + 'a {
        let partitions = self.partitions;
        partitions.iter().map(|p| &p.key)
    }

    /// Every partition, sorted by key.
    pub fn partitions(&self) -> &'a [Partition<K>] {
        self.partitions
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }
}

// ---------------------------------------------------------------------------
// Group
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PartitionId {
    /// Keyed by a field of component `component`, of key type `key`.
    Component { component: TypeId, key: TypeId },
    /// Keyed by a caller-named function of the entity id.
    Named(String),
}

struct PartitionCache {
    dirty: bool,
    /// `Vec<Partition<K>>` behind `dyn Any`.
    partitions: Box<dyn Any>,
}

/// An ordered set of entities matching a [`GroupKey`].
pub struct Group {
    key: GroupKey,
    members: SparseSet,
    sort_order: SortOrder,
    sorting_invalidated: bool,
    partitions: HashMap<PartitionId, PartitionCache>,
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("key", &self.key)
            .field("len", &self.members.len())
            .field("sorting_invalidated", &self.sorting_invalidated)
            .field("partitions", &self.partitions.len())
            .finish()
    }
}

impl Group {
    fn new(key: GroupKey) -> Self {
        Self {
            key,
            members: SparseSet::new(),
            sort_order: SortOrder::Ascending,
            sorting_invalidated: true,
            partitions: HashMap::new(),
        }
    }

    /// The owned and non-owned signatures this group was registered with.
    pub fn key(&self) -> GroupKey {
        self.key
    }

    /// Members in group order.
    pub fn entities(&self) -> &[Entity] {
        self.members.as_slice()
    }

    /// Up to `count` members starting at `start`, clamped to the group size.
    pub fn entities_in_range(&self, start: usize, count: usize) -> &[Entity] {
        let all = self.members.as_slice();
        let start = start.min(all.len());
        let end = start.saturating_add(count).min(all.len());
        &all[start..end]
    }

    /// Whether `entity` is currently a member.
    pub fn contains(&self, entity: Entity) -> bool {
        self.members.contains(entity)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether the next [`sort_by`](Self::sort_by) will actually sort.
    pub fn sorting_invalidated(&self) -> bool {
        self.sorting_invalidated
    }

    /// Force the next sort. Call after mutating a field the group is sorted by.
    pub fn invalidate_sorting(&mut self) {
        self.sorting_invalidated = true;
    }

    /// Mark every cached partition for rebuild.
    pub fn invalidate_partitions(&mut self) {
        for cache in self.partitions.values_mut() {
            cache.dirty = true;
        }
    }

    pub(crate) fn entity_signature_changed(&mut self, entity: Entity, signature: Signature) {
        let changed = if self.key.matches(&signature) {
            self.members.insert(entity)
        } else {
            self.members.remove(entity)
        };
        if changed {
            self.membership_changed();
        }
    }

    pub(crate) fn entity_destroyed(&mut self, entity: Entity) {
        if self.members.remove(entity) {
            self.membership_changed();
        }
    }

    fn membership_changed(&mut self) {
        self.sorting_invalidated = true;
        self.invalidate_partitions();
    }

    /// Fail unless `C` is one of the group's owned or non-owned types.
    fn require<C: Component>(&self, components: &ComponentManager) -> Result<(), EcsError> {
        let ty = components.component_type::<C>()?;
        if self.key.required().test(ty) {
            Ok(())
        } else {
            Err(EcsError::ComponentNotInGroup {
                component: std::any::type_name::<C>().to_owned(),
            })
        }
    }

    /// Stable-sort the members by a field of `C`.
    ///
    /// Does nothing if the group is already sorted in `order` and nothing
    /// invalidated it since. Incomparable keys (e.g. `NaN`) compare equal.
    ///
    /// # Errors
    ///
    /// - [`EcsError::ComponentNotInGroup`] if `C` is not a group type.
    /// - [`EcsError::ComponentNotRegistered`] if `C` is unknown.
    pub fn sort_by<C, K, F>(
        &mut self,
        components: &ComponentManager,
        extractor: F,
        order: SortOrder,
    ) -> Result<(), EcsError>
    where
        C: Component,
        K: PartialOrd,
        F: Fn(&C) -> K,
    {
        self.require::<C>(components)?;
        if order != self.sort_order {
            self.sort_order = order;
            self.sorting_invalidated = true;
        }
        if !self.sorting_invalidated {
            return Ok(());
        }

        let array = components.array::<C>()?;
        let mut keyed = Vec::with_capacity(self.members.len());
        for &entity in self.members.iter() {
            let value = array
                .get(entity)
                .ok_or_else(|| EcsError::ComponentNotFound {
                    entity,
                    component: std::any::type_name::<C>().to_owned(),
                })?;
            keyed.push((extractor(value), entity));
        }
        keyed.sort_by(|(a, _), (b, _)| {
            let ord = a.partial_cmp(b).unwrap_or(Ordering::Equal);
            match order {
                SortOrder::Ascending => ord,
                SortOrder::Descending => ord.reverse(),
            }
        });

        let sorted: Vec<Entity> = keyed.into_iter().map(|(_, e)| e).collect();
        if sorted.as_slice() != self.members.as_slice() {
            self.members.reorder(sorted);
            self.invalidate_partitions();
        }
        self.sorting_invalidated = false;
        Ok(())
    }

    /// Partition the members by a field of `C`.
    ///
    /// The view is cached per `(C, K)` pair and only rebuilt after a
    /// membership change or a reorder. Rebuilding regroups members so each
    /// partition is contiguous, keeping their relative order.
    ///
    /// # Errors
    ///
    /// Same as [`sort_by`](Self::sort_by).
    pub fn partition_by<C, K, F>(
        &mut self,
        components: &ComponentManager,
        extractor: F,
    ) -> Result<PartitionView<'_, K>, EcsError>
    where
        C: Component,
        K: Ord + Clone + 'static,
        F: Fn(&C) -> K,
    {
        self.require::<C>(components)?;
        let array = components.array::<C>()?;
        let id = PartitionId::Component {
            component: TypeId::of::<C>(),
            key: TypeId::of::<K>(),
        };
        self.partition_with(id, |entity| {
            array
                .get(entity)
                .map(&extractor)
                .ok_or_else(|| EcsError::ComponentNotFound {
                    entity,
                    component: std::any::type_name::<C>().to_owned(),
                })
        })
    }

    /// Partition the members by a function of the entity id, cached under
    /// `name`.
    pub fn partition_by_entity<K, F>(
        &mut self,
        name: &str,
        extractor: F,
    ) -> Result<PartitionView<'_, K>, EcsError>
    where
        K: Ord + Clone + 'static,
        F: Fn(Entity) -> K,
    {
        self.partition_with(PartitionId::Named(name.to_owned()), |e| Ok(extractor(e)))
    }

    fn partition_with<K>(
        &mut self,
        id: PartitionId,
        key_of: impl Fn(Entity) -> Result<K, EcsError>,
    ) -> Result<PartitionView<'_, K>, EcsError>
    where
        K: Ord + Clone + 'static,
    {
        let fresh = self
            .partitions
            .get(&id)
            .is_some_and(|c| !c.dirty && c.partitions.is::<Vec<Partition<K>>>());
        if !fresh {
            let partitions = self.rebuild_partitions(&key_of)?;
            self.partitions.insert(
                id.clone(),
                PartitionCache {
                    dirty: false,
                    partitions: Box::new(partitions),
                },
            );
        }

        let partitions = self
            .partitions
            .get(&id)
            .and_then(|c| c.partitions.downcast_ref::<Vec<Partition<K>>>())
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        Ok(PartitionView {
            partitions,
            entities: self.members.as_slice(),
        })
    }

    fn rebuild_partitions<K: Ord>(
        &mut self,
        key_of: &impl Fn(Entity) -> Result<K, EcsError>,
    ) -> Result<Vec<Partition<K>>, EcsError> {
        let mut buckets: BTreeMap<K, Vec<Entity>> = BTreeMap::new();
        for &entity in self.members.iter() {
            buckets.entry(key_of(entity)?).or_default().push(entity);
        }

        let mut order = Vec::with_capacity(self.members.len());
        let mut partitions = Vec::with_capacity(buckets.len());
        for (key, entities) in buckets {
            partitions.push(Partition {
                key,
                start: order.len(),
                count: entities.len(),
            });
            order.extend(entities);
        }

        if order.as_slice() != self.members.as_slice() {
            self.members.reorder(order);
            self.sorting_invalidated = true;
            self.invalidate_partitions();
        }
        Ok(partitions)
    }
}

// ---------------------------------------------------------------------------
// GroupManager
// ---------------------------------------------------------------------------

/// Every registered group, with the union of their owned types.
#[derive(Debug, Default)]
pub struct GroupManager {
    groups: Vec<Group>,
    by_key: HashMap<GroupKey, usize>,
    owned: Signature,
}

impl GroupManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a group for `key`. Returns `false` if it already existed.
    ///
    /// # Errors
    ///
    /// - [`EcsError::InvalidGroup`] if `key` owns nothing, or a type is both
    ///   owned and non-owned.
    /// - [`EcsError::GroupOwnershipConflict`] if another group owns one of
    ///   the owned types.
    pub fn register(&mut self, key: GroupKey) -> Result<bool, EcsError> {
        if self.by_key.contains_key(&key) {
            return Ok(false);
        }
        if key.owned.is_empty() {
            return Err(EcsError::InvalidGroup {
                details: "a group must own at least one component type".to_owned(),
            });
        }
        if key.owned.intersects(&key.non_owned) {
            return Err(EcsError::InvalidGroup {
                details: format!(
                    "{:?} listed as both owned and non-owned",
                    key.owned.intersection(&key.non_owned)
                ),
            });
        }
        let taken = self.owned.intersection(&key.owned);
        if let Some(component_type) = taken.iter().next() {
            return Err(EcsError::GroupOwnershipConflict { component_type });
        }

        self.by_key.insert(key, self.groups.len());
        self.groups.push(Group::new(key));
        self.owned = self.owned.union(&key.owned);
        Ok(true)
    }

    /// The group registered for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::GroupNotRegistered`] if there is none.
    pub fn group(&self, key: &GroupKey) -> Result<&Group, EcsError> {
        self.by_key
            .get(key)
            .map(|&i| &self.groups[i])
            .ok_or_else(|| not_registered(key))
    }

    /// Mutable access to the group registered for `key`.
    pub fn group_mut(&mut self, key: &GroupKey) -> Result<&mut Group, EcsError> {
        match self.by_key.get(key) {
            Some(&i) => Ok(&mut self.groups[i]),
            None => Err(not_registered(key)),
        }
    }

    /// Whether a group is registered for exactly `key`.
    pub fn contains(&self, key: &GroupKey) -> bool {
        self.by_key.contains_key(key)
    }

    /// Re-test `entity` against every group.
    pub fn entity_signature_changed(&mut self, entity: Entity, signature: Signature) {
        for group in &mut self.groups {
            group.entity_signature_changed(entity, signature);
        }
    }

    /// Drop `entity` from every group.
    pub fn entity_destroyed(&mut self, entity: Entity) {
        for group in &mut self.groups {
            group.entity_destroyed(entity);
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Keys of every group, in registration order.
    pub fn keys(&self) -> impl Iterator<Item = GroupKey> + '_ {
        self.groups.iter().map(|g| g.key)
    }
}

fn not_registered(key: &GroupKey) -> EcsError {
    EcsError::GroupNotRegistered {
        owned: key.owned,
        non_owned: key.non_owned,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::ComponentType;

    fn ty(i: usize) -> ComponentType {
        ComponentType::from_index(i).unwrap()
    }

    fn key(owned: &[usize], non_owned: &[usize]) -> GroupKey {
        GroupKey {
            owned: Signature::from_types(&owned.iter().map(|&i| ty(i)).collect::<Vec<_>>()),
            non_owned: Signature::from_types(
                &non_owned.iter().map(|&i| ty(i)).collect::<Vec<_>>(),
            ),
        }
    }

    #[test]
    fn key_requires_owned_and_non_owned() {
        let k = key(&[0], &[1]);
        assert!(k.matches(&Signature::from_types(&[ty(0), ty(1), ty(2)])));
        assert!(!k.matches(&Signature::from_types(&[ty(0)])));
        assert!(!k.matches(&Signature::from_types(&[ty(1)])));
    }

    #[test]
    fn register_validates_keys() {
        let mut groups = GroupManager::new();
        assert!(groups.register(key(&[0], &[1])).unwrap());
        assert!(!groups.register(key(&[0], &[1])).unwrap(), "second register is a no-op");

        assert!(matches!(
            groups.register(key(&[], &[1])),
            Err(EcsError::InvalidGroup { .. })
        ));
        assert!(matches!(
            groups.register(key(&[2], &[2])),
            Err(EcsError::InvalidGroup { .. })
        ));
        assert!(matches!(
            groups.register(key(&[0, 3], &[])),
            Err(EcsError::GroupOwnershipConflict { component_type }) if component_type == ty(0)
        ));
        // Reading a type another group owns is fine.
        assert!(groups.register(key(&[3], &[0])).unwrap());
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn membership_follows_signatures() {
        let mut groups = GroupManager::new();
        let k = key(&[0], &[1]);
        groups.register(k).unwrap();
        let full = Signature::from_types(&[ty(0), ty(1)]);

        groups.entity_signature_changed(Entity::new(4), full);
        groups.entity_signature_changed(Entity::new(7), full);
        groups.entity_signature_changed(Entity::new(9), Signature::from_types(&[ty(0)]));
        assert_eq!(
            groups.group(&k).unwrap().entities(),
            &[Entity::new(4), Entity::new(7)]
        );

        groups.entity_signature_changed(Entity::new(4), Signature::from_types(&[ty(1)]));
        groups.entity_destroyed(Entity::new(7));
        assert!(groups.group(&k).unwrap().is_empty());
    }

    #[test]
    fn membership_change_invalidates_sorting() {
        let mut group = Group::new(key(&[0], &[]));
        let sig = Signature::from_types(&[ty(0)]);
        group.entity_signature_changed(Entity::new(1), sig);
        group.sorting_invalidated = false;

        // Same membership, nothing to invalidate.
        group.entity_signature_changed(Entity::new(1), sig);
        assert!(!group.sorting_invalidated());

        group.entity_signature_changed(Entity::new(2), sig);
        assert!(group.sorting_invalidated());
    }

    #[test]
    fn entities_in_range_clamps() {
        let mut group = Group::new(key(&[0], &[]));
        let sig = Signature::from_types(&[ty(0)]);
        for i in 0..5 {
            group.entity_signature_changed(Entity::new(i), sig);
        }
        assert_eq!(group.entities_in_range(1, 2), &[Entity::new(1), Entity::new(2)]);
        assert_eq!(group.entities_in_range(3, 10).len(), 2);
        assert!(group.entities_in_range(8, 2).is_empty());
        assert_eq!(group.entities_in_range(0, usize::MAX).len(), 5);
    }

    #[test]
    fn entity_partitions_are_contiguous_and_cached() {
        let mut group = Group::new(key(&[0], &[]));
        let sig = Signature::from_types(&[ty(0)]);
        for i in 0..5 {
            group.entity_signature_changed(Entity::new(i), sig);
        }

        let view = group
            .partition_by_entity("parity", |e| e.id() % 2)
            .unwrap();
        assert_eq!(view.partition_count(), 2);
        assert_eq!(view.keys().copied().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(
            view.entities(&0),
            &[Entity::new(0), Entity::new(2), Entity::new(4)]
        );
        assert_eq!(view.entities(&1), &[Entity::new(1), Entity::new(3)]);
        assert_eq!(
            view.partition(&1),
            Some(&Partition { key: 1, start: 3, count: 2 })
        );
        assert!(view.partition(&7).is_none());
        assert!(view.entities(&7).is_empty());

        // Served from the cache: the extractor is not consulted again.
        let view = group
            .partition_by_entity::<u32, _>("parity", |_| unreachable!())
            .unwrap();
        assert_eq!(view.partition_count(), 2);

        group.entity_signature_changed(Entity::new(5), sig);
        let view = group
            .partition_by_entity("parity", |e| e.id() % 2)
            .unwrap();
        assert_eq!(view.entities(&1).len(), 3);
        assert_eq!(view.entities(&0).len(), 3);
    }

    #[test]
    fn empty_group_has_no_partitions() {
        let mut group = Group::new(key(&[0], &[]));
        let view = group.partition_by_entity("any", |e| e.id()).unwrap();
        assert_eq!(view.partition_count(), 0);
    }
}
