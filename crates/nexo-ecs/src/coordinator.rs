//! The [`Coordinator`] facade.
//!
//! The coordinator owns the entity, component, singleton and system managers
//! and keeps them consistent: every component add or remove updates the
//! entity's signature and re-tests it against every system in the same call.
//! Collaborators (renderer, physics, scripting, scenes) depend only on this
//! type.

use std::any::Any;

use tracing::{debug, trace};

use crate::component::{Component, ComponentArray, ComponentInfo};
use crate::component_manager::ComponentManager;
use crate::config::EcsConfig;
use crate::entity::{Entity, EntityManager};
use crate::group::{Group, GroupKey, GroupManager, PartitionView, SortOrder};
use crate::query::{ComponentSet, Query};
use crate::signature::{ComponentType, Signature};
use crate::singleton::SingletonComponentManager;
use crate::system::{System, SystemHandle, SystemManager};
use crate::EcsError;

/// Central ECS object composing all managers.
#[derive(Debug)]
pub struct Coordinator {
    config: EcsConfig,
    entities: EntityManager,
    components: ComponentManager,
    singletons: SingletonComponentManager,
    systems: SystemManager,
    groups: GroupManager,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    /// Create a coordinator with [`EcsConfig::default()`].
    pub fn new() -> Self {
        Self::build(EcsConfig::default())
    }

    /// Create a coordinator from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if `config` fails validation.
    pub fn with_config(config: EcsConfig) -> Result<Self, EcsError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: EcsConfig) -> Self {
        Self {
            entities: EntityManager::new(config.max_entities),
            components: ComponentManager::new(config.initial_component_capacity),
            singletons: SingletonComponentManager::new(),
            systems: SystemManager::new(),
            groups: GroupManager::new(),
            config,
        }
    }

    /// The limits this coordinator was built with.
    pub fn config(&self) -> &EcsConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Entities
    // -----------------------------------------------------------------------

    /// Create an entity with no components.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::TooManyEntities`] when the living limit is reached.
    pub fn create_entity(&mut self) -> Result<Entity, EcsError> {
        let entity = self.entities.create_entity()?;
        trace!(%entity, "created entity");
        Ok(entity)
    }

    /// Destroy `entity` together with all of its components.
    ///
    /// The entity is removed from every system's set and its id returns to
    /// the recycle pool.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotAlive`] if `entity` is not living.
    pub fn destroy_entity(&mut self, entity: Entity) -> Result<(), EcsError> {
        let signature = self.entities.signature(entity)?;
        self.entities.destroy_entity(entity)?;
        self.components.entity_destroyed(entity, signature);
        self.systems.entity_destroyed(entity);
        self.groups.entity_destroyed(entity);
        trace!(%entity, components = signature.count(), "destroyed entity");
        Ok(())
    }

    /// Whether `entity` is currently living. Destroyed and never-created ids
    /// are both reported as dead.
    #[inline]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// All living entities, in no particular order.
    pub fn living_entities(&self) -> &[Entity] {
        self.entities.living_entities()
    }

    /// Number of living entities.
    pub fn entity_count(&self) -> usize {
        self.entities.living_count()
    }

    /// The component signature of a living entity.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotAlive`] if `entity` is not living.
    pub fn signature(&self, entity: Entity) -> Result<Signature, EcsError> {
        self.entities.signature(entity)
    }

    /// Store a new signature, re-test the entity against every system, then
    /// against every group.
    fn update_signature(&mut self, entity: Entity, signature: Signature) -> Result<(), EcsError> {
        self.entities.set_signature(entity, signature)?;
        self.systems.entity_signature_changed(entity, signature);
        self.groups.entity_signature_changed(entity, signature);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Components
    // -----------------------------------------------------------------------

    /// Register `T` under its Rust type name.
    pub fn register_component<T: Component>(&mut self) -> Result<ComponentType, EcsError> {
        self.components
            .register_component::<T>(std::any::type_name::<T>())
    }

    /// Register `T` under `name`, which scripting code can resolve with
    /// [`component_type_by_name`](Self::component_type_by_name).
    pub fn register_component_named<T: Component>(
        &mut self,
        name: &str,
    ) -> Result<ComponentType, EcsError> {
        self.components.register_component::<T>(name)
    }

    /// Attach `value` to `entity`.
    ///
    /// # Errors
    ///
    /// - [`EcsError::EntityNotAlive`] if `entity` is not living.
    /// - [`EcsError::ComponentNotRegistered`] if `T` is unknown.
    /// - [`EcsError::ComponentAlreadyPresent`] if `entity` already owns a `T`;
    ///   the stored value is left unchanged.
    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) -> Result<(), EcsError> {
        let signature = self.entities.signature(entity)?;
        let ty = self.components.add_component(entity, value)?;
        self.update_signature(entity, signature.with(ty))
    }

    /// Detach and return `entity`'s `T`.
    ///
    /// # Errors
    ///
    /// - [`EcsError::EntityNotAlive`] if `entity` is not living.
    /// - [`EcsError::ComponentNotFound`] if `entity` has no `T`.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<T, EcsError> {
        let signature = self.entities.signature(entity)?;
        let ty = self.components.component_type::<T>()?;
        let value = self.components.remove_component::<T>(entity)?;
        self.update_signature(entity, signature.without(ty))?;
        Ok(value)
    }

    /// Like [`remove_component`](Self::remove_component), but `None` instead
    /// of an error when there is nothing to remove.
    pub fn try_remove_component<T: Component>(&mut self, entity: Entity) -> Option<T> {
        if !self.has_component::<T>(entity) {
            return None;
        }
        self.remove_component::<T>(entity).ok()
    }

    /// Borrow `entity`'s `T`.
    ///
    /// # Errors
    ///
    /// - [`EcsError::EntityNotAlive`] if `entity` is not living.
    /// - [`EcsError::ComponentNotRegistered`] if `T` is unknown.
    /// - [`EcsError::ComponentNotFound`] if `entity` has no `T`.
    pub fn get_component<T: Component>(&self, entity: Entity) -> Result<&T, EcsError> {
        self.entities.ensure_alive(entity)?;
        self.components.get_component::<T>(entity)
    }

    /// Mutably borrow `entity`'s `T`. Fails like
    /// [`get_component`](Self::get_component).
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T, EcsError> {
        self.entities.ensure_alive(entity)?;
        self.components.get_component_mut::<T>(entity)
    }

    /// `entity`'s `T`, or `None` if the entity is dead or has no `T`.
    pub fn try_get_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        if !self.is_alive(entity) {
            return None;
        }
        self.components.try_get_component::<T>(entity)
    }

    /// Mutable counterpart of [`try_get_component`](Self::try_get_component).
    pub fn try_get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        if !self.is_alive(entity) {
            return None;
        }
        self.components.try_get_component_mut::<T>(entity)
    }

    /// Whether a living `entity` owns a `T`.
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.try_get_component::<T>(entity).is_some()
    }

    /// The dense array holding every `T`.
    pub fn component_array<T: Component>(&self) -> Result<&ComponentArray<T>, EcsError> {
        self.components.array::<T>()
    }

    /// Mutable access to every `T`. Values may change; membership may not.
    pub fn component_array_mut<T: Component>(&mut self) -> Result<&mut [T], EcsError> {
        self.components
            .array_mut::<T>()
            .map(|arr| arr.components_mut())
    }

    /// The id `T` was registered under.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotRegistered`] if `T` is unknown.
    pub fn component_type<T: Component>(&self) -> Result<ComponentType, EcsError> {
        self.components.component_type::<T>()
    }

    /// Read-only access to the component registry.
    pub fn components(&self) -> &ComponentManager {
        &self.components
    }

    // -----------------------------------------------------------------------
    // Reflection and erased access
    // -----------------------------------------------------------------------

    /// Every component of `entity` as `(type, &dyn Any)`, in type order.
    pub fn get_all_components(
        &self,
        entity: Entity,
    ) -> Result<Vec<(ComponentType, &dyn Any)>, EcsError> {
        let signature = self.entities.signature(entity)?;
        signature
            .iter()
            .map(|ty| Ok((ty, self.components.get_component_erased(ty, entity)?)))
            .collect()
    }

    /// The component types attached to `entity`, in type order.
    pub fn get_all_component_types(&self, entity: Entity) -> Result<Vec<ComponentType>, EcsError> {
        Ok(self.entities.signature(entity)?.iter().collect())
    }

    /// Create a new entity holding a copy of every component of `src`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotAlive`] if `src` is not living, or
    /// [`EcsError::TooManyEntities`] if no id is available.
    pub fn duplicate_entity(&mut self, src: Entity) -> Result<Entity, EcsError> {
        let signature = self.entities.signature(src)?;
        let dst = self.entities.create_entity()?;
        for ty in signature.iter() {
            if let Err(e) = self.components.duplicate_component(ty, src, dst) {
                self.components.entity_destroyed(dst, signature);
                self.entities.destroy_entity(dst)?;
                return Err(e);
            }
        }
        self.update_signature(dst, signature)?;
        trace!(%src, %dst, "duplicated entity");
        Ok(dst)
    }

    /// Whether `entity` owns a component of the registered `component_type`.
    ///
    /// # Errors
    ///
    /// - [`EcsError::EntityNotAlive`] if `entity` is not living.
    /// - [`EcsError::UnknownComponentType`] if no type is registered under
    ///   `component_type`.
    pub fn has_component_by_type(
        &self,
        entity: Entity,
        component_type: ComponentType,
    ) -> Result<bool, EcsError> {
        self.entities.ensure_alive(entity)?;
        self.components.has_component_erased(component_type, entity)
    }

    /// Borrow one component of `entity` without naming its Rust type.
    /// Downcast the result with [`Any::downcast_ref`].
    ///
    /// # Errors
    ///
    /// - [`EcsError::EntityNotAlive`] if `entity` is not living.
    /// - [`EcsError::UnknownComponentType`] if `component_type` is unknown.
    /// - [`EcsError::ComponentNotFound`] if `entity` has no such component.
    pub fn get_component_by_type(
        &self,
        entity: Entity,
        component_type: ComponentType,
    ) -> Result<&dyn Any, EcsError> {
        self.entities.ensure_alive(entity)?;
        self.components.get_component_erased(component_type, entity)
    }

    /// Mutable counterpart of
    /// [`get_component_by_type`](Self::get_component_by_type).
    pub fn get_component_by_type_mut(
        &mut self,
        entity: Entity,
        component_type: ComponentType,
    ) -> Result<&mut dyn Any, EcsError> {
        self.entities.ensure_alive(entity)?;
        self.components
            .get_component_erased_mut(component_type, entity)
    }

    /// Attach a boxed value of the type registered as `component_type`.
    ///
    /// # Errors
    ///
    /// [`EcsError::TypeMismatch`] if `value` has a different type, plus the
    /// failures of [`add_component`](Self::add_component).
    pub fn add_component_by_type(
        &mut self,
        entity: Entity,
        component_type: ComponentType,
        value: Box<dyn Any>,
    ) -> Result<(), EcsError> {
        let signature = self.entities.signature(entity)?;
        self.components
            .add_component_erased(component_type, entity, value)?;
        self.update_signature(entity, signature.with(component_type))
    }

    /// Detach one component of `entity` and return it boxed.
    ///
    /// # Errors
    ///
    /// - [`EcsError::EntityNotAlive`] if `entity` is not living.
    /// - [`EcsError::UnknownComponentType`] if `component_type` is unknown.
    /// - [`EcsError::ComponentNotFound`] if `entity` has no such component.
    pub fn remove_component_by_type(
        &mut self,
        entity: Entity,
        component_type: ComponentType,
    ) -> Result<Box<dyn Any>, EcsError> {
        let signature = self.entities.signature(entity)?;
        let value = self
            .components
            .remove_component_erased(component_type, entity)?;
        self.update_signature(entity, signature.without(component_type))?;
        Ok(value)
    }

    /// Capture one component as a JSON memento.
    pub fn save_component(
        &self,
        entity: Entity,
        component_type: ComponentType,
    ) -> Result<serde_json::Value, EcsError> {
        self.entities.ensure_alive(entity)?;
        self.components.save_component(entity, component_type)
    }

    /// Write a memento back, attaching the component if it is missing.
    pub fn restore_component(
        &mut self,
        entity: Entity,
        component_type: ComponentType,
        value: &serde_json::Value,
    ) -> Result<(), EcsError> {
        let signature = self.entities.signature(entity)?;
        let inserted = self
            .components
            .restore_component(entity, component_type, value)?;
        if inserted {
            self.update_signature(entity, signature.with(component_type))?;
        }
        Ok(())
    }

    /// Resolve a name given at registration.
    pub fn component_type_by_name(&self, name: &str) -> Option<ComponentType> {
        self.components.component_type_by_name(name)
    }

    /// Registration metadata for `component_type`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownComponentType`] if nothing is registered
    /// under `component_type`.
    pub fn component_info(&self, component_type: ComponentType) -> Result<&ComponentInfo, EcsError> {
        self.components.component_info(component_type)
    }

    // -----------------------------------------------------------------------
    // Singletons
    // -----------------------------------------------------------------------

    /// Store the singleton `value`, returning the instance it replaced.
    pub fn register_singleton_component<T: 'static>(&mut self, value: T) -> Option<T> {
        let previous = self.singletons.register(value);
        debug!(
            singleton = std::any::type_name::<T>(),
            replaced = previous.is_some(),
            "registered singleton component"
        );
        previous
    }

    /// Borrow the singleton `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SingletonNotRegistered`] if no `T` is stored.
    pub fn get_singleton_component<T: 'static>(&self) -> Result<&T, EcsError> {
        self.singletons.get::<T>()
    }

    /// Mutably borrow the singleton `T`. Fails like
    /// [`get_singleton_component`](Self::get_singleton_component).
    pub fn get_singleton_component_mut<T: 'static>(&mut self) -> Result<&mut T, EcsError> {
        self.singletons.get_mut::<T>()
    }

    /// Remove the singleton `T` and hand it back.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SingletonNotRegistered`] if no `T` is stored.
    pub fn unregister_singleton_component<T: 'static>(&mut self) -> Result<T, EcsError> {
        self.singletons.unregister::<T>()
    }

    /// Whether a singleton `T` is stored.
    pub fn has_singleton_component<T: 'static>(&self) -> bool {
        self.singletons.contains::<T>()
    }

    // -----------------------------------------------------------------------
    // Systems
    // -----------------------------------------------------------------------

    /// Register `system`. It matches nothing until given a signature.
    pub fn register_system<T: System>(&mut self, system: T) -> Result<SystemHandle<T>, EcsError> {
        self.systems.register(system)
    }

    /// Set `T`'s required signature and rebuild its entity set from every
    /// living entity.
    pub fn set_system_signature<T: System>(&mut self, signature: Signature) -> Result<(), EcsError> {
        self.systems.set_signature::<T>(signature)?;
        for &entity in self.entities.living_entities() {
            let current = self.entities.signature(entity)?;
            self.systems.entity_signature_changed(entity, current);
        }
        debug!(
            system = std::any::type_name::<T>(),
            ?signature,
            matched = self.systems.entities::<T>()?.len(),
            "set system signature"
        );
        Ok(())
    }

    /// [`set_system_signature`](Self::set_system_signature) from a tuple of
    /// component types.
    pub fn set_system_signature_of<T: System, C: ComponentSet>(&mut self) -> Result<(), EcsError> {
        let signature = C::signature(&self.components)?;
        self.set_system_signature::<T>(signature)
    }

    /// A shared handle to the registered `T`.
    pub fn system<T: System>(&self) -> Result<SystemHandle<T>, EcsError> {
        self.systems.handle::<T>()
    }

    /// Entities currently matched by `T`.
    pub fn system_entities<T: System>(&self) -> Result<&[Entity], EcsError> {
        self.systems.entities::<T>()
    }

    /// The signature `T` was last given.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotRegistered`] if `T` is unknown.
    pub fn system_signature<T: System>(&self) -> Result<Signature, EcsError> {
        self.systems.signature::<T>()
    }

    /// Read-only access to the system registry.
    pub fn systems(&self) -> &SystemManager {
        &self.systems
    }

    /// Run `T::update` over a snapshot of its matched entities.
    ///
    /// Changes the system makes to signatures take effect on the live sets
    /// immediately, but the slice it iterates is fixed for the whole call.
    ///
    /// # Errors
    ///
    /// - [`EcsError::SystemNotRegistered`] if `T` is unknown.
    /// - [`EcsError::SystemBusy`] if `T` is already running (re-entrant call).
    /// - Whatever `T::update` returns.
    pub fn run_system<T: System>(&mut self) -> Result<(), EcsError> {
        let handle = self.systems.handle::<T>()?;
        let snapshot = self.systems.entities::<T>()?.to_vec();
        let mut system = handle
            .try_borrow_mut()
            .map_err(|_| EcsError::SystemBusy {
                name: std::any::type_name::<T>().to_owned(),
            })?;
        system.update(self, &snapshot)
    }

    // -----------------------------------------------------------------------
    // Groups
    // -----------------------------------------------------------------------

    fn group_key_of<O: ComponentSet, N: ComponentSet>(&self) -> Result<GroupKey, EcsError> {
        Ok(GroupKey {
            owned: O::signature(&self.components)?,
            non_owned: N::signature(&self.components)?,
        })
    }

    /// Register (or look up) the group owning `O` and reading `N`, filled
    /// with every living entity that matches.
    ///
    /// Use `()` for `N` when the group reads nothing besides what it owns.
    ///
    /// # Errors
    ///
    /// - [`EcsError::ComponentNotRegistered`] if a type is unknown.
    /// - [`EcsError::InvalidGroup`] if `O` is empty or overlaps `N`.
    /// - [`EcsError::GroupOwnershipConflict`] if another group owns a type
    ///   in `O`.
    pub fn register_group<O: ComponentSet, N: ComponentSet>(&mut self) -> Result<GroupKey, EcsError> {
        let key = self.group_key_of::<O, N>()?;
        if self.groups.register(key)? {
            let group = self.groups.group_mut(&key)?;
            for &entity in self.entities.living_entities() {
                group.entity_signature_changed(entity, self.entities.signature(entity)?);
            }
            debug!(?key, members = group.len(), "registered group");
        }
        Ok(key)
    }

    /// The key of an already registered group owning `O` and reading `N`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::GroupNotRegistered`] if there is no such group.
    pub fn group_key<O: ComponentSet, N: ComponentSet>(&self) -> Result<GroupKey, EcsError> {
        let key = self.group_key_of::<O, N>()?;
        self.groups.group(&key)?;
        Ok(key)
    }

    /// The group registered under `key`.
    pub fn group(&self, key: &GroupKey) -> Result<&Group, EcsError> {
        self.groups.group(key)
    }

    /// Members of the group under `key`, in group order.
    pub fn group_entities(&self, key: &GroupKey) -> Result<&[Entity], EcsError> {
        self.groups.group(key).map(Group::entities)
    }

    /// Every registered group.
    pub fn groups(&self) -> &GroupManager {
        &self.groups
    }

    /// Sort the group under `key` by a field of `C`. Skipped when the group
    /// is still sorted in `order`.
    ///
    /// # Errors
    ///
    /// [`EcsError::GroupNotRegistered`], or [`EcsError::ComponentNotInGroup`]
    /// if `C` is neither owned nor read by the group.
    pub fn sort_group_by<C, K, F>(
        &mut self,
        key: &GroupKey,
        extractor: F,
        order: SortOrder,
    ) -> Result<(), EcsError>
    where
        C: Component,
        K: PartialOrd,
        F: Fn(&C) -> K,
    {
        self.groups
            .group_mut(key)?
            .sort_by(&self.components, extractor, order)
    }

    /// Force the next [`sort_group_by`](Self::sort_group_by) on `key` to sort.
    pub fn invalidate_group_sorting(&mut self, key: &GroupKey) -> Result<(), EcsError> {
        self.groups.group_mut(key)?.invalidate_sorting();
        Ok(())
    }

    /// Partition the group under `key` by a field of `C`, rebuilding the
    /// cached partitions if membership or order changed since the last call.
    ///
    /// # Errors
    ///
    /// Same as [`sort_group_by`](Self::sort_group_by).
    pub fn group_partitions<C, K, F>(
        &mut self,
        key: &GroupKey,
        extractor: F,
    ) -> Result<PartitionView<'_, K>, EcsError>
    where
        C: Component,
        K: Ord + Clone + 'static,
        F: Fn(&C) -> K,
    {
        self.groups
            .group_mut(key)?
            .partition_by(&self.components, extractor)
    }

    /// Partition the group under `key` by a function of the entity id. The
    /// view is cached under `name`.
    pub fn group_partitions_by_entity<K, F>(
        &mut self,
        key: &GroupKey,
        name: &str,
        extractor: F,
    ) -> Result<PartitionView<'_, K>, EcsError>
    where
        K: Ord + Clone + 'static,
        F: Fn(Entity) -> K,
    {
        self.groups.group_mut(key)?.partition_by_entity(name, extractor)
    }

    /// Call `f` with every member of the group under `key` and its `C`.
    ///
    /// # Errors
    ///
    /// [`EcsError::GroupNotRegistered`], or [`EcsError::ComponentNotInGroup`]
    /// if `C` is neither owned nor read by the group.
    pub fn each_in_group<C, F>(&mut self, key: &GroupKey, f: F) -> Result<(), EcsError>
    where
        C: Component,
        F: FnMut(Entity, &mut C),
    {
        self.each_in_group_range(key, 0, usize::MAX, f)
    }

    /// Like [`each_in_group`](Self::each_in_group), restricted to `count`
    /// members starting at `start` (clamped to the group size).
    pub fn each_in_group_range<C, F>(
        &mut self,
        key: &GroupKey,
        start: usize,
        count: usize,
        mut f: F,
    ) -> Result<(), EcsError>
    where
        C: Component,
        F: FnMut(Entity, &mut C),
    {
        let group = self.groups.group(key)?;
        let ty = self.components.component_type::<C>()?;
        if !key.required().test(ty) {
            return Err(EcsError::ComponentNotInGroup {
                component: std::any::type_name::<C>().to_owned(),
            });
        }
        let array = self.components.array_mut::<C>()?;
        for &entity in group.entities_in_range(start, count) {
            if let Some(value) = array.get_mut(entity) {
                f(entity, value);
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The signature of a tuple of component types.
    pub fn signature_of<C: ComponentSet>(&self) -> Result<Signature, EcsError> {
        C::signature(&self.components)
    }

    /// Living entities passing `query`.
    pub fn entities_with(&self, query: &Query) -> Result<Vec<Entity>, EcsError> {
        let filter = query.resolve(&self.components)?;
        let mut out = Vec::new();
        for &entity in self.entities.living_entities() {
            if filter.matches(&self.entities.signature(entity)?) {
                out.push(entity);
            }
        }
        Ok(out)
    }

    /// Living entities owning every type in `C`.
    pub fn entities_with_all<C: ComponentSet>(&self) -> Result<Vec<Entity>, EcsError> {
        let required = C::signature(&self.components)?;
        let mut out = Vec::new();
        for &entity in self.entities.living_entities() {
            if self.entities.signature(entity)?.contains(&required) {
                out.push(entity);
            }
        }
        Ok(out)
    }
}
