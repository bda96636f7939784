//! Type-erased registry of component arrays.
//!
//! The [`ComponentManager`] owns one [`ComponentArray<T>`] per registered
//! component type. Arrays are stored behind `Box<dyn Any>` and indexed by
//! [`ComponentType`]. Typed calls downcast directly; untyped calls (scripting,
//! editor inspection, entity duplication) go through a dispatch table of
//! monomorphized function pointers captured at registration time.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use crate::component::{Component, ComponentArray, ComponentInfo};
use crate::entity::Entity;
use crate::signature::{ComponentType, Signature, MAX_COMPONENT_TYPE};
use crate::EcsError;

// ---------------------------------------------------------------------------
// ComponentVtable -- per-type dispatch table
// ---------------------------------------------------------------------------

/// Why an erased insert did not store its value.
#[derive(Debug)]
enum ErasedInsertError {
    AlreadyPresent,
    TypeMismatch,
}

/// Function pointers operating on a `ComponentArray<T>` hidden behind
/// `dyn Any`. Built once per type at registration.
#[derive(Clone, Copy)]
struct ComponentVtable {
    has: fn(&dyn Any, Entity) -> bool,
    get: for<'a> fn(&'a dyn Any, Entity) -> Option<&'a dyn Any>,
    get_mut: for<'a> fn(&'a mut dyn Any, Entity) -> Option<&'a mut dyn Any>,
    insert: fn(&mut dyn Any, Entity, Box<dyn Any>) -> Result<(), ErasedInsertError>,
    remove: fn(&mut dyn Any, Entity) -> Option<Box<dyn Any>>,
    duplicate: fn(&mut dyn Any, Entity, Entity) -> bool,
    save: fn(&dyn Any, Entity) -> Option<Result<serde_json::Value, serde_json::Error>>,
    /// Decodes and stores the value; `Ok(true)` when a new slot was created.
    restore: fn(&mut dyn Any, Entity, &serde_json::Value) -> Result<bool, serde_json::Error>,
    len: fn(&dyn Any) -> usize,
    entities: for<'a> fn(&'a dyn Any) -> &'a [Entity],
}

impl ComponentVtable {
    fn new<T: Component>() -> Self {
        fn array<T: Component>(storage: &dyn Any) -> Option<&ComponentArray<T>> {
            storage.downcast_ref::<ComponentArray<T>>()
        }

        fn array_mut<T: Component>(storage: &mut dyn Any) -> Option<&mut ComponentArray<T>> {
            storage.downcast_mut::<ComponentArray<T>>()
        }

        fn has_impl<T: Component>(storage: &dyn Any, entity: Entity) -> bool {
            array::<T>(storage).is_some_and(|a| a.contains(entity))
        }

        fn get_impl<T: Component>(storage: &dyn Any, entity: Entity) -> Option<&dyn Any> {
            array::<T>(storage)?.get(entity).map(|v| v as &dyn Any)
        }

        fn get_mut_impl<T: Component>(
            storage: &mut dyn Any,
            entity: Entity,
        ) -> Option<&mut dyn Any> {
            array_mut::<T>(storage)?
                .get_mut(entity)
                .map(|v| v as &mut dyn Any)
        }

        fn insert_impl<T: Component>(
            storage: &mut dyn Any,
            entity: Entity,
            value: Box<dyn Any>,
        ) -> Result<(), ErasedInsertError> {
            let value = value
                .downcast::<T>()
                .map_err(|_| ErasedInsertError::TypeMismatch)?;
            let arr = array_mut::<T>(storage).ok_or(ErasedInsertError::TypeMismatch)?;
            arr.insert(entity, *value)
                .map_err(|_| ErasedInsertError::AlreadyPresent)
        }

        fn remove_impl<T: Component>(storage: &mut dyn Any, entity: Entity) -> Option<Box<dyn Any>> {
            array_mut::<T>(storage)?
                .remove(entity)
                .map(|v| Box::new(v) as Box<dyn Any>)
        }

        fn duplicate_impl<T: Component>(storage: &mut dyn Any, src: Entity, dst: Entity) -> bool {
            array_mut::<T>(storage).is_some_and(|a| a.duplicate(src, dst))
        }

        fn save_impl<T: Component>(
            storage: &dyn Any,
            entity: Entity,
        ) -> Option<Result<serde_json::Value, serde_json::Error>> {
            array::<T>(storage)?.get(entity).map(serde_json::to_value)
        }

        fn restore_impl<T: Component>(
            storage: &mut dyn Any,
            entity: Entity,
            value: &serde_json::Value,
        ) -> Result<bool, serde_json::Error> {
            let decoded: T = serde_json::from_value(value.clone())?;
            let Some(arr) = array_mut::<T>(storage) else {
                return Ok(false);
            };
            match arr.get_mut(entity) {
                Some(slot) => {
                    *slot = decoded;
                    Ok(false)
                }
                None => Ok(arr.insert(entity, decoded).is_ok()),
            }
        }

        fn len_impl<T: Component>(storage: &dyn Any) -> usize {
            array::<T>(storage).map_or(0, |a| a.len())
        }

        fn entities_impl<T: Component>(storage: &dyn Any) -> &[Entity] {
            array::<T>(storage).map(|a| a.entities()).unwrap_or(&[])
        }

        Self {
            has: has_impl::<T>,
            get: get_impl::<T>,
            get_mut: get_mut_impl::<T>,
            insert: insert_impl::<T>,
            remove: remove_impl::<T>,
            duplicate: duplicate_impl::<T>,
            save: save_impl::<T>,
            restore: restore_impl::<T>,
            len: len_impl::<T>,
            entities: entities_impl::<T>,
        }
    }
}

// ---------------------------------------------------------------------------
// ComponentManager
// ---------------------------------------------------------------------------

/// One registered component type: metadata, storage and dispatch table.
struct ComponentSlot {
    info: ComponentInfo,
    storage: Box<dyn Any>,
    vtable: ComponentVtable,
}

/// Registry mapping component types to their dense storage.
pub struct ComponentManager {
    /// TypeId -> ComponentType for typed access.
    by_type: HashMap<TypeId, ComponentType>,
    /// Registered name -> ComponentType for scripting lookups.
    by_name: HashMap<String, ComponentType>,
    /// Indexed by `ComponentType::index()`.
    slots: Vec<ComponentSlot>,
    /// Reserved capacity of each new array.
    initial_capacity: usize,
}

impl fmt::Debug for ComponentManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentManager")
            .field("registered", &self.slots.len())
            .finish()
    }
}

impl ComponentManager {
    /// Create an empty manager. New arrays reserve `initial_capacity` slots.
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            by_type: HashMap::new(),
            by_name: HashMap::new(),
            slots: Vec::new(),
            initial_capacity,
        }
    }

    /// Register `T` under `name` and assign it the next [`ComponentType`].
    ///
    /// # Errors
    ///
    /// - [`EcsError::ComponentAlreadyRegistered`] if `T` or `name` is taken.
    /// - [`EcsError::TooManyComponentTypes`] if the registry is full.
    pub fn register_component<T: Component>(
        &mut self,
        name: &str,
    ) -> Result<ComponentType, EcsError> {
        if self.by_type.contains_key(&TypeId::of::<T>()) || self.by_name.contains_key(name) {
            return Err(EcsError::ComponentAlreadyRegistered {
                name: name.to_owned(),
            });
        }
        let component_type = ComponentType::from_index(self.slots.len()).ok_or(
            EcsError::TooManyComponentTypes {
                max: MAX_COMPONENT_TYPE,
            },
        )?;

        self.slots.push(ComponentSlot {
            info: ComponentInfo::of::<T>(component_type, name),
            storage: Box::new(ComponentArray::<T>::with_capacity(self.initial_capacity)),
            vtable: ComponentVtable::new::<T>(),
        });
        self.by_type.insert(TypeId::of::<T>(), component_type);
        self.by_name.insert(name.to_owned(), component_type);
        tracing::debug!(
            component = %name,
            component_type = component_type.index(),
            "registered component type"
        );
        Ok(component_type)
    }

    // -- lookups ------------------------------------------------------------

    /// The [`ComponentType`] of `T`, if registered.
    #[inline]
    pub fn lookup<T: 'static>(&self) -> Option<ComponentType> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    pub(crate) fn lookup_type_id(&self, type_id: TypeId) -> Option<ComponentType> {
        self.by_type.get(&type_id).copied()
    }

    /// The [`ComponentType`] of `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotRegistered`] if `T` is unknown.
    pub fn component_type<T: 'static>(&self) -> Result<ComponentType, EcsError> {
        self.lookup::<T>()
            .ok_or_else(|| EcsError::ComponentNotRegistered {
                name: std::any::type_name::<T>().to_owned(),
            })
    }

    /// Resolve a registered name to its [`ComponentType`].
    pub fn component_type_by_name(&self, name: &str) -> Option<ComponentType> {
        self.by_name.get(name).copied()
    }

    /// Metadata of a registered component type.
    pub fn component_info(&self, component_type: ComponentType) -> Result<&ComponentInfo, EcsError> {
        self.slot(component_type).map(|s| &s.info)
    }

    /// Metadata of every registered type, in registration order.
    pub fn infos(&self) -> impl Iterator<Item = &ComponentInfo> + '_ {
        self.slots.iter().map(|s| &s.info)
    }

    /// Number of registered component types.
    pub fn registered_count(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, component_type: ComponentType) -> Result<&ComponentSlot, EcsError> {
        self.slots
            .get(component_type.index())
            .ok_or(EcsError::UnknownComponentType { component_type })
    }

    fn slot_mut(&mut self, component_type: ComponentType) -> Result<&mut ComponentSlot, EcsError> {
        self.slots
            .get_mut(component_type.index())
            .ok_or(EcsError::UnknownComponentType { component_type })
    }

    fn name_of(&self, component_type: ComponentType) -> String {
        self.slots
            .get(component_type.index())
            .map_or_else(|| component_type.to_string(), |s| s.info.name.clone())
    }

    // -- typed access -------------------------------------------------------

    /// Shared access to the whole array of `T`.
    pub fn array<T: Component>(&self) -> Result<&ComponentArray<T>, EcsError> {
        let ty = self.component_type::<T>()?;
        self.slot(ty)?
            .storage
            .downcast_ref::<ComponentArray<T>>()
            .ok_or_else(|| self.mismatch::<T>(ty))
    }

    /// Exclusive access to the whole array of `T`.
    pub fn array_mut<T: Component>(&mut self) -> Result<&mut ComponentArray<T>, EcsError> {
        let ty = self.component_type::<T>()?;
        let expected = std::any::type_name::<T>();
        self.slot_mut(ty)?
            .storage
            .downcast_mut::<ComponentArray<T>>()
            .ok_or(EcsError::TypeMismatch {
                expected,
                component_type: ty,
            })
    }

    fn mismatch<T>(&self, component_type: ComponentType) -> EcsError {
        EcsError::TypeMismatch {
            expected: std::any::type_name::<T>(),
            component_type,
        }
    }

    /// Store `value` for `entity`. Returns the component's type index.
    ///
    /// # Errors
    ///
    /// - [`EcsError::ComponentNotRegistered`] if `T` is unknown.
    /// - [`EcsError::ComponentAlreadyPresent`] if `entity` already owns a `T`.
    pub fn add_component<T: Component>(
        &mut self,
        entity: Entity,
        value: T,
    ) -> Result<ComponentType, EcsError> {
        let ty = self.component_type::<T>()?;
        let arr = self.array_mut::<T>()?;
        if arr.insert(entity, value).is_err() {
            return Err(EcsError::ComponentAlreadyPresent {
                entity,
                component: self.name_of(ty),
            });
        }
        Ok(ty)
    }

    /// Remove and return `entity`'s `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotFound`] if `entity` has no `T`.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<T, EcsError> {
        let ty = self.component_type::<T>()?;
        let removed = self.array_mut::<T>()?.remove(entity);
        removed.ok_or_else(|| EcsError::ComponentNotFound {
            entity,
            component: self.name_of(ty),
        })
    }

    /// Shared access to `entity`'s `T`.
    pub fn get_component<T: Component>(&self, entity: Entity) -> Result<&T, EcsError> {
        let ty = self.component_type::<T>()?;
        self.array::<T>()?
            .get(entity)
            .ok_or_else(|| EcsError::ComponentNotFound {
                entity,
                component: self.name_of(ty),
            })
    }

    /// Exclusive access to `entity`'s `T`.
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T, EcsError> {
        let ty = self.component_type::<T>()?;
        let component = self.name_of(ty);
        self.array_mut::<T>()?
            .get_mut(entity)
            .ok_or(EcsError::ComponentNotFound { entity, component })
    }

    /// `entity`'s `T`, or `None` if it has none or `T` is unregistered.
    pub fn try_get_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.array::<T>().ok()?.get(entity)
    }

    /// Mutable variant of [`try_get_component`](Self::try_get_component).
    pub fn try_get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.array_mut::<T>().ok()?.get_mut(entity)
    }

    /// Whether `entity` owns a `T`.
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.try_get_component::<T>(entity).is_some()
    }

    // -- lifecycle hooks ----------------------------------------------------

    /// Drop every component flagged in `signature` for a destroyed entity.
    pub fn entity_destroyed(&mut self, entity: Entity, signature: Signature) {
        for ty in signature.iter() {
            if let Some(slot) = self.slots.get_mut(ty.index()) {
                (slot.vtable.remove)(slot.storage.as_mut(), entity);
            }
        }
    }

    /// Clone `src`'s component of type `component_type` into a new slot for `dst`.
    ///
    /// # Errors
    ///
    /// - [`EcsError::ComponentNotFound`] if `src` has no such component.
    /// - [`EcsError::ComponentAlreadyPresent`] if `dst` already has one.
    pub fn duplicate_component(
        &mut self,
        component_type: ComponentType,
        src: Entity,
        dst: Entity,
    ) -> Result<(), EcsError> {
        let slot = self.slot_mut(component_type)?;
        let storage = slot.storage.as_mut();
        if !(slot.vtable.has)(storage, src) {
            return Err(EcsError::ComponentNotFound {
                entity: src,
                component: slot.info.name.clone(),
            });
        }
        if (slot.vtable.has)(storage, dst) {
            return Err(EcsError::ComponentAlreadyPresent {
                entity: dst,
                component: slot.info.name.clone(),
            });
        }
        (slot.vtable.duplicate)(storage, src, dst);
        Ok(())
    }

    // -- erased access ------------------------------------------------------

    /// Whether `entity` owns a component of `component_type`.
    pub fn has_component_erased(
        &self,
        component_type: ComponentType,
        entity: Entity,
    ) -> Result<bool, EcsError> {
        let slot = self.slot(component_type)?;
        Ok((slot.vtable.has)(slot.storage.as_ref(), entity))
    }

    /// `entity`'s component of `component_type` as `&dyn Any`.
    pub fn get_component_erased(
        &self,
        component_type: ComponentType,
        entity: Entity,
    ) -> Result<&dyn Any, EcsError> {
        let slot = self.slot(component_type)?;
        (slot.vtable.get)(slot.storage.as_ref(), entity).ok_or_else(|| {
            EcsError::ComponentNotFound {
                entity,
                component: slot.info.name.clone(),
            }
        })
    }

    /// `entity`'s component of `component_type` as `&mut dyn Any`.
    pub fn get_component_erased_mut(
        &mut self,
        component_type: ComponentType,
        entity: Entity,
    ) -> Result<&mut dyn Any, EcsError> {
        let slot = self.slot_mut(component_type)?;
        let component = slot.info.name.clone();
        (slot.vtable.get_mut)(slot.storage.as_mut(), entity)
            .ok_or(EcsError::ComponentNotFound { entity, component })
    }

    /// Store a boxed value of the registered type for `entity`.
    ///
    /// # Errors
    ///
    /// - [`EcsError::TypeMismatch`] if `value` is not of the registered type.
    /// - [`EcsError::ComponentAlreadyPresent`] if `entity` already owns one.
    pub fn add_component_erased(
        &mut self,
        component_type: ComponentType,
        entity: Entity,
        value: Box<dyn Any>,
    ) -> Result<(), EcsError> {
        let slot = self.slot_mut(component_type)?;
        (slot.vtable.insert)(slot.storage.as_mut(), entity, value).map_err(|e| match e {
            ErasedInsertError::AlreadyPresent => EcsError::ComponentAlreadyPresent {
                entity,
                component: slot.info.name.clone(),
            },
            ErasedInsertError::TypeMismatch => EcsError::TypeMismatch {
                expected: slot.info.type_name,
                component_type,
            },
        })
    }

    /// Remove `entity`'s component of `component_type`, returning it boxed.
    pub fn remove_component_erased(
        &mut self,
        component_type: ComponentType,
        entity: Entity,
    ) -> Result<Box<dyn Any>, EcsError> {
        let slot = self.slot_mut(component_type)?;
        let component = slot.info.name.clone();
        (slot.vtable.remove)(slot.storage.as_mut(), entity)
            .ok_or(EcsError::ComponentNotFound { entity, component })
    }

    /// Capture `entity`'s component of `component_type` as a JSON memento.
    pub fn save_component(
        &self,
        entity: Entity,
        component_type: ComponentType,
    ) -> Result<serde_json::Value, EcsError> {
        let slot = self.slot(component_type)?;
        match (slot.vtable.save)(slot.storage.as_ref(), entity) {
            Some(Ok(value)) => Ok(value),
            Some(Err(e)) => Err(EcsError::ComponentSerialization {
                component: slot.info.name.clone(),
                details: e.to_string(),
            }),
            None => Err(EcsError::ComponentNotFound {
                entity,
                component: slot.info.name.clone(),
            }),
        }
    }

    /// Decode `value` and store it for `entity`, replacing any existing value.
    ///
    /// Returns `true` when the entity did not own this component before.
    pub fn restore_component(
        &mut self,
        entity: Entity,
        component_type: ComponentType,
        value: &serde_json::Value,
    ) -> Result<bool, EcsError> {
        let slot = self.slot_mut(component_type)?;
        (slot.vtable.restore)(slot.storage.as_mut(), entity, value).map_err(|e| {
            EcsError::ComponentDeserialization {
                component: slot.info.name.clone(),
                details: e.to_string(),
            }
        })
    }

    /// Entities owning a component of `component_type`, in slot order.
    pub fn entities_with_component(
        &self,
        component_type: ComponentType,
    ) -> Result<&[Entity], EcsError> {
        let slot = self.slot(component_type)?;
        Ok((slot.vtable.entities)(slot.storage.as_ref()))
    }

    /// Number of stored components of `component_type`.
    pub fn count(&self, component_type: ComponentType) -> Result<usize, EcsError> {
        let slot = self.slot(component_type)?;
        Ok((slot.vtable.len)(slot.storage.as_ref()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
