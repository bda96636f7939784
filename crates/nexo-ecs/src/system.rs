//! Systems and their incrementally maintained entity sets.
//!
//! A system declares a required [`Signature`]. The [`SystemManager`] keeps,
//! per system, the set of living entities whose signature is a superset of
//! it. The set is updated on every signature change, so a system never has
//! to scan the world to find its entities.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::coordinator::Coordinator;
use crate::entity::Entity;
use crate::signature::Signature;
use crate::sparse_set::SparseSet;
use crate::EcsError;

/// Shared handle to a registered system.
pub type SystemHandle<T> = Rc<RefCell<T>>;

/// Behavior unit run over the entities matching its signature.
pub trait System: 'static {
    /// Process `entities`, a snapshot of the matched set taken by
    /// [`Coordinator::run_system`].
    ///
    /// The coordinator is passed in so systems can read and write components,
    /// create or destroy entities, and reach singletons. The default does
    /// nothing, for systems used only as entity filters.
    fn update(
        &mut self,
        coordinator: &mut Coordinator,
        entities: &[Entity],
    ) -> Result<(), EcsError> {
        let _ = (coordinator, entities);
        Ok(())
    }
}

struct SystemSlot {
    name: &'static str,
    signature: Signature,
    entities: SparseSet,
    /// `Rc<RefCell<T>>` behind `dyn Any`.
    instance: Rc<dyn Any>,
}

/// Registry of systems keyed by their Rust type.
#[derive(Default)]
pub struct SystemManager {
    by_type: HashMap<TypeId, usize>,
    slots: Vec<SystemSlot>,
}

impl fmt::Debug for SystemManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.slots.iter().map(|s| (s.name, s.entities.len())))
            .finish()
    }
}

fn not_registered<T>() -> EcsError {
    EcsError::SystemNotRegistered {
        name: std::any::type_name::<T>().to_owned(),
    }
}

impl SystemManager {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `system`. It starts with an empty signature and no entities.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemAlreadyRegistered`] if a `T` is already stored.
    pub fn register<T: System>(&mut self, system: T) -> Result<SystemHandle<T>, EcsError> {
        let name = std::any::type_name::<T>();
        if self.by_type.contains_key(&TypeId::of::<T>()) {
            return Err(EcsError::SystemAlreadyRegistered {
                name: name.to_owned(),
            });
        }
        let handle: SystemHandle<T> = Rc::new(RefCell::new(system));
        self.by_type.insert(TypeId::of::<T>(), self.slots.len());
        self.slots.push(SystemSlot {
            name,
            signature: Signature::EMPTY,
            entities: SparseSet::new(),
            instance: handle.clone(),
        });
        tracing::debug!(system = name, "registered system");
        Ok(handle)
    }

    fn slot<T: 'static>(&self) -> Result<&SystemSlot, EcsError> {
        self.by_type
            .get(&TypeId::of::<T>())
            .map(|&i| &self.slots[i])
            .ok_or_else(not_registered::<T>)
    }

    /// Replace `T`'s required signature.
    ///
    /// Membership is not recomputed here; the coordinator re-evaluates every
    /// living entity afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotRegistered`] if `T` is unknown.
    pub fn set_signature<T: 'static>(&mut self, signature: Signature) -> Result<(), EcsError> {
        let idx = *self
            .by_type
            .get(&TypeId::of::<T>())
            .ok_or_else(not_registered::<T>)?;
        self.slots[idx].signature = signature;
        Ok(())
    }

    /// `T`'s required signature, empty until one is set.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotRegistered`] if `T` is unknown.
    pub fn signature<T: 'static>(&self) -> Result<Signature, EcsError> {
        self.slot::<T>().map(|s| s.signature)
    }

    /// Re-test `entity` against every system after its signature changed.
    ///
    /// A system with an empty required signature matches nothing.
    pub fn entity_signature_changed(&mut self, entity: Entity, signature: Signature) {
        for slot in &mut self.slots {
            if !slot.signature.is_empty() && signature.contains(&slot.signature) {
                slot.entities.insert(entity);
            } else {
                slot.entities.remove(entity);
            }
        }
    }

    /// Drop `entity` from every system's set.
    pub fn entity_destroyed(&mut self, entity: Entity) {
        for slot in &mut self.slots {
            slot.entities.remove(entity);
        }
    }

    /// Entities currently matched by `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemNotRegistered`] if `T` is unknown.
    pub fn entities<T: 'static>(&self) -> Result<&[Entity], EcsError> {
        self.slot::<T>().map(|s| s.entities.as_slice())
    }

    /// A new shared handle to the registered `T`.
    pub fn handle<T: System>(&self) -> Result<SystemHandle<T>, EcsError> {
        let slot = self.slot::<T>()?;
        Rc::clone(&slot.instance)
            .downcast::<RefCell<T>>()
            .map_err(|_| not_registered::<T>())
    }

    /// Whether a `T` has been registered.
    pub fn contains<T: 'static>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<T>())
    }

    /// Number of registered systems.
    pub fn system_count(&self) -> usize {
        self.slots.len()
    }

    /// Registered system type names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.slots.iter().map(|s| s.name)
    }
}
