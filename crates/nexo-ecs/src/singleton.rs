//! Storage for at most one instance of each singleton component type.
//!
//! Singletons are global to a coordinator: they belong to no entity and
//! never appear in signatures. Typical uses are frame timing, input state or
//! the active camera.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use crate::EcsError;

/// Map from `TypeId` to the single live value of that type.
#[derive(Default)]
pub struct SingletonComponentManager {
    values: HashMap<TypeId, Box<dyn Any>>,
}

impl fmt::Debug for SingletonComponentManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SingletonComponentManager")
            .field("count", &self.values.len())
            .finish()
    }
}

fn not_registered<T>() -> EcsError {
    EcsError::SingletonNotRegistered {
        name: std::any::type_name::<T>().to_owned(),
    }
}

impl SingletonComponentManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value`, returning the previous instance of `T` if there was one.
    pub fn register<T: 'static>(&mut self, value: T) -> Option<T> {
        let previous = self.values.insert(TypeId::of::<T>(), Box::new(value))?;
        previous.downcast::<T>().ok().map(|b| *b)
    }

    /// Shared access to the instance of `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SingletonNotRegistered`] if no `T` is stored.
    pub fn get<T: 'static>(&self) -> Result<&T, EcsError> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|b| b.downcast_ref::<T>())
            .ok_or_else(not_registered::<T>)
    }

    /// Exclusive access to the instance of `T`.
    pub fn get_mut<T: 'static>(&mut self) -> Result<&mut T, EcsError> {
        self.values
            .get_mut(&TypeId::of::<T>())
            .and_then(|b| b.downcast_mut::<T>())
            .ok_or_else(not_registered::<T>)
    }

    /// Remove and return the instance of `T`.
    pub fn unregister<T: 'static>(&mut self) -> Result<T, EcsError> {
        self.values
            .remove(&TypeId::of::<T>())
            .and_then(|b| b.downcast::<T>().ok())
            .map(|b| *b)
            .ok_or_else(not_registered::<T>)
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.values.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
