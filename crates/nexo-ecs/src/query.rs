//! Ad-hoc entity filters by component type.
//!
//! [`ComponentSet`] turns a tuple of component types into a [`Signature`].
//! [`Query`] adds exclusion on top: it matches living entities that own every
//! required type and none of the excluded ones.
//!
//! ```
//! use nexo_ecs::prelude::*;
//!
//! #[derive(Clone, serde::Serialize, serde::Deserialize)]
//! struct Position(f32, f32);
//! #[derive(Clone, serde::Serialize, serde::Deserialize)]
//! struct Frozen;
//!
//! let mut coord = Coordinator::new();
//! coord.register_component::<Position>().unwrap();
//! coord.register_component::<Frozen>().unwrap();
//!
//! let moving = coord.create_entity().unwrap();
//! coord.add_component(moving, Position(0.0, 0.0)).unwrap();
//! let stuck = coord.create_entity().unwrap();
//! coord.add_component(stuck, Position(1.0, 1.0)).unwrap();
//! coord.add_component(stuck, Frozen).unwrap();
//!
//! let query = Query::new().with::<Position>().without::<Frozen>();
//! assert_eq!(coord.entities_with(&query).unwrap(), vec![moving]);
//! ```

use std::any::TypeId;

use crate::component::Component;
use crate::component_manager::ComponentManager;
use crate::signature::Signature;
use crate::EcsError;

// ---------------------------------------------------------------------------
// ComponentSet
// ---------------------------------------------------------------------------

/// A statically known group of component types.
pub trait ComponentSet: 'static {
    /// The signature with one bit per member type.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotRegistered`] if any member is unknown.
    fn signature(components: &ComponentManager) -> Result<Signature, EcsError>;
}

impl ComponentSet for () {
    fn signature(_: &ComponentManager) -> Result<Signature, EcsError> {
        Ok(Signature::EMPTY)
    }
}

impl<A: Component> ComponentSet for (A,) {
    fn signature(components: &ComponentManager) -> Result<Signature, EcsError> {
        Ok(Signature::from_types(&[components.component_type::<A>()?]))
    }
}

impl<A: Component, B: Component> ComponentSet for (A, B) {
    fn signature(components: &ComponentManager) -> Result<Signature, EcsError> {
        Ok(Signature::from_types(&[
            components.component_type::<A>()?,
            components.component_type::<B>()?,
        ]))
    }
}

impl<A: Component, B: Component, C: Component> ComponentSet for (A, B, C) {
    fn signature(components: &ComponentManager) -> Result<Signature, EcsError> {
        Ok(Signature::from_types(&[
            components.component_type::<A>()?,
            components.component_type::<B>()?,
            components.component_type::<C>()?,
        ]))
    }
}

impl<A: Component, B: Component, C: Component, D: Component> ComponentSet for (A, B, C, D) {
    fn signature(components: &ComponentManager) -> Result<Signature, EcsError> {
        Ok(Signature::from_types(&[
            components.component_type::<A>()?,
            components.component_type::<B>()?,
            components.component_type::<C>()?,
            components.component_type::<D>()?,
        ]))
    }
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TypeKey {
    type_id: TypeId,
    name: &'static str,
}

impl TypeKey {
    fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }
}

/// Required/excluded component filter, built before the types are resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    required: Vec<TypeKey>,
    excluded: Vec<TypeKey>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require component `T`.
    pub fn with<T: Component>(mut self) -> Self {
        self.required.push(TypeKey::of::<T>());
        self
    }

    /// Reject entities owning component `T`.
    pub fn without<T: Component>(mut self) -> Self {
        self.excluded.push(TypeKey::of::<T>());
        self
    }

    /// Resolve the type lists into signatures.
    ///
    /// Excluded types that were never registered cannot be owned by anyone
    /// and are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotRegistered`] for an unknown required type.
    pub fn resolve(&self, components: &ComponentManager) -> Result<QueryFilter, EcsError> {
        let mut required = Signature::new();
        for key in &self.required {
            let ty = components.lookup_type_id(key.type_id).ok_or_else(|| {
                EcsError::ComponentNotRegistered {
                    name: key.name.to_owned(),
                }
            })?;
            required.set(ty);
        }
        let mut excluded = Signature::new();
        for ty in self
            .excluded
            .iter()
            .filter_map(|key| components.lookup_type_id(key.type_id))
        {
            excluded.set(ty);
        }
        Ok(QueryFilter { required, excluded })
    }
}

/// A [`Query`] resolved against a component registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryFilter {
    pub required: Signature,
    pub excluded: Signature,
}

impl QueryFilter {
    /// Whether an entity with `signature` passes the filter.
    #[inline]
    pub fn matches(&self, signature: &Signature) -> bool {
        signature.contains(&self.required) && !signature.intersects(&self.excluded)
    }
}
