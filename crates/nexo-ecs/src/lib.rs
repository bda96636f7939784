//! Nexo ECS -- signature-based Entity Component System.
//!
//! Entities are plain recycled ids. Each component type lives in its own
//! densely packed array, and every entity carries a bitset signature of the
//! component types it owns. Systems declare a required signature and the
//! [`Coordinator`](coordinator::Coordinator) keeps each system's entity set
//! up to date as components come and go.
//!
//! # Quick Start
//!
//! ```
//! use nexo_ecs::prelude::*;
//!
//! #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
//! struct Position { x: f32, y: f32 }
//!
//! #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
//! struct Velocity { dx: f32, dy: f32 }
//!
//! struct Movement;
//!
//! impl System for Movement {
//!     fn update(&mut self, coord: &mut Coordinator, entities: &[Entity]) -> Result<(), EcsError> {
//!         for &e in entities {
//!             let v = coord.get_component::<Velocity>(e)?.clone();
//!             let p = coord.get_component_mut::<Position>(e)?;
//!             p.x += v.dx;
//!             p.y += v.dy;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let mut coord = Coordinator::new();
//! coord.register_component::<Position>().unwrap();
//! coord.register_component::<Velocity>().unwrap();
//! coord.register_system(Movement).unwrap();
//! coord.set_system_signature_of::<Movement, (Position, Velocity)>().unwrap();
//!
//! let e = coord.create_entity().unwrap();
//! coord.add_component(e, Position { x: 0.0, y: 0.0 }).unwrap();
//! coord.add_component(e, Velocity { dx: 1.0, dy: 2.0 }).unwrap();
//!
//! coord.run_system::<Movement>().unwrap();
//! assert_eq!(coord.get_component::<Position>(e).unwrap(), &Position { x: 1.0, y: 2.0 });
//! ```

#![deny(unsafe_code)]

pub mod component;
pub mod component_manager;
pub mod config;
pub mod coordinator;
pub mod entity;
pub mod group;
pub mod query;
pub mod signature;
pub mod singleton;
pub mod sparse_set;
pub mod system;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by ECS operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// The living-entity limit was reached.
    #[error("too many living entities (limit {max})")]
    TooManyEntities { max: u32 },

    /// Every component type index is taken.
    #[error("too many component types (limit {max})")]
    TooManyComponentTypes { max: usize },

    /// The entity was never created or has been destroyed.
    #[error("entity {entity} is not alive")]
    EntityNotAlive { entity: entity::Entity },

    #[error("component type '{name}' is already registered")]
    ComponentAlreadyRegistered { name: String },

    /// Adding a component never overwrites; remove it first.
    #[error("entity {entity} already has component '{component}'")]
    ComponentAlreadyPresent {
        entity: entity::Entity,
        component: String,
    },

    #[error("system '{name}' is already registered")]
    SystemAlreadyRegistered { name: String },

    /// The entity is alive but does not own the component.
    #[error("entity {entity} has no component '{component}'")]
    ComponentNotFound {
        entity: entity::Entity,
        component: String,
    },

    #[error("component type '{name}' is not registered")]
    ComponentNotRegistered { name: String },

    #[error("no component type is registered with index {component_type}")]
    UnknownComponentType {
        component_type: signature::ComponentType,
    },

    #[error("singleton component '{name}' is not registered")]
    SingletonNotRegistered { name: String },

    #[error("system '{name}' is not registered")]
    SystemNotRegistered { name: String },

    /// An erased value did not have the registered Rust type.
    #[error("value for component type {component_type} is not a '{expected}'")]
    TypeMismatch {
        expected: &'static str,
        component_type: signature::ComponentType,
    },

    #[error("failed to serialize component '{component}': {details}")]
    ComponentSerialization { component: String, details: String },

    #[error("failed to deserialize component '{component}': {details}")]
    ComponentDeserialization { component: String, details: String },

    /// `run_system` was called for a system that is already running.
    #[error("system '{name}' is already running")]
    SystemBusy { name: String },

    #[error("invalid ECS configuration: {details}")]
    InvalidConfig { details: String },

    #[error("no group owns {owned:?} with non-owned {non_owned:?}")]
    GroupNotRegistered {
        owned: signature::Signature,
        non_owned: signature::Signature,
    },

    /// A component type can be owned by one group only.
    #[error("component type {component_type} is already owned by another group")]
    GroupOwnershipConflict {
        component_type: signature::ComponentType,
    },

    #[error("invalid group: {details}")]
    InvalidGroup { details: String },

    /// Sorting or partitioning by a type the group does not require.
    #[error("component '{component}' is not part of the group")]
    ComponentNotInGroup { component: String },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::component::{Component, ComponentArray, ComponentInfo};
    pub use crate::component_manager::ComponentManager;
    pub use crate::config::EcsConfig;
    pub use crate::coordinator::Coordinator;
    pub use crate::entity::{Entity, EntityManager};
    pub use crate::group::{Group, GroupKey, GroupManager, Partition, PartitionView, SortOrder};
    pub use crate::query::{ComponentSet, Query, QueryFilter};
    pub use crate::signature::{ComponentType, Signature, MAX_COMPONENT_TYPE};
    pub use crate::singleton::SingletonComponentManager;
    pub use crate::sparse_set::SparseSet;
    pub use crate::system::{System, SystemHandle, SystemManager};
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
