//! Nexo Scene -- scene partitioning for the Nexo ECS.
//!
//! A scene is a named group of entities with an active flag (simulated) and
//! a render flag (drawn). Members carry a [`SceneTag`](tag::SceneTag)
//! component mirroring those flags, so any system can filter them without
//! going through the manager.
//!
//! # Quick Start
//!
//! ```
//! use nexo_ecs::prelude::*;
//! use nexo_scene::prelude::*;
//!
//! let mut coord = Coordinator::new();
//! let mut scenes = SceneManager::new(&mut coord).unwrap();
//!
//! let level = scenes.create_scene(&mut coord, "level 1").unwrap();
//! let player = coord.create_entity().unwrap();
//! scenes.add_entity_to_scene(&mut coord, player, level).unwrap();
//!
//! scenes.set_scene_active_status(&mut coord, level, false).unwrap();
//! assert!(scenes.active_entities(&coord, level).unwrap().is_empty());
//! assert_eq!(scenes.rendered_entities(&coord, level).unwrap(), vec![player]);
//! ```

#![deny(unsafe_code)]

pub mod manager;
pub mod scene;
pub mod tag;

use nexo_ecs::entity::Entity;
use nexo_ecs::EcsError;

use tag::SceneId;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by scene operations.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("scene {id} does not exist")]
    SceneNotFound { id: SceneId },

    /// An entity can belong to one scene at a time.
    #[error("entity {entity} already belongs to scene {scene}")]
    AlreadyInScene { entity: Entity, scene: SceneId },

    #[error("entity {entity} is not in scene {scene}")]
    NotInScene { entity: Entity, scene: SceneId },

    #[error(transparent)]
    Ecs(#[from] EcsError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::manager::{SceneIdAllocator, SceneManager, SceneMembership};
    pub use crate::scene::Scene;
    pub use crate::tag::{SceneId, SceneTag};
    pub use crate::SceneError;
}
