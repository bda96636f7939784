//! The scene tag component.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a scene within one [`SceneManager`](crate::manager::SceneManager).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SceneId(pub u32);

impl fmt::Debug for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SceneId({})", self.0)
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Marks an entity as a member of a scene and mirrors the scene's flags.
///
/// The flags are copied from the scene when the entity joins and rewritten
/// whenever the scene's status changes, so renderers and physics can filter
/// on the tag alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneTag {
    pub id: SceneId,
    pub is_active: bool,
    pub is_rendered: bool,
}

impl SceneTag {
    pub fn new(id: SceneId) -> Self {
        Self {
            id,
            is_active: true,
            is_rendered: true,
        }
    }
}
