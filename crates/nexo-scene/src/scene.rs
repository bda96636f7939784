//! Scene metadata.

use crate::tag::{SceneId, SceneTag};

/// Name and status flags of one scene.
///
/// Membership is not stored here: an entity belongs to a scene exactly when
/// it carries a [`SceneTag`] with the scene's id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scene {
    id: SceneId,
    name: String,
    active: bool,
    rendered: bool,
}

impl Scene {
    pub(crate) fn new(id: SceneId, name: String) -> Self {
        Self {
            id,
            name,
            active: true,
            rendered: true,
        }
    }

    pub fn id(&self) -> SceneId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_rendered(&self) -> bool {
        self.rendered
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub(crate) fn set_rendered(&mut self, rendered: bool) {
        self.rendered = rendered;
    }

    /// The tag a newly added member receives.
    pub fn tag(&self) -> SceneTag {
        SceneTag {
            id: self.id,
            is_active: self.active,
            is_rendered: self.rendered,
        }
    }
}
