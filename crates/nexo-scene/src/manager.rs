//! Scene bookkeeping on top of a [`Coordinator`].
//!
//! Scene membership lives in the ECS itself: members carry a [`SceneTag`],
//! and the [`SceneMembership`] system (signature `{SceneTag}`) keeps the set
//! of tagged entities up to date. Per-scene queries filter that set by tag id,
//! so destroying an entity anywhere removes it from its scene too.
//!
//! Scene ids come from a [`SceneIdAllocator`] singleton on the coordinator,
//! so several managers sharing one coordinator never issue the same id.

use std::collections::BTreeMap;

use nexo_ecs::prelude::*;
use tracing::{debug, warn};

use crate::scene::Scene;
use crate::tag::{SceneId, SceneTag};
use crate::SceneError;

/// Filter system matching every entity that carries a [`SceneTag`].
#[derive(Debug, Default)]
pub struct SceneMembership;

impl System for SceneMembership {}

/// Coordinator singleton handing out scene ids.
#[derive(Debug, Default)]
pub struct SceneIdAllocator {
    next: u32,
}

impl SceneIdAllocator {
    /// The next unused id.
    pub fn allocate(&mut self) -> SceneId {
        let id = SceneId(self.next);
        self.next += 1;
        id
    }
}

/// Owns scene metadata and routes membership changes to the coordinator.
#[derive(Debug)]
pub struct SceneManager {
    scenes: BTreeMap<SceneId, Scene>,
}

impl SceneManager {
    /// Register [`SceneTag`], [`SceneMembership`] and the
    /// [`SceneIdAllocator`] singleton with `coord` unless they already are.
    pub fn new(coord: &mut Coordinator) -> Result<Self, SceneError> {
        if coord.component_type::<SceneTag>().is_err() {
            coord.register_component_named::<SceneTag>("scene_tag")?;
        }
        if !coord.systems().contains::<SceneMembership>() {
            coord.register_system(SceneMembership)?;
            coord.set_system_signature_of::<SceneMembership, (SceneTag,)>()?;
        }
        if !coord.has_singleton_component::<SceneIdAllocator>() {
            coord.register_singleton_component(SceneIdAllocator::default());
        }
        Ok(Self {
            scenes: BTreeMap::new(),
        })
    }

    // -- scene lifecycle ----------------------------------------------------

    /// Create an empty, active and rendered scene.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::Ecs`] if the [`SceneIdAllocator`] singleton was
    /// unregistered from `coord`.
    pub fn create_scene(
        &mut self,
        coord: &mut Coordinator,
        name: impl Into<String>,
    ) -> Result<SceneId, SceneError> {
        let id = coord
            .get_singleton_component_mut::<SceneIdAllocator>()?
            .allocate();
        let scene = Scene::new(id, name.into());
        debug!(scene = %id, name = scene.name(), "created scene");
        self.scenes.insert(id, scene);
        Ok(id)
    }

    /// Delete a scene and destroy every entity in it. Returns how many
    /// entities were destroyed.
    pub fn delete_scene(
        &mut self,
        coord: &mut Coordinator,
        id: SceneId,
    ) -> Result<usize, SceneError> {
        let members = self.entities(coord, id)?;
        self.scenes.remove(&id);
        for &entity in &members {
            coord.destroy_entity(entity)?;
        }
        debug!(scene = %id, destroyed = members.len(), "deleted scene");
        Ok(members.len())
    }

    /// The scene registered under `id`, if any.
    pub fn scene(&self, id: SceneId) -> Option<&Scene> {
        self.scenes.get(&id)
    }

    fn scene_or_err(&self, id: SceneId) -> Result<&Scene, SceneError> {
        self.scenes.get(&id).ok_or(SceneError::SceneNotFound { id })
    }

    fn scene_mut_or_err(&mut self, id: SceneId) -> Result<&mut Scene, SceneError> {
        self.scenes
            .get_mut(&id)
            .ok_or(SceneError::SceneNotFound { id })
    }

    /// Ids of every scene, ascending.
    pub fn scene_ids(&self) -> Vec<SceneId> {
        self.scenes.keys().copied().collect()
    }

    /// Change a scene's display name.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::SceneNotFound`] if `id` is unknown.
    pub fn rename_scene(&mut self, id: SceneId, name: impl Into<String>) -> Result<(), SceneError> {
        self.scene_mut_or_err(id)?.set_name(name.into());
        Ok(())
    }

    // -- membership ---------------------------------------------------------

    /// Attach a [`SceneTag`] carrying the scene's current flags.
    ///
    /// # Errors
    ///
    /// - [`SceneError::SceneNotFound`] if `id` is unknown.
    /// - [`SceneError::AlreadyInScene`] if `entity` already has a tag.
    /// - [`SceneError::Ecs`] if `entity` is not alive.
    pub fn add_entity_to_scene(
        &self,
        coord: &mut Coordinator,
        entity: Entity,
        id: SceneId,
    ) -> Result<(), SceneError> {
        let tag = self.scene_or_err(id)?.tag();
        if let Some(existing) = coord.try_get_component::<SceneTag>(entity) {
            return Err(SceneError::AlreadyInScene {
                entity,
                scene: existing.id,
            });
        }
        coord.add_component(entity, tag)?;
        Ok(())
    }

    /// Detach `entity`'s [`SceneTag`].
    ///
    /// # Errors
    ///
    /// - [`SceneError::SceneNotFound`] if `id` is unknown.
    /// - [`SceneError::Ecs`] if `entity` is not alive.
    /// - [`SceneError::NotInScene`] unless `entity` belongs to `id`.
    pub fn remove_entity_from_scene(
        &self,
        coord: &mut Coordinator,
        entity: Entity,
        id: SceneId,
    ) -> Result<(), SceneError> {
        self.scene_or_err(id)?;
        if !coord.is_alive(entity) {
            return Err(EcsError::EntityNotAlive { entity }.into());
        }
        match coord.try_get_component::<SceneTag>(entity) {
            Some(tag) if tag.id == id => {
                coord.remove_component::<SceneTag>(entity)?;
                Ok(())
            }
            _ => Err(SceneError::NotInScene { entity, scene: id }),
        }
    }

    // -- status flags -------------------------------------------------------

    /// Set the scene's active flag and rewrite the tag of every member.
    pub fn set_scene_active_status(
        &mut self,
        coord: &mut Coordinator,
        id: SceneId,
        active: bool,
    ) -> Result<(), SceneError> {
        self.scene_mut_or_err(id)?.set_active(active);
        let members = self.entities(coord, id)?;
        rewrite_tags(coord, &members, |tag| tag.is_active = active);
        Ok(())
    }

    /// Set the scene's render flag and rewrite the tag of every member.
    pub fn set_scene_render_status(
        &mut self,
        coord: &mut Coordinator,
        id: SceneId,
        rendered: bool,
    ) -> Result<(), SceneError> {
        self.scene_mut_or_err(id)?.set_rendered(rendered);
        let members = self.entities(coord, id)?;
        rewrite_tags(coord, &members, |tag| tag.is_rendered = rendered);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`SceneError::SceneNotFound`] if `id` is unknown.
    pub fn is_scene_active(&self, id: SceneId) -> Result<bool, SceneError> {
        self.scene_or_err(id).map(Scene::is_active)
    }

    /// # Errors
    ///
    /// Returns [`SceneError::SceneNotFound`] if `id` is unknown.
    pub fn is_scene_rendered(&self, id: SceneId) -> Result<bool, SceneError> {
        self.scene_or_err(id).map(Scene::is_rendered)
    }

    // -- queries ------------------------------------------------------------

    /// Members of scene `id` whose tag satisfies `pred`.
    fn members_where(
        &self,
        coord: &Coordinator,
        id: SceneId,
        pred: impl Fn(&SceneTag) -> bool,
    ) -> Result<Vec<Entity>, SceneError> {
        self.scene_or_err(id)?;
        tagged_where(coord, |tag| tag.id == id && pred(tag))
    }

    /// Every entity of scene `id`.
    pub fn entities(&self, coord: &Coordinator, id: SceneId) -> Result<Vec<Entity>, SceneError> {
        self.members_where(coord, id, |_| true)
    }

    /// Entities of scene `id` whose tag is active.
    pub fn active_entities(
        &self,
        coord: &Coordinator,
        id: SceneId,
    ) -> Result<Vec<Entity>, SceneError> {
        self.members_where(coord, id, |tag| tag.is_active)
    }

    /// Entities of scene `id` whose tag is rendered.
    pub fn rendered_entities(
        &self,
        coord: &Coordinator,
        id: SceneId,
    ) -> Result<Vec<Entity>, SceneError> {
        self.members_where(coord, id, |tag| tag.is_rendered)
    }

    /// Active entities across every scene of this manager.
    pub fn all_active_entities(&self, coord: &Coordinator) -> Result<Vec<Entity>, SceneError> {
        tagged_where(coord, |tag| tag.is_active && self.scenes.contains_key(&tag.id))
    }

    /// Narrow `entities` (typically another system's matched set) to the
    /// members of scene `id`.
    pub fn filter_entities(
        &self,
        coord: &Coordinator,
        entities: &[Entity],
        id: SceneId,
    ) -> Result<Vec<Entity>, SceneError> {
        self.scene_or_err(id)?;
        Ok(entities
            .iter()
            .copied()
            .filter(|&e| {
                coord
                    .try_get_component::<SceneTag>(e)
                    .is_some_and(|tag| tag.id == id)
            })
            .collect())
    }
}

/// Tagged entities whose tag satisfies `pred`, in membership-set order.
fn tagged_where(
    coord: &Coordinator,
    pred: impl Fn(&SceneTag) -> bool,
) -> Result<Vec<Entity>, SceneError> {
    let tagged = coord.system_entities::<SceneMembership>()?;
    Ok(tagged
        .iter()
        .copied()
        .filter(|&e| coord.try_get_component::<SceneTag>(e).is_some_and(&pred))
        .collect())
}

fn rewrite_tags(coord: &mut Coordinator, members: &[Entity], update: impl Fn(&mut SceneTag)) {
    for &entity in members {
        match coord.get_component_mut::<SceneTag>(entity) {
            Ok(tag) => update(tag),
            Err(e) => warn!(%entity, error = %e, "skipping scene member without a tag"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Coordinator, SceneManager) {
        let mut coord = Coordinator::new();
        let scenes = SceneManager::new(&mut coord).unwrap();
        (coord, scenes)
    }

    #[test]
    fn new_registers_tag_and_membership_system() {
        let (mut coord, _) = setup();
        assert!(coord.component_type::<SceneTag>().is_ok());
        assert!(coord.systems().contains::<SceneMembership>());
        assert!(coord.has_singleton_component::<SceneIdAllocator>());
        // A second manager on the same coordinator reuses the registrations.
        assert!(SceneManager::new(&mut coord).is_ok());
    }

    #[test]
    fn second_manager_continues_the_id_sequence() {
        let (mut coord, mut first) = setup();
        first.create_scene(&mut coord, "a").unwrap();
        let mut second = SceneManager::new(&mut coord).unwrap();
        assert_eq!(second.create_scene(&mut coord, "b").unwrap(), SceneId(1));
        assert_eq!(first.create_scene(&mut coord, "c").unwrap(), SceneId(2));
    }

    #[test]
    fn scene_ids_are_sequential() {
        let (mut coord, mut scenes) = setup();
        let a = scenes.create_scene(&mut coord, "a").unwrap();
        let b = scenes.create_scene(&mut coord, "b").unwrap();
        assert_eq!(a, SceneId(0));
        assert_eq!(b, SceneId(1));
        assert_eq!(scenes.scene_ids(), vec![a, b]);
        assert_eq!(scenes.scene(b).unwrap().name(), "b");
    }

    #[test]
    fn rename_scene() {
        let (mut coord, mut scenes) = setup();
        let id = scenes.create_scene(&mut coord, "old").unwrap();
        scenes.rename_scene(id, "new").unwrap();
        assert_eq!(scenes.scene(id).unwrap().name(), "new");
        assert!(matches!(
            scenes.rename_scene(SceneId(99), "x"),
            Err(SceneError::SceneNotFound { .. })
        ));
    }

    #[test]
    fn add_copies_current_flags() {
        let (mut coord, mut scenes) = setup();
        let id = scenes.create_scene(&mut coord, "level").unwrap();
        scenes.set_scene_render_status(&mut coord, id, false).unwrap();

        let e = coord.create_entity().unwrap();
        scenes.add_entity_to_scene(&mut coord, e, id).unwrap();
        let tag = coord.get_component::<SceneTag>(e).unwrap();
        assert_eq!(tag.id, id);
        assert!(tag.is_active);
        assert!(!tag.is_rendered);
    }
}
