//! Scene manager behavior against a live coordinator.

use std::collections::BTreeMap;

use nexo_ecs::prelude::*;
use nexo_scene::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct Renderable(u32);

struct RenderSystem;
impl System for RenderSystem {}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn setup() -> (Coordinator, SceneManager) {
    init_tracing();
    let mut coord = Coordinator::new();
    coord.register_component::<Renderable>().unwrap();
    let scenes = SceneManager::new(&mut coord).unwrap();
    (coord, scenes)
}

fn spawn_in(
    coord: &mut Coordinator,
    scenes: &SceneManager,
    id: SceneId,
    n: usize,
) -> Vec<Entity> {
    (0..n)
        .map(|_| {
            let e = coord.create_entity().unwrap();
            scenes.add_entity_to_scene(coord, e, id).unwrap();
            e
        })
        .collect()
}

#[test]
fn entities_are_partitioned_by_scene() {
    let (mut coord, mut scenes) = setup();
    let menu = scenes.create_scene(&mut coord, "menu").unwrap();
    let level = scenes.create_scene(&mut coord, "level").unwrap();
    let in_menu = spawn_in(&mut coord, &scenes, menu, 2);
    let in_level = spawn_in(&mut coord, &scenes, level, 3);
    let loose = coord.create_entity().unwrap();

    assert_eq!(scenes.entities(&coord, menu).unwrap(), in_menu);
    assert_eq!(scenes.entities(&coord, level).unwrap(), in_level);
    assert!(!scenes
        .all_active_entities(&coord)
        .unwrap()
        .contains(&loose));
    assert_eq!(scenes.all_active_entities(&coord).unwrap().len(), 5);
}

#[test]
fn an_entity_belongs_to_one_scene() {
    let (mut coord, mut scenes) = setup();
    let a = scenes.create_scene(&mut coord, "a").unwrap();
    let b = scenes.create_scene(&mut coord, "b").unwrap();
    let e = coord.create_entity().unwrap();
    scenes.add_entity_to_scene(&mut coord, e, a).unwrap();

    let err = scenes.add_entity_to_scene(&mut coord, e, b).unwrap_err();
    assert!(matches!(err, SceneError::AlreadyInScene { scene, .. } if scene == a));
    assert!(matches!(
        scenes.remove_entity_from_scene(&mut coord, e, b),
        Err(SceneError::NotInScene { .. })
    ));

    scenes.remove_entity_from_scene(&mut coord, e, a).unwrap();
    assert!(!coord.has_component::<SceneTag>(e));
    scenes.add_entity_to_scene(&mut coord, e, b).unwrap();
    assert_eq!(scenes.entities(&coord, b).unwrap(), vec![e]);
}

#[test]
fn unknown_scene_and_dead_entity_are_errors() {
    let (mut coord, mut scenes) = setup();
    let e = coord.create_entity().unwrap();
    assert!(matches!(
        scenes.add_entity_to_scene(&mut coord, e, SceneId(7)),
        Err(SceneError::SceneNotFound { .. })
    ));
    assert!(scenes.entities(&coord, SceneId(7)).is_err());

    let id = scenes.create_scene(&mut coord, "s").unwrap();
    coord.destroy_entity(e).unwrap();
    assert!(matches!(
        scenes.add_entity_to_scene(&mut coord, e, id),
        Err(SceneError::Ecs(EcsError::EntityNotAlive { .. }))
    ));
}

#[test]
fn removing_a_dead_entity_is_an_identity_error() {
    let (mut coord, mut scenes) = setup();
    let id = scenes.create_scene(&mut coord, "s").unwrap();
    let e = coord.create_entity().unwrap();
    scenes.add_entity_to_scene(&mut coord, e, id).unwrap();
    coord.destroy_entity(e).unwrap();

    assert!(matches!(
        scenes.remove_entity_from_scene(&mut coord, e, id),
        Err(SceneError::Ecs(EcsError::EntityNotAlive { entity })) if entity == e
    ));
}

#[test]
fn managers_sharing_a_coordinator_stay_apart() {
    let (mut coord, mut editor) = setup();
    let mut game = SceneManager::new(&mut coord).unwrap();
    let a = editor.create_scene(&mut coord, "editor").unwrap();
    let b = game.create_scene(&mut coord, "game").unwrap();
    assert_ne!(a, b);

    let tool = coord.create_entity().unwrap();
    editor.add_entity_to_scene(&mut coord, tool, a).unwrap();
    let player = coord.create_entity().unwrap();
    game.add_entity_to_scene(&mut coord, player, b).unwrap();

    game.set_scene_active_status(&mut coord, b, false).unwrap();
    assert!(coord.get_component::<SceneTag>(tool).unwrap().is_active);
    assert_eq!(game.entities(&coord, b).unwrap(), vec![player]);
    assert_eq!(editor.entities(&coord, a).unwrap(), vec![tool]);
    assert_eq!(editor.all_active_entities(&coord).unwrap(), vec![tool]);
    assert!(game.all_active_entities(&coord).unwrap().is_empty());
    // Scenes of one manager are unknown to the other.
    assert!(matches!(
        game.entities(&coord, a),
        Err(SceneError::SceneNotFound { .. })
    ));
}

#[test]
fn create_scene_needs_the_id_allocator() {
    let (mut coord, mut scenes) = setup();
    coord
        .unregister_singleton_component::<SceneIdAllocator>()
        .unwrap();
    assert!(matches!(
        scenes.create_scene(&mut coord, "orphan"),
        Err(SceneError::Ecs(EcsError::SingletonNotRegistered { .. }))
    ));
}

#[test]
fn status_changes_rewrite_member_tags() {
    let (mut coord, mut scenes) = setup();
    let id = scenes.create_scene(&mut coord, "level").unwrap();
    let members = spawn_in(&mut coord, &scenes, id, 3);

    scenes.set_scene_active_status(&mut coord, id, false).unwrap();
    assert!(!scenes.is_scene_active(id).unwrap());
    assert!(scenes.active_entities(&coord, id).unwrap().is_empty());
    assert_eq!(scenes.rendered_entities(&coord, id).unwrap(), members);
    for &e in &members {
        assert!(!coord.get_component::<SceneTag>(e).unwrap().is_active);
    }

    scenes.set_scene_render_status(&mut coord, id, false).unwrap();
    assert!(!scenes.is_scene_rendered(id).unwrap());
    assert!(scenes.rendered_entities(&coord, id).unwrap().is_empty());

    // Late joiners inherit the current flags.
    let late = coord.create_entity().unwrap();
    scenes.add_entity_to_scene(&mut coord, late, id).unwrap();
    let tag = coord.get_component::<SceneTag>(late).unwrap();
    assert!(!tag.is_active && !tag.is_rendered);

    scenes.set_scene_active_status(&mut coord, id, true).unwrap();
    assert_eq!(scenes.active_entities(&coord, id).unwrap().len(), 4);
}

#[test]
fn delete_scene_destroys_members_only() {
    let (mut coord, mut scenes) = setup();
    let doomed = scenes.create_scene(&mut coord, "doomed").unwrap();
    let kept = scenes.create_scene(&mut coord, "kept").unwrap();
    let gone = spawn_in(&mut coord, &scenes, doomed, 3);
    let stay = spawn_in(&mut coord, &scenes, kept, 2);

    assert_eq!(scenes.delete_scene(&mut coord, doomed).unwrap(), 3);
    assert!(scenes.scene(doomed).is_none());
    assert_eq!(scenes.scene_ids(), vec![kept]);
    for e in gone {
        assert!(!coord.is_alive(e));
    }
    let mut remaining = scenes.entities(&coord, kept).unwrap();
    remaining.sort();
    assert_eq!(remaining, stay);
    assert_eq!(coord.entity_count(), 2);
}

#[test]
fn destroyed_entities_leave_their_scene() {
    let (mut coord, mut scenes) = setup();
    let id = scenes.create_scene(&mut coord, "s").unwrap();
    let members = spawn_in(&mut coord, &scenes, id, 3);
    coord.destroy_entity(members[1]).unwrap();
    let remaining = scenes.entities(&coord, id).unwrap();
    assert_eq!(remaining.len(), 2);
    assert!(!remaining.contains(&members[1]));
}

#[test]
fn filter_narrows_another_systems_entities() {
    let (mut coord, mut scenes) = setup();
    coord.register_system(RenderSystem).unwrap();
    coord
        .set_system_signature_of::<RenderSystem, (Renderable,)>()
        .unwrap();

    let a = scenes.create_scene(&mut coord, "a").unwrap();
    let b = scenes.create_scene(&mut coord, "b").unwrap();
    let in_a = spawn_in(&mut coord, &scenes, a, 2);
    let in_b = spawn_in(&mut coord, &scenes, b, 2);
    for (i, &e) in in_a.iter().chain(&in_b).enumerate() {
        coord.add_component(e, Renderable(i as u32)).unwrap();
    }

    let matched = coord.system_entities::<RenderSystem>().unwrap().to_vec();
    assert_eq!(matched.len(), 4);
    assert_eq!(scenes.filter_entities(&coord, &matched, b).unwrap(), in_b);
}

// ---------------------------------------------------------------------------
// Property tests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum SceneOp {
    Spawn(usize),
    Move(usize, usize),
    Leave(usize),
    Destroy(usize),
}

const SCENES: usize = 3;

fn scene_op_strategy() -> impl Strategy<Value = SceneOp> {
    prop_oneof![
        (0..SCENES).prop_map(SceneOp::Spawn),
        (0..64usize, 0..SCENES).prop_map(|(e, s)| SceneOp::Move(e, s)),
        (0..64usize).prop_map(SceneOp::Leave),
        (0..64usize).prop_map(SceneOp::Destroy),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn membership_matches_model(ops in prop::collection::vec(scene_op_strategy(), 1..200)) {
        let (mut coord, mut scenes) = setup();
        let ids: Vec<SceneId> = (0..SCENES)
            .map(|i| scenes.create_scene(&mut coord, format!("s{i}")).unwrap())
            .collect();
        // entity -> scene index, `None` when alive without a scene.
        let mut model: BTreeMap<Entity, Option<usize>> = BTreeMap::new();

        for op in ops {
            match op {
                SceneOp::Spawn(s) => {
                    let e = coord.create_entity().unwrap();
                    scenes.add_entity_to_scene(&mut coord, e, ids[s]).unwrap();
                    model.insert(e, Some(s));
                }
                SceneOp::Move(pick, s) => {
                    if let Some((&e, current)) = model.iter_mut().nth(pick % 64) {
                        if let Some(old) = current.take() {
                            scenes.remove_entity_from_scene(&mut coord, e, ids[old]).unwrap();
                        }
                        scenes.add_entity_to_scene(&mut coord, e, ids[s]).unwrap();
                        *current = Some(s);
                    }
                }
                SceneOp::Leave(pick) => {
                    if let Some((&e, current)) = model.iter_mut().nth(pick % 64) {
                        match current.take() {
                            Some(old) => scenes.remove_entity_from_scene(&mut coord, e, ids[old]).unwrap(),
                            None => {
                                let refused = scenes.remove_entity_from_scene(&mut coord, e, ids[0]).is_err();
                                prop_assert!(refused);
                            }
                        }
                    }
                }
                SceneOp::Destroy(pick) => {
                    let victim = model.keys().nth(pick % 64).copied();
                    if let Some(e) = victim {
                        coord.destroy_entity(e).unwrap();
                        model.remove(&e);
                    }
                }
            }

            for (s, &id) in ids.iter().enumerate() {
                let mut actual = scenes.entities(&coord, id).unwrap();
                actual.sort();
                let expected: Vec<Entity> = model
                    .iter()
                    .filter(|(_, m)| **m == Some(s))
                    .map(|(e, _)| *e)
                    .collect();
                prop_assert_eq!(actual, expected);
            }
        }
    }
}
