//! Property tests for coordinator bookkeeping.
//!
//! Random mutation sequences are applied to a coordinator and to a naive
//! model side by side. After every step, system membership, signatures and
//! component storage are compared against the model.

use std::collections::{BTreeMap, BTreeSet};

use nexo_ecs::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct C0(u32);
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct C1(u32);
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct C2(u32);
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct C3(u32);
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct C4(u32);

const COMPONENTS: usize = 5;
const SLOTS: usize = 50;

struct S0;
struct S1;
struct S2;
struct S3;
struct S4;
impl System for S0 {}
impl System for S1 {}
impl System for S2 {}
impl System for S3 {}
impl System for S4 {}

/// Required component indices per system. `S4` keeps an empty signature.
const SYSTEM_REQUIREMENTS: [&[usize]; 5] = [&[0], &[0, 1], &[2], &[1, 3, 4], &[]];

fn setup() -> Coordinator {
    let mut coord = Coordinator::with_config(EcsConfig {
        max_entities: SLOTS as u32,
        initial_component_capacity: 8,
    })
    .unwrap();
    coord.register_component::<C0>().unwrap();
    coord.register_component::<C1>().unwrap();
    coord.register_component::<C2>().unwrap();
    coord.register_component::<C3>().unwrap();
    coord.register_component::<C4>().unwrap();

    coord.register_system(S0).unwrap();
    coord.register_system(S1).unwrap();
    coord.register_system(S2).unwrap();
    coord.register_system(S3).unwrap();
    coord.register_system(S4).unwrap();
    coord.set_system_signature_of::<S0, (C0,)>().unwrap();
    coord.set_system_signature_of::<S1, (C0, C1)>().unwrap();
    coord.set_system_signature_of::<S2, (C2,)>().unwrap();
    coord.set_system_signature_of::<S3, (C1, C3, C4)>().unwrap();
    coord
}

fn add(coord: &mut Coordinator, e: Entity, c: usize, v: u32) -> Result<(), EcsError> {
    match c {
        0 => coord.add_component(e, C0(v)),
        1 => coord.add_component(e, C1(v)),
        2 => coord.add_component(e, C2(v)),
        3 => coord.add_component(e, C3(v)),
        _ => coord.add_component(e, C4(v)),
    }
}

fn remove(coord: &mut Coordinator, e: Entity, c: usize) -> Result<u32, EcsError> {
    match c {
        0 => coord.remove_component::<C0>(e).map(|c| c.0),
        1 => coord.remove_component::<C1>(e).map(|c| c.0),
        2 => coord.remove_component::<C2>(e).map(|c| c.0),
        3 => coord.remove_component::<C3>(e).map(|c| c.0),
        _ => coord.remove_component::<C4>(e).map(|c| c.0),
    }
}

fn value(coord: &Coordinator, e: Entity, c: usize) -> Option<u32> {
    match c {
        0 => coord.try_get_component::<C0>(e).map(|c| c.0),
        1 => coord.try_get_component::<C1>(e).map(|c| c.0),
        2 => coord.try_get_component::<C2>(e).map(|c| c.0),
        3 => coord.try_get_component::<C3>(e).map(|c| c.0),
        _ => coord.try_get_component::<C4>(e).map(|c| c.0),
    }
}

/// Dense storage holds exactly `owners`, and the slot -> entity and
/// entity -> slot maps are inverses of each other.
fn check_array<T: Component>(arr: &ComponentArray<T>, owners: &[Entity], c: usize) {
    assert_eq!(arr.len(), owners.len(), "dense length of component {c}");
    assert_eq!(arr.entities().len(), arr.len(), "entity column of component {c}");
    for slot in 0..arr.len() {
        let entity = arr.entity_at(slot).unwrap();
        assert_eq!(arr.slot_of(entity), Some(slot), "slot {slot} of component {c}");
    }
    for &owner in owners {
        let slot = arr.slot_of(owner);
        assert!(slot.is_some(), "{owner} lost its component {c}");
        assert_eq!(arr.entity_at(slot.unwrap()), Some(owner));
    }
    assert_eq!(arr.entity_at(arr.len()), None);
}

fn check_storage(coord: &Coordinator, c: usize, owners: &[Entity]) {
    match c {
        0 => check_array(coord.component_array::<C0>().unwrap(), owners, c),
        1 => check_array(coord.component_array::<C1>().unwrap(), owners, c),
        2 => check_array(coord.component_array::<C2>().unwrap(), owners, c),
        3 => check_array(coord.component_array::<C3>().unwrap(), owners, c),
        _ => check_array(coord.component_array::<C4>().unwrap(), owners, c),
    }
}

fn system_entities(coord: &Coordinator, s: usize) -> BTreeSet<Entity> {
    let slice = match s {
        0 => coord.system_entities::<S0>(),
        1 => coord.system_entities::<S1>(),
        2 => coord.system_entities::<S2>(),
        3 => coord.system_entities::<S3>(),
        _ => coord.system_entities::<S4>(),
    };
    slice.unwrap().iter().copied().collect()
}

/// Model: slot -> (entity, component index -> value).
type Model = BTreeMap<usize, (Entity, BTreeMap<usize, u32>)>;

fn check_against_model(coord: &Coordinator, model: &Model) {
    assert_eq!(coord.entity_count(), model.len());

    for (entity, comps) in model.values() {
        assert!(coord.is_alive(*entity));
        let sig = coord.signature(*entity).unwrap();
        for c in 0..COMPONENTS {
            let expected = comps.get(&c).copied();
            assert_eq!(value(coord, *entity, c), expected);
            let ty = ComponentType::from_index(c).unwrap();
            assert_eq!(sig.test(ty), expected.is_some(), "signature bit {c}");
        }
    }

    for c in 0..COMPONENTS {
        let owners: Vec<Entity> = model
            .values()
            .filter(|(_, m)| m.contains_key(&c))
            .map(|(e, _)| *e)
            .collect();
        check_storage(coord, c, &owners);
    }

    for (s, required) in SYSTEM_REQUIREMENTS.iter().enumerate() {
        let naive: BTreeSet<Entity> = if required.is_empty() {
            BTreeSet::new()
        } else {
            model
                .values()
                .filter(|(_, m)| required.iter().all(|c| m.contains_key(c)))
                .map(|(e, _)| *e)
                .collect()
        };
        assert_eq!(system_entities(coord, s), naive, "membership of system {s}");
    }
}

#[derive(Debug, Clone)]
enum Op {
    Create(usize),
    Destroy(usize),
    Add(usize, usize, u32),
    Remove(usize, usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..SLOTS).prop_map(Op::Create),
        (0..SLOTS).prop_map(Op::Destroy),
        (0..SLOTS, 0..COMPONENTS, any::<u32>()).prop_map(|(s, c, v)| Op::Add(s, c, v)),
        (0..SLOTS, 0..COMPONENTS).prop_map(|(s, c)| Op::Remove(s, c)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_mutations_keep_system_sets_exact(
        ops in prop::collection::vec(op_strategy(), 1000)
    ) {
        let mut coord = setup();
        let mut model: Model = BTreeMap::new();

        for op in ops {
            match op {
                Op::Create(slot) => {
                    if !model.contains_key(&slot) {
                        let e = coord.create_entity().unwrap();
                        model.insert(slot, (e, BTreeMap::new()));
                    }
                }
                Op::Destroy(slot) => {
                    if let Some((e, _)) = model.remove(&slot) {
                        coord.destroy_entity(e).unwrap();
                        prop_assert!(!coord.is_alive(e));
                    }
                }
                Op::Add(slot, c, v) => {
                    if let Some((e, comps)) = model.get_mut(&slot) {
                        let result = add(&mut coord, *e, c, v);
                        if comps.contains_key(&c) {
                            let rejected = matches!(result, Err(EcsError::ComponentAlreadyPresent { .. }));
                            prop_assert!(rejected);
                        } else {
                            prop_assert!(result.is_ok());
                            comps.insert(c, v);
                        }
                    }
                }
                Op::Remove(slot, c) => {
                    if let Some((e, comps)) = model.get_mut(&slot) {
                        let result = remove(&mut coord, *e, c);
                        match comps.remove(&c) {
                            Some(v) => {
                                prop_assert_eq!(result.unwrap(), v);
                            }
                            None => {
                                let missing = matches!(result, Err(EcsError::ComponentNotFound { .. }));
                                prop_assert!(missing);
                            }
                        }
                    }
                }
            }
            check_against_model(&coord, &model);
        }
    }

    #[test]
    fn recycled_ids_come_back_clean_in_fifo_order(
        count in 1..SLOTS,
        values in prop::collection::vec(any::<u32>(), SLOTS),
    ) {
        let mut coord = setup();
        let entities: Vec<Entity> = (0..count).map(|_| coord.create_entity().unwrap()).collect();
        for (i, &e) in entities.iter().enumerate() {
            add(&mut coord, e, i % COMPONENTS, values[i]).unwrap();
            add(&mut coord, e, (i + 1) % COMPONENTS, values[i]).unwrap();
        }
        // Destroy in reverse creation order.
        for &e in entities.iter().rev() {
            coord.destroy_entity(e).unwrap();
        }
        prop_assert_eq!(coord.entity_count(), 0);

        for &expected in entities.iter().rev() {
            let e = coord.create_entity().unwrap();
            prop_assert_eq!(e, expected);
            prop_assert!(coord.signature(e).unwrap().is_empty());
            for c in 0..COMPONENTS {
                prop_assert_eq!(value(&coord, e, c), None);
            }
        }
        for s in 0..SYSTEM_REQUIREMENTS.len() {
            prop_assert!(system_entities(&coord, s).is_empty());
        }
    }

    #[test]
    fn duplicated_entities_are_independent_copies(
        comps in prop::collection::btree_map(0..COMPONENTS, any::<u32>(), 0..=COMPONENTS),
    ) {
        let mut coord = setup();
        let src = coord.create_entity().unwrap();
        for (&c, &v) in &comps {
            add(&mut coord, src, c, v).unwrap();
        }

        let dst = coord.duplicate_entity(src).unwrap();
        prop_assert_ne!(src, dst);
        prop_assert_eq!(coord.signature(src).unwrap(), coord.signature(dst).unwrap());
        for c in 0..COMPONENTS {
            prop_assert_eq!(value(&coord, dst, c), comps.get(&c).copied());
        }
        for s in 0..SYSTEM_REQUIREMENTS.len() {
            let members = system_entities(&coord, s);
            prop_assert_eq!(members.contains(&src), members.contains(&dst));
        }

        // Mutating the copy leaves the source untouched.
        if let Some(copy) = coord.try_get_component_mut::<C0>(dst) {
            copy.0 = copy.0.wrapping_add(1);
            prop_assert_eq!(value(&coord, src, 0), comps.get(&0).copied());
        }
    }
}
