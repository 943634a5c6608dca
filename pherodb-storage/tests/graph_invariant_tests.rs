//! Property tests over arbitrary sequences of store mutations, checking the
//! invariants and round-trip laws a `GraphStore` must hold in any reachable
//! state (P1, P2, P4, P6, R1, R2, R3).

use pherodb_core::{Direction, EntityId, PropertyValue};
use pherodb_storage::GraphStore;
use proptest::prelude::*;
use std::collections::HashMap;

const COLLECTION: &str = "Things";
const EDGE_TYPE: &str = "REL";

#[derive(Debug, Clone)]
enum Op {
    AddEntity,
    AddEdge(usize, usize),
    RemoveEntity(usize),
    RemoveEdgeOfPair(usize, usize),
    Evaporate,
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        3 => Just(Op::AddEntity),
        3 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::AddEdge(a, b)),
        2 => any::<usize>().prop_map(Op::RemoveEntity),
        1 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::RemoveEdgeOfPair(a, b)),
        1 => Just(Op::Evaporate),
    ];
    prop::collection::vec(op, 0..60)
}

proptest! {
    /// P1: every edge's endpoints exist and both adjacency directories name
    /// it. P2: every collection member's type tag equals the collection
    /// name. P4: every edge pheromone stays in [0.1, 10.0]. P6: a removed
    /// id leaves no edge referencing it and is absent from its collection.
    #[test]
    fn invariants_hold_after_arbitrary_mutations(ops in ops_strategy()) {
        let mut store = GraphStore::new();
        let mut ids: Vec<EntityId> = Vec::new();
        let mut removed: Vec<EntityId> = Vec::new();

        for op in ops {
            match op {
                Op::AddEntity => {
                    let id = store.add_entity(COLLECTION, HashMap::new(), None);
                    ids.push(id);
                }
                Op::AddEdge(a, b) => {
                    if ids.is_empty() { continue; }
                    let source = ids[a % ids.len()];
                    let target = ids[b % ids.len()];
                    store.add_edge(source, target, EDGE_TYPE, HashMap::new());
                }
                Op::RemoveEntity(i) => {
                    if ids.is_empty() { continue; }
                    let idx = i % ids.len();
                    let id = ids.remove(idx);
                    store.remove_entity(id);
                    removed.push(id);
                }
                Op::RemoveEdgeOfPair(a, b) => {
                    if ids.is_empty() { continue; }
                    let source = ids[a % ids.len()];
                    let target = ids[b % ids.len()];
                    for edge in store.get_edges_between(source, target, None).iter().map(|e| e.id).collect::<Vec<_>>() {
                        store.remove_edge(edge);
                    }
                }
                Op::Evaporate => store.evaporate_pheromones(),
            }
        }

        prop_assert!(store.check_invariants().is_ok());

        // P1 + P4
        for edge in store.all_edges() {
            prop_assert!(store.peek_entity(edge.source).is_some(), "edge source must exist");
            prop_assert!(store.peek_entity(edge.target).is_some(), "edge target must exist");
            prop_assert!(edge.pheromone >= 0.1 && edge.pheromone <= 10.0, "pheromone out of bounds: {}", edge.pheromone);
        }

        // P2
        if let Some(collection) = store.get_collection(COLLECTION) {
            for entity in collection.scan() {
                prop_assert_eq!(&entity.type_tag, COLLECTION);
            }
        }

        // P6
        for id in removed {
            prop_assert!(store.peek_entity(id).is_none());
            for edge in store.all_edges() {
                prop_assert_ne!(edge.source, id);
                prop_assert_ne!(edge.target, id);
            }
        }

        // Surviving ids must still resolve (sanity check on bookkeeping).
        for id in &ids {
            prop_assert!(store.peek_entity(*id).is_some());
        }
    }
}

#[test]
fn r1_add_entity_then_get_entity_round_trips_property_bag() {
    let mut store = GraphStore::new();
    let mut props = HashMap::new();
    props.insert("name".to_string(), PropertyValue::from("Alice"));
    let id = store.add_entity("Users", props.clone(), None);

    let fetched = store.get_entity(id).unwrap();
    assert_eq!(fetched.properties, props);
    assert_eq!(store.get_collection("Users").unwrap().scan().filter(|e| e.id == id).count(), 1);
}

#[test]
fn r2_repeated_add_edge_yields_single_record() {
    let mut store = GraphStore::new();
    let a = store.add_entity("Users", HashMap::new(), None);
    let b = store.add_entity("Users", HashMap::new(), None);
    store.add_edge(a, b, "FOLLOWS", HashMap::new());
    store.add_edge(a, b, "FOLLOWS", HashMap::new());
    assert_eq!(store.get_edges_between(a, b, Some("FOLLOWS")).len(), 1);
}

#[test]
fn r3_create_index_twice_is_a_noop_and_backfills_existing_entities() {
    let mut store = GraphStore::new();
    let mut props = HashMap::new();
    props.insert("age".to_string(), PropertyValue::Int(30));
    store.add_entity("Users", props, None);

    let collection = store.get_or_create_collection("Users");
    collection.create_index("age");
    collection.create_index("age");
    assert_eq!(collection.lookup_exact("age", &PropertyValue::Int(30)).len(), 1);
}

#[test]
fn p6_remove_entity_drops_it_from_every_index() {
    let mut store = GraphStore::new();
    let mut props = HashMap::new();
    props.insert("age".to_string(), PropertyValue::Int(30));
    let id = store.add_entity("Users", props, None);
    store.get_or_create_collection("Users").create_index("age");

    store.remove_entity(id);
    assert!(store
        .get_collection("Users")
        .unwrap()
        .scan()
        .all(|e| e.id != id));
}

#[test]
fn traverse_visits_each_reachable_node_exactly_once_even_with_cycles() {
    let mut store = GraphStore::new();
    let a = store.add_entity("Users", HashMap::new(), None);
    let b = store.add_entity("Users", HashMap::new(), None);
    let c = store.add_entity("Users", HashMap::new(), None);
    store.add_edge(a, b, "FOLLOWS", HashMap::new());
    store.add_edge(b, c, "FOLLOWS", HashMap::new());
    store.add_edge(c, a, "FOLLOWS", HashMap::new());

    let result = store.traverse(a, Some("FOLLOWS"), Direction::Out, 10, None);
    let mut sorted = result.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(result.len(), sorted.len());
    assert!(result.contains(&b));
    assert!(result.contains(&c));
    assert!(!result.contains(&a));
}
