//! Concrete seed scenarios from the engine's acceptance tests (S1-S6):
//! index lookups, filtered select, traversal, pattern matching, stigmergy
//! cache population across repeated executions, and cascading removal.

use pherodb_core::{CacheConfig, Comparator, Direction, ExplorerConfig, FilterExpr, PropertyValue};
use pherodb_optimizer::{AntColonyOptimizer, StigmergyCache};
use pherodb_query::{Executor, Operation, Pattern, PatternEdge, PatternNode, Plan, Projection};
use pherodb_storage::GraphStore;
use serde_json::Value;
use std::collections::HashMap;

fn executor() -> Executor {
    Executor::new(AntColonyOptimizer::new(ExplorerConfig::default(), StigmergyCache::new(CacheConfig::default())))
}

fn users_with_alice_bob_carol() -> GraphStore {
    let mut store = GraphStore::new();
    let mut alice = HashMap::new();
    alice.insert("name".to_string(), PropertyValue::from("Alice"));
    alice.insert("age".to_string(), PropertyValue::Int(28));
    alice.insert("city".to_string(), PropertyValue::from("NYC"));
    store.add_entity("Users", alice, None);

    let mut bob = HashMap::new();
    bob.insert("name".to_string(), PropertyValue::from("Bob"));
    bob.insert("age".to_string(), PropertyValue::Int(35));
    bob.insert("city".to_string(), PropertyValue::from("NYC"));
    store.add_entity("Users", bob, None);

    let mut carol = HashMap::new();
    carol.insert("name".to_string(), PropertyValue::from("Carol"));
    carol.insert("age".to_string(), PropertyValue::Int(42));
    carol.insert("city".to_string(), PropertyValue::from("SF"));
    store.add_entity("Users", carol, None);

    store
}

#[test]
fn s1_index_lookups_by_city_and_age_range() {
    let mut store = users_with_alice_bob_carol();
    let collection = store.get_or_create_collection("Users");

    let nyc = collection.lookup_exact("city", &PropertyValue::from("NYC"));
    assert_eq!(nyc.len(), 2);

    let mid_range = collection.lookup_range("age", Some(&PropertyValue::Int(30)), Some(&PropertyValue::Int(40)));
    assert_eq!(mid_range.len(), 1);
    assert_eq!(mid_range[0].get_property("name"), Some(&PropertyValue::from("Bob")));
}

#[test]
fn s2_select_with_filters_and_projection() {
    let mut store = users_with_alice_bob_carol();
    let mut exec = executor();

    let plan = Plan::new(Operation::Select)
        .collection("Users")
        .filter(FilterExpr::new("age", Comparator::Gt, PropertyValue::Int(25)))
        .filter(FilterExpr::eq("city", PropertyValue::from("NYC")))
        .project("name")
        .project("age");

    let rows = exec.execute(&mut store, &plan).unwrap();
    assert_eq!(rows.len(), 2);
    for row in &rows {
        let obj = row.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert!(obj.contains_key("name"));
        assert!(obj.contains_key("age"));
    }
}

#[test]
fn s3_traverse_depth_two_emits_both_direct_and_indirect_follows() {
    let mut store = GraphStore::new();
    let alice = store.add_entity("Users", HashMap::new(), None);
    let bob = store.add_entity("Users", HashMap::new(), None);
    let carol = store.add_entity("Users", HashMap::new(), None);
    store.add_edge(alice, bob, "FOLLOWS", HashMap::new());
    store.add_edge(alice, carol, "FOLLOWS", HashMap::new());
    store.add_edge(bob, carol, "FOLLOWS", HashMap::new());

    let result = store.traverse(alice, Some("FOLLOWS"), Direction::Out, 2, None);
    assert!(!result.contains(&alice));
    assert!(result.contains(&bob));
    assert!(result.contains(&carol));
    assert_eq!(result.len(), 2);
}

#[test]
fn s4_pattern_match_yields_two_bindings_for_follows_target() {
    let mut store = GraphStore::new();
    let mut alice_props = HashMap::new();
    alice_props.insert("name".to_string(), PropertyValue::from("Alice"));
    let alice = store.add_entity("User", alice_props, None);
    let bob = store.add_entity("User", HashMap::new(), None);
    let carol = store.add_entity("User", HashMap::new(), None);
    store.add_edge(alice, bob, "FOLLOWS", HashMap::new());
    store.add_edge(alice, carol, "FOLLOWS", HashMap::new());

    let pattern = Pattern {
        nodes: vec![
            PatternNode::new("u").with_label("User").with_property("name", PropertyValue::from("Alice")),
            PatternNode::new("f").with_label("User"),
        ],
        edges: vec![PatternEdge::new("u", "FOLLOWS", Direction::Out, "f")],
    };
    let plan = Plan { pattern: Some(pattern), projections: vec![Projection::parse("f")], ..Plan::new(Operation::Match) };

    let mut exec = executor();
    let rows = exec.execute(&mut store, &plan).unwrap();
    assert_eq!(rows.len(), 2);
    let ids: Vec<&Value> = rows.iter().filter_map(|r| r.get("f")).collect();
    assert_eq!(ids.len(), 2);
}

#[test]
fn s5_repeated_select_reinforces_cache_and_is_literal_invariant() {
    let mut store = users_with_alice_bob_carol();
    let mut exec = executor();
    let plan = Plan::new(Operation::Select).collection("Users").filter(FilterExpr::eq("city", PropertyValue::from("NYC")));

    for _ in 0..10 {
        exec.execute(&mut store, &plan).unwrap();
    }
    assert_eq!(exec.stats().total_queries, 10);

    let flipped_literal =
        Plan::new(Operation::Select).collection("Users").filter(FilterExpr::eq("city", PropertyValue::from("SF")));
    let misses_before = exec.optimizer_mut().cache_mut().stats().cache_misses;
    exec.execute(&mut store, &flipped_literal).unwrap();
    let misses_after = exec.optimizer_mut().cache_mut().stats().cache_misses;
    assert_eq!(misses_before, misses_after, "flipping a filter literal must still hit the cache");
}

#[test]
fn s6_remove_entity_cascades_edges_and_traversal_still_reaches_survivors() {
    let mut store = GraphStore::new();
    let alice = store.add_entity("Users", HashMap::new(), None);
    let bob = store.add_entity("Users", HashMap::new(), None);
    let carol = store.add_entity("Users", HashMap::new(), None);
    store.add_edge(alice, bob, "FOLLOWS", HashMap::new());
    store.add_edge(alice, carol, "FOLLOWS", HashMap::new());
    store.add_edge(bob, carol, "FOLLOWS", HashMap::new());

    store.remove_entity(bob);

    assert!(store.get_edges_between(alice, bob, None).is_empty());
    assert!(store.peek_entity(bob).is_none());
    let result = store.traverse(alice, Some("FOLLOWS"), Direction::Out, 5, None);
    assert!(result.contains(&carol));
    assert!(!result.contains(&bob));
}
