//! Integration coverage for a trail's life past the unit-test level:
//! evaporation driving pheromone down, a later success reinforcing it back
//! up (R4), and pruning removing whatever evaporation leaves below the
//! floor.

use pherodb_core::CacheConfig;
use pherodb_optimizer::StigmergyCache;
use serde_json::json;

fn query() -> pherodb_optimizer::QuerySignature {
    pherodb_optimizer::QuerySignature {
        operation: "select".into(),
        collection: Some("Orders".into()),
        filters: vec!["status".into()],
        joins: vec![],
        traversals: vec![],
    }
}

#[test]
fn r4_evaporation_then_reinforcement_recovers_pheromone() {
    let mut cache = StigmergyCache::new(CacheConfig::default());
    cache.add_trail(&query(), json!({"strategy": "index"}), 5.0, true);
    let after_add = cache.lookup(&query())[0].pheromone;

    for _ in 0..5 {
        cache.evaporate_all();
    }
    let after_evaporation = cache.lookup(&query())[0].pheromone;
    assert!(after_evaporation < after_add, "repeated evaporation must weaken the trail");

    cache.add_trail(&query(), json!({"strategy": "index"}), 5.0, true);
    let after_reinforcement = cache.lookup(&query())[0].pheromone;
    assert!(after_reinforcement > after_evaporation, "a later success must recover pheromone");
}

#[test]
fn evaporation_below_prune_floor_drops_the_trail_entirely() {
    let config = CacheConfig { evaporation_rate: 0.9, ..CacheConfig::default() };
    let mut cache = StigmergyCache::new(config);
    cache.add_trail(&query(), json!({"strategy": "scan"}), 50.0, false);

    for _ in 0..10 {
        cache.evaporate_all();
    }

    assert!(cache.lookup(&query()).is_empty());
    assert_eq!(cache.stats().total_trails, 0);
}

#[test]
fn distinct_query_signatures_keep_independent_trail_sets() {
    let mut cache = StigmergyCache::new(CacheConfig::default());
    let other = pherodb_optimizer::QuerySignature {
        operation: "select".into(),
        collection: Some("Orders".into()),
        filters: vec!["total".into()],
        joins: vec![],
        traversals: vec![],
    };

    cache.add_trail(&query(), json!({"strategy": "index"}), 5.0, true);
    cache.add_trail(&other, json!({"strategy": "scan"}), 80.0, true);

    assert_eq!(cache.lookup(&query()).len(), 1);
    assert_eq!(cache.lookup(&other).len(), 1);
    assert_eq!(cache.stats().total_trails, 2);
}
