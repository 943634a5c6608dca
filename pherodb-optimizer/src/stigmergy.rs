//! The stigmergy cache: a pheromone map of execution paths that worked,
//! keyed by query-pattern fingerprint. Environment-mediated coordination —
//! the engine learns from its own execution history without a centralized
//! planner.

use crate::fingerprint;
use chrono::{DateTime, Duration, Utc};
use pherodb_core::CacheConfig;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

const FAILURE_DECAY: f64 = 0.8;
const TRAIL_FLOOR: f64 = 0.1;
const PRUNE_FLOOR: f64 = 0.2;
const REINFORCEMENT_EMA_ALPHA: f64 = 0.3;

/// The structural shape of a query, stripped of literal values — what two
/// queries need to share to reuse each other's pheromone trail.
#[derive(Debug, Clone, Serialize)]
pub struct QuerySignature {
    pub operation: String,
    pub collection: Option<String>,
    pub filters: Vec<String>,
    pub joins: Vec<String>,
    pub traversals: Vec<String>,
}

impl QuerySignature {
    pub fn fingerprint(&self) -> String {
        let mut filters = self.filters.clone();
        filters.sort();
        let normalized = QuerySignature { filters, ..self.clone() };
        fingerprint(&normalized)
    }
}

/// A pheromone trail marking one execution path that was tried for a
/// query pattern.
#[derive(Debug, Clone)]
pub struct PheromoneTrail {
    pub query_signature: String,
    pub path_signature: String,

    pub pheromone: f64,
    pub initial_pheromone: f64,

    pub avg_execution_time_ms: f64,
    pub success_count: u64,
    pub failure_count: u64,

    pub created_at: DateTime<Utc>,
    pub last_reinforced: DateTime<Utc>,
    pub last_used: DateTime<Utc>,

    pub execution_plan: serde_json::Value,
}

impl PheromoneTrail {
    fn new(query_signature: String, path_signature: String, execution_plan: serde_json::Value, execution_time_ms: f64) -> Self {
        let now = Utc::now();
        Self {
            query_signature,
            path_signature,
            pheromone: pherodb_core::INITIAL_PHEROMONE,
            initial_pheromone: pherodb_core::INITIAL_PHEROMONE,
            avg_execution_time_ms: execution_time_ms,
            success_count: 0,
            failure_count: 0,
            created_at: now,
            last_reinforced: now,
            last_used: now,
            execution_plan,
        }
    }

    /// Strengthen (success) or weaken (failure) this trail after a use.
    pub fn reinforce(&mut self, execution_time_ms: f64, success: bool) {
        if success {
            self.success_count += 1;
            if self.avg_execution_time_ms == 0.0 {
                self.avg_execution_time_ms = execution_time_ms;
            } else {
                self.avg_execution_time_ms =
                    REINFORCEMENT_EMA_ALPHA * execution_time_ms + (1.0 - REINFORCEMENT_EMA_ALPHA) * self.avg_execution_time_ms;
            }
            let reinforcement = 1.0 / (1.0 + execution_time_ms / 100.0);
            self.pheromone = (self.pheromone + reinforcement).min(pherodb_core::MAX_PHEROMONE);
        } else {
            self.failure_count += 1;
            self.pheromone = (self.pheromone * FAILURE_DECAY).max(TRAIL_FLOOR);
        }
        let now = Utc::now();
        self.last_reinforced = now;
        self.last_used = now;
    }

    pub fn evaporate(&mut self, decay_rate: f64) {
        self.pheromone = (self.pheromone * (1.0 - decay_rate)).max(TRAIL_FLOOR);
    }

    pub fn is_stale(&self, max_age_minutes: i64) -> bool {
        Utc::now() - self.last_used > Duration::minutes(max_age_minutes)
    }

    /// Pheromone strength, weighted by historical success rate and speed.
    pub fn quality_score(&self) -> f64 {
        let total = self.success_count + self.failure_count;
        if total == 0 {
            return 0.0;
        }
        let success_rate = self.success_count as f64 / total as f64;
        let time_score = 1.0 / (1.0 + self.avg_execution_time_ms / 100.0);
        self.pheromone * success_rate * time_score
    }
}

/// Running counters over cache activity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    pub total_trails: usize,
    pub total_reinforcements: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

/// The cache itself: query-pattern fingerprint -> trails tried for it.
#[derive(Debug)]
pub struct StigmergyCache {
    config: CacheConfig,
    trails: HashMap<String, Vec<PheromoneTrail>>,
    stats: CacheStats,
}

impl StigmergyCache {
    pub fn new(config: CacheConfig) -> Self {
        Self { config, trails: HashMap::new(), stats: CacheStats::default() }
    }

    /// Trails recorded for `query`, stale ones excluded, sorted best-first
    /// by quality score.
    pub fn lookup(&mut self, query: &QuerySignature) -> Vec<&PheromoneTrail> {
        let sig = query.fingerprint();
        let Some(trails) = self.trails.get(&sig) else {
            self.stats.cache_misses += 1;
            return Vec::new();
        };
        let mut live: Vec<&PheromoneTrail> = trails
            .iter()
            .filter(|t| !t.is_stale(self.config.staleness_threshold_minutes))
            .collect();
        live.sort_by(|a, b| b.quality_score().total_cmp(&a.quality_score()));
        self.stats.cache_hits += 1;
        live
    }

    /// Add a new trail, or reinforce the existing one sharing the same
    /// (query, plan) pair.
    pub fn add_trail(
        &mut self,
        query: &QuerySignature,
        execution_plan: serde_json::Value,
        execution_time_ms: f64,
        success: bool,
    ) -> &PheromoneTrail {
        let query_sig = query.fingerprint();
        let path_sig = fingerprint(&execution_plan);

        let bucket = self.trails.entry(query_sig.clone()).or_default();
        if let Some(pos) = bucket.iter().position(|t| t.path_signature == path_sig) {
            bucket[pos].reinforce(execution_time_ms, success);
            self.stats.total_reinforcements += 1;
            return &bucket[pos];
        }

        let mut trail = PheromoneTrail::new(query_sig.clone(), path_sig, execution_plan, execution_time_ms);
        trail.reinforce(execution_time_ms, success);
        bucket.push(trail);
        self.stats.total_trails += 1;

        self.enforce_capacity();
        self.trails[&query_sig].last().expect("just inserted")
    }

    /// Decay every trail's pheromone, then drop trails that fell below
    /// the prune floor.
    pub fn evaporate_all(&mut self) {
        let rate = self.config.evaporation_rate;
        for trails in self.trails.values_mut() {
            for trail in trails.iter_mut() {
                trail.evaporate(rate);
            }
        }
        self.prune_weak_trails();
    }

    fn prune_weak_trails(&mut self) {
        self.trails.retain(|_, trails| {
            trails.retain(|t| t.pheromone >= PRUNE_FLOOR);
            !trails.is_empty()
        });
        self.stats.total_trails = self.trails.values().map(|t| t.len()).sum();
    }

    fn enforce_capacity(&mut self) {
        let total: usize = self.trails.values().map(|t| t.len()).sum();
        if total <= self.config.max_trails {
            return;
        }
        let mut to_remove = total - self.config.max_trails;
        debug!(to_remove, "evicting lowest-quality trails over capacity");

        while to_remove > 0 {
            let worst = self
                .trails
                .iter()
                .flat_map(|(sig, trails)| trails.iter().enumerate().map(move |(i, t)| (sig.clone(), i, t.quality_score())))
                .min_by(|a, b| a.2.total_cmp(&b.2));
            let Some((sig, idx, _)) = worst else { break };
            if let Some(bucket) = self.trails.get_mut(&sig) {
                bucket.remove(idx);
                if bucket.is_empty() {
                    self.trails.remove(&sig);
                }
            }
            to_remove -= 1;
        }
        self.stats.total_trails = self.config.max_trails;
    }

    /// The execution plan of the strongest surviving trail for `query`,
    /// if any exist.
    pub fn best_plan(&mut self, query: &QuerySignature) -> Option<serde_json::Value> {
        self.lookup(query).first().map(|t| t.execution_plan.clone())
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query() -> QuerySignature {
        QuerySignature {
            operation: "select".into(),
            collection: Some("Users".into()),
            filters: vec!["age".into()],
            joins: vec![],
            traversals: vec![],
        }
    }

    #[test]
    fn lookup_on_empty_cache_is_a_miss() {
        let mut cache = StigmergyCache::new(CacheConfig::default());
        assert!(cache.lookup(&query()).is_empty());
        assert_eq!(cache.stats().cache_misses, 1);
    }

    #[test]
    fn add_trail_then_lookup_is_a_hit() {
        let mut cache = StigmergyCache::new(CacheConfig::default());
        cache.add_trail(&query(), json!({"strategy": "index"}), 5.0, true);
        let found = cache.lookup(&query());
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn reinforcing_same_plan_twice_does_not_duplicate_trail() {
        let mut cache = StigmergyCache::new(CacheConfig::default());
        let plan = json!({"strategy": "index"});
        cache.add_trail(&query(), plan.clone(), 5.0, true);
        cache.add_trail(&query(), plan, 5.0, true);
        assert_eq!(cache.stats().total_trails, 1);
        assert_eq!(cache.stats().total_reinforcements, 1);
    }

    #[test]
    fn failure_weakens_pheromone_below_initial() {
        let mut cache = StigmergyCache::new(CacheConfig::default());
        cache.add_trail(&query(), json!({"strategy": "scan"}), 50.0, false);
        let trail = cache.lookup(&query())[0];
        assert!(trail.pheromone < pherodb_core::INITIAL_PHEROMONE);
    }

    #[test]
    fn capacity_eviction_keeps_size_at_max() {
        let config = CacheConfig { max_trails: 3, ..CacheConfig::default() };
        let mut cache = StigmergyCache::new(config);
        for i in 0..5 {
            cache.add_trail(&query(), json!({"variant": i}), 10.0 * i as f64, true);
        }
        assert_eq!(cache.stats().total_trails, 3);
    }

    #[test]
    fn best_plan_returns_highest_quality_trail() {
        let mut cache = StigmergyCache::new(CacheConfig::default());
        cache.add_trail(&query(), json!({"strategy": "scan"}), 200.0, true);
        cache.add_trail(&query(), json!({"strategy": "index"}), 5.0, true);
        let best = cache.best_plan(&query()).unwrap();
        assert_eq!(best, json!({"strategy": "index"}));
    }
}
