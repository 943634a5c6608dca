//! Ant colony optimization over the space of execution plans.
//!
//! Each `QueryAnt` tries one plan — either a random one or a small mutation
//! of whatever the stigmergy cache already knows works — and reports back
//! an estimated cost. `AntColonyOptimizer` runs several iterations of this,
//! letting the best plans from each round reinforce the cache so later
//! ants are more likely to follow them.

use crate::{QuerySignature, StigmergyCache};
use pherodb_core::ExplorerConfig;
use rand::prelude::*;
use serde_json::{json, Value};

const JOIN_BASE_COST: f64 = 50.0;
const JOIN_GROWTH: f64 = 1.5;
const INDEX_DISCOUNT: f64 = 0.7;
const STRATEGY_FACTOR_BFS: f64 = 1.0;
const STRATEGY_FACTOR_DFS: f64 = 0.9;
const STRATEGY_FACTOR_BIDIRECTIONAL: f64 = 0.8;
const NOISE_LOW: f64 = 0.9;
const NOISE_HIGH: f64 = 1.1;

const TRAVERSAL_STRATEGIES: [&str; 3] = ["bfs", "dfs", "bidirectional"];

/// The shape of a query an ant can plan for — structure only, matching
/// what `QuerySignature` fingerprints, plus the specific collections of
/// joins/filters/indexes/traversals a plan actually needs to arrange.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub operation: String,
    pub collection: Option<String>,
    pub joins: Vec<String>,
    pub filters: Vec<String>,
    pub indexed_properties: Vec<String>,
    pub has_traversal: bool,
}

impl QuerySpec {
    pub fn signature(&self) -> QuerySignature {
        QuerySignature {
            operation: self.operation.clone(),
            collection: self.collection.clone(),
            filters: self.filters.clone(),
            joins: self.joins.clone(),
            traversals: if self.has_traversal { vec!["traverse".to_string()] } else { vec![] },
        }
    }
}

/// Fixed, dimensionless cost weights standing in for real cardinality
/// estimation (out of scope — see the engine's Non-goals). These are the
/// per-operation baselines; everything past this point in the cost model
/// is a multiplier on top.
#[derive(Debug, Clone, Copy)]
pub struct CostBaselines {
    pub scan: f64,
    pub lookup: f64,
    pub traverse: f64,
}

impl Default for CostBaselines {
    fn default() -> Self {
        Self { scan: 100.0, lookup: 10.0, traverse: 50.0 }
    }
}

/// One agent's attempt at a plan for `query`.
struct QueryAnt<'a> {
    query: &'a QuerySpec,
    pheromone_sensitivity: f64,
}

impl<'a> QueryAnt<'a> {
    /// Explore one plan: follow the strongest existing trail (with small
    /// variation) with probability `pheromone_sensitivity`, otherwise
    /// generate a fresh random plan. Returns the plan and its estimated
    /// cost.
    fn explore(&self, baselines: CostBaselines, cache: &mut StigmergyCache, rng: &mut impl Rng) -> (Value, f64) {
        let trails = cache.lookup(&self.query.signature());

        let plan = if !trails.is_empty() && rng.gen_bool(self.pheromone_sensitivity) {
            let base_plan = trails[0].execution_plan.clone();
            self.vary_plan(&base_plan, rng)
        } else {
            self.generate_random_plan(rng)
        };

        let cost = estimate_cost(&plan, baselines, rng);
        (plan, cost)
    }

    fn generate_random_plan(&self, rng: &mut impl Rng) -> Value {
        let mut plan = serde_json::Map::new();
        plan.insert("operation".to_string(), json!(self.query.operation));

        if !self.query.joins.is_empty() {
            let mut joins = self.query.joins.clone();
            joins.shuffle(rng);
            plan.insert("join_order".to_string(), json!(joins));
        }

        if !self.query.filters.is_empty() {
            let mut filters = self.query.filters.clone();
            filters.shuffle(rng);
            plan.insert("filter_order".to_string(), json!(filters));
        }

        if !self.query.indexed_properties.is_empty() {
            let k = rng.gen_range(0..=self.query.indexed_properties.len());
            let mut chosen = self.query.indexed_properties.clone();
            chosen.shuffle(rng);
            chosen.truncate(k);
            plan.insert("use_indexes".to_string(), json!(chosen));
        }

        if self.query.has_traversal {
            let strategy = TRAVERSAL_STRATEGIES.choose(rng).unwrap();
            plan.insert("traversal_strategy".to_string(), json!(strategy));
        }

        Value::Object(plan)
    }

    /// A small mutation of `base_plan`: swap two joins, add/remove one
    /// index choice, or switch the traversal strategy — never all three.
    fn vary_plan(&self, base_plan: &Value, rng: &mut impl Rng) -> Value {
        let mut plan = base_plan.clone();
        let Value::Object(ref mut map) = plan else { return plan };
        let mutation: f64 = rng.gen();

        if mutation < 0.3 {
            if let Some(Value::Array(order)) = map.get_mut("join_order") {
                if order.len() >= 2 {
                    let i = rng.gen_range(0..order.len());
                    let mut j = rng.gen_range(0..order.len());
                    while j == i {
                        j = rng.gen_range(0..order.len());
                    }
                    order.swap(i, j);
                }
            }
        } else if mutation < 0.6 {
            if let Some(Value::Array(indexes)) = map.get_mut("use_indexes") {
                if rng.gen_bool(0.5) && !self.query.indexed_properties.is_empty() {
                    let current: Vec<String> = indexes.iter().filter_map(|v| v.as_str().map(String::from)).collect();
                    let available: Vec<&String> =
                        self.query.indexed_properties.iter().filter(|p| !current.contains(p)).collect();
                    if let Some(pick) = available.choose(rng) {
                        indexes.push(json!(pick.to_string()));
                    }
                } else if !indexes.is_empty() {
                    let idx = rng.gen_range(0..indexes.len());
                    indexes.remove(idx);
                }
            }
        } else if let Some(Value::String(current)) = map.get("traversal_strategy").cloned() {
            let remaining: Vec<&&str> = TRAVERSAL_STRATEGIES.iter().filter(|s| **s != current).collect();
            if let Some(next) = remaining.choose(rng) {
                map.insert("traversal_strategy".to_string(), json!(**next));
            }
        }

        plan
    }
}

/// Cost model: fixed per-access-pattern baseline, multiplied by join
/// combinatorics, discounted by index usage and traversal strategy, with
/// uniform noise to simulate real-world variability. Lower is better.
///
/// The baseline is chosen from what the plan actually does, not the query's
/// `operation` field (which names `select`/`match`/etc., never `scan`/
/// `lookup`/`traverse`): a plan carrying a `traversal_strategy` pays the
/// traversal baseline, one carrying non-empty `use_indexes` pays the lookup
/// baseline, and everything else falls back to a full scan.
fn estimate_cost(plan: &Value, baselines: CostBaselines, rng: &mut impl Rng) -> f64 {
    let uses_indexes = matches!(plan.get("use_indexes"), Some(Value::Array(a)) if !a.is_empty());
    let mut cost = if plan.get("traversal_strategy").is_some() {
        baselines.traverse
    } else if uses_indexes {
        baselines.lookup
    } else {
        baselines.scan
    };

    if let Some(Value::Array(joins)) = plan.get("join_order") {
        let n = joins.len() as f64;
        cost += n * JOIN_BASE_COST * JOIN_GROWTH.powf(n);
    }

    if let Some(Value::Array(indexes)) = plan.get("use_indexes") {
        cost *= INDEX_DISCOUNT.powf(indexes.len() as f64);
    }

    match plan.get("traversal_strategy").and_then(Value::as_str) {
        Some("bfs") => cost *= STRATEGY_FACTOR_BFS,
        Some("dfs") => cost *= STRATEGY_FACTOR_DFS,
        Some("bidirectional") => cost *= STRATEGY_FACTOR_BIDIRECTIONAL,
        _ => {}
    }

    cost * rng.gen_range(NOISE_LOW..=NOISE_HIGH)
}

/// Read-only snapshot of optimizer activity, mirroring the stigmergy
/// cache's own stats struct.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptimizerStats {
    pub total_optimizations: u64,
    pub avg_plans_explored: usize,
    pub avg_improvement_ratio: f64,
}

/// Deploys a colony of ants across several iterations to converge on a
/// good execution plan for one query, reinforcing the stigmergy cache as
/// it goes.
pub struct AntColonyOptimizer {
    config: ExplorerConfig,
    cache: StigmergyCache,
    stats: OptimizerStats,
}

impl AntColonyOptimizer {
    pub fn new(config: ExplorerConfig, cache: StigmergyCache) -> Self {
        Self { config, cache, stats: OptimizerStats::default() }
    }

    pub fn cache_mut(&mut self) -> &mut StigmergyCache {
        &mut self.cache
    }

    /// Run the configured number of iterations and ants, returning the
    /// lowest-cost plan found. The top fifth of each iteration's ants
    /// reinforce the cache so later iterations (and later queries with
    /// the same signature) are biased toward what worked.
    pub fn optimize(&mut self, query: &QuerySpec, baselines: CostBaselines) -> Value {
        let mut rng = thread_rng();
        let mut best_plan: Option<Value> = None;
        let mut best_cost = f64::INFINITY;
        let mut all_costs: Vec<f64> = Vec::new();

        for iteration in 0..self.config.num_iterations {
            let sensitivity = self.config.base_pheromone_sensitivity
                + (iteration as f64 / self.config.num_iterations as f64)
                    * (self.config.max_pheromone_sensitivity - self.config.base_pheromone_sensitivity);

            let mut iteration_plans: Vec<(Value, f64)> = Vec::with_capacity(self.config.num_ants);
            for _ in 0..self.config.num_ants {
                let ant = QueryAnt { query, pheromone_sensitivity: sensitivity };
                let (plan, cost) = ant.explore(baselines, &mut self.cache, &mut rng);

                if cost < best_cost {
                    best_cost = cost;
                    best_plan = Some(plan.clone());
                }
                all_costs.push(cost);
                iteration_plans.push((plan, cost));
            }

            iteration_plans.sort_by(|a, b| a.1.total_cmp(&b.1));
            let top_count = (self.config.num_ants / 5).max(1);
            let signature = query.signature();
            for (plan, cost) in iteration_plans.into_iter().take(top_count) {
                self.cache.add_trail(&signature, plan, cost, true);
            }
        }

        self.stats.total_optimizations += 1;
        self.stats.avg_plans_explored = all_costs.len();
        if let Some(worst) = all_costs.iter().cloned().fold(None, |acc: Option<f64>, c| {
            Some(acc.map_or(c, |a| a.max(c)))
        }) {
            if worst > 0.0 {
                self.stats.avg_improvement_ratio = worst / best_cost;
            }
        }

        best_plan.unwrap_or_else(|| json!({ "operation": query.operation }))
    }

    pub fn stats(&self) -> &OptimizerStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> QuerySpec {
        QuerySpec {
            operation: "select".into(),
            collection: Some("Users".into()),
            joins: vec![],
            filters: vec!["age".into()],
            indexed_properties: vec!["age".into()],
            has_traversal: false,
        }
    }

    #[test]
    fn optimize_returns_a_plan_with_matching_operation() {
        let mut optimizer = AntColonyOptimizer::new(ExplorerConfig::default(), StigmergyCache::new(pherodb_core::CacheConfig::default()));
        let plan = optimizer.optimize(&spec(), CostBaselines::default());
        assert_eq!(plan.get("operation").and_then(Value::as_str), Some("select"));
    }

    #[test]
    fn optimize_reinforces_the_cache() {
        let mut optimizer = AntColonyOptimizer::new(ExplorerConfig::default(), StigmergyCache::new(pherodb_core::CacheConfig::default()));
        optimizer.optimize(&spec(), CostBaselines::default());
        assert!(optimizer.cache_mut().lookup(&spec().signature()).len() >= 1);
    }

    #[test]
    fn repeated_optimizations_increment_stats() {
        let mut optimizer = AntColonyOptimizer::new(ExplorerConfig::default(), StigmergyCache::new(pherodb_core::CacheConfig::default()));
        optimizer.optimize(&spec(), CostBaselines::default());
        optimizer.optimize(&spec(), CostBaselines::default());
        assert_eq!(optimizer.stats().total_optimizations, 2);
    }

    #[test]
    fn indexed_plan_with_discount_costs_less_than_unindexed_scan() {
        let mut rng = rand::thread_rng();
        let scan = json!({"operation": "scan"});
        let indexed = json!({"operation": "scan", "use_indexes": ["age"]});
        let baselines = CostBaselines::default();
        // Noise is uniform(0.9, 1.1); the index discount (0.7) widens the
        // gap enough that ranges never overlap, so this holds regardless
        // of the RNG draw.
        assert!(estimate_cost(&indexed, baselines, &mut rng) < estimate_cost(&scan, baselines, &mut rng));
    }
}
