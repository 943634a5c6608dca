//! The executor: dispatches a `Plan` by operation, consulting the
//! stigmergy cache and ant-colony explorer for select/match plans, and
//! running the rest directly against the store.

use crate::plan::{
    BoundFilter, Hints, InsertPayload, Operation, Pattern, PatternNode, Plan, Projection, TraversalStrategy,
};
use pherodb_core::{Comparator, Direction, Entity, EntityId, ExecutorError, PlanError, PropertyValue};
use pherodb_optimizer::{AntColonyOptimizer, CostBaselines, QuerySpec};
use pherodb_storage::GraphStore;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;
use tracing::trace;

/// Running counters over executor activity, mirroring the cache's and
/// optimizer's own stats structs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutorStats {
    pub total_queries: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub total_execution_time_ms: f64,
}

impl ExecutorStats {
    pub fn avg_execution_time_ms(&self) -> f64 {
        if self.total_queries == 0 {
            0.0
        } else {
            self.total_execution_time_ms / self.total_queries as f64
        }
    }

    fn record(&mut self, latency_ms: f64, cache_hit: bool) {
        self.total_queries += 1;
        self.total_execution_time_ms += latency_ms;
        if cache_hit {
            self.cache_hits += 1;
        } else {
            self.cache_misses += 1;
        }
    }
}

/// Runs query plans against a `GraphStore`, learning from the stigmergy
/// cache and ant-colony explorer as it goes. One `Executor` per store is
/// the usual arrangement, since it owns the optimizer's cache of learned
/// trails across calls.
pub struct Executor {
    optimizer: AntColonyOptimizer,
    baselines: CostBaselines,
    stats: ExecutorStats,
}

impl Executor {
    pub fn new(optimizer: AntColonyOptimizer) -> Self {
        Self { optimizer, baselines: CostBaselines::default(), stats: ExecutorStats::default() }
    }

    pub fn with_baselines(mut self, baselines: CostBaselines) -> Self {
        self.baselines = baselines;
        self
    }

    pub fn stats(&self) -> &ExecutorStats {
        &self.stats
    }

    pub fn optimizer_mut(&mut self) -> &mut AntColonyOptimizer {
        &mut self.optimizer
    }

    /// Run one plan against `store`, returning its result rows or a
    /// structural error (`UnknownCollection`, `UnsupportedOperation`, the
    /// `TypeMismatch` a range lookup aborts on). Row-level failures never
    /// reach here — they are silently dropped during filtering.
    pub fn execute(&mut self, store: &mut GraphStore, plan: &Plan) -> Result<Vec<Value>, ExecutorError> {
        match plan.operation.0 {
            Some(Operation::Select) => self.execute_select(store, plan),
            Some(Operation::Match) => self.execute_match(store, plan),
            Some(Operation::Insert) | Some(Operation::Create) => execute_insert(store, plan),
            Some(Operation::Update) => execute_update(store, plan),
            Some(Operation::Delete) => execute_delete(store, plan),
            Some(Operation::CreateTable) => execute_create_table(store, plan),
            Some(Operation::CreateIndex) => execute_create_index(store, plan),
            None => Err(PlanError::UnsupportedOperation { operation: "<unset>".to_string() }.into()),
        }
    }

    fn execute_select(&mut self, store: &mut GraphStore, plan: &Plan) -> Result<Vec<Value>, ExecutorError> {
        let collection_name = plan
            .collection
            .clone()
            .ok_or_else(|| PlanError::UnknownCollection { name: String::new() })?;
        if store.get_collection(&collection_name).is_none() {
            return Err(PlanError::UnknownCollection { name: collection_name }.into());
        }

        let spec = query_spec(plan);
        let (plan_json, cache_hit) = self.resolve_plan_json(&spec);
        let hints = hints_from_json(&plan_json, &plan.hints);

        let start = Instant::now();
        let result = run_select(store, plan, &collection_name, &hints);
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        self.reinforce(&spec, plan_json, latency_ms, result.is_ok(), cache_hit);
        result
    }

    fn execute_match(&mut self, store: &mut GraphStore, plan: &Plan) -> Result<Vec<Value>, ExecutorError> {
        let spec = query_spec(plan);
        let (plan_json, cache_hit) = self.resolve_plan_json(&spec);

        let start = Instant::now();
        let result = run_match(store, plan);
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        self.reinforce(&spec, plan_json, latency_ms, result.is_ok(), cache_hit);
        result
    }

    /// Ask the cache for the best surviving trail's plan; on a miss, ask
    /// the ant-colony explorer (which seeds the cache itself). Returns
    /// the chosen plan JSON and whether it was a cache hit.
    fn resolve_plan_json(&mut self, spec: &QuerySpec) -> (Value, bool) {
        let sig = spec.signature();
        match self.optimizer.cache_mut().best_plan(&sig) {
            Some(json) => (json, true),
            None => (self.optimizer.optimize(spec, self.baselines), false),
        }
    }

    fn reinforce(&mut self, spec: &QuerySpec, plan_json: Value, latency_ms: f64, success: bool, cache_hit: bool) {
        let sig = spec.signature();
        self.optimizer.cache_mut().add_trail(&sig, plan_json, latency_ms, success);
        self.stats.record(latency_ms, cache_hit);
        trace!(latency_ms, success, cache_hit, "query executed");
    }
}

// ---------------------------------------------------------------------
// select
// ---------------------------------------------------------------------

fn run_select(
    store: &mut GraphStore,
    plan: &Plan,
    collection_name: &str,
    hints: &Hints,
) -> Result<Vec<Value>, ExecutorError> {
    let ordered = order_filters(&plan.filters, &hints.filter_order);
    let pushdown = ordered
        .iter()
        .find(|f| matches!(f.comparator, Comparator::Eq | Comparator::Lt | Comparator::Gt));

    let collection = store.get_collection_mut(collection_name).expect("existence checked by caller");
    let candidates: Vec<Entity> = match pushdown {
        Some(f) if f.comparator == Comparator::Eq => {
            collection.lookup_exact(&f.property, &f.literal).into_iter().cloned().collect()
        }
        Some(f) if f.comparator == Comparator::Gt => {
            collection.lookup_range_checked(&f.property, Some(&f.literal), None)?.into_iter().cloned().collect()
        }
        Some(f) if f.comparator == Comparator::Lt => {
            collection.lookup_range_checked(&f.property, None, Some(&f.literal))?.into_iter().cloned().collect()
        }
        _ => collection.scan().cloned().collect(),
    };

    let mut rows = Vec::new();
    'candidates: for entity in &candidates {
        for f in &plan.filters {
            if !f.matches(entity.get_property(&f.property)) {
                continue 'candidates;
            }
        }
        rows.push(project_entity(entity, &plan.projections));
    }
    if let Some(limit) = plan.limit {
        rows.truncate(limit);
    }
    Ok(rows)
}

fn order_filters<'a>(filters: &'a [pherodb_core::FilterExpr], filter_order: &[String]) -> Vec<&'a pherodb_core::FilterExpr> {
    let mut ordered: Vec<&pherodb_core::FilterExpr> = Vec::with_capacity(filters.len());
    for prop in filter_order {
        if let Some(f) = filters.iter().find(|f| &f.property == prop) {
            if !ordered.iter().any(|o| std::ptr::eq(*o, f)) {
                ordered.push(f);
            }
        }
    }
    for f in filters {
        if !ordered.iter().any(|o| std::ptr::eq(*o, f)) {
            ordered.push(f);
        }
    }
    ordered
}

fn project_entity(entity: &Entity, projections: &[Projection]) -> Value {
    if projections.is_empty() {
        return entity_to_json(entity);
    }
    let mut map = serde_json::Map::new();
    for p in projections {
        match p {
            Projection::All => {
                if let Value::Object(obj) = entity_to_json(entity) {
                    map.extend(obj);
                }
            }
            Projection::Field(name) => {
                let value = entity.get_property(name).cloned().unwrap_or(PropertyValue::Null);
                map.insert(name.clone(), serde_json::to_value(&value).unwrap_or(Value::Null));
            }
            Projection::VarField { field, .. } => {
                let value = entity.get_property(field).cloned().unwrap_or(PropertyValue::Null);
                map.insert(field.clone(), serde_json::to_value(&value).unwrap_or(Value::Null));
            }
        }
    }
    Value::Object(map)
}

fn entity_to_json(entity: &Entity) -> Value {
    serde_json::to_value(entity).unwrap_or(Value::Null)
}

// ---------------------------------------------------------------------
// match (graph pattern)
// ---------------------------------------------------------------------

/// Runs a pattern against the store, fanning out one row per surviving
/// binding combination: the first node seeds one partial binding per
/// matching candidate, and each edge step extends every live partial
/// binding by every frontier target that survives the next node's label,
/// inline properties, and bound WHERE clauses (not just the first one —
/// two matching targets at the same step produce two distinct output
/// rows, as required by a query like `(u)-[:FOLLOWS]->(f)` binding `f` to
/// every followee, not only the first traversed).
fn run_match(store: &GraphStore, plan: &Plan) -> Result<Vec<Value>, ExecutorError> {
    let Some(pattern) = &plan.pattern else { return Ok(Vec::new()) };
    let Some(first_node) = pattern.nodes.first() else { return Ok(Vec::new()) };

    let candidate_ids: Vec<EntityId> = match &first_node.label {
        Some(label) => {
            let collection = store
                .get_collection(label)
                .ok_or_else(|| PlanError::UnknownCollection { name: label.clone() })?;
            collection.scan().map(|e| e.id).collect()
        }
        None => store.all_entities().map(|e| e.id).collect(),
    };

    let mut bindings: Vec<HashMap<String, EntityId>> = Vec::new();
    for start_id in candidate_ids {
        let Some(entity) = store.peek_entity(start_id) else { continue };
        if !node_matches(entity, first_node) || !where_matches(entity, &first_node.var, &plan.where_filters) {
            continue;
        }
        let mut binding = HashMap::new();
        binding.insert(first_node.var.clone(), start_id);
        bindings.push(binding);
    }

    for edge in &pattern.edges {
        let Some(to_node) = pattern.nodes.iter().find(|n| n.var == edge.to) else {
            bindings.clear();
            break;
        };

        let mut extended = Vec::new();
        for binding in &bindings {
            let Some(&from_id) = binding.get(&edge.from) else { continue };
            let frontier = store.traverse(from_id, Some(&edge.edge_type), edge.direction, 1, None);
            for target_id in frontier {
                let Some(candidate) = store.peek_entity(target_id) else { continue };
                if node_matches(candidate, to_node) && where_matches(candidate, &to_node.var, &plan.where_filters) {
                    let mut next = binding.clone();
                    next.insert(to_node.var.clone(), target_id);
                    extended.push(next);
                }
            }
        }
        bindings = extended;
    }

    let mut rows: Vec<Value> = bindings.iter().map(|b| project_bindings(b, store, &plan.projections)).collect();
    if let Some(limit) = plan.limit {
        rows.truncate(limit);
    }
    Ok(rows)
}

fn node_matches(entity: &Entity, node: &PatternNode) -> bool {
    if let Some(label) = &node.label {
        if entity.type_tag != *label {
            return false;
        }
    }
    node.properties.iter().all(|(key, value)| entity.get_property(key) == Some(value))
}

fn where_matches(entity: &Entity, var: &str, where_filters: &[BoundFilter]) -> bool {
    where_filters
        .iter()
        .filter(|bf| bf.var == var)
        .all(|bf| bf.filter.matches(entity.get_property(&bf.filter.property)))
}

fn project_bindings(bindings: &HashMap<String, EntityId>, store: &GraphStore, projections: &[Projection]) -> Value {
    let mut map = serde_json::Map::new();
    let whole_entity = |var: &str, map: &mut serde_json::Map<String, Value>| {
        if let Some(id) = bindings.get(var) {
            if let Some(entity) = store.peek_entity(*id) {
                map.insert(var.to_string(), entity_to_json(entity));
            }
        }
    };

    if projections.is_empty() {
        for var in bindings.keys() {
            whole_entity(var, &mut map);
        }
        return Value::Object(map);
    }

    for p in projections {
        match p {
            Projection::All => {
                for var in bindings.keys() {
                    whole_entity(var, &mut map);
                }
            }
            Projection::Field(var) => whole_entity(var, &mut map),
            Projection::VarField { var, field } => {
                if let Some(id) = bindings.get(var) {
                    if let Some(entity) = store.peek_entity(*id) {
                        let value = entity.get_property(field).cloned().unwrap_or(PropertyValue::Null);
                        map.insert(field.clone(), serde_json::to_value(&value).unwrap_or(Value::Null));
                    }
                }
            }
        }
    }
    Value::Object(map)
}

// ---------------------------------------------------------------------
// insert / create
// ---------------------------------------------------------------------

fn execute_insert(store: &mut GraphStore, plan: &Plan) -> Result<Vec<Value>, ExecutorError> {
    match &plan.insert {
        Some(InsertPayload::Entity { collection, properties }) => {
            let id = store.add_entity(collection.clone(), properties.clone(), None);
            let entity = store
                .peek_entity(id)
                .cloned()
                .ok_or(ExecutorError::TargetNotFound { id })?;
            Ok(vec![entity_to_json(&entity)])
        }
        Some(InsertPayload::Pattern(pattern)) => materialize_pattern(store, pattern),
        None => Err(PlanError::UnsupportedOperation { operation: "insert with no payload".to_string() }.into()),
    }
}

fn materialize_pattern(store: &mut GraphStore, pattern: &Pattern) -> Result<Vec<Value>, ExecutorError> {
    let mut bindings: HashMap<String, EntityId> = HashMap::new();
    for node in &pattern.nodes {
        let collection_name = node.label.clone().unwrap_or_else(|| "default".to_string());
        let properties: HashMap<String, PropertyValue> = node.properties.iter().cloned().collect();
        let id = store.add_entity(collection_name, properties, None);
        bindings.insert(node.var.clone(), id);
    }
    for edge in &pattern.edges {
        let (Some(&from_id), Some(&to_id)) = (bindings.get(&edge.from), bindings.get(&edge.to)) else { continue };
        let (source, target) = match edge.direction {
            Direction::In => (to_id, from_id),
            Direction::Out | Direction::Both => (from_id, to_id),
        };
        store.add_edge(source, target, edge.edge_type.clone(), HashMap::new());
    }
    Ok(bindings
        .values()
        .filter_map(|id| store.peek_entity(*id))
        .map(entity_to_json)
        .collect())
}

// ---------------------------------------------------------------------
// update / delete
// ---------------------------------------------------------------------

fn execute_update(store: &mut GraphStore, plan: &Plan) -> Result<Vec<Value>, ExecutorError> {
    let collection_name = plan
        .collection
        .clone()
        .ok_or_else(|| PlanError::UnknownCollection { name: String::new() })?;
    if store.get_collection(&collection_name).is_none() {
        return Err(PlanError::UnknownCollection { name: collection_name }.into());
    }

    let target_ids: Vec<EntityId> = {
        let collection = store.get_collection(&collection_name).expect("checked above");
        collection
            .filter(|e| plan.filters.iter().all(|f| f.matches(e.get_property(&f.property))))
            .into_iter()
            .map(|e| e.id)
            .collect()
    };

    let mut rows = Vec::new();
    let collection = store.get_collection_mut(&collection_name).expect("checked above");
    for id in target_ids {
        if let Some(entity) = collection.update_entity(id, &plan.assignments) {
            rows.push(entity_to_json(entity));
        }
    }
    Ok(rows)
}

fn execute_delete(store: &mut GraphStore, plan: &Plan) -> Result<Vec<Value>, ExecutorError> {
    let collection_name = plan
        .collection
        .clone()
        .ok_or_else(|| PlanError::UnknownCollection { name: String::new() })?;
    if store.get_collection(&collection_name).is_none() {
        return Err(PlanError::UnknownCollection { name: collection_name }.into());
    }

    let (target_ids, rows): (Vec<EntityId>, Vec<Value>) = {
        let collection = store.get_collection(&collection_name).expect("checked above");
        let matching = collection.filter(|e| plan.filters.iter().all(|f| f.matches(e.get_property(&f.property))));
        (matching.iter().map(|e| e.id).collect(), matching.iter().map(|e| entity_to_json(e)).collect())
    };
    for id in target_ids {
        store.remove_entity(id);
    }
    Ok(rows)
}

// ---------------------------------------------------------------------
// DDL
// ---------------------------------------------------------------------

fn execute_create_table(store: &mut GraphStore, plan: &Plan) -> Result<Vec<Value>, ExecutorError> {
    let name = plan
        .collection
        .clone()
        .ok_or_else(|| PlanError::UnknownCollection { name: String::new() })?;
    store.create_collection(name, plan.schema.clone());
    Ok(Vec::new())
}

fn execute_create_index(store: &mut GraphStore, plan: &Plan) -> Result<Vec<Value>, ExecutorError> {
    let collection_name = plan
        .collection
        .clone()
        .ok_or_else(|| PlanError::UnknownCollection { name: String::new() })?;
    let property = plan
        .index_property
        .clone()
        .ok_or_else(|| PlanError::UnsupportedOperation { operation: "create_index with no property".to_string() })?;
    let collection = store
        .get_collection_mut(&collection_name)
        .ok_or_else(|| PlanError::UnknownCollection { name: collection_name })?;
    collection.create_index(property);
    Ok(Vec::new())
}

// ---------------------------------------------------------------------
// optimizer bridging
// ---------------------------------------------------------------------

fn query_spec(plan: &Plan) -> QuerySpec {
    let filters: Vec<String> = plan.filters.iter().map(|f| f.property.clone()).collect();
    let indexed_properties = if plan.hints.use_indexes.is_empty() { filters.clone() } else { plan.hints.use_indexes.clone() };
    QuerySpec {
        operation: plan.operation.0.map(|o| o.as_str().to_string()).unwrap_or_default(),
        collection: plan.collection.clone(),
        joins: plan.hints.join_order.clone(),
        filters,
        indexed_properties,
        has_traversal: plan.pattern.is_some(),
    }
}

fn hints_from_json(value: &Value, fallback: &Hints) -> Hints {
    let string_array = |key: &str, fallback: &[String]| -> Vec<String> {
        value
            .get(key)
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_else(|| fallback.to_vec())
    };
    Hints {
        filter_order: string_array("filter_order", &fallback.filter_order),
        use_indexes: string_array("use_indexes", &fallback.use_indexes),
        join_order: string_array("join_order", &fallback.join_order),
        traversal_strategy: value
            .get("traversal_strategy")
            .and_then(Value::as_str)
            .and_then(TraversalStrategy::parse)
            .unwrap_or(fallback.traversal_strategy),
    }
}
