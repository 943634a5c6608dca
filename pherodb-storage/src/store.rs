//! GraphStore: the authoritative property-graph structure. Coordinates
//! entities, edges, collections and their dual adjacency directories, and
//! implements traversal and pheromone-weighted routing.

use crate::Collection;
use pherodb_core::{Direction, Edge, EdgeId, Entity, EntityId, PropertyValue, StorageError, StoreConfig};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use tracing::{debug, trace};

/// Snapshot counters over the whole store. Descriptive only, like
/// `Collection`'s stats; the optimizer's cost model does not consume these.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphStats {
    pub entity_count: usize,
    pub edge_count: usize,
    pub collection_count: usize,
}

/// edge_type -> endpoint_id -> edge_id, keyed per source (outgoing) or per
/// target (incoming). A second `add_edge` for the same (source, type,
/// target) overwrites the entry here and releases the old edge-table
/// record, so at most one edge ever occupies a given triple.
type AdjacencyDirectory = HashMap<EntityId, HashMap<String, HashMap<EntityId, EdgeId>>>;

#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    collections: HashMap<String, Collection>,
    /// Which collection currently owns a given entity id, so `get_entity`/
    /// `remove_entity` can be addressed by id alone without a second,
    /// duplicate copy of every entity living directly in the store.
    entity_location: HashMap<EntityId, String>,

    edges: HashMap<EdgeId, Edge>,
    outgoing: AdjacencyDirectory,
    incoming: AdjacencyDirectory,

    config: StoreConfig,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            collections: HashMap::new(),
            entity_location: HashMap::new(),
            edges: HashMap::new(),
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
            config,
        }
    }

    // ---------------------------------------------------------------
    // Entities
    // ---------------------------------------------------------------

    /// Create and add an entity, stored under `type_or_collection` (a
    /// collection is created if it does not already exist). Returns the
    /// assigned id.
    pub fn add_entity(
        &mut self,
        type_or_collection: impl Into<String>,
        properties: HashMap<String, PropertyValue>,
        id: Option<EntityId>,
    ) -> EntityId {
        let collection_name = type_or_collection.into();
        let id = id.unwrap_or_else(EntityId::new_v4);
        let entity = Entity::new(id, collection_name.clone(), properties);

        self.get_or_create_collection(&collection_name).add_entity(entity);
        self.entity_location.insert(id, collection_name);
        self.outgoing.entry(id).or_default();
        self.incoming.entry(id).or_default();

        trace!(entity_id = %id, "entity added");
        id
    }

    /// Look up an entity, marking it accessed as a side effect (pheromone
    /// bookkeeping for entities).
    pub fn get_entity(&mut self, id: EntityId) -> Option<&Entity> {
        let collection_name = self.entity_location.get(&id)?.clone();
        let collection = self.collections.get_mut(&collection_name)?;
        collection.get_entity_mut(id)?.mark_accessed();
        collection.get_entity(id)
    }

    /// Remove an entity: drops it from its collection, cascades through
    /// every incident edge on both adjacency directories, and erases the
    /// entity. Cascades are total — no dangling edge remains.
    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        let Some(collection_name) = self.entity_location.remove(&id) else { return false };

        let incident: Vec<EdgeId> = self
            .outgoing
            .get(&id)
            .into_iter()
            .flat_map(|by_type| by_type.values())
            .chain(self.incoming.get(&id).into_iter().flat_map(|by_type| by_type.values()))
            .copied()
            .collect();
        for edge_id in incident {
            self.remove_edge(edge_id);
        }

        self.outgoing.remove(&id);
        self.incoming.remove(&id);

        if let Some(collection) = self.collections.get_mut(&collection_name) {
            collection.remove_entity(id);
        }
        debug!(entity_id = %id, "entity removed");
        true
    }

    // ---------------------------------------------------------------
    // Edges
    // ---------------------------------------------------------------

    /// Add a directed edge. Both endpoints must already exist, otherwise
    /// returns `None`. A second call with the same (source, type, target)
    /// overwrites the adjacency entry and releases the old edge record.
    pub fn add_edge(
        &mut self,
        source: EntityId,
        target: EntityId,
        edge_type: impl Into<String>,
        properties: HashMap<String, PropertyValue>,
    ) -> Option<EdgeId> {
        if !self.entity_location.contains_key(&source) || !self.entity_location.contains_key(&target) {
            return None;
        }
        let edge_type = edge_type.into();

        if let Some(old_id) = self
            .outgoing
            .get(&source)
            .and_then(|by_type| by_type.get(&edge_type))
            .and_then(|targets| targets.get(&target))
            .copied()
        {
            self.edges.remove(&old_id);
        }

        let edge_id = EdgeId::new_v4();
        let edge = Edge::new(edge_id, source, target, edge_type.clone(), properties);
        self.edges.insert(edge_id, edge);

        self.outgoing.entry(source).or_default().entry(edge_type.clone()).or_default().insert(target, edge_id);
        self.incoming.entry(target).or_default().entry(edge_type.clone()).or_default().insert(source, edge_id);

        self.mutate_entity(source, |e| e.add_outgoing_edge(edge_type.clone(), target));
        self.mutate_entity(target, |e| e.add_incoming_edge(edge_type.clone(), source));
        self.refresh_degree_stats_for(source);
        self.refresh_degree_stats_for(target);

        trace!(edge_id = %edge_id, %source, %target, "edge added");
        Some(edge_id)
    }

    pub fn get_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn get_edge_mut(&mut self, id: EdgeId) -> Option<&mut Edge> {
        self.edges.get_mut(&id)
    }

    /// Remove an edge from both adjacency directories and the edge table,
    /// and from both entities' local neighbor sets. Idempotent: removing
    /// an absent id returns `false`.
    pub fn remove_edge(&mut self, id: EdgeId) -> bool {
        let Some(edge) = self.edges.remove(&id) else { return false };

        if let Some(by_type) = self.outgoing.get_mut(&edge.source) {
            if let Some(targets) = by_type.get_mut(&edge.type_tag) {
                targets.remove(&edge.target);
            }
        }
        if let Some(by_type) = self.incoming.get_mut(&edge.target) {
            if let Some(sources) = by_type.get_mut(&edge.type_tag) {
                sources.remove(&edge.source);
            }
        }
        self.mutate_entity(edge.source, |e| e.remove_outgoing_edge(&edge.type_tag, edge.target));
        self.mutate_entity(edge.target, |e| e.remove_incoming_edge(&edge.type_tag, edge.source));
        self.refresh_degree_stats_for(edge.source);
        self.refresh_degree_stats_for(edge.target);
        true
    }

    pub fn get_edges_between(&self, source: EntityId, target: EntityId, edge_type: Option<&str>) -> Vec<&Edge> {
        let Some(by_type) = self.outgoing.get(&source) else { return Vec::new() };
        match edge_type {
            Some(t) => by_type
                .get(t)
                .and_then(|targets| targets.get(&target))
                .and_then(|id| self.edges.get(id))
                .into_iter()
                .collect(),
            None => by_type
                .values()
                .filter_map(|targets| targets.get(&target))
                .filter_map(|id| self.edges.get(id))
                .collect(),
        }
    }

    // ---------------------------------------------------------------
    // Collections
    // ---------------------------------------------------------------

    /// Create a collection, optionally with an advisory schema. No-op if
    /// the collection already exists (its schema is not overwritten).
    pub fn create_collection(&mut self, name: impl Into<String>, schema: Option<HashMap<String, String>>) {
        let name = name.into();
        self.collections.entry(name.clone()).or_insert_with(|| match schema {
            Some(schema) => Collection::with_schema(name, schema),
            None => Collection::new(name),
        });
    }

    pub fn get_or_create_collection(&mut self, name: impl Into<String>) -> &mut Collection {
        let name = name.into();
        self.collections.entry(name.clone()).or_insert_with(|| Collection::new(name))
    }

    pub fn get_collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    pub fn get_collection_mut(&mut self, name: &str) -> Option<&mut Collection> {
        self.collections.get_mut(name)
    }

    /// Drop a collection, cascading through `remove_entity` for every
    /// member so incident edges are cleaned up too.
    pub fn drop_collection(&mut self, name: &str) -> bool {
        if !self.collections.contains_key(name) {
            return false;
        }
        let member_ids: Vec<EntityId> = self.collections[name].scan().map(|e| e.id).collect();
        for id in member_ids {
            self.remove_entity(id);
        }
        self.collections.remove(name);
        true
    }

    // ---------------------------------------------------------------
    // Traversal
    // ---------------------------------------------------------------

    /// Breadth-first traversal from `start_id`. The start node is never
    /// included in the result. A node is visited at most once (earliest
    /// depth wins). `predicate`, if given, filters what is *emitted* but
    /// never prunes exploration: a non-matching node's own successors are
    /// still queued.
    pub fn traverse(
        &self,
        start_id: EntityId,
        edge_type: Option<&str>,
        direction: Direction,
        max_depth: usize,
        predicate: Option<&dyn Fn(&Entity) -> bool>,
    ) -> Vec<EntityId> {
        let mut visited = HashSet::new();
        visited.insert(start_id);
        let mut queue = VecDeque::new();
        queue.push_back((start_id, 0usize));
        let mut result = Vec::new();

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for next in self.neighbor_ids(current, edge_type, direction) {
                if !visited.insert(next) {
                    continue;
                }
                let emit = match predicate {
                    Some(p) => self.peek_entity(next).map(|e| p(e)).unwrap_or(false),
                    None => true,
                };
                if emit {
                    result.push(next);
                }
                queue.push_back((next, depth + 1));
            }
        }
        result
    }

    fn neighbor_ids(&self, id: EntityId, edge_type: Option<&str>, direction: Direction) -> Vec<EntityId> {
        let mut out = Vec::new();
        if matches!(direction, Direction::Out | Direction::Both) {
            if let Some(by_type) = self.outgoing.get(&id) {
                collect_directory(by_type, edge_type, &mut out);
            }
        }
        if matches!(direction, Direction::In | Direction::Both) {
            if let Some(by_type) = self.incoming.get(&id) {
                collect_directory(by_type, edge_type, &mut out);
            }
        }
        out
    }

    /// Best-first search over accumulated pheromone sum (maximized). Not
    /// guaranteed to enumerate every simple path, but the path it returns
    /// is never dominated by another reachable path with strictly greater
    /// pheromone sum.
    pub fn get_strongest_path(
        &self,
        source: EntityId,
        target: EntityId,
        edge_type: Option<&str>,
    ) -> Option<Vec<EntityId>> {
        if source == target {
            return Some(vec![source]);
        }

        let mut best_sum: HashMap<EntityId, f64> = HashMap::new();
        best_sum.insert(source, 0.0);
        let mut heap = BinaryHeap::new();
        heap.push(PathState { sum: 0.0, node: source, path: vec![source] });

        while let Some(PathState { sum, node, path }) = heap.pop() {
            if node == target {
                return Some(path);
            }
            if sum < *best_sum.get(&node).unwrap_or(&f64::NEG_INFINITY) {
                continue;
            }
            let Some(by_type) = self.outgoing.get(&node) else { continue };
            for (etype, targets) in by_type {
                if let Some(required) = edge_type {
                    if etype != required {
                        continue;
                    }
                }
                for (&next, &edge_id) in targets {
                    if path.contains(&next) {
                        continue;
                    }
                    let Some(edge) = self.edges.get(&edge_id) else { continue };
                    let next_sum = sum + edge.pheromone;
                    if next_sum > *best_sum.get(&next).unwrap_or(&f64::NEG_INFINITY) {
                        best_sum.insert(next, next_sum);
                        let mut next_path = path.clone();
                        next_path.push(next);
                        heap.push(PathState { sum: next_sum, node: next, path: next_path });
                    }
                }
            }
        }
        None
    }

    /// Multiply every edge's pheromone by `1 - evaporation_rate` (from
    /// this store's `StoreConfig`), clamped at `MIN_PHEROMONE`.
    /// Independent of any stigmergy trail.
    pub fn evaporate_pheromones(&mut self) {
        let rate = self.config.evaporation_rate;
        for edge in self.edges.values_mut() {
            edge.evaporate_pheromone(rate);
        }
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            entity_count: self.entity_location.len(),
            edge_count: self.edges.len(),
            collection_count: self.collections.len(),
        }
    }

    /// Read-only entity lookup that does not mark the entity as accessed,
    /// for internal callers (traversal, query execution) that look an
    /// entity up incidentally rather than as a direct caller request —
    /// the access-counter side effect is reserved for `get_entity`.
    pub fn peek_entity(&self, id: EntityId) -> Option<&Entity> {
        let name = self.entity_location.get(&id)?;
        self.collections.get(name)?.get_entity(id)
    }

    /// Every entity across every collection, for pattern queries whose
    /// start node carries no label.
    pub fn all_entities(&self) -> impl Iterator<Item = &Entity> {
        self.collections.values().flat_map(|c| c.scan())
    }

    /// Every edge currently in the edge table, for callers (tests,
    /// maintenance jobs) that need to sweep pheromone or adjacency state
    /// rather than look up one edge at a time.
    pub fn all_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Check the edge table and both adjacency directories agree: every
    /// edge has a matching entry on both its source's outgoing side and its
    /// target's incoming side, and every adjacency entry names an edge that
    /// still exists and points back the way the directory says it does.
    /// Intended for maintenance jobs and tests, not the mutation hot path —
    /// the directories are kept in sync on every `add_edge`/`remove_edge`
    /// call, so a mismatch here means a bug, not an expected transient state.
    pub fn check_invariants(&self) -> Result<(), StorageError> {
        for (&edge_id, edge) in &self.edges {
            let forward = self
                .outgoing
                .get(&edge.source)
                .and_then(|by_type| by_type.get(&edge.type_tag))
                .and_then(|targets| targets.get(&edge.target));
            if forward != Some(&edge_id) {
                return Err(StorageError::InvariantViolation {
                    reason: format!("edge {edge_id} missing from outgoing directory at {}", edge.source),
                });
            }
            let backward = self
                .incoming
                .get(&edge.target)
                .and_then(|by_type| by_type.get(&edge.type_tag))
                .and_then(|sources| sources.get(&edge.source));
            if backward != Some(&edge_id) {
                return Err(StorageError::InvariantViolation {
                    reason: format!("edge {edge_id} missing from incoming directory at {}", edge.target),
                });
            }
        }

        for (&source, by_type) in &self.outgoing {
            for (edge_type, targets) in by_type {
                for (&target, &edge_id) in targets {
                    let matches = self
                        .edges
                        .get(&edge_id)
                        .is_some_and(|e| e.source == source && e.target == target && &e.type_tag == edge_type);
                    if !matches {
                        return Err(StorageError::InvariantViolation {
                            reason: format!("outgoing directory entry {edge_id} at {source} has no matching edge"),
                        });
                    }
                }
            }
        }
        for (&target, by_type) in &self.incoming {
            for (edge_type, sources) in by_type {
                for (&source, &edge_id) in sources {
                    let matches = self
                        .edges
                        .get(&edge_id)
                        .is_some_and(|e| e.source == source && e.target == target && &e.type_tag == edge_type);
                    if !matches {
                        return Err(StorageError::InvariantViolation {
                            reason: format!("incoming directory entry {edge_id} at {target} has no matching edge"),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn mutate_entity(&mut self, id: EntityId, f: impl FnOnce(&mut Entity)) {
        if let Some(name) = self.entity_location.get(&id).cloned() {
            if let Some(collection) = self.collections.get_mut(&name) {
                if let Some(entity) = collection.get_entity_mut(id) {
                    f(entity);
                }
            }
        }
    }

    /// Recompute `avg_degree` for the collection owning `id`, reading each
    /// member's local adjacency view (kept in sync with the store's
    /// authoritative tables on every edge mutation).
    fn refresh_degree_stats_for(&mut self, id: EntityId) {
        let Some(name) = self.entity_location.get(&id).cloned() else { return };
        let Some(collection) = self.collections.get(&name) else { return };
        let degrees: HashMap<EntityId, usize> =
            collection.scan().map(|e| (e.id, e.degree(Direction::Both))).collect();
        if let Some(collection) = self.collections.get_mut(&name) {
            collection.refresh_degree_stats(|id| degrees.get(&id).copied().unwrap_or(0));
        }
    }
}

fn collect_directory(by_type: &HashMap<String, HashMap<EntityId, EdgeId>>, edge_type: Option<&str>, out: &mut Vec<EntityId>) {
    match edge_type {
        Some(t) => {
            if let Some(targets) = by_type.get(t) {
                out.extend(targets.keys().copied());
            }
        }
        None => {
            for targets in by_type.values() {
                out.extend(targets.keys().copied());
            }
        }
    }
}

/// Search-frontier entry for `get_strongest_path`, ordered by accumulated
/// pheromone sum so `BinaryHeap` behaves as a max-priority queue.
struct PathState {
    sum: f64,
    node: EntityId,
    path: Vec<EntityId>,
}

impl PartialEq for PathState {
    fn eq(&self, other: &Self) -> bool {
        self.sum == other.sum
    }
}
impl Eq for PathState {}

impl Ord for PathState {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sum.total_cmp(&other.sum)
    }
}
impl PartialOrd for PathState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
