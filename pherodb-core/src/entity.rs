//! Entity: the universal node type in the property graph.

use crate::{EntityId, PropertyValue, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Direction of traversal/degree relative to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum Direction {
    In,
    Out,
    Both,
}

/// A node in the property graph: properties plus a local adjacency view.
///
/// The local `outgoing`/`incoming` maps are a convenience mirror of the
/// graph store's authoritative adjacency tables (see `pherodb-storage`);
/// every mutation to one must be mirrored to the other to preserve the
/// adjacency invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Entity {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub type_tag: String,
    pub properties: HashMap<String, PropertyValue>,
    pub shard_id: Option<String>,

    outgoing: HashMap<String, HashSet<EntityId>>,
    incoming: HashMap<String, HashSet<EntityId>>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub access_count: u64,
    pub last_accessed: Option<Timestamp>,
}

impl Entity {
    /// Construct a new entity. `id` is generated by the caller (the graph
    /// store owns id assignment); this constructor only initializes state.
    pub fn new(id: EntityId, type_tag: impl Into<String>, properties: HashMap<String, PropertyValue>) -> Self {
        let now = Utc::now();
        Self {
            id,
            type_tag: type_tag.into(),
            properties,
            shard_id: None,
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
            created_at: now,
            updated_at: now,
            access_count: 0,
            last_accessed: None,
        }
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: PropertyValue) {
        self.properties.insert(key.into(), value);
        self.updated_at = Utc::now();
    }

    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Record a local outgoing edge to `target` under `edge_type`. Idempotent.
    pub fn add_outgoing_edge(&mut self, edge_type: impl Into<String>, target: EntityId) {
        self.outgoing.entry(edge_type.into()).or_default().insert(target);
    }

    /// Record a local incoming edge from `source` under `edge_type`. Idempotent.
    pub fn add_incoming_edge(&mut self, edge_type: impl Into<String>, source: EntityId) {
        self.incoming.entry(edge_type.into()).or_default().insert(source);
    }

    /// Drop a local outgoing edge to `target` under `edge_type`.
    pub fn remove_outgoing_edge(&mut self, edge_type: &str, target: EntityId) {
        if let Some(set) = self.outgoing.get_mut(edge_type) {
            set.remove(&target);
        }
    }

    /// Drop a local incoming edge from `source` under `edge_type`.
    pub fn remove_incoming_edge(&mut self, edge_type: &str, source: EntityId) {
        if let Some(set) = self.incoming.get_mut(edge_type) {
            set.remove(&source);
        }
    }

    /// Neighbor ids in `direction`, optionally filtered by edge type; the
    /// union across all edge types if `edge_type` is `None`.
    pub fn neighbors(&self, direction: Direction, edge_type: Option<&str>) -> HashSet<EntityId> {
        let mut out = HashSet::new();
        if matches!(direction, Direction::Out | Direction::Both) {
            collect_neighbors(&self.outgoing, edge_type, &mut out);
        }
        if matches!(direction, Direction::In | Direction::Both) {
            collect_neighbors(&self.incoming, edge_type, &mut out);
        }
        out
    }

    pub fn degree(&self, direction: Direction) -> usize {
        match direction {
            Direction::Out => self.outgoing.values().map(|s| s.len()).sum(),
            Direction::In => self.incoming.values().map(|s| s.len()).sum(),
            Direction::Both => self.degree(Direction::Out) + self.degree(Direction::In),
        }
    }

    pub fn mark_accessed(&mut self) {
        self.access_count += 1;
        self.last_accessed = Some(Utc::now());
    }
}

fn collect_neighbors(map: &HashMap<String, HashSet<EntityId>>, edge_type: Option<&str>, out: &mut HashSet<EntityId>) {
    match edge_type {
        Some(t) => {
            if let Some(set) = map.get(t) {
                out.extend(set.iter().copied());
            }
        }
        None => {
            for set in map.values() {
                out.extend(set.iter().copied());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity() -> Entity {
        Entity::new(EntityId::new_v4(), "Users", HashMap::new())
    }

    #[test]
    fn set_and_get_property_round_trips() {
        let mut e = entity();
        e.set_property("name", PropertyValue::Str("Alice".into()));
        assert_eq!(e.get_property("name"), Some(&PropertyValue::Str("Alice".into())));
        assert!(e.has_property("name"));
        assert!(!e.has_property("missing"));
    }

    #[test]
    fn outgoing_edge_is_idempotent_for_same_pair() {
        let mut e = entity();
        let target = EntityId::new_v4();
        e.add_outgoing_edge("FOLLOWS", target);
        e.add_outgoing_edge("FOLLOWS", target);
        assert_eq!(e.degree(Direction::Out), 1);
    }

    #[test]
    fn neighbors_filters_by_edge_type_or_unions_all() {
        let mut e = entity();
        let a = EntityId::new_v4();
        let b = EntityId::new_v4();
        e.add_outgoing_edge("FOLLOWS", a);
        e.add_outgoing_edge("BLOCKS", b);
        assert_eq!(e.neighbors(Direction::Out, Some("FOLLOWS")).len(), 1);
        assert_eq!(e.neighbors(Direction::Out, None).len(), 2);
    }

    #[test]
    fn degree_both_sums_in_and_out() {
        let mut e = entity();
        e.add_outgoing_edge("FOLLOWS", EntityId::new_v4());
        e.add_incoming_edge("FOLLOWS", EntityId::new_v4());
        assert_eq!(e.degree(Direction::Both), 2);
    }

    #[test]
    fn mark_accessed_increments_counter_and_timestamp() {
        let mut e = entity();
        assert_eq!(e.access_count, 0);
        e.mark_accessed();
        assert_eq!(e.access_count, 1);
        assert!(e.last_accessed.is_some());
    }
}
