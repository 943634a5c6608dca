//! Secondary index over one property: equality map plus a sorted structure
//! for range queries.

use pherodb_core::{Entity, EntityId, PropertyValue};
use std::collections::{HashMap, HashSet};

/// A per-property index supporting equality and range lookups.
///
/// Lazily created by its owning `Collection` on first indexed lookup; this
/// type itself has no knowledge of laziness, it is simply populated on
/// construction from whatever entities are passed to it.
#[derive(Debug, Clone, Default)]
pub struct Index {
    property: String,
    value_map: HashMap<PropertyValue, HashSet<EntityId>>,
    sorted_entries: Vec<(PropertyValue, EntityId)>,
}

impl Index {
    pub fn new(property: impl Into<String>) -> Self {
        Self { property: property.into(), value_map: HashMap::new(), sorted_entries: Vec::new() }
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    /// Insert `entity` into both structures. No-op if the property is
    /// absent. Safe to call twice for the same entity as long as the
    /// property value has not changed between calls.
    pub fn insert(&mut self, entity: &Entity) {
        let Some(value) = entity.get_property(&self.property) else { return };
        let value = value.clone();

        let already_present = self
            .value_map
            .get(&value)
            .map(|set| set.contains(&entity.id))
            .unwrap_or(false);
        if already_present {
            return;
        }

        self.value_map.entry(value.clone()).or_default().insert(entity.id);

        let pos = self
            .sorted_entries
            .partition_point(|(v, id)| (v, id) < (&value, &entity.id));
        self.sorted_entries.insert(pos, (value, entity.id));
    }

    /// Remove `entity` from both structures for its current value. No-op
    /// if the property is absent.
    pub fn remove(&mut self, entity: &Entity) {
        let Some(value) = entity.get_property(&self.property) else { return };
        let value = value.clone();

        if let Some(set) = self.value_map.get_mut(&value) {
            set.remove(&entity.id);
            if set.is_empty() {
                self.value_map.remove(&value);
            }
        }

        self.sorted_entries.retain(|(v, id)| !(*v == value && *id == entity.id));
    }

    /// Exact-match lookup. Returns an owned copy the caller may mutate
    /// freely without affecting the index.
    pub fn lookup_exact(&self, value: &PropertyValue) -> HashSet<EntityId> {
        self.value_map.get(value).cloned().unwrap_or_default()
    }

    /// Range lookup: `min <= value <= max`, either bound optional.
    /// Comparison uses the value type's natural ordering; mixed-type
    /// entries in the index simply sort after/before by type rank (see
    /// `PropertyValue`'s `Ord` impl) rather than erroring here — callers
    /// needing a strict type check do so before calling.
    pub fn lookup_range(&self, min: Option<&PropertyValue>, max: Option<&PropertyValue>) -> HashSet<EntityId> {
        let mut result = HashSet::new();
        for (value, id) in &self.sorted_entries {
            if let Some(min) = min {
                if value < min {
                    continue;
                }
            }
            if let Some(max) = max {
                if value > max {
                    break;
                }
            }
            result.insert(*id);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn entity_with(property: &str, value: PropertyValue) -> Entity {
        let mut props = Map::new();
        props.insert(property.to_string(), value);
        Entity::new(EntityId::new_v4(), "Users", props)
    }

    #[test]
    fn insert_is_idempotent_for_unchanged_value() {
        let mut idx = Index::new("age");
        let e = entity_with("age", PropertyValue::Int(30));
        idx.insert(&e);
        idx.insert(&e);
        assert_eq!(idx.lookup_exact(&PropertyValue::Int(30)).len(), 1);
    }

    #[test]
    fn remove_clears_both_structures() {
        let mut idx = Index::new("age");
        let e = entity_with("age", PropertyValue::Int(30));
        idx.insert(&e);
        idx.remove(&e);
        assert!(idx.lookup_exact(&PropertyValue::Int(30)).is_empty());
        assert!(idx.lookup_range(None, None).is_empty());
    }

    #[test]
    fn range_lookup_respects_bounds() {
        let mut idx = Index::new("age");
        for age in [20, 28, 35, 42] {
            idx.insert(&entity_with("age", PropertyValue::Int(age)));
        }
        let result = idx.lookup_range(Some(&PropertyValue::Int(25)), Some(&PropertyValue::Int(40)));
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn insert_without_property_is_noop() {
        let mut idx = Index::new("age");
        let e = Entity::new(EntityId::new_v4(), "Users", Map::new());
        idx.insert(&e);
        assert!(idx.lookup_range(None, None).is_empty());
    }
}
