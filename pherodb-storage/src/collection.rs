//! Collection: a typed set of entities with lazily-created secondary indexes.

use crate::Index;
use pherodb_core::{Entity, EntityId, PropertyValue};
use std::collections::HashMap;
use tracing::debug;

/// Rolling, descriptive-only statistics. Not consumed by the cost model
/// (see the optimizer's fixed cost function) — these exist purely so
/// callers can inspect a collection's shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionStats {
    pub count: usize,
    pub avg_properties: f64,
    pub avg_degree: f64,
}

/// A named bucket of entities of one logical type, with lazily-created
/// per-property indexes.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    name: String,
    /// Declared property types, advisory only — nothing in this crate
    /// validates an entity's properties against it.
    schema: Option<HashMap<String, String>>,
    entities: HashMap<EntityId, Entity>,
    indexes: HashMap<String, Index>,
    stats: CollectionStats,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            entities: HashMap::new(),
            indexes: HashMap::new(),
            stats: CollectionStats::default(),
        }
    }

    pub fn with_schema(name: impl Into<String>, schema: HashMap<String, String>) -> Self {
        Self { schema: Some(schema), ..Self::new(name) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> Option<&HashMap<String, String>> {
        self.schema.as_ref()
    }

    /// Insert `entity`, stamping its type to this collection's name,
    /// populating every existing index, and refreshing stats.
    pub fn add_entity(&mut self, mut entity: Entity) -> EntityId {
        entity.type_tag = self.name.clone();
        let id = entity.id;
        for index in self.indexes.values_mut() {
            index.insert(&entity);
        }
        self.entities.insert(id, entity);
        self.update_stats();
        id
    }

    /// Remove and return the entity, clearing it from every index. Does
    /// not touch the graph store's edge tables; callers coordinating a
    /// full removal (the store) are responsible for that.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        for index in self.indexes.values_mut() {
            index.remove(&entity);
        }
        self.update_stats();
        Some(entity)
    }

    /// Apply `assignments` to the entity, keeping every index consistent:
    /// the entity is removed from each index under its pre-mutation
    /// values and reinserted under its post-mutation ones.
    pub fn update_entity(&mut self, id: EntityId, assignments: &HashMap<String, PropertyValue>) -> Option<&Entity> {
        if !self.entities.contains_key(&id) {
            return None;
        }
        {
            let entity = &self.entities[&id];
            for index in self.indexes.values_mut() {
                index.remove(entity);
            }
        }
        let entity = self.entities.get_mut(&id)?;
        for (key, value) in assignments {
            entity.set_property(key.clone(), value.clone());
        }
        {
            let entity = &self.entities[&id];
            for index in self.indexes.values_mut() {
                index.insert(entity);
            }
        }
        self.update_stats();
        self.entities.get(&id)
    }

    pub fn get_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn scan(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn filter(&self, predicate: impl Fn(&Entity) -> bool) -> Vec<&Entity> {
        self.entities.values().filter(|e| predicate(e)).collect()
    }

    /// Idempotent: if the index already exists, this is a no-op. On first
    /// creation, backfills from every current entity.
    pub fn create_index(&mut self, property: impl Into<String>) {
        let property = property.into();
        if self.indexes.contains_key(&property) {
            return;
        }
        debug!(property = %property, collection = %self.name, "creating index");
        let mut index = Index::new(property.clone());
        for entity in self.entities.values() {
            index.insert(entity);
        }
        self.indexes.insert(property, index);
    }

    pub fn drop_index(&mut self, property: &str) {
        self.indexes.remove(property);
    }

    /// Exact-match lookup, auto-creating the index on first use.
    pub fn lookup_exact(&mut self, property: &str, value: &PropertyValue) -> Vec<&Entity> {
        self.create_index(property);
        let ids = self.indexes[property].lookup_exact(value);
        self.entities.iter().filter(|(id, _)| ids.contains(id)).map(|(_, e)| e).collect()
    }

    /// Range lookup, auto-creating the index on first use.
    pub fn lookup_range(
        &mut self,
        property: &str,
        min: Option<&PropertyValue>,
        max: Option<&PropertyValue>,
    ) -> Vec<&Entity> {
        self.create_index(property);
        let ids = self.indexes[property].lookup_range(min, max);
        self.entities.iter().filter(|(id, _)| ids.contains(id)).map(|(_, e)| e).collect()
    }

    /// Range lookup that rejects a bound whose type doesn't match the
    /// property's actual stored type, rather than silently falling back to
    /// the index's cross-variant type-rank ordering — a mixed-type range
    /// comparison aborts the call, unlike a filter's row-level type
    /// mismatch. Checked against a sampled stored value rather than just
    /// `min` against `max`, since a caller (the executor's filter pushdown)
    /// only ever supplies one bound at a time.
    pub fn lookup_range_checked(
        &mut self,
        property: &str,
        min: Option<&PropertyValue>,
        max: Option<&PropertyValue>,
    ) -> Result<Vec<&Entity>, pherodb_core::PlanError> {
        if let Some(sample) = self.sample_property_value(property) {
            for bound in [min, max].into_iter().flatten() {
                if std::mem::discriminant(bound) != std::mem::discriminant(sample) {
                    return Err(pherodb_core::PlanError::TypeMismatch {
                        property: property.to_string(),
                        found: bound.type_name().to_string(),
                        expected: sample.type_name().to_string(),
                    });
                }
            }
        }
        Ok(self.lookup_range(property, min, max))
    }

    /// Any one entity's value for `property`, used to learn the column's
    /// actual stored type for a bound check. `None` if no member currently
    /// carries the property (nothing is stored to disagree with a bound).
    fn sample_property_value(&self, property: &str) -> Option<&PropertyValue> {
        self.entities.values().find_map(|e| e.get_property(property))
    }

    pub fn count(&self) -> usize {
        self.entities.len()
    }

    pub fn stats(&self) -> &CollectionStats {
        &self.stats
    }

    /// Recompute `avg_degree` from the graph store's authoritative
    /// adjacency. The collection has no adjacency of its own, so the
    /// store supplies degree per member id; called after edge mutations
    /// touching this collection's members.
    pub fn refresh_degree_stats(&mut self, degree_of: impl Fn(EntityId) -> usize) {
        self.stats.avg_degree = if self.entities.is_empty() {
            0.0
        } else {
            self.entities.keys().map(|id| degree_of(*id) as f64).sum::<f64>() / self.entities.len() as f64
        };
    }

    fn update_stats(&mut self) {
        self.stats.count = self.entities.len();
        self.stats.avg_properties = if self.entities.is_empty() {
            0.0
        } else {
            self.entities.values().map(|e| e.properties.len()).sum::<usize>() as f64 / self.entities.len() as f64
        };
    }
}
