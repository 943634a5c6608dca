//! Edge: a directed, typed, pheromone-weighted relationship between entities.

use crate::{EdgeId, EntityId, PropertyValue, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lower bound on any pheromone scalar (edge or trail).
pub const MIN_PHEROMONE: f64 = 0.1;
/// Upper bound on any pheromone scalar (edge or trail).
pub const MAX_PHEROMONE: f64 = 10.0;
/// Initial pheromone concentration assigned to a new edge.
pub const INITIAL_PHEROMONE: f64 = 1.0;
/// Default per-call evaporation fraction applied to an edge's pheromone.
pub const DEFAULT_EVAPORATION_RATE: f64 = 0.05;
/// Smoothing factor for the traversal-cost exponential moving average.
const TRAVERSAL_COST_EMA_ALPHA: f64 = 0.3;

/// A directed relationship between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Edge {
    pub id: EdgeId,
    pub source: EntityId,
    pub target: EntityId,
    #[serde(rename = "type")]
    pub type_tag: String,
    pub properties: HashMap<String, PropertyValue>,

    pub pheromone: f64,
    pub traversal_count: u64,
    pub avg_traversal_cost_ms: f64,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Edge {
    pub fn new(
        id: EdgeId,
        source: EntityId,
        target: EntityId,
        type_tag: impl Into<String>,
        properties: HashMap<String, PropertyValue>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            source,
            target,
            type_tag: type_tag.into(),
            properties,
            pheromone: INITIAL_PHEROMONE,
            traversal_count: 0,
            avg_traversal_cost_ms: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: PropertyValue) {
        self.properties.insert(key.into(), value);
        self.updated_at = Utc::now();
    }

    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Increase pheromone, clamped at `MAX_PHEROMONE`.
    pub fn reinforce_pheromone(&mut self, amount: f64) {
        self.pheromone = (self.pheromone + amount).min(MAX_PHEROMONE);
        self.updated_at = Utc::now();
    }

    /// Decay pheromone by `rate`, clamped at `MIN_PHEROMONE`.
    pub fn evaporate_pheromone(&mut self, rate: f64) {
        self.pheromone = (self.pheromone * (1.0 - rate)).max(MIN_PHEROMONE);
    }

    /// Record a traversal: bumps the counter, updates the cost EMA, and
    /// reinforces pheromone inversely proportional to cost (fast edges get
    /// a stronger deposit).
    pub fn mark_traversed(&mut self, cost_ms: f64) {
        self.traversal_count += 1;

        if self.avg_traversal_cost_ms == 0.0 {
            self.avg_traversal_cost_ms = cost_ms;
        } else {
            self.avg_traversal_cost_ms =
                TRAVERSAL_COST_EMA_ALPHA * cost_ms + (1.0 - TRAVERSAL_COST_EMA_ALPHA) * self.avg_traversal_cost_ms;
        }

        if cost_ms > 0.0 {
            let reinforcement = 1.0 / (cost_ms + 2.0).log2();
            self.reinforce_pheromone(reinforcement);
        }
    }

    /// Routing weight: inverse pheromone adjusted by historical cost.
    /// Lower is more desirable, mirroring a distance metric.
    pub fn weight(&self) -> f64 {
        let base = 1.0 / self.pheromone;
        if self.avg_traversal_cost_ms > 0.0 {
            let cost_factor = (1.0 + self.avg_traversal_cost_ms).ln() / 10.0;
            base * (1.0 + cost_factor)
        } else {
            base
        }
    }

    pub fn is_stale(&self, staleness_threshold: f64) -> bool {
        self.pheromone < staleness_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge() -> Edge {
        Edge::new(EdgeId::new_v4(), EntityId::new_v4(), EntityId::new_v4(), "FOLLOWS", HashMap::new())
    }

    #[test]
    fn new_edge_starts_at_initial_pheromone() {
        assert_eq!(edge().pheromone, INITIAL_PHEROMONE);
    }

    #[test]
    fn reinforce_clamps_at_max() {
        let mut e = edge();
        e.reinforce_pheromone(100.0);
        assert_eq!(e.pheromone, MAX_PHEROMONE);
    }

    #[test]
    fn evaporate_clamps_at_min() {
        let mut e = edge();
        for _ in 0..500 {
            e.evaporate_pheromone(0.9);
        }
        assert_eq!(e.pheromone, MIN_PHEROMONE);
    }

    #[test]
    fn mark_traversed_updates_ema_and_reinforces() {
        let mut e = edge();
        e.mark_traversed(10.0);
        assert_eq!(e.avg_traversal_cost_ms, 10.0);
        assert!(e.pheromone > INITIAL_PHEROMONE);

        e.mark_traversed(20.0);
        // EMA should move toward 20 but not jump all the way there.
        assert!(e.avg_traversal_cost_ms > 10.0 && e.avg_traversal_cost_ms < 20.0);
    }

    #[test]
    fn weight_decreases_as_pheromone_increases() {
        let mut e = edge();
        let w0 = e.weight();
        e.reinforce_pheromone(5.0);
        assert!(e.weight() < w0);
    }
}
