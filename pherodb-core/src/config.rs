//! Engine configuration: the numeric constants governing pheromone decay,
//! cache capacity, and ant-colony exploration, gathered in one place
//! instead of scattered as magic numbers.

use crate::{Error, PlanError};
use serde::{Deserialize, Serialize};

/// Configuration for the graph store's pheromone evaporation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StoreConfig {
    /// Fraction of pheromone lost per `evaporate_pheromones()` call.
    pub evaporation_rate: f64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { evaporation_rate: 0.05 }
    }
}

/// Configuration for the stigmergy cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CacheConfig {
    /// Maximum number of trails retained across all query patterns.
    pub max_trails: usize,
    /// Fraction of pheromone lost per `evaporate_all()` call.
    pub evaporation_rate: f64,
    /// A trail unused for longer than this is stale and excluded from lookups.
    pub staleness_threshold_minutes: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_trails: 10_000,
            evaporation_rate: 0.05,
            staleness_threshold_minutes: 60,
        }
    }
}

/// Configuration for the ant-colony plan explorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ExplorerConfig {
    pub num_ants: usize,
    pub num_iterations: usize,
    /// Starting probability of following an existing trail rather than
    /// exploring randomly; increases linearly across iterations.
    pub base_pheromone_sensitivity: f64,
    /// Upper bound the sensitivity climbs to by the final iteration.
    pub max_pheromone_sensitivity: f64,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            num_ants: 20,
            num_iterations: 3,
            base_pheromone_sensitivity: 0.5,
            max_pheromone_sensitivity: 0.8,
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if !(0.0..=1.0).contains(&self.evaporation_rate) {
            return Err(PlanError::UnsupportedOperation {
                operation: format!("evaporation_rate out of range: {}", self.evaporation_rate),
            }
            .into());
        }
        Ok(())
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_trails == 0 {
            return Err(PlanError::UnsupportedOperation {
                operation: "max_trails must be greater than 0".to_string(),
            }
            .into());
        }
        if !(0.0..=1.0).contains(&self.evaporation_rate) {
            return Err(PlanError::UnsupportedOperation {
                operation: format!("evaporation_rate out of range: {}", self.evaporation_rate),
            }
            .into());
        }
        Ok(())
    }
}

impl ExplorerConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.num_ants == 0 || self.num_iterations == 0 {
            return Err(PlanError::UnsupportedOperation {
                operation: "num_ants and num_iterations must be greater than 0".to_string(),
            }
            .into());
        }
        if self.base_pheromone_sensitivity > self.max_pheromone_sensitivity {
            return Err(PlanError::UnsupportedOperation {
                operation: "base_pheromone_sensitivity must not exceed max_pheromone_sensitivity".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
