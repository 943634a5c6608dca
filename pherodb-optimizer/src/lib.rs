//! pherodb Optimizer - stigmergy cache and ant-colony plan exploration.
//!
//! Execution plans are represented here as `serde_json::Value`, mirroring
//! the dict-shaped plans of the reference implementation this module is
//! descended from; `pherodb-query` translates its typed `Plan` to and from
//! this representation at the optimizer boundary.

mod explorer;
mod fingerprint;
mod stigmergy;

pub use explorer::*;
pub use fingerprint::*;
pub use stigmergy::*;
