//! pherodb Storage - the property-graph store.
//!
//! Owns entities, edges, collections and their indexes, and implements the
//! traversal and pheromone-weighted path primitives. Nothing here knows
//! about query plans or the optimizer; those live in `pherodb-query` and
//! `pherodb-optimizer`.

mod collection;
mod index;
mod store;

pub use collection::*;
pub use index::*;
pub use store::*;
