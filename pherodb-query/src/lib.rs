//! pherodb Query - the normalized plan representation and the executor that
//! runs it against a `GraphStore`, consulting the stigmergy cache and
//! ant-colony explorer along the way.
//!
//! Nothing here parses SQL or graph-pattern syntax; a `Plan` is assumed
//! already built by a surface parser out of this workspace's scope.

mod executor;
mod plan;

pub use executor::*;
pub use plan::*;
