//! Error types for pherodb operations.

use crate::EntityId;
use thiserror::Error;

/// Storage-layer errors: raised only where the contract does not allow an
/// "absent" return. `NotFound` is surfaced as `Option`/`bool` at the call
/// site instead; `InvariantViolation` always raises.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StorageError {
    #[error("invariant violation: {reason}")]
    InvariantViolation { reason: String },
}

/// Errors raised while resolving or validating a query plan.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlanError {
    #[error("unknown collection: {name}")]
    UnknownCollection { name: String },

    #[error("unsupported operation: {operation}")]
    UnsupportedOperation { operation: String },

    #[error("type mismatch on property {property}: cannot compare {found} against {expected}")]
    TypeMismatch { property: String, found: String, expected: String },
}

/// Errors raised by the executor and the optimizer it drives.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExecutorError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("target entity not found: {id}")]
    TargetNotFound { id: EntityId },
}

/// Aggregated error type for the whole engine.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("plan error: {0}")]
    Plan(#[from] PlanError),

    #[error("executor error: {0}")]
    Executor(#[from] ExecutorError),
}

/// Result type alias used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;
