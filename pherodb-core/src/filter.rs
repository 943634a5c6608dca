//! Filter predicates used by query plans.

use crate::PropertyValue;
use serde::{Deserialize, Serialize};

/// Comparator applied between a property and a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Comparator {
    /// Apply the comparator given an already same-typed `lhs`/`rhs` pair.
    pub fn apply(&self, lhs: &PropertyValue, rhs: &PropertyValue) -> Option<bool> {
        use std::cmp::Ordering::*;
        if matches!(self, Comparator::Eq) {
            return Some(lhs == rhs);
        }
        if matches!(self, Comparator::Ne) {
            return Some(lhs != rhs);
        }
        let ord = lhs.partial_cmp_same_type(rhs)?;
        Some(match self {
            Comparator::Lt => ord == Less,
            Comparator::Lte => ord != Greater,
            Comparator::Gt => ord == Greater,
            Comparator::Gte => ord != Less,
            Comparator::Eq | Comparator::Ne => unreachable!(),
        })
    }
}

/// A single filter predicate: `property comparator literal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FilterExpr {
    pub property: String,
    pub comparator: Comparator,
    pub literal: PropertyValue,
}

impl FilterExpr {
    pub fn new(property: impl Into<String>, comparator: Comparator, literal: PropertyValue) -> Self {
        Self { property: property.into(), comparator, literal }
    }

    pub fn eq(property: impl Into<String>, literal: PropertyValue) -> Self {
        Self::new(property, Comparator::Eq, literal)
    }

    /// Evaluate this filter against a candidate property value, attempting
    /// one coercion toward the literal's type if the types mismatch.
    /// Returns `false` (row rejected) if evaluation cannot proceed, never
    /// an error — row-level failures are silent per the propagation policy.
    pub fn matches(&self, candidate: Option<&PropertyValue>) -> bool {
        let Some(value) = candidate else { return false };

        let coerced;
        let value = if std::mem::discriminant(value) == std::mem::discriminant(&self.literal) {
            value
        } else {
            match value.coerce_to(&self.literal) {
                Some(v) => {
                    coerced = v;
                    &coerced
                }
                None => return false,
            }
        };

        self.comparator.apply(value, &self.literal).unwrap_or(false)
    }
}
