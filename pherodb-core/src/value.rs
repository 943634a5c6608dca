//! Dynamic property values stored on entities and edges.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A property value: one of integer, floating-point, string, boolean, or null.
///
/// Property keys are always strings; a property may simply be absent from
/// the map, which is distinct from being present with `PropertyValue::Null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(untagged)]
pub enum PropertyValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
}

impl PropertyValue {
    /// The type tag, used for coercion/error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Int(_) => "int",
            PropertyValue::Float(_) => "float",
            PropertyValue::Str(_) => "string",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Null => "null",
        }
    }

    /// Attempt to coerce `self` to the variant of `target`'s type.
    ///
    /// Mirrors the executor's single-coercion-attempt rule: numeric values
    /// convert between int/float, numeric-looking strings parse, and
    /// anything coerces to a string via its natural display form. Returns
    /// `None` if no conversion applies.
    pub fn coerce_to(&self, target: &PropertyValue) -> Option<PropertyValue> {
        match (self, target) {
            (PropertyValue::Int(i), PropertyValue::Float(_)) => Some(PropertyValue::Float(*i as f64)),
            (PropertyValue::Float(f), PropertyValue::Int(_)) => Some(PropertyValue::Int(*f as i64)),
            (PropertyValue::Str(s), PropertyValue::Int(_)) => s.parse::<i64>().ok().map(PropertyValue::Int),
            (PropertyValue::Str(s), PropertyValue::Float(_)) => {
                s.parse::<f64>().ok().map(PropertyValue::Float)
            }
            (_, PropertyValue::Str(_)) => Some(PropertyValue::Str(self.to_string())),
            _ => None,
        }
    }

    /// Natural ordering within the same variant; cross-variant comparison
    /// is not defined here (callers must coerce first, or treat it as a
    /// type mismatch).
    pub fn partial_cmp_same_type(&self, other: &PropertyValue) -> Option<Ordering> {
        match (self, other) {
            (PropertyValue::Int(a), PropertyValue::Int(b)) => a.partial_cmp(b),
            (PropertyValue::Float(a), PropertyValue::Float(b)) => a.partial_cmp(b),
            (PropertyValue::Str(a), PropertyValue::Str(b)) => a.partial_cmp(b),
            (PropertyValue::Bool(a), PropertyValue::Bool(b)) => a.partial_cmp(b),
            (PropertyValue::Null, PropertyValue::Null) => Some(Ordering::Equal),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Int(i) => write!(f, "{i}"),
            PropertyValue::Float(x) => write!(f, "{x}"),
            PropertyValue::Str(s) => write!(f, "{s}"),
            PropertyValue::Bool(b) => write!(f, "{b}"),
            PropertyValue::Null => write!(f, "null"),
        }
    }
}

/// Ordering over property values used by the index's sorted structure.
///
/// Cross-variant pairs are ordered by type tag first so the sorted
/// structure has a total order even over a mixed-type column; range
/// queries on a mixed column are a caller error the index does not
/// itself reject (raised as a `TypeMismatch` at the executor/lookup
/// boundary instead, not as a panic here).
impl Eq for PropertyValue {}

/// Hashes in lockstep with the derived `PartialEq`/manual `Eq`: floats hash
/// by bit pattern so that index value-maps can key on `PropertyValue`
/// directly. NaN hashes consistently with itself but, as with the derived
/// equality, does not equal other NaNs bit-for-bit differently.
impl Hash for PropertyValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            PropertyValue::Int(i) => {
                state.write_u8(0);
                i.hash(state);
            }
            PropertyValue::Float(f) => {
                state.write_u8(1);
                f.to_bits().hash(state);
            }
            PropertyValue::Str(s) => {
                state.write_u8(2);
                s.hash(state);
            }
            PropertyValue::Bool(b) => {
                state.write_u8(3);
                b.hash(state);
            }
            PropertyValue::Null => state.write_u8(4),
        }
    }
}

impl PartialOrd for PropertyValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PropertyValue {
    fn cmp(&self, other: &Self) -> Ordering {
        if let Some(ord) = self.partial_cmp_same_type(other) {
            return ord;
        }
        fn rank(v: &PropertyValue) -> u8 {
            match v {
                PropertyValue::Null => 0,
                PropertyValue::Bool(_) => 1,
                PropertyValue::Int(_) => 2,
                PropertyValue::Float(_) => 3,
                PropertyValue::Str(_) => 4,
            }
        }
        rank(self).cmp(&rank(other))
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Float(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Str(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::Str(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}
