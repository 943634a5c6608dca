//! The normalized, language-agnostic query plan the executor consumes.
//!
//! A `Plan` is what a surface parser (SQL subset, graph-pattern subset —
//! both out of this workspace's scope) is expected to produce. Nothing
//! here parses text; this module only defines the record shape and the
//! few structural operations (fingerprinting inputs, hint merging) the
//! executor and optimizer need.

use pherodb_core::{Direction, FilterExpr, PropertyValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The operation a plan requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Select,
    Match,
    Insert,
    Create,
    Update,
    Delete,
    CreateTable,
    CreateIndex,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Select => "select",
            Operation::Match => "match",
            Operation::Insert => "insert",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::CreateTable => "create_table",
            Operation::CreateIndex => "create_index",
        }
    }
}

/// The ant-colony explorer's three traversal strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalStrategy {
    Bfs,
    Dfs,
    Bidirectional,
}

impl Default for TraversalStrategy {
    fn default() -> Self {
        TraversalStrategy::Bfs
    }
}

impl TraversalStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraversalStrategy::Bfs => "bfs",
            TraversalStrategy::Dfs => "dfs",
            TraversalStrategy::Bidirectional => "bidirectional",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bfs" => Some(TraversalStrategy::Bfs),
            "dfs" => Some(TraversalStrategy::Dfs),
            "bidirectional" => Some(TraversalStrategy::Bidirectional),
            _ => None,
        }
    }
}

/// Planner hints. Advisory only — per spec §4.5, the executor must
/// produce identical result sets regardless of what these say.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hints {
    pub filter_order: Vec<String>,
    pub use_indexes: Vec<String>,
    pub join_order: Vec<String>,
    pub traversal_strategy: TraversalStrategy,
}

/// A single projection expression: `"*"`, `"prop"`, or `"var.prop"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Projection {
    /// `"*"` — the whole entity.
    All,
    /// A bare name. In a `select` plan this is a property name; in a
    /// `match` plan (no dot) it names a pattern variable whose whole
    /// bound entity should be emitted.
    Field(String),
    /// `"var.prop"` — one property of a pattern variable's binding.
    VarField { var: String, field: String },
}

impl Projection {
    /// Parse one projection expression string.
    pub fn parse(expr: &str) -> Self {
        if expr == "*" {
            return Projection::All;
        }
        match expr.split_once('.') {
            Some((var, field)) => Projection::VarField { var: var.to_string(), field: field.to_string() },
            None => Projection::Field(expr.to_string()),
        }
    }
}

/// One node in a graph pattern: a variable bound to an entity, optionally
/// constrained to a label (collection) and inline property equalities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternNode {
    pub var: String,
    pub label: Option<String>,
    pub properties: Vec<(String, PropertyValue)>,
}

impl PatternNode {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into(), label: None, properties: Vec::new() }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.push((key.into(), value));
        self
    }
}

/// One edge step in a graph pattern: `(from)-[type]->(to)` or the
/// reverse, per `direction`. Only `In`/`Out` are meaningful here —
/// `Both` is not a legal pattern-edge direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternEdge {
    pub var: Option<String>,
    pub edge_type: String,
    pub direction: Direction,
    pub from: String,
    pub to: String,
}

impl PatternEdge {
    pub fn new(from: impl Into<String>, edge_type: impl Into<String>, direction: Direction, to: impl Into<String>) -> Self {
        Self { var: None, edge_type: edge_type.into(), direction, from: from.into(), to: to.into() }
    }
}

/// A filter that applies to one pattern variable's binding, rather than
/// to the single implicit collection a `select` plan targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundFilter {
    pub var: String,
    pub filter: FilterExpr,
}

/// An ordered node list and edge list describing a graph pattern.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub nodes: Vec<PatternNode>,
    pub edges: Vec<PatternEdge>,
}

/// What an `insert`/`create` plan materializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InsertPayload {
    /// A single entity: a property map plus its target collection.
    Entity { collection: String, properties: HashMap<String, PropertyValue> },
    /// Materialize a whole pattern: every node becomes an entity, then
    /// every edge is created between the bound variables.
    Pattern(Pattern),
}

/// The normalized query plan the executor accepts. Produced by a surface
/// parser (out of scope); every field beyond `operation` is optional
/// because most operations only use a handful of them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    pub operation: OperationSlot,
    pub collection: Option<String>,
    pub filters: Vec<FilterExpr>,
    pub projections: Vec<Projection>,
    pub limit: Option<usize>,

    pub pattern: Option<Pattern>,
    pub where_filters: Vec<BoundFilter>,

    pub insert: Option<InsertPayload>,
    pub assignments: HashMap<String, PropertyValue>,

    pub schema: Option<HashMap<String, String>>,
    pub index_property: Option<String>,

    pub hints: Hints,
}

/// `Operation` wrapped so `Plan` can derive `Default` (an unparsed plan
/// defaults to an operation no dispatcher recognizes, which surfaces as
/// `UnsupportedOperation` rather than silently behaving like `select`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationSlot(pub Option<Operation>);

impl Default for OperationSlot {
    fn default() -> Self {
        OperationSlot(None)
    }
}

impl From<Operation> for OperationSlot {
    fn from(op: Operation) -> Self {
        OperationSlot(Some(op))
    }
}

impl Plan {
    pub fn new(operation: Operation) -> Self {
        Self { operation: operation.into(), ..Default::default() }
    }

    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collection = Some(name.into());
        self
    }

    pub fn filter(mut self, f: FilterExpr) -> Self {
        self.filters.push(f);
        self
    }

    pub fn project(mut self, expr: &str) -> Self {
        self.projections.push(Projection::parse(expr));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn pattern(mut self, pattern: Pattern) -> Self {
        self.pattern = Some(pattern);
        self
    }
}
