//! Point vocabulary shared by the engine contract and the mapping layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Identifier accepted natively by the engine: an unsigned integer or a
/// UUID. Everything else must be reconciled first (see [`crate::ident`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    Num(u64),
    Uuid(Uuid),
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointId::Num(n) => write!(f, "{}", n),
            PointId::Uuid(u) => write!(f, "{}", u),
        }
    }
}

impl PointId {
    /// JSON form suitable for payload storage: number or canonical string.
    pub fn to_value(&self) -> Value {
        match self {
            PointId::Num(n) => Value::from(*n),
            PointId::Uuid(u) => Value::String(u.to_string()),
        }
    }
}

impl From<u64> for PointId {
    fn from(n: u64) -> Self {
        PointId::Num(n)
    }
}

impl From<Uuid> for PointId {
    fn from(u: Uuid) -> Self {
        PointId::Uuid(u)
    }
}

/// Scalar attributes of a point.
pub type Payload = serde_json::Map<String, Value>;

/// Index/value pair list representing a mostly-zero vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VectorData {
    Dense(Vec<f32>),
    Sparse(SparseVector),
}

/// Named vectors of a point, in a deterministic order.
pub type NamedVectors = BTreeMap<String, VectorData>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Point {
    pub id: PointId,
    #[serde(default)]
    pub payload: Payload,
    #[serde(default)]
    pub vectors: NamedVectors,
}

/// A point returned by a similarity search, carrying its score.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub id: PointId,
    pub score: f32,
    pub payload: Payload,
    pub vectors: NamedVectors,
}
