//! Request parameter types for the engine contract.

use serde::{Deserialize, Serialize};

use crate::grammar::Filter;
use crate::point::SparseVector;

/// One named query vector, dense or sparse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryVector {
    Dense { field: String, vector: Vec<f32> },
    Sparse { field: String, vector: SparseVector },
}

impl QueryVector {
    pub fn field(&self) -> &str {
        match self {
            QueryVector::Dense { field, .. } | QueryVector::Sparse { field, .. } => field,
        }
    }
}

/// Nearest-neighbor query against one named vector field.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub vector: QueryVector,
    pub filter: Option<Filter>,
    pub limit: usize,
    pub offset: usize,
    pub with_payload: bool,
    pub with_vectors: bool,
    pub score_threshold: Option<f32>,
}

/// Filtered enumeration of points, without ranking.
#[derive(Debug, Clone)]
pub struct ScrollRequest {
    pub filter: Option<Filter>,
    pub limit: usize,
    pub offset: usize,
    pub with_payload: bool,
    pub with_vectors: bool,
}
