//! Weighted multi-field fusion search.
//!
//! One independent nearest-neighbor search per weighted vector field; each
//! hit contributes `score * normalized_weight` to its point's running
//! total. Identifiers a field never returned receive no contribution from
//! it — no penalty, no default. A failed per-field search is logged and
//! contributes nothing rather than voiding the fusion.

use std::collections::{BTreeMap, HashMap};
use tracing::warn;

use pointmap_core::error::{Error, Result};
use pointmap_engine::grammar::Filter;
use pointmap_engine::point::PointId;
use pointmap_engine::request::{QueryVector, SearchRequest};
use pointmap_engine::traits::VectorEngine;

/// Each per-field search over-fetches this multiple of the requested limit
/// so the aggregate ranking stabilizes before truncation.
pub const OVERFETCH_FACTOR: usize = 3;

/// A weighted multi-field search request: per-field weights and query
/// vectors, with its own limit and score threshold.
///
/// Fields with a non-positive weight or without a query vector are skipped
/// at execution time, not errored.
#[derive(Debug, Clone)]
pub struct CombinedSearch {
    weights: BTreeMap<String, f32>,
    query_vectors: BTreeMap<String, Vec<f32>>,
    limit: usize,
    score_threshold: Option<f32>,
}

impl Default for CombinedSearch {
    fn default() -> Self {
        Self {
            weights: BTreeMap::new(),
            query_vectors: BTreeMap::new(),
            limit: 10,
            score_threshold: None,
        }
    }
}

impl CombinedSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field's weight and query vector in one step.
    pub fn field(self, name: impl Into<String>, weight: f32, vector: Vec<f32>) -> Self {
        let name = name.into();
        self.weight(name.clone(), weight).query_vector(name, vector)
    }

    pub fn weight(mut self, name: impl Into<String>, weight: f32) -> Self {
        self.weights.insert(name.into(), weight);
        self
    }

    pub fn query_vector(mut self, name: impl Into<String>, vector: Vec<f32>) -> Self {
        self.query_vectors.insert(name.into(), vector);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = Some(threshold);
        self
    }

    pub fn weights(&self) -> &BTreeMap<String, f32> {
        &self.weights
    }
}

/// Normalize weights to sum to 1. A zero or negative total is a contract
/// violation.
pub fn normalize_weights(weights: &BTreeMap<String, f32>) -> Result<BTreeMap<String, f32>> {
    let total: f32 = weights.values().sum();
    if total <= 0.0 {
        return Err(Error::NonPositiveWeights);
    }
    Ok(weights.iter().map(|(name, w)| (name.clone(), w / total)).collect())
}

/// Execute the per-field searches sequentially and return the fused
/// identifier ranking, truncated to the request's limit.
pub(crate) async fn ranked_ids<E: VectorEngine>(
    engine: &E,
    collection: &str,
    filter: Option<&Filter>,
    combined: &CombinedSearch,
) -> Result<Vec<(PointId, f32)>> {
    let normalized = normalize_weights(&combined.weights)?;

    let mut scores: HashMap<PointId, f32> = HashMap::new();
    for (field, weight) in &normalized {
        if *weight <= 0.0 {
            continue;
        }
        let Some(vector) = combined.query_vectors.get(field) else { continue };
        let request = SearchRequest {
            vector: QueryVector::Dense { field: field.clone(), vector: vector.clone() },
            filter: filter.cloned(),
            limit: combined.limit * OVERFETCH_FACTOR,
            offset: 0,
            with_payload: false,
            with_vectors: false,
            score_threshold: combined.score_threshold,
        };
        match engine.search(collection, request).await {
            Ok(hits) => {
                for hit in hits {
                    *scores.entry(hit.id).or_insert(0.0) += hit.score * weight;
                }
            }
            Err(e) => {
                warn!(collection, field = %field, error = %e, "per-field search failed; contributes nothing");
            }
        }
    }

    let mut ranked: Vec<(PointId, f32)> = scores.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    ranked.truncate(combined.limit);
    Ok(ranked)
}
