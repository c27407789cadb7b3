//! In-memory reference engine.
//!
//! Implements the full [`VectorEngine`] contract against process-local
//! state: cosine similarity for dense vectors, dot product for sparse ones,
//! and a recursive evaluator for the native filter grammar. Used by tests
//! and examples; collections are created implicitly on first upsert.
//!
//! Enumeration (`scroll`, `retrieve`) walks points in identifier order,
//! which deliberately differs from request order — callers that need rank
//! order must reorder themselves, exactly as with a remote engine.

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::grammar::{Condition, CountBounds, Filter, Match, Range};
use crate::point::{NamedVectors, Payload, Point, PointId, ScoredPoint, SparseVector, VectorData};
use crate::request::{QueryVector, ScrollRequest, SearchRequest};
use crate::traits::VectorEngine;

#[derive(Debug, Clone)]
struct StoredPoint {
    payload: Payload,
    vectors: NamedVectors,
}

type Collection = BTreeMap<PointId, StoredPoint>;

#[derive(Debug, Default)]
pub struct MemoryEngine {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points currently stored in `collection`.
    pub fn point_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .ok()
            .and_then(|map| map.get(collection).map(BTreeMap::len))
            .unwrap_or(0)
    }
}

#[async_trait]
impl VectorEngine for MemoryEngine {
    async fn upsert(&self, collection: &str, points: Vec<Point>) -> anyhow::Result<()> {
        let mut map = self.collections.write().map_err(|_| anyhow!("state lock poisoned"))?;
        let stored = map.entry(collection.to_string()).or_default();
        for point in points {
            stored.insert(point.id, StoredPoint { payload: point.payload, vectors: point.vectors });
        }
        Ok(())
    }

    async fn retrieve(
        &self,
        collection: &str,
        ids: &[PointId],
        with_payload: bool,
        with_vectors: bool,
    ) -> anyhow::Result<Vec<Point>> {
        let map = self.collections.read().map_err(|_| anyhow!("state lock poisoned"))?;
        let Some(stored) = map.get(collection) else { return Ok(Vec::new()) };
        // Identifier order, not request order.
        Ok(stored
            .iter()
            .filter(|(id, _)| ids.contains(id))
            .map(|(id, point)| Point {
                id: *id,
                payload: if with_payload { point.payload.clone() } else { Payload::new() },
                vectors: if with_vectors { point.vectors.clone() } else { NamedVectors::new() },
            })
            .collect())
    }

    async fn delete(&self, collection: &str, ids: &[PointId]) -> anyhow::Result<()> {
        let mut map = self.collections.write().map_err(|_| anyhow!("state lock poisoned"))?;
        if let Some(stored) = map.get_mut(collection) {
            for id in ids {
                stored.remove(id);
            }
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        request: SearchRequest,
    ) -> anyhow::Result<Vec<ScoredPoint>> {
        let map = self.collections.read().map_err(|_| anyhow!("state lock poisoned"))?;
        let Some(stored) = map.get(collection) else { return Ok(Vec::new()) };

        let mut hits: Vec<(PointId, f32)> = Vec::new();
        for (id, point) in stored {
            if let Some(filter) = &request.filter {
                if !filter_matches(filter, id, &point.payload) {
                    continue;
                }
            }
            let Some(score) = score_vector(&request.vector, &point.vectors) else { continue };
            if let Some(threshold) = request.score_threshold {
                if score < threshold {
                    continue;
                }
            }
            hits.push((*id, score));
        }
        hits.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        Ok(hits
            .into_iter()
            .skip(request.offset)
            .take(request.limit)
            .map(|(id, score)| {
                let point = &stored[&id];
                ScoredPoint {
                    id,
                    score,
                    payload: if request.with_payload { point.payload.clone() } else { Payload::new() },
                    vectors: if request.with_vectors {
                        point.vectors.clone()
                    } else {
                        NamedVectors::new()
                    },
                }
            })
            .collect())
    }

    async fn scroll(
        &self,
        collection: &str,
        request: ScrollRequest,
    ) -> anyhow::Result<(Vec<Point>, Option<usize>)> {
        let map = self.collections.read().map_err(|_| anyhow!("state lock poisoned"))?;
        let Some(stored) = map.get(collection) else { return Ok((Vec::new(), None)) };

        let matched: Vec<(&PointId, &StoredPoint)> = stored
            .iter()
            .filter(|(id, point)| match &request.filter {
                Some(filter) => filter_matches(filter, id, &point.payload),
                None => true,
            })
            .collect();

        let has_more = matched.len() > request.offset + request.limit;
        let page = matched
            .into_iter()
            .skip(request.offset)
            .take(request.limit)
            .map(|(id, point)| Point {
                id: *id,
                payload: if request.with_payload { point.payload.clone() } else { Payload::new() },
                vectors: if request.with_vectors {
                    point.vectors.clone()
                } else {
                    NamedVectors::new()
                },
            })
            .collect();
        let next_offset = has_more.then_some(request.offset + request.limit);
        Ok((page, next_offset))
    }

    async fn count(&self, collection: &str, filter: Option<Filter>) -> anyhow::Result<usize> {
        let map = self.collections.read().map_err(|_| anyhow!("state lock poisoned"))?;
        let Some(stored) = map.get(collection) else { return Ok(0) };
        Ok(stored
            .iter()
            .filter(|(id, point)| match &filter {
                Some(filter) => filter_matches(filter, id, &point.payload),
                None => true,
            })
            .count())
    }
}

fn score_vector(query: &QueryVector, vectors: &NamedVectors) -> Option<f32> {
    match query {
        QueryVector::Dense { field, vector } => match vectors.get(field) {
            Some(VectorData::Dense(stored)) if stored.len() == vector.len() => {
                Some(cosine(vector, stored))
            }
            _ => None,
        },
        QueryVector::Sparse { field, vector } => match vectors.get(field) {
            Some(VectorData::Sparse(stored)) => Some(sparse_dot(vector, stored)),
            _ => None,
        },
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let norm = norm_a.sqrt() * norm_b.sqrt();
    if norm == 0.0 {
        0.0
    } else {
        dot / norm
    }
}

fn sparse_dot(a: &SparseVector, b: &SparseVector) -> f32 {
    let by_index: HashMap<u32, f32> =
        b.indices.iter().copied().zip(b.values.iter().copied()).collect();
    a.indices
        .iter()
        .zip(a.values.iter())
        .filter_map(|(i, v)| by_index.get(i).map(|w| v * w))
        .sum()
}

/// Recursive evaluation of the native grammar against one point.
pub fn filter_matches(filter: &Filter, id: &PointId, payload: &Payload) -> bool {
    if !filter.must.iter().all(|c| condition_matches(c, id, payload)) {
        return false;
    }
    if filter.must_not.iter().any(|c| condition_matches(c, id, payload)) {
        return false;
    }
    if !filter.should.is_empty() && !filter.should.iter().any(|c| condition_matches(c, id, payload))
    {
        return false;
    }
    true
}

fn condition_matches(condition: &Condition, id: &PointId, payload: &Payload) -> bool {
    match condition {
        Condition::Field(fc) => {
            let value = payload.get(&fc.key);
            if let Some(m) = &fc.r#match {
                if !match_matches(m, value) {
                    return false;
                }
            }
            if let Some(range) = &fc.range {
                if !range_matches(range, value) {
                    return false;
                }
            }
            if let Some(bounds) = &fc.values_count {
                if !count_matches(bounds, value) {
                    return false;
                }
            }
            true
        }
        Condition::IsEmpty { is_empty } => match payload.get(&is_empty.key) {
            None | Some(Value::Null) => true,
            Some(Value::Array(items)) => items.is_empty(),
            Some(_) => false,
        },
        Condition::IsNull { is_null } => matches!(payload.get(&is_null.key), Some(Value::Null)),
        Condition::HasId { has_id } => has_id.contains(id),
        Condition::Nested { filter } => filter_matches(filter, id, payload),
    }
}

/// Stored values a match condition tests against: the elements of an array
/// payload, or the single scalar itself.
fn candidates(value: Option<&Value>) -> &[Value] {
    match value {
        Some(Value::Array(items)) => items.as_slice(),
        Some(single) => std::slice::from_ref(single),
        None => &[],
    }
}

fn match_matches(m: &Match, value: Option<&Value>) -> bool {
    let stored = candidates(value);
    if stored.is_empty() {
        return false;
    }
    match m {
        Match::Value { value: target } => stored.iter().any(|v| value_eq(v, target)),
        Match::Text { text } => {
            let needle = text.to_lowercase();
            stored.iter().any(|v| match v {
                Value::String(s) => s.to_lowercase().contains(&needle),
                _ => false,
            })
        }
        Match::Any { any } => stored.iter().any(|v| any.iter().any(|t| value_eq(v, t))),
        Match::Except { except } => stored.iter().any(|v| !except.iter().any(|t| value_eq(v, t))),
    }
}

fn range_matches(range: &Range, value: Option<&Value>) -> bool {
    let Some(actual) = value.and_then(Value::as_f64) else { return false };
    if let Some(bound) = range.gt {
        if actual <= bound {
            return false;
        }
    }
    if let Some(bound) = range.gte {
        if actual < bound {
            return false;
        }
    }
    if let Some(bound) = range.lt {
        if actual >= bound {
            return false;
        }
    }
    if let Some(bound) = range.lte {
        if actual > bound {
            return false;
        }
    }
    true
}

fn count_matches(bounds: &CountBounds, value: Option<&Value>) -> bool {
    let count = match value {
        None => return false,
        Some(Value::Array(items)) => items.len() as u64,
        Some(_) => 1,
    };
    if let Some(bound) = bounds.gt {
        if count <= bound {
            return false;
        }
    }
    if let Some(bound) = bounds.gte {
        if count < bound {
            return false;
        }
    }
    if let Some(bound) = bounds.lt {
        if count >= bound {
            return false;
        }
    }
    if let Some(bound) = bounds.lte {
        if count > bound {
            return false;
        }
    }
    true
}

/// Equality with numeric cross-type tolerance (`1` equals `1.0`).
fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(fx), Some(fy)) => (fx - fy).abs() < f64::EPSILON,
            _ => x == y,
        },
        _ => a == b,
    }
}
