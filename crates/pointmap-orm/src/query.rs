//! Fluent query builder and retrieval-mode dispatcher.
//!
//! Mode priority: a combined (fusion) search wins, then a single-field
//! vector search, then filtered enumeration. Point lookup by identifier
//! bypasses filter and vector logic entirely.
//!
//! Read-path transport failures are logged and converted into empty
//! results / zero / not-found; contract violations (bad vectors, illegal
//! operators) surface as typed errors before any request is sent.

use serde_json::Value;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::ops::Deref;
use tracing::warn;

use pointmap_core::error::{Error, Result};
use pointmap_core::filter::FilterExpr;
use pointmap_core::model::Model;
use pointmap_core::schema::FieldKind;
use pointmap_engine::grammar::{Condition, Filter};
use pointmap_engine::point::{Point, PointId, SparseVector, VectorData};
use pointmap_engine::request::{QueryVector, ScrollRequest, SearchRequest};
use pointmap_engine::traits::VectorEngine;

use crate::fusion::{self, CombinedSearch};
use crate::session::{hydrate, Session};
use crate::translate::build_filter;

const DEFAULT_LIMIT: usize = 10;

/// A record returned by a query, with the similarity score attached when
/// the retrieval mode produced one.
#[derive(Debug, Clone)]
pub struct Scored<M> {
    pub record: M,
    pub score: Option<f32>,
}

impl<M> Deref for Scored<M> {
    type Target = M;

    fn deref(&self) -> &M {
        &self.record
    }
}

pub struct Query<'s, M: Model, E: VectorEngine> {
    session: &'s Session<E>,
    filters: Vec<FilterExpr>,
    vector: Option<QueryVector>,
    combined: Option<CombinedSearch>,
    using: Option<String>,
    limit: usize,
    offset: usize,
    with_payload: bool,
    with_vectors: bool,
    score_threshold: Option<f32>,
    _model: PhantomData<M>,
}

impl<'s, M: Model, E: VectorEngine> Query<'s, M, E> {
    pub(crate) fn new(session: &'s Session<E>) -> Self {
        Self {
            session,
            filters: Vec::new(),
            vector: None,
            combined: None,
            using: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
            with_payload: true,
            with_vectors: false,
            score_threshold: None,
            _model: PhantomData,
        }
    }

    /// Add a filter expression; repeated calls AND together.
    pub fn filter(mut self, expr: FilterExpr) -> Self {
        self.filters.push(expr);
        self
    }

    /// Nearest-neighbor search on a dense vector field.
    pub fn vector_search(mut self, field: impl Into<String>, vector: Vec<f32>) -> Self {
        self.vector = Some(QueryVector::Dense { field: field.into(), vector });
        self
    }

    /// Nearest-neighbor search on a sparse vector field.
    pub fn sparse_vector_search(mut self, field: impl Into<String>, vector: SparseVector) -> Self {
        self.vector = Some(QueryVector::Sparse { field: field.into(), vector });
        self
    }

    /// Weighted multi-field fusion search; takes precedence over
    /// `vector_search`.
    pub fn combined_vector_search(mut self, combined: CombinedSearch) -> Self {
        self.combined = Some(combined);
        self
    }

    /// Vector field used by `recommend`. Defaults to the schema's first
    /// dense vector field.
    pub fn using(mut self, field: impl Into<String>) -> Self {
        self.using = Some(field.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_payload(mut self, with_payload: bool) -> Self {
        self.with_payload = with_payload;
        self
    }

    pub fn with_vectors(mut self, with_vectors: bool) -> Self {
        self.with_vectors = with_vectors;
        self
    }

    pub fn score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = Some(threshold);
        self
    }

    /// Translated native filter for the current expression list.
    pub fn native_filter(&self) -> Result<Option<Filter>> {
        build_filter(M::schema(), &self.filters)
    }

    /// Execute the query and return all matching records.
    pub async fn all(self) -> Result<Vec<Scored<M>>> {
        let collection = M::schema().collection();
        let filter = self.native_filter()?;

        // 1) Fusion takes precedence.
        if let Some(combined) = &self.combined {
            return self.run_combined(collection, filter, combined).await;
        }

        // 2) Single-field vector search.
        if let Some(vector) = &self.vector {
            self.validate_query_vector(vector)?;
            let request = SearchRequest {
                vector: vector.clone(),
                filter,
                limit: self.limit,
                offset: self.offset,
                with_payload: self.with_payload,
                with_vectors: self.with_vectors,
                score_threshold: self.score_threshold,
            };
            let hits = match self.session.engine().search(collection, request).await {
                Ok(hits) => hits,
                Err(e) => {
                    warn!(collection, error = %e, "vector search failed; returning empty result");
                    return Ok(Vec::new());
                }
            };
            return hits
                .into_iter()
                .map(|hit| {
                    hydrate::<M>(&hit.id, hit.payload, hit.vectors)
                        .map(|record| Scored { record, score: Some(hit.score) })
                })
                .collect();
        }

        // 3) Filtered enumeration.
        let request = ScrollRequest {
            filter,
            limit: self.limit,
            offset: self.offset,
            with_payload: self.with_payload,
            with_vectors: self.with_vectors,
        };
        let points = match self.session.engine().scroll(collection, request).await {
            Ok((points, _next)) => points,
            Err(e) => {
                warn!(collection, error = %e, "scroll failed; returning empty result");
                return Ok(Vec::new());
            }
        };
        points
            .into_iter()
            .map(|point| {
                hydrate::<M>(&point.id, point.payload, point.vectors)
                    .map(|record| Scored { record, score: None })
            })
            .collect()
    }

    /// The sole matching record, or `None`.
    pub async fn first(mut self) -> Result<Option<Scored<M>>> {
        self.limit = 1;
        Ok(self.all().await?.into_iter().next())
    }

    /// Point lookup by domain identifier; bypasses filters and vectors.
    pub async fn get(self, id: impl Into<Value>) -> Result<Option<M>> {
        let collection = M::schema().collection();
        let domain_id = id.into();
        let engine_id = self.session.id_cache().resolve(collection, &domain_id);
        let points = match self
            .session
            .engine()
            .retrieve(collection, &[engine_id], self.with_payload, self.with_vectors)
            .await
        {
            Ok(points) => points,
            Err(e) => {
                warn!(collection, error = %e, "retrieve failed; treating as not found");
                return Ok(None);
            }
        };
        match points.into_iter().next() {
            Some(point) => Ok(Some(hydrate::<M>(&point.id, point.payload, point.vectors)?)),
            None => Ok(None),
        }
    }

    /// Cardinality of the records matching the filter. Transport failures
    /// count as zero.
    pub async fn count(self) -> Result<usize> {
        let collection = M::schema().collection();
        let filter = self.native_filter()?;
        match self.session.engine().count(collection, filter).await {
            Ok(count) => Ok(count),
            Err(e) => {
                warn!(collection, error = %e, "count failed; returning zero");
                Ok(0)
            }
        }
    }

    /// Records similar to the positive examples and dissimilar to the
    /// negative ones, excluding the examples themselves. Runs entirely on
    /// the base engine contract: the example vectors are fetched, averaged
    /// (positives shifted away from the negative average), and fed into a
    /// regular filtered search.
    pub async fn recommend<I, V>(self, positive: I, negative: I) -> Result<Vec<Scored<M>>>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let schema = M::schema();
        let collection = schema.collection();

        let field = match &self.using {
            Some(name) => {
                let descriptor = name.clone();
                match schema.field(&descriptor).map(|f| &f.kind) {
                    Some(FieldKind::DenseVector { .. }) => descriptor,
                    Some(_) => {
                        return Err(Error::InvalidVector {
                            field: descriptor,
                            reason: "recommendation requires a dense vector field".to_string(),
                        })
                    }
                    None => {
                        return Err(Error::UnknownField {
                            model: collection.to_string(),
                            field: descriptor,
                        })
                    }
                }
            }
            None => schema
                .first_dense_vector()
                .map(|f| f.name.clone())
                .ok_or_else(|| {
                    Error::Schema(format!("'{}' declares no dense vector field", collection))
                })?,
        };

        let positive_ids: Vec<PointId> = positive
            .into_iter()
            .map(|id| self.session.id_cache().resolve(collection, &id.into()))
            .collect();
        let negative_ids: Vec<PointId> = negative
            .into_iter()
            .map(|id| self.session.id_cache().resolve(collection, &id.into()))
            .collect();
        if positive_ids.is_empty() {
            return Err(Error::Schema(
                "recommendation requires at least one positive example".to_string(),
            ));
        }

        let mut example_ids = positive_ids.clone();
        example_ids.extend(negative_ids.iter().copied());
        let examples = match self
            .session
            .engine()
            .retrieve(collection, &example_ids, false, true)
            .await
        {
            Ok(points) => points,
            Err(e) => {
                warn!(collection, error = %e, "example retrieval failed; returning empty result");
                return Ok(Vec::new());
            }
        };

        let vector_of = |point: &Point| match point.vectors.get(&field) {
            Some(VectorData::Dense(v)) => Some(v.clone()),
            _ => None,
        };
        let positives: Vec<Vec<f32>> = examples
            .iter()
            .filter(|p| positive_ids.contains(&p.id))
            .filter_map(vector_of)
            .collect();
        let negatives: Vec<Vec<f32>> = examples
            .iter()
            .filter(|p| negative_ids.contains(&p.id))
            .filter_map(vector_of)
            .collect();
        let Some(query_vector) = recommendation_vector(&positives, &negatives) else {
            warn!(collection, field = %field, "no example vectors found; returning empty result");
            return Ok(Vec::new());
        };

        // Exclude the example points from the result set.
        let mut filter = self.native_filter()?.unwrap_or_default();
        filter.must_not.push(Condition::has_id(example_ids));

        let request = SearchRequest {
            vector: QueryVector::Dense { field, vector: query_vector },
            filter: Some(filter),
            limit: self.limit,
            offset: self.offset,
            with_payload: self.with_payload,
            with_vectors: self.with_vectors,
            score_threshold: self.score_threshold,
        };
        let hits = match self.session.engine().search(collection, request).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(collection, error = %e, "recommendation search failed; returning empty result");
                return Ok(Vec::new());
            }
        };
        hits.into_iter()
            .map(|hit| {
                hydrate::<M>(&hit.id, hit.payload, hit.vectors)
                    .map(|record| Scored { record, score: Some(hit.score) })
            })
            .collect()
    }

    async fn run_combined(
        &self,
        collection: &str,
        filter: Option<Filter>,
        combined: &CombinedSearch,
    ) -> Result<Vec<Scored<M>>> {
        let ranked =
            fusion::ranked_ids(self.session.engine(), collection, filter.as_ref(), combined)
                .await?;
        if ranked.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<PointId> = ranked.iter().map(|(id, _)| *id).collect();
        let points = match self
            .session
            .engine()
            .retrieve(collection, &ids, self.with_payload, self.with_vectors)
            .await
        {
            Ok(points) => points,
            Err(e) => {
                warn!(collection, error = %e, "fused retrieval failed; returning empty result");
                return Ok(Vec::new());
            }
        };

        // Batch retrieval does not preserve request order; restore rank
        // order from the fused scores.
        let mut by_id: HashMap<PointId, Point> =
            points.into_iter().map(|p| (p.id, p)).collect();
        let mut records = Vec::with_capacity(ranked.len());
        for (id, score) in ranked {
            let Some(point) = by_id.remove(&id) else { continue };
            let record = hydrate::<M>(&point.id, point.payload, point.vectors)?;
            records.push(Scored { record, score: Some(score) });
        }
        Ok(records)
    }

    fn validate_query_vector(&self, vector: &QueryVector) -> Result<()> {
        let schema = M::schema();
        let field = vector.field();
        let Some(descriptor) = schema.field(field) else {
            return Err(Error::UnknownField {
                model: schema.collection().to_string(),
                field: field.to_string(),
            });
        };
        match (&descriptor.kind, vector) {
            (FieldKind::DenseVector { dim, .. }, QueryVector::Dense { vector, .. }) => {
                if vector.len() != *dim {
                    return Err(Error::InvalidVector {
                        field: field.to_string(),
                        reason: format!("expected {} dimensions, got {}", dim, vector.len()),
                    });
                }
                Ok(())
            }
            (FieldKind::SparseVector, QueryVector::Sparse { vector, .. }) => {
                if vector.indices.len() != vector.values.len() {
                    return Err(Error::InvalidVector {
                        field: field.to_string(),
                        reason: format!(
                            "{} indices but {} values",
                            vector.indices.len(),
                            vector.values.len()
                        ),
                    });
                }
                Ok(())
            }
            (FieldKind::DenseVector { .. }, QueryVector::Sparse { .. }) => {
                Err(Error::InvalidVector {
                    field: field.to_string(),
                    reason: "field is dense; use vector_search".to_string(),
                })
            }
            (FieldKind::SparseVector, QueryVector::Dense { .. }) => Err(Error::InvalidVector {
                field: field.to_string(),
                reason: "field is sparse; use sparse_vector_search".to_string(),
            }),
            _ => Err(Error::InvalidVector {
                field: field.to_string(),
                reason: "field is not a vector field".to_string(),
            }),
        }
    }
}

/// Average of the positive example vectors, shifted away from the negative
/// average when present: `avg(pos) + (avg(pos) - avg(neg))`.
fn recommendation_vector(positives: &[Vec<f32>], negatives: &[Vec<f32>]) -> Option<Vec<f32>> {
    let avg_pos = mean(positives)?;
    match mean(negatives) {
        Some(avg_neg) if avg_neg.len() == avg_pos.len() => Some(
            avg_pos
                .iter()
                .zip(avg_neg.iter())
                .map(|(p, n)| p + (p - n))
                .collect(),
        ),
        _ => Some(avg_pos),
    }
}

fn mean(vectors: &[Vec<f32>]) -> Option<Vec<f32>> {
    let first = vectors.first()?;
    let mut sum = vec![0.0f32; first.len()];
    let mut count = 0usize;
    for vector in vectors {
        if vector.len() != sum.len() {
            continue;
        }
        for (slot, v) in sum.iter_mut().zip(vector.iter()) {
            *slot += v;
        }
        count += 1;
    }
    let count = count as f32;
    Some(sum.into_iter().map(|v| v / count).collect())
}
