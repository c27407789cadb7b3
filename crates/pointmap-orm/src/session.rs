//! Session: the unit of work and the identifier bridge.
//!
//! `add`/`delete` buffer pending operations; `commit` groups them by
//! collection and flushes upserts then deletes. Every engine-bound
//! identifier passes through the reconciler, and the `(collection,
//! domain id) -> engine id` mapping is recorded on insert so later lookups
//! and deletes can skip re-derivation. The buffer is not thread-safe;
//! share a session across tasks only behind external locking.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

use pointmap_core::error::{Error, Result};
use pointmap_core::model::{self, Model};
use pointmap_core::schema::{FieldKind, RecordSchema, ScalarKind};
use pointmap_engine::ident::{self, IdCache};
use pointmap_engine::point::{NamedVectors, Payload, Point, PointId, SparseVector, VectorData};
use pointmap_engine::traits::VectorEngine;

use crate::query::Query;

enum PendingOp {
    Upsert { collection: &'static str, point: Point },
    Delete { collection: &'static str, domain_id: Value },
}

pub struct Session<E: VectorEngine> {
    engine: E,
    pending: Vec<PendingOp>,
    ids: IdCache,
}

impl<E: VectorEngine> Session<E> {
    pub fn new(engine: E) -> Self {
        Self { engine, pending: Vec::new(), ids: IdCache::new() }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn id_cache(&self) -> &IdCache {
        &self.ids
    }

    /// Drop all cached identifier mappings. Purely an optimization knob:
    /// lookups and deletes re-derive on a miss.
    pub fn clear_id_cache(&mut self) {
        self.ids.clear();
    }

    /// Stage a record for insert-or-replace. If the record carries no
    /// primary-key value, a fresh random identifier is generated and written
    /// back onto the record before derivation.
    pub fn add<M: Model>(&mut self, record: &mut M) -> Result<()> {
        let schema = M::schema();
        let mut values = model::to_values(record)?;
        let pk = schema
            .primary_key()
            .ok_or_else(|| Error::MissingPrimaryKey(schema.collection().to_string()))?;

        let domain_id = match model::primary_key_value(&values, schema) {
            Some(existing) => existing,
            None => {
                let fresh = Value::String(ident::random_domain_id());
                values.insert(pk.name.clone(), fresh.clone());
                *record = model::from_values(values.clone())?;
                fresh
            }
        };

        let point = build_point(schema, &domain_id, values)?;
        self.ids.record(schema.collection(), &domain_id, point.id);
        self.pending.push(PendingOp::Upsert { collection: schema.collection(), point });
        Ok(())
    }

    /// Stage a record for deletion by its primary-key value.
    pub fn delete<M: Model>(&mut self, record: &M) -> Result<()> {
        let schema = M::schema();
        let values = model::to_values(record)?;
        let domain_id = model::primary_key_value(&values, schema).unwrap_or(Value::Null);
        self.pending
            .push(PendingOp::Delete { collection: schema.collection(), domain_id });
        Ok(())
    }

    /// Flush pending operations, upserts before deletes, one batch per
    /// collection. Engine failures propagate; the buffer is only cleared
    /// after every batch succeeded.
    pub async fn commit(&mut self) -> Result<()> {
        let mut upserts: BTreeMap<&str, Vec<Point>> = BTreeMap::new();
        let mut deletes: BTreeMap<&str, Vec<PointId>> = BTreeMap::new();
        for op in &self.pending {
            match op {
                PendingOp::Upsert { collection, point } => {
                    upserts.entry(collection).or_default().push(point.clone());
                }
                PendingOp::Delete { collection, domain_id } => {
                    let engine_id = self.ids.resolve(collection, domain_id);
                    deletes.entry(collection).or_default().push(engine_id);
                }
            }
        }

        for (collection, points) in upserts {
            debug!(collection, count = points.len(), "flushing upserts");
            self.engine
                .upsert(collection, points)
                .await
                .map_err(|e| Error::Engine(e.to_string()))?;
        }
        for (collection, ids) in deletes {
            debug!(collection, count = ids.len(), "flushing deletes");
            self.engine
                .delete(collection, &ids)
                .await
                .map_err(|e| Error::Engine(e.to_string()))?;
        }

        self.pending.clear();
        Ok(())
    }

    /// Number of staged, uncommitted operations.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn query<M: Model>(&self) -> Query<'_, M, E> {
        Query::new(self)
    }

    /// Point lookup by domain identifier.
    pub async fn get<M: Model>(&self, id: impl Into<Value>) -> Result<Option<M>> {
        self.query::<M>().get(id).await
    }
}

/// Split a record's field map into payload and named vectors, validating
/// vector shapes, and derive the engine identifier.
fn build_point(schema: &RecordSchema, domain_id: &Value, values: Map<String, Value>) -> Result<Point> {
    let mut payload = Payload::new();
    let mut vectors = NamedVectors::new();

    for (name, value) in values {
        let descriptor = schema.field(&name);
        match descriptor.map(|d| &d.kind) {
            Some(FieldKind::DenseVector { dim, .. }) => {
                if value.is_null() {
                    continue;
                }
                let dense: Vec<f32> =
                    serde_json::from_value(value).map_err(|e| Error::InvalidVector {
                        field: name.clone(),
                        reason: e.to_string(),
                    })?;
                if dense.len() != *dim {
                    return Err(Error::InvalidVector {
                        field: name,
                        reason: format!("expected {} dimensions, got {}", dim, dense.len()),
                    });
                }
                vectors.insert(name, VectorData::Dense(dense));
            }
            Some(FieldKind::SparseVector) => {
                if value.is_null() {
                    continue;
                }
                let sparse: SparseVector =
                    serde_json::from_value(value).map_err(|e| Error::InvalidVector {
                        field: name.clone(),
                        reason: e.to_string(),
                    })?;
                if sparse.indices.len() != sparse.values.len() {
                    return Err(Error::InvalidVector {
                        field: name,
                        reason: format!(
                            "{} indices but {} values",
                            sparse.indices.len(),
                            sparse.values.len()
                        ),
                    });
                }
                vectors.insert(name, VectorData::Sparse(sparse));
            }
            Some(_) | None => {
                if value.is_null() {
                    if let Some(descriptor) = descriptor {
                        if !descriptor.nullable {
                            return Err(Error::Schema(format!(
                                "field '{}' of '{}' is not nullable",
                                name,
                                schema.collection()
                            )));
                        }
                    }
                }
                payload.insert(name, value);
            }
        }
    }

    Ok(Point { id: ident::reconcile(domain_id), payload, vectors })
}

/// Rebuild a record from an engine point: merge payload and vectors (sparse
/// vectors keep their index/value form), fall back to the engine identifier
/// for a missing primary key, then fill declared defaults.
pub(crate) fn hydrate<M: Model>(
    id: &PointId,
    payload: Payload,
    vectors: NamedVectors,
) -> Result<M> {
    let schema = M::schema();
    let mut values = payload;
    for (name, data) in vectors {
        let value = match data {
            VectorData::Dense(v) => serde_json::to_value(v)?,
            VectorData::Sparse(s) => serde_json::to_value(s)?,
        };
        values.insert(name, value);
    }
    if let Some(pk) = schema.primary_key() {
        let missing = matches!(values.get(&pk.name), None | Some(Value::Null));
        if missing {
            // Keyword keys take the identifier's string form; everything
            // else keeps the native number/uuid value.
            let fallback = match &pk.kind {
                FieldKind::Scalar(ScalarKind::Keyword) => Value::String(id.to_string()),
                _ => id.to_value(),
            };
            values.insert(pk.name.clone(), fallback);
        }
    }
    model::apply_defaults(&mut values, schema);
    model::from_values(values)
}
