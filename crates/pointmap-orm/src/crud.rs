//! Bulk and conditional CRUD helpers built on the session and query API.

use serde_json::{Map, Value};

use pointmap_core::error::{Error, Result};
use pointmap_core::filter::{field, FilterExpr};
use pointmap_core::model::{self, Model};
use pointmap_engine::traits::VectorEngine;

use crate::session::Session;

/// Page size used when a helper has to enumerate matching records.
const PAGE_SIZE: usize = 100;

/// Insert records in committed batches.
pub async fn bulk_insert<M: Model, E: VectorEngine>(
    session: &mut Session<E>,
    records: &mut [M],
    batch_size: usize,
) -> Result<()> {
    for chunk in records.chunks_mut(batch_size.max(1)) {
        for record in chunk.iter_mut() {
            session.add(record)?;
        }
        session.commit().await?;
    }
    Ok(())
}

/// Update records in committed batches. Inserts are upserts, so this is
/// `bulk_insert` under another name.
pub async fn bulk_update<M: Model, E: VectorEngine>(
    session: &mut Session<E>,
    records: &mut [M],
    batch_size: usize,
) -> Result<()> {
    bulk_insert(session, records, batch_size).await
}

/// Delete records in committed batches.
pub async fn bulk_delete<M: Model, E: VectorEngine>(
    session: &mut Session<E>,
    records: &[M],
    batch_size: usize,
) -> Result<()> {
    for chunk in records.chunks(batch_size.max(1)) {
        for record in chunk {
            session.delete(record)?;
        }
        session.commit().await?;
    }
    Ok(())
}

/// Delete every record matching the filters. Returns the number deleted.
pub async fn delete_by_filter<M: Model, E: VectorEngine>(
    session: &mut Session<E>,
    filters: Vec<FilterExpr>,
) -> Result<usize> {
    let mut deleted = 0usize;
    loop {
        let mut query = session.query::<M>().limit(PAGE_SIZE);
        for expr in filters.iter().cloned() {
            query = query.filter(expr);
        }
        let page = query.all().await?;
        if page.is_empty() {
            break;
        }
        let count = page.len();
        for scored in &page {
            session.delete(&scored.record)?;
        }
        session.commit().await?;
        deleted += count;
        // A short page means the match set is exhausted.
        if count < PAGE_SIZE {
            break;
        }
    }
    Ok(deleted)
}

/// Apply `updates` to every record matching the filters. Update keys are
/// validated against the schema. Returns the number updated.
pub async fn update_by_filter<M: Model, E: VectorEngine>(
    session: &mut Session<E>,
    updates: &Map<String, Value>,
    filters: Vec<FilterExpr>,
) -> Result<usize> {
    validate_keys::<M>(updates)?;
    let mut updated = 0usize;
    let mut offset = 0usize;
    loop {
        // Vectors must ride along or the re-inserted points would lose them.
        let mut query = session.query::<M>().with_vectors(true).limit(PAGE_SIZE).offset(offset);
        for expr in filters.iter().cloned() {
            query = query.filter(expr);
        }
        let page = query.all().await?;
        if page.is_empty() {
            break;
        }
        let count = page.len();
        for scored in page {
            let mut values = model::to_values(&scored.record)?;
            for (key, value) in updates {
                values.insert(key.clone(), value.clone());
            }
            let mut record: M = model::from_values(values)?;
            session.add(&mut record)?;
        }
        session.commit().await?;
        updated += count;
        if count < PAGE_SIZE {
            break;
        }
        offset += PAGE_SIZE;
    }
    Ok(updated)
}

/// Fetch the record matching the equality constraints, or create it from
/// the constraints plus `defaults`. Returns the record and whether it was
/// created.
pub async fn get_or_create<M: Model, E: VectorEngine>(
    session: &mut Session<E>,
    matchers: &Map<String, Value>,
    defaults: &Map<String, Value>,
) -> Result<(M, bool)> {
    validate_keys::<M>(matchers)?;
    validate_keys::<M>(defaults)?;

    if let Some(found) = find_first::<M, E>(session, matchers).await? {
        return Ok((found, false));
    }

    let mut values = matchers.clone();
    for (key, value) in defaults {
        values.insert(key.clone(), value.clone());
    }
    model::apply_defaults(&mut values, M::schema());
    let mut record: M = model::from_values(values)?;
    session.add(&mut record)?;
    session.commit().await?;
    Ok((record, true))
}

/// Update the record matching the equality constraints with `defaults`, or
/// create it. Returns the record and whether it was created.
pub async fn update_or_create<M: Model, E: VectorEngine>(
    session: &mut Session<E>,
    matchers: &Map<String, Value>,
    defaults: &Map<String, Value>,
) -> Result<(M, bool)> {
    validate_keys::<M>(matchers)?;
    validate_keys::<M>(defaults)?;

    if let Some(found) = find_first::<M, E>(session, matchers).await? {
        let mut values = model::to_values(&found)?;
        for (key, value) in defaults {
            values.insert(key.clone(), value.clone());
        }
        let mut record: M = model::from_values(values)?;
        session.add(&mut record)?;
        session.commit().await?;
        return Ok((record, false));
    }

    let mut values = matchers.clone();
    for (key, value) in defaults {
        values.insert(key.clone(), value.clone());
    }
    model::apply_defaults(&mut values, M::schema());
    let mut record: M = model::from_values(values)?;
    session.add(&mut record)?;
    session.commit().await?;
    Ok((record, true))
}

async fn find_first<M: Model, E: VectorEngine>(
    session: &Session<E>,
    matchers: &Map<String, Value>,
) -> Result<Option<M>> {
    let mut query = session.query::<M>().with_vectors(true);
    for (key, value) in matchers {
        query = query.filter(field(key).eq(value.clone()));
    }
    Ok(query.first().await?.map(|scored| scored.record))
}

fn validate_keys<M: Model>(values: &Map<String, Value>) -> Result<()> {
    let schema = M::schema();
    for key in values.keys() {
        if schema.field(key).is_none() {
            return Err(Error::UnknownField {
                model: schema.collection().to_string(),
                field: key.clone(),
            });
        }
    }
    Ok(())
}
