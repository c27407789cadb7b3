//! Shared fixtures: test models and stub engines.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::OnceLock;

use anyhow::anyhow;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use pointmap_core::model::Model;
use pointmap_core::schema::{Distance, FieldDescriptor, RecordSchema, ScalarKind};
use pointmap_engine::grammar::Filter;
use pointmap_engine::point::{Point, PointId, ScoredPoint};
use pointmap_engine::request::{ScrollRequest, SearchRequest};
use pointmap_engine::traits::VectorEngine;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Option<String>,
    pub title: String,
    pub category: String,
    pub price: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    pub embedding: Option<Vec<f32>>,
}

static DOCUMENT_SCHEMA: OnceLock<RecordSchema> = OnceLock::new();

impl Model for Document {
    fn schema() -> &'static RecordSchema {
        DOCUMENT_SCHEMA.get_or_init(|| {
            RecordSchema::builder("documents")
                .field(FieldDescriptor::keyword("id").primary_key())
                .field(FieldDescriptor::keyword("title"))
                .field(FieldDescriptor::keyword("category"))
                .field(FieldDescriptor::float("price"))
                .field(FieldDescriptor::array("tags", ScalarKind::Keyword))
                .field(FieldDescriptor::dense_vector("embedding", 3, Distance::Cosine))
                .build()
                .expect("document schema")
        })
    }
}

pub fn document(id: &str, title: &str, category: &str, price: f64, embedding: [f32; 3]) -> Document {
    Document {
        id: Some(id.to_string()),
        title: title.to_string(),
        category: category.to_string(),
        price,
        tags: Vec::new(),
        embedding: Some(embedding.to_vec()),
    }
}

/// Two dense fields plus payload, for fusion tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: Option<String>,
    pub label: String,
    pub vec_a: Option<Vec<f32>>,
    pub vec_b: Option<Vec<f32>>,
}

static ITEM_SCHEMA: OnceLock<RecordSchema> = OnceLock::new();

impl Model for Item {
    fn schema() -> &'static RecordSchema {
        ITEM_SCHEMA.get_or_init(|| {
            RecordSchema::builder("items")
                .field(FieldDescriptor::keyword("id").primary_key())
                .field(FieldDescriptor::keyword("label"))
                .field(FieldDescriptor::dense_vector("vec_a", 2, Distance::Cosine))
                .field(FieldDescriptor::dense_vector("vec_b", 2, Distance::Cosine))
                .build()
                .expect("item schema")
        })
    }
}

/// Engine whose every operation fails, for the permissive-read-path tests.
pub struct FailingEngine;

#[async_trait]
impl VectorEngine for FailingEngine {
    async fn upsert(&self, _collection: &str, _points: Vec<Point>) -> anyhow::Result<()> {
        Err(anyhow!("transport down"))
    }

    async fn retrieve(
        &self,
        _collection: &str,
        _ids: &[PointId],
        _with_payload: bool,
        _with_vectors: bool,
    ) -> anyhow::Result<Vec<Point>> {
        Err(anyhow!("transport down"))
    }

    async fn delete(&self, _collection: &str, _ids: &[PointId]) -> anyhow::Result<()> {
        Err(anyhow!("transport down"))
    }

    async fn search(
        &self,
        _collection: &str,
        _request: SearchRequest,
    ) -> anyhow::Result<Vec<ScoredPoint>> {
        Err(anyhow!("transport down"))
    }

    async fn scroll(
        &self,
        _collection: &str,
        _request: ScrollRequest,
    ) -> anyhow::Result<(Vec<Point>, Option<usize>)> {
        Err(anyhow!("transport down"))
    }

    async fn count(&self, _collection: &str, _filter: Option<Filter>) -> anyhow::Result<usize> {
        Err(anyhow!("transport down"))
    }
}

/// Engine returning scripted per-field hits, for exact fusion arithmetic.
/// A field absent from the script fails its search.
pub struct ScriptedEngine {
    pub hits_by_field: HashMap<String, Vec<(PointId, f32)>>,
    pub points: Vec<Point>,
}

#[async_trait]
impl VectorEngine for ScriptedEngine {
    async fn upsert(&self, _collection: &str, _points: Vec<Point>) -> anyhow::Result<()> {
        Err(anyhow!("read-only script"))
    }

    async fn retrieve(
        &self,
        _collection: &str,
        ids: &[PointId],
        _with_payload: bool,
        _with_vectors: bool,
    ) -> anyhow::Result<Vec<Point>> {
        // Deliberately reversed: batch retrieval preserves no request order.
        let mut found: Vec<Point> = self
            .points
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect();
        found.reverse();
        Ok(found)
    }

    async fn delete(&self, _collection: &str, _ids: &[PointId]) -> anyhow::Result<()> {
        Err(anyhow!("read-only script"))
    }

    async fn search(
        &self,
        _collection: &str,
        request: SearchRequest,
    ) -> anyhow::Result<Vec<ScoredPoint>> {
        let field = request.vector.field();
        let hits = self
            .hits_by_field
            .get(field)
            .ok_or_else(|| anyhow!("field '{}' unavailable", field))?;
        Ok(hits
            .iter()
            .take(request.limit)
            .map(|(id, score)| ScoredPoint {
                id: *id,
                score: *score,
                payload: serde_json::Map::new(),
                vectors: std::collections::BTreeMap::new(),
            })
            .collect())
    }

    async fn scroll(
        &self,
        _collection: &str,
        _request: ScrollRequest,
    ) -> anyhow::Result<(Vec<Point>, Option<usize>)> {
        Ok((Vec::new(), None))
    }

    async fn count(&self, _collection: &str, _filter: Option<Filter>) -> anyhow::Result<usize> {
        Ok(self.points.len())
    }
}
