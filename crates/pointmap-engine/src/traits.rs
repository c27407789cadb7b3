//! The black-box engine contract.
//!
//! Storage, indexing, and similarity ranking live behind this trait; the
//! mapping layer only constructs requests and reconciles responses. All six
//! operations are blocking request/response calls awaited one at a time.

use async_trait::async_trait;

use crate::grammar::Filter;
use crate::point::{Point, PointId, ScoredPoint};
use crate::request::{ScrollRequest, SearchRequest};

#[async_trait]
pub trait VectorEngine: Send + Sync {
    /// Idempotent insert-or-replace by identifier.
    async fn upsert(&self, collection: &str, points: Vec<Point>) -> anyhow::Result<()>;

    /// Batch point lookup. Results preserve no particular order relative to
    /// `ids`; absent identifiers are simply missing from the result.
    async fn retrieve(
        &self,
        collection: &str,
        ids: &[PointId],
        with_payload: bool,
        with_vectors: bool,
    ) -> anyhow::Result<Vec<Point>>;

    /// Remove points by identifier. Absent identifiers are not an error.
    async fn delete(&self, collection: &str, ids: &[PointId]) -> anyhow::Result<()>;

    /// Nearest-neighbor search on one named vector field.
    async fn search(
        &self,
        collection: &str,
        request: SearchRequest,
    ) -> anyhow::Result<Vec<ScoredPoint>>;

    /// Filtered enumeration; returns the page and the offset of the next
    /// page, if any.
    async fn scroll(
        &self,
        collection: &str,
        request: ScrollRequest,
    ) -> anyhow::Result<(Vec<Point>, Option<usize>)>;

    /// Cardinality of the points matching `filter`.
    async fn count(&self, collection: &str, filter: Option<Filter>) -> anyhow::Result<usize>;
}
