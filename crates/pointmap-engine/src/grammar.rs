//! Native filter grammar of the engine.
//!
//! A [`Filter`] carries three buckets: conditions that must all hold,
//! conditions that must all fail, and conditions of which at least one
//! should hold. Nested filters are themselves conditions, so groups nest to
//! arbitrary depth.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::point::PointId;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must_not: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub should: Vec<Condition>,
}

impl Filter {
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.must_not.is_empty() && self.should.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    Field(FieldCondition),
    IsEmpty { is_empty: PayloadField },
    IsNull { is_null: PayloadField },
    HasId { has_id: Vec<PointId> },
    Nested { filter: Box<Filter> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadField {
    pub key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldCondition {
    pub key: String,
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub r#match: Option<Match>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values_count: Option<CountBounds>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Match {
    Value { value: Value },
    Text { text: String },
    Any { any: Vec<Value> },
    Except { except: Vec<Value> },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Range {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountBounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<u64>,
}

impl Condition {
    /// Exact match on a payload value.
    pub fn matches(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Field(FieldCondition {
            key: key.into(),
            r#match: Some(Match::Value { value: value.into() }),
            ..Default::default()
        })
    }

    /// Value is any of the given alternatives.
    pub fn match_any(key: impl Into<String>, any: Vec<Value>) -> Self {
        Condition::Field(FieldCondition {
            key: key.into(),
            r#match: Some(Match::Any { any }),
            ..Default::default()
        })
    }

    /// Value is none of the given alternatives.
    pub fn match_except(key: impl Into<String>, except: Vec<Value>) -> Self {
        Condition::Field(FieldCondition {
            key: key.into(),
            r#match: Some(Match::Except { except }),
            ..Default::default()
        })
    }

    /// Full-text match on a payload string.
    pub fn text(key: impl Into<String>, text: impl Into<String>) -> Self {
        Condition::Field(FieldCondition {
            key: key.into(),
            r#match: Some(Match::Text { text: text.into() }),
            ..Default::default()
        })
    }

    /// Numeric range on a payload value.
    pub fn range(key: impl Into<String>, range: Range) -> Self {
        Condition::Field(FieldCondition {
            key: key.into(),
            range: Some(range),
            ..Default::default()
        })
    }

    /// Bounds on the element count of an array payload value.
    pub fn values_count(key: impl Into<String>, bounds: CountBounds) -> Self {
        Condition::Field(FieldCondition {
            key: key.into(),
            values_count: Some(bounds),
            ..Default::default()
        })
    }

    pub fn is_empty(key: impl Into<String>) -> Self {
        Condition::IsEmpty { is_empty: PayloadField { key: key.into() } }
    }

    pub fn is_null(key: impl Into<String>) -> Self {
        Condition::IsNull { is_null: PayloadField { key: key.into() } }
    }

    pub fn has_id(ids: Vec<PointId>) -> Self {
        Condition::HasId { has_id: ids }
    }

    /// A nested filter used as a single condition.
    pub fn nested(filter: Filter) -> Self {
        Condition::Nested { filter: Box::new(filter) }
    }
}
