//! Declarative filter expressions.
//!
//! A [`FilterExpr`] is an immutable tree of leaf conditions
//! `(field, operator, value)` and `and`/`or` groups. Conditions are built
//! through the per-operator factory methods on [`FieldRef`]; no validation
//! against the field's declared kind happens here — legality is checked at
//! translation time, once the schema is in hand.
//!
//! A condition whose value is `Value::Null` is legal to build and is
//! silently dropped by the translator. Use [`FieldRef::is_null`] to test
//! for null payloads.

use serde_json::{Map, Value};

/// The fixed operator vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Contains,
    ContainsAny,
    ContainsAll,
    IsEmpty,
    IsNull,
    TextMatch,
    ValuesCount,
}

impl Operator {
    /// Token used in diagnostics.
    pub fn token(self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::In => "in",
            Operator::NotIn => "not_in",
            Operator::Contains => "contains",
            Operator::ContainsAny => "contains_any",
            Operator::ContainsAll => "contains_all",
            Operator::IsEmpty => "is_empty",
            Operator::IsNull => "is_null",
            Operator::TextMatch => "text_match",
            Operator::ValuesCount => "values_count",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    pub field: String,
    pub op: Operator,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterGroup {
    pub logic: Logic,
    pub children: Vec<FilterExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Condition(FilterCondition),
    Group(FilterGroup),
}

impl FilterExpr {
    /// Combine two predicates with AND logic.
    pub fn and(self, other: FilterExpr) -> FilterExpr {
        FilterExpr::Group(FilterGroup { logic: Logic::And, children: vec![self, other] })
    }

    /// Combine two predicates with OR logic.
    pub fn or(self, other: FilterExpr) -> FilterExpr {
        FilterExpr::Group(FilterGroup { logic: Logic::Or, children: vec![self, other] })
    }
}

/// Bounds on the element count of an array field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountRange {
    pub gt: Option<u64>,
    pub gte: Option<u64>,
    pub lt: Option<u64>,
    pub lte: Option<u64>,
}

impl CountRange {
    pub fn is_unbounded(&self) -> bool {
        self.gt.is_none() && self.gte.is_none() && self.lt.is_none() && self.lte.is_none()
    }

    fn into_value(self) -> Value {
        let mut map = Map::new();
        if let Some(v) = self.gt {
            map.insert("gt".to_string(), v.into());
        }
        if let Some(v) = self.gte {
            map.insert("gte".to_string(), v.into());
        }
        if let Some(v) = self.lt {
            map.insert("lt".to_string(), v.into());
        }
        if let Some(v) = self.lte {
            map.insert("lte".to_string(), v.into());
        }
        Value::Object(map)
    }
}

/// Handle on a field name, carrying the per-operator condition factories.
#[derive(Debug, Clone)]
pub struct FieldRef {
    name: String,
}

/// Entry point of the fluent filter API: `field("price").gt(100)`.
pub fn field(name: impl Into<String>) -> FieldRef {
    FieldRef { name: name.into() }
}

impl FieldRef {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn cond(&self, op: Operator, value: Value) -> FilterExpr {
        FilterExpr::Condition(FilterCondition { field: self.name.clone(), op, value })
    }

    pub fn eq(&self, value: impl Into<Value>) -> FilterExpr {
        self.cond(Operator::Eq, value.into())
    }

    pub fn ne(&self, value: impl Into<Value>) -> FilterExpr {
        self.cond(Operator::Ne, value.into())
    }

    pub fn gt(&self, value: impl Into<Value>) -> FilterExpr {
        self.cond(Operator::Gt, value.into())
    }

    pub fn gte(&self, value: impl Into<Value>) -> FilterExpr {
        self.cond(Operator::Gte, value.into())
    }

    pub fn lt(&self, value: impl Into<Value>) -> FilterExpr {
        self.cond(Operator::Lt, value.into())
    }

    pub fn lte(&self, value: impl Into<Value>) -> FilterExpr {
        self.cond(Operator::Lte, value.into())
    }

    pub fn is_in<I, V>(&self, values: I) -> FilterExpr
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.cond(Operator::In, Value::Array(values.into_iter().map(Into::into).collect()))
    }

    pub fn not_in<I, V>(&self, values: I) -> FilterExpr
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.cond(Operator::NotIn, Value::Array(values.into_iter().map(Into::into).collect()))
    }

    pub fn contains(&self, value: impl Into<Value>) -> FilterExpr {
        self.cond(Operator::Contains, value.into())
    }

    pub fn contains_any<I, V>(&self, values: I) -> FilterExpr
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.cond(
            Operator::ContainsAny,
            Value::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    pub fn contains_all<I, V>(&self, values: I) -> FilterExpr
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.cond(
            Operator::ContainsAll,
            Value::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    pub fn is_empty(&self) -> FilterExpr {
        self.cond(Operator::IsEmpty, Value::Bool(true))
    }

    pub fn is_null(&self) -> FilterExpr {
        self.cond(Operator::IsNull, Value::Bool(true))
    }

    pub fn matches_text(&self, text: impl Into<String>) -> FilterExpr {
        self.cond(Operator::TextMatch, Value::String(text.into()))
    }

    pub fn values_count(&self, range: CountRange) -> FilterExpr {
        self.cond(Operator::ValuesCount, range.into_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_builds_a_two_child_group() {
        let expr = field("category").eq("books").and(field("price").lt(20));
        match expr {
            FilterExpr::Group(group) => {
                assert_eq!(group.logic, Logic::And);
                assert_eq!(group.children.len(), 2);
            }
            FilterExpr::Condition(_) => panic!("expected a group"),
        }
    }

    #[test]
    fn or_of_group_nests() {
        let pair = field("a").eq(1).or(field("b").eq(2));
        let expr = pair.or(field("c").eq(3));
        match expr {
            FilterExpr::Group(group) => {
                assert_eq!(group.logic, Logic::Or);
                assert!(matches!(group.children[0], FilterExpr::Group(_)));
                assert!(matches!(group.children[1], FilterExpr::Condition(_)));
            }
            FilterExpr::Condition(_) => panic!("expected a group"),
        }
    }

    #[test]
    fn values_count_serializes_only_set_bounds() {
        let expr = field("tags").values_count(CountRange { gte: Some(2), ..Default::default() });
        match expr {
            FilterExpr::Condition(cond) => {
                assert_eq!(cond.op, Operator::ValuesCount);
                assert_eq!(cond.value, serde_json::json!({ "gte": 2 }));
            }
            FilterExpr::Group(_) => panic!("expected a condition"),
        }
    }
}
