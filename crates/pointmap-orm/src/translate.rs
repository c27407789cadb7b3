//! Translation of declarative filter expressions into the native grammar.
//!
//! One conversion rule per operator. Equality-style matches land in `must`,
//! negations (`!=`, `not_in`) in `must_not`, and or-groups become a single
//! nested alternative in the enclosing bucket set. Groups translate
//! recursively to arbitrary depth. Conditions whose value is null are
//! dropped without error; callers who mean "the payload is null" must use
//! the explicit `is_null` operator.

use serde_json::Value;

use pointmap_core::error::{Error, Result};
use pointmap_core::filter::{FilterCondition, FilterExpr, FilterGroup, Logic, Operator};
use pointmap_core::schema::{FieldKind, RecordSchema, ScalarKind};
use pointmap_engine::grammar::{Condition, CountBounds, Filter, Range};

/// Build the native filter for a sequence of expressions (implicitly
/// AND-ed, as repeated `filter` calls on a query). Returns `None` when no
/// conditions were present or every condition was skipped.
pub fn build_filter(schema: &RecordSchema, exprs: &[FilterExpr]) -> Result<Option<Filter>> {
    let mut filter = Filter::default();
    for expr in exprs {
        add_to_buckets(schema, expr, &mut filter)?;
    }
    if filter.is_empty() {
        Ok(None)
    } else {
        Ok(Some(filter))
    }
}

fn add_to_buckets(schema: &RecordSchema, expr: &FilterExpr, filter: &mut Filter) -> Result<()> {
    match expr {
        FilterExpr::Condition(cond) => match translate_condition(schema, cond)? {
            None => {}
            Some(Translated::Match(c)) => filter.must.push(c),
            Some(Translated::Negated(c)) => filter.must_not.push(c),
            Some(Translated::All(cs)) => filter.must.extend(cs),
        },
        FilterExpr::Group(group) => match group.logic {
            // An and-group distributes its children over the same buckets.
            Logic::And => {
                for child in &group.children {
                    add_to_buckets(schema, child, filter)?;
                }
            }
            // An or-group is one nested alternative.
            Logic::Or => {
                if let Some(cond) = or_group_condition(schema, group)? {
                    filter.must.push(cond);
                }
            }
        },
    }
    Ok(())
}

fn or_group_condition(schema: &RecordSchema, group: &FilterGroup) -> Result<Option<Condition>> {
    let mut should = Vec::new();
    for child in &group.children {
        if let Some(cond) = as_condition(schema, child)? {
            should.push(cond);
        }
    }
    if should.is_empty() {
        return Ok(None);
    }
    Ok(Some(Condition::nested(Filter { should, ..Default::default() })))
}

/// Render any expression as a single condition, wrapping negations and
/// groups in nested filters. Used for or-alternatives and nested groups.
fn as_condition(schema: &RecordSchema, expr: &FilterExpr) -> Result<Option<Condition>> {
    match expr {
        FilterExpr::Condition(cond) => Ok(translate_condition(schema, cond)?.map(|t| match t {
            Translated::Match(c) => c,
            Translated::Negated(c) => {
                Condition::nested(Filter { must_not: vec![c], ..Default::default() })
            }
            Translated::All(cs) => Condition::nested(Filter { must: cs, ..Default::default() }),
        })),
        FilterExpr::Group(group) => match group.logic {
            Logic::Or => or_group_condition(schema, group),
            Logic::And => {
                let mut nested = Filter::default();
                for child in &group.children {
                    add_to_buckets(schema, child, &mut nested)?;
                }
                if nested.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Condition::nested(nested)))
                }
            }
        },
    }
}

enum Translated {
    /// A positive condition for the `must` bucket.
    Match(Condition),
    /// A positive condition whose containing bucket must be negated.
    Negated(Condition),
    /// An AND of singleton conditions (`contains_all` expansion).
    All(Vec<Condition>),
}

fn translate_condition(
    schema: &RecordSchema,
    cond: &FilterCondition,
) -> Result<Option<Translated>> {
    // Null values drop the condition entirely.
    if cond.value.is_null() {
        return Ok(None);
    }
    let declared = schema.field(&cond.field).map(|f| &f.kind);
    check_legality(&cond.field, cond.op, declared)?;

    let field = cond.field.as_str();
    let value = &cond.value;
    let translated = match cond.op {
        Operator::Eq | Operator::Contains => {
            Translated::Match(Condition::matches(field, value.clone()))
        }
        Operator::Ne => Translated::Negated(Condition::matches(field, value.clone())),
        Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
            let bound = value.as_f64().ok_or_else(|| Error::FilterValue {
                field: field.to_string(),
                reason: format!("operator '{}' requires a numeric value", cond.op.token()),
            })?;
            let range = match cond.op {
                Operator::Gt => Range { gt: Some(bound), ..Default::default() },
                Operator::Gte => Range { gte: Some(bound), ..Default::default() },
                Operator::Lt => Range { lt: Some(bound), ..Default::default() },
                _ => Range { lte: Some(bound), ..Default::default() },
            };
            Translated::Match(Condition::range(field, range))
        }
        Operator::In => Translated::Match(Condition::match_any(field, as_list(value))),
        Operator::NotIn => {
            let cast = cast_exclusion_list(field, declared, &as_list(value))?;
            Translated::Negated(Condition::match_except(field, cast))
        }
        Operator::ContainsAny => Translated::Match(Condition::match_any(field, as_list(value))),
        Operator::ContainsAll => Translated::All(
            as_list(value)
                .into_iter()
                .map(|item| Condition::matches(field, item))
                .collect(),
        ),
        Operator::IsEmpty => Translated::Match(Condition::is_empty(field)),
        Operator::IsNull => Translated::Match(Condition::is_null(field)),
        Operator::TextMatch => {
            let text = value.as_str().ok_or_else(|| Error::FilterValue {
                field: field.to_string(),
                reason: "'text_match' requires a string value".to_string(),
            })?;
            Translated::Match(Condition::text(field, text))
        }
        Operator::ValuesCount => {
            let bounds: CountBounds =
                serde_json::from_value(value.clone()).map_err(|_| Error::FilterValue {
                    field: field.to_string(),
                    reason: "'values_count' requires gt/gte/lt/lte bounds".to_string(),
                })?;
            if bounds == CountBounds::default() {
                return Err(Error::FilterValue {
                    field: field.to_string(),
                    reason: "'values_count' requires at least one bound".to_string(),
                });
            }
            Translated::Match(Condition::values_count(field, bounds))
        }
    };
    Ok(Some(translated))
}

/// Translation-time operator legality against the declared field kind.
/// Unknown fields pass unchecked; vector fields reject every operator, and
/// array-only operators reject declared scalars.
fn check_legality(field: &str, op: Operator, declared: Option<&FieldKind>) -> Result<()> {
    let Some(kind) = declared else { return Ok(()) };
    let illegal = match kind {
        FieldKind::DenseVector { .. } | FieldKind::SparseVector => true,
        FieldKind::Scalar(_) => matches!(
            op,
            Operator::Contains
                | Operator::ContainsAny
                | Operator::ContainsAll
                | Operator::ValuesCount
        ),
        FieldKind::Array(_) => false,
    };
    if illegal {
        return Err(Error::UnsupportedOperator {
            op: op.token().to_string(),
            field: field.to_string(),
        });
    }
    Ok(())
}

fn as_list(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

/// Cast an exclusion list to the field's declared scalar kind. The negated
/// match representation is type-sensitive, and float exclusion is not
/// expressible at all.
fn cast_exclusion_list(
    field: &str,
    declared: Option<&FieldKind>,
    values: &[Value],
) -> Result<Vec<Value>> {
    let declared_kind = match declared {
        Some(FieldKind::Scalar(k)) | Some(FieldKind::Array(k)) => Some(*k),
        _ => None,
    };
    let kind = declared_kind.or_else(|| values.first().map(infer_kind));
    match kind {
        Some(ScalarKind::Float) => Err(Error::FloatExclusion(field.to_string())),
        Some(ScalarKind::Integer) => values
            .iter()
            .map(|v| cast_integer(field, v))
            .collect::<Result<Vec<Value>>>(),
        Some(ScalarKind::Keyword) => Ok(values
            .iter()
            .map(|v| match v {
                Value::String(_) => v.clone(),
                other => Value::String(other.to_string()),
            })
            .collect()),
        Some(ScalarKind::Bool) => values
            .iter()
            .map(|v| {
                v.as_bool().map(Value::Bool).ok_or_else(|| Error::FilterValue {
                    field: field.to_string(),
                    reason: format!("cannot cast {} to bool", v),
                })
            })
            .collect(),
        None => Ok(values.to_vec()),
    }
}

fn cast_integer(field: &str, value: &Value) -> Result<Value> {
    if let Some(i) = value.as_i64() {
        return Ok(Value::from(i));
    }
    if let Value::String(s) = value {
        if let Ok(i) = s.parse::<i64>() {
            return Ok(Value::from(i));
        }
    }
    Err(Error::FilterValue {
        field: field.to_string(),
        reason: format!("cannot cast {} to integer", value),
    })
}

fn infer_kind(value: &Value) -> ScalarKind {
    match value {
        Value::Number(n) if n.as_i64().is_some() || n.as_u64().is_some() => ScalarKind::Integer,
        Value::Number(_) => ScalarKind::Float,
        Value::Bool(_) => ScalarKind::Bool,
        _ => ScalarKind::Keyword,
    }
}
