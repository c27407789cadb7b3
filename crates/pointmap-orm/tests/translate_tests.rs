use serde_json::{json, Value};

use pointmap_core::error::Error;
use pointmap_core::filter::{field, CountRange};
use pointmap_core::schema::{Distance, FieldDescriptor, RecordSchema, ScalarKind};
use pointmap_engine::grammar::{Condition, FieldCondition, Match};
use pointmap_orm::build_filter;

fn schema() -> RecordSchema {
    RecordSchema::builder("products")
        .field(FieldDescriptor::keyword("id").primary_key())
        .field(FieldDescriptor::keyword("category"))
        .field(FieldDescriptor::integer("stock"))
        .field(FieldDescriptor::float("price"))
        .field(FieldDescriptor::boolean("in_stock"))
        .field(FieldDescriptor::array("tags", ScalarKind::Keyword))
        .field(FieldDescriptor::dense_vector("embedding", 4, Distance::Cosine))
        .build()
        .expect("schema")
}

fn match_of(condition: &Condition) -> &Match {
    match condition {
        Condition::Field(FieldCondition { r#match: Some(m), .. }) => m,
        other => panic!("expected a match condition, got {:?}", other),
    }
}

#[test]
fn single_equality_populates_only_must() {
    let filter = build_filter(&schema(), &[field("category").eq("books")])
        .expect("translation")
        .expect("non-empty filter");
    assert_eq!(filter.must.len(), 1);
    assert!(filter.must_not.is_empty());
    assert!(filter.should.is_empty());
    match &filter.must[0] {
        Condition::Field(fc) => {
            assert_eq!(fc.key, "category");
            assert_eq!(fc.r#match, Some(Match::Value { value: json!("books") }));
        }
        other => panic!("expected a field condition, got {:?}", other),
    }
}

#[test]
fn not_in_on_integer_field_is_one_except_in_must_not() {
    let filter = build_filter(&schema(), &[field("stock").not_in([1, 2, 3])])
        .expect("translation")
        .expect("non-empty filter");
    assert!(filter.must.is_empty());
    assert_eq!(filter.must_not.len(), 1);
    assert_eq!(
        match_of(&filter.must_not[0]),
        &Match::Except { except: vec![json!(1), json!(2), json!(3)] }
    );
}

#[test]
fn not_in_on_float_field_raises_a_capability_error() {
    let result = build_filter(&schema(), &[field("price").not_in([9.99, 19.99])]);
    match result {
        Err(Error::FloatExclusion(name)) => assert_eq!(name, "price"),
        other => panic!("expected FloatExclusion, got {:?}", other),
    }
}

#[test]
fn not_in_casts_to_the_declared_keyword_kind() {
    let filter = build_filter(&schema(), &[field("category").not_in([json!(5), json!("books")])])
        .expect("translation")
        .expect("non-empty filter");
    assert_eq!(
        match_of(&filter.must_not[0]),
        &Match::Except { except: vec![json!("5"), json!("books")] }
    );
}

#[test]
fn not_in_on_unknown_field_infers_from_the_first_value() {
    let result = build_filter(&schema(), &[field("rating").not_in([json!(1.5)])]);
    assert!(matches!(result, Err(Error::FloatExclusion(_))));

    let filter = build_filter(&schema(), &[field("rating").not_in([json!(1), json!(2)])])
        .expect("translation")
        .expect("non-empty filter");
    assert_eq!(filter.must_not.len(), 1);
}

#[test]
fn null_valued_conditions_are_skipped_entirely() {
    let exprs = [field("category").eq(Value::Null)];
    assert!(build_filter(&schema(), &exprs).expect("translation").is_none());

    // One live condition keeps the filter; the null one leaves no trace.
    let exprs = [field("category").eq(Value::Null), field("stock").gt(0)];
    let filter = build_filter(&schema(), &exprs).expect("translation").expect("filter");
    assert_eq!(filter.must.len(), 1);
    assert!(filter.must_not.is_empty());
}

#[test]
fn no_filters_translate_to_no_filter() {
    assert!(build_filter(&schema(), &[]).expect("translation").is_none());
}

#[test]
fn ordering_operators_become_ranges() {
    let filter = build_filter(
        &schema(),
        &[field("price").gte(10), field("price").lt(20)],
    )
    .expect("translation")
    .expect("filter");
    assert_eq!(filter.must.len(), 2);
    match &filter.must[0] {
        Condition::Field(fc) => {
            let range = fc.range.expect("range");
            assert_eq!(range.gte, Some(10.0));
            assert_eq!(range.lt, None);
        }
        other => panic!("expected a range condition, got {:?}", other),
    }
}

#[test]
fn in_becomes_match_any() {
    let filter = build_filter(&schema(), &[field("category").is_in(["books", "games"])])
        .expect("translation")
        .expect("filter");
    assert_eq!(
        match_of(&filter.must[0]),
        &Match::Any { any: vec![json!("books"), json!("games")] }
    );
}

#[test]
fn contains_all_expands_into_one_must_per_element() {
    let filter = build_filter(&schema(), &[field("tags").contains_all(["rust", "search"])])
        .expect("translation")
        .expect("filter");
    assert_eq!(filter.must.len(), 2);
    assert_eq!(match_of(&filter.must[0]), &Match::Value { value: json!("rust") });
    assert_eq!(match_of(&filter.must[1]), &Match::Value { value: json!("search") });
}

#[test]
fn or_group_is_one_nested_alternative() {
    let expr = field("category").eq("books").or(field("category").eq("games"));
    let filter = build_filter(&schema(), &[expr]).expect("translation").expect("filter");
    assert_eq!(filter.must.len(), 1);
    match &filter.must[0] {
        Condition::Nested { filter: nested } => {
            assert_eq!(nested.should.len(), 2);
            assert!(nested.must.is_empty());
        }
        other => panic!("expected a nested filter, got {:?}", other),
    }
}

#[test]
fn and_group_distributes_over_buckets() {
    let expr = field("category").eq("books").and(field("stock").not_in([0]));
    let filter = build_filter(&schema(), &[expr]).expect("translation").expect("filter");
    assert_eq!(filter.must.len(), 1);
    assert_eq!(filter.must_not.len(), 1);
}

#[test]
fn two_level_nesting_translates_recursively() {
    // category == "books" AND (stock > 0 OR in_stock == true)
    let expr = field("category")
        .eq("books")
        .and(field("stock").gt(0).or(field("in_stock").eq(true)));
    let filter = build_filter(&schema(), &[expr]).expect("translation").expect("filter");
    assert_eq!(filter.must.len(), 2);
    let nested = filter
        .must
        .iter()
        .find_map(|c| match c {
            Condition::Nested { filter } => Some(filter),
            _ => None,
        })
        .expect("nested or-group");
    assert_eq!(nested.should.len(), 2);
}

#[test]
fn negation_inside_an_or_group_nests_a_must_not() {
    let expr = field("category").ne("books").or(field("stock").gt(10));
    let filter = build_filter(&schema(), &[expr]).expect("translation").expect("filter");
    let alternatives = match &filter.must[0] {
        Condition::Nested { filter } => &filter.should,
        other => panic!("expected a nested filter, got {:?}", other),
    };
    assert!(alternatives.iter().any(|c| matches!(
        c,
        Condition::Nested { filter } if filter.must_not.len() == 1
    )));
}

#[test]
fn specialized_operators_map_to_their_native_conditions() {
    let filter = build_filter(
        &schema(),
        &[
            field("category").is_empty(),
            field("category").is_null(),
            field("category").matches_text("gaming laptop"),
            field("tags").values_count(CountRange { gt: Some(2), ..Default::default() }),
        ],
    )
    .expect("translation")
    .expect("filter");
    assert_eq!(filter.must.len(), 4);
    assert!(matches!(&filter.must[0], Condition::IsEmpty { is_empty } if is_empty.key == "category"));
    assert!(matches!(&filter.must[1], Condition::IsNull { is_null } if is_null.key == "category"));
    assert!(matches!(&filter.must[2], Condition::Field(fc)
        if fc.r#match == Some(Match::Text { text: "gaming laptop".to_string() })));
    assert!(matches!(&filter.must[3], Condition::Field(fc)
        if fc.values_count.is_some_and(|b| b.gt == Some(2))));
}

#[test]
fn values_count_requires_at_least_one_bound() {
    let result = build_filter(&schema(), &[field("tags").values_count(CountRange::default())]);
    assert!(matches!(result, Err(Error::FilterValue { .. })));
}

#[test]
fn array_operators_on_scalar_fields_are_unsupported() {
    let result = build_filter(&schema(), &[field("category").contains("books")]);
    match result {
        Err(Error::UnsupportedOperator { op, field }) => {
            assert_eq!(op, "contains");
            assert_eq!(field, "category");
        }
        other => panic!("expected UnsupportedOperator, got {:?}", other),
    }
}

#[test]
fn any_operator_on_a_vector_field_is_unsupported() {
    let result = build_filter(&schema(), &[field("embedding").eq("x")]);
    assert!(matches!(result, Err(Error::UnsupportedOperator { .. })));
}

#[test]
fn contains_on_array_field_is_an_exact_match_in_must() {
    let filter = build_filter(&schema(), &[field("tags").contains("rust")])
        .expect("translation")
        .expect("filter");
    assert_eq!(filter.must.len(), 1);
    assert_eq!(match_of(&filter.must[0]), &Match::Value { value: json!("rust") });
}
