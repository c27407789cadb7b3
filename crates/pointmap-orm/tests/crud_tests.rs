mod common;

use common::{document, Document};
use serde_json::{json, Map, Value};

use pointmap_core::error::Error;
use pointmap_core::filter::field;
use pointmap_engine::memory::MemoryEngine;
use pointmap_orm::{crud, Session};

fn updates(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

#[tokio::test]
async fn bulk_insert_commits_in_batches() -> anyhow::Result<()> {
    let mut session = Session::new(MemoryEngine::new());
    let mut records: Vec<Document> = (0..25)
        .map(|i| {
            document(
                &format!("doc{}", i),
                &format!("Title {}", i),
                "books",
                10.0 + i as f64,
                [1.0, 0.0, 0.0],
            )
        })
        .collect();
    crud::bulk_insert(&mut session, &mut records, 10).await?;
    assert_eq!(session.engine().point_count("documents"), 25);
    assert_eq!(session.pending_len(), 0);
    Ok(())
}

#[tokio::test]
async fn delete_by_filter_removes_every_match() -> anyhow::Result<()> {
    let mut session = Session::new(MemoryEngine::new());
    let mut records = vec![
        document("a", "A", "books", 10.0, [1.0, 0.0, 0.0]),
        document("b", "B", "games", 20.0, [0.0, 1.0, 0.0]),
        document("c", "C", "books", 30.0, [0.0, 0.0, 1.0]),
    ];
    crud::bulk_insert(&mut session, &mut records, 100).await?;

    let deleted =
        crud::delete_by_filter::<Document, _>(&mut session, vec![field("category").eq("books")])
            .await?;
    assert_eq!(deleted, 2);
    assert_eq!(session.engine().point_count("documents"), 1);
    Ok(())
}

#[tokio::test]
async fn update_by_filter_rewrites_matches_and_validates_keys() -> anyhow::Result<()> {
    let mut session = Session::new(MemoryEngine::new());
    let mut records = vec![
        document("a", "A", "books", 10.0, [1.0, 0.0, 0.0]),
        document("b", "B", "books", 20.0, [0.0, 1.0, 0.0]),
        document("c", "C", "games", 30.0, [0.0, 0.0, 1.0]),
    ];
    crud::bulk_insert(&mut session, &mut records, 100).await?;

    let updated = crud::update_by_filter::<Document, _>(
        &mut session,
        &updates(&[("category", json!("clearance"))]),
        vec![field("category").eq("books")],
    )
    .await?;
    assert_eq!(updated, 2);
    let clearance = session
        .query::<Document>()
        .filter(field("category").eq("clearance"))
        .count()
        .await?;
    assert_eq!(clearance, 2);

    let result = crud::update_by_filter::<Document, _>(
        &mut session,
        &updates(&[("no_such_field", json!(1))]),
        vec![],
    )
    .await;
    assert!(matches!(result, Err(Error::UnknownField { .. })));
    Ok(())
}

#[tokio::test]
async fn get_or_create_only_creates_once() -> anyhow::Result<()> {
    let mut session = Session::new(MemoryEngine::new());
    let matchers = updates(&[("id", json!("d1")), ("title", json!("Dune"))]);
    let defaults = updates(&[
        ("category", json!("books")),
        ("price", json!(15.0)),
        ("embedding", json!([0.0, 1.0, 0.0])),
    ]);

    let (created, was_created) =
        crud::get_or_create::<Document, _>(&mut session, &matchers, &defaults).await?;
    assert!(was_created);
    assert_eq!(created.title, "Dune");

    let (found, was_created) =
        crud::get_or_create::<Document, _>(&mut session, &matchers, &defaults).await?;
    assert!(!was_created);
    assert_eq!(found.id.as_deref(), Some("d1"));
    assert_eq!(session.engine().point_count("documents"), 1);
    Ok(())
}

#[tokio::test]
async fn update_or_create_overwrites_existing_records() -> anyhow::Result<()> {
    let mut session = Session::new(MemoryEngine::new());
    let mut record = document("d1", "Dune", "books", 15.0, [0.0, 1.0, 0.0]);
    session.add(&mut record)?;
    session.commit().await?;

    let matchers = updates(&[("id", json!("d1"))]);
    let (updated, was_created) = crud::update_or_create::<Document, _>(
        &mut session,
        &matchers,
        &updates(&[("price", json!(12.5))]),
    )
    .await?;
    assert!(!was_created);
    assert_eq!(updated.price, 12.5);

    let reloaded: Document = session.get("d1").await?.expect("record present");
    assert_eq!(reloaded.price, 12.5);
    Ok(())
}
