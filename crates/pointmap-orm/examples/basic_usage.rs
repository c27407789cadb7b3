use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use pointmap_core::filter::field;
use pointmap_core::model::Model;
use pointmap_core::schema::{Distance, FieldDescriptor, RecordSchema, ScalarKind};
use pointmap_engine::memory::MemoryEngine;
use pointmap_orm::Session;

// Insert a few records into the in-memory engine and run the basic query
// modes: filtered enumeration, vector search, point lookup, count.
// Usage:
//   cargo run -p pointmap-orm --example basic_usage

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Article {
    id: Option<String>,
    title: String,
    category: String,
    rating: f64,
    #[serde(default)]
    tags: Vec<String>,
    embedding: Option<Vec<f32>>,
}

static SCHEMA: OnceLock<RecordSchema> = OnceLock::new();

impl Model for Article {
    fn schema() -> &'static RecordSchema {
        SCHEMA.get_or_init(|| {
            RecordSchema::builder("articles")
                .field(FieldDescriptor::keyword("id").primary_key())
                .field(FieldDescriptor::keyword("title"))
                .field(FieldDescriptor::keyword("category"))
                .field(FieldDescriptor::float("rating"))
                .field(FieldDescriptor::array("tags", ScalarKind::Keyword))
                .field(FieldDescriptor::dense_vector("embedding", 3, Distance::Cosine))
                .build()
                .expect("article schema")
        })
    }
}

fn article(id: &str, title: &str, category: &str, rating: f64, embedding: [f32; 3]) -> Article {
    Article {
        id: Some(id.to_string()),
        title: title.to_string(),
        category: category.to_string(),
        rating,
        tags: Vec::new(),
        embedding: Some(embedding.to_vec()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut session = Session::new(MemoryEngine::new());

    let mut articles = vec![
        article("a1", "Borrow checker field notes", "rust", 4.6, [1.0, 0.1, 0.0]),
        article("a2", "Drip irrigation for small gardens", "home", 4.1, [0.0, 1.0, 0.2]),
        article("a3", "Async executors compared", "rust", 4.8, [0.9, 0.2, 0.1]),
    ];
    for a in &mut articles {
        session.add(a)?;
    }
    session.commit().await?;

    println!("pointmap basic usage\n====================");

    let rust_articles = session
        .query::<Article>()
        .filter(field("category").eq("rust").and(field("rating").gte(4.5)))
        .all()
        .await?;
    println!("\nHighly rated rust articles:");
    for a in &rust_articles {
        println!("  {} ({:.1})", a.title, a.rating);
    }

    let nearest = session
        .query::<Article>()
        .vector_search("embedding", vec![1.0, 0.0, 0.0])
        .limit(2)
        .all()
        .await?;
    println!("\nNearest to [1, 0, 0]:");
    for a in &nearest {
        println!("  score={:.3} {}", a.score.unwrap_or_default(), a.title);
    }

    let one: Option<Article> = session.get("a2").await?;
    println!("\nPoint lookup a2: {:?}", one.map(|a| a.title));

    let total = session.query::<Article>().count().await?;
    println!("Total articles: {}", total);

    Ok(())
}
