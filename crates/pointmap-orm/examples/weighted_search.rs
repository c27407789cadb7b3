use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use pointmap_core::filter::field;
use pointmap_core::model::Model;
use pointmap_core::schema::{Distance, FieldDescriptor, RecordSchema};
use pointmap_engine::memory::MemoryEngine;
use pointmap_orm::{CombinedSearch, Session};

// Weighted multi-vector fusion over two embedding fields.
// Usage:
//   cargo run -p pointmap-orm --example weighted_search

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Product {
    id: Option<String>,
    name: String,
    category: String,
    image_embedding: Option<Vec<f32>>,
    text_embedding: Option<Vec<f32>>,
}

static SCHEMA: OnceLock<RecordSchema> = OnceLock::new();

impl Model for Product {
    fn schema() -> &'static RecordSchema {
        SCHEMA.get_or_init(|| {
            RecordSchema::builder("products")
                .field(FieldDescriptor::keyword("id").primary_key())
                .field(FieldDescriptor::keyword("name"))
                .field(FieldDescriptor::keyword("category"))
                .field(FieldDescriptor::dense_vector("image_embedding", 4, Distance::Cosine))
                .field(FieldDescriptor::dense_vector("text_embedding", 4, Distance::Cosine))
                .build()
                .expect("product schema")
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut session = Session::new(MemoryEngine::new());

    let catalog = [
        ("p1", "Mechanical keyboard", "electronics", [0.9, 0.1, 0.0, 0.0], [0.7, 0.3, 0.0, 0.0]),
        ("p2", "Ergonomic mouse", "electronics", [0.8, 0.2, 0.1, 0.0], [0.2, 0.8, 0.0, 0.0]),
        ("p3", "Walnut desk organizer", "home", [0.1, 0.9, 0.0, 0.0], [0.1, 0.2, 0.9, 0.0]),
        ("p4", "Monitor lamp", "electronics", [0.5, 0.5, 0.0, 0.0], [0.6, 0.4, 0.1, 0.0]),
    ];
    for (id, name, category, image, text) in catalog {
        let mut product = Product {
            id: Some(id.to_string()),
            name: name.to_string(),
            category: category.to_string(),
            image_embedding: Some(image.to_vec()),
            text_embedding: Some(text.to_vec()),
        };
        session.add(&mut product)?;
    }
    session.commit().await?;

    println!("pointmap weighted multi-vector search\n=====================================");

    // Image similarity dominates, text refines the ranking.
    let combined = CombinedSearch::new()
        .field("image_embedding", 0.7, vec![1.0, 0.0, 0.0, 0.0])
        .field("text_embedding", 0.3, vec![0.8, 0.2, 0.0, 0.0])
        .limit(3);
    let results = session
        .query::<Product>()
        .filter(field("category").eq("electronics"))
        .combined_vector_search(combined)
        .all()
        .await?;

    println!("\nFused ranking (0.7 image / 0.3 text, electronics only):");
    for (i, p) in results.iter().enumerate() {
        println!("  {}. score={:.3} {}", i + 1, p.score.unwrap_or_default(), p.name);
    }

    Ok(())
}
