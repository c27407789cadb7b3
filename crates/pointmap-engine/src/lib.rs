pub mod grammar;
pub mod ident;
pub mod memory;
pub mod point;
pub mod request;
pub mod traits;

pub use point::{NamedVectors, Payload, Point, PointId, ScoredPoint, SparseVector, VectorData};
pub use traits::VectorEngine;
