//! Object-mapping layer for an external vector-search engine.
//!
//! Records are serde structs tied to a [`pointmap_core::schema::RecordSchema`];
//! a [`Session`] buffers inserts and deletes as a unit of work, and the fluent
//! [`Query`] builder translates declarative filters into the engine's native
//! grammar, dispatches one of the retrieval modes, and maps points back into
//! records.

pub mod crud;
pub mod fusion;
pub mod query;
pub mod session;
pub mod translate;

pub use fusion::CombinedSearch;
pub use query::{Query, Scored};
pub use session::Session;
pub use translate::build_filter;
