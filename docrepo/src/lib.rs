//! A typed repository layer over document stores.
//!
//! This crate is the entry point for users of docrepo. It re-exports the core types, the
//! derive macros and the storage backends.
//!
//! # Features
//!
//! - **Typed repositories** - one repository per document type, with query, paging, counting,
//!   insert, update, replace and delete operations in async and blocking form
//! - **Two ways to filter** - typed field constants checked at compile time, or dynamic
//!   filter and order strings checked against the document shape at run time
//! - **Identity and timestamps** - store-assigned identities and write timestamps maintained
//!   on every write
//! - **Multiple backends** - in-memory and MongoDB storage behind one backend trait
//!
//! # Quick Start
//!
//! ```ignore
//! use docrepo::{memory::InMemoryStore, prelude::*};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Embedded)]
//! pub struct Address {
//!     pub street: String,
//!     pub zipcode: String,
//! }
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! #[document(collection = "restaurants")]
//! pub struct Restaurant {
//!     pub id: Option<String>,
//!     pub modified_on: Option<bson::DateTime>,
//!     pub name: String,
//!     pub borough: String,
//!     pub address: Address,
//! }
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = DocumentStore::new(InMemoryStore::new());
//!     let restaurants = store.repository::<Restaurant>();
//!
//!     let inserted = restaurants.insert_one(Restaurant {
//!         id: None,
//!         modified_on: None,
//!         name: "Dominick's #1".into(),
//!         borough: "Bronx".into(),
//!         address: Address { street: "Arthur Avenue".into(), zipcode: "10458".into() },
//!     }).await?;
//!
//!     // Typed criteria
//!     let bronx = restaurants
//!         .find(Restaurant::BOROUGH.eq("Bronx").and(Restaurant::NAME.starts_with("Dom")))
//!         .await?;
//!
//!     // The same filter as a string
//!     let same = restaurants
//!         .find_str_ordered("Borough = \"Bronx\" && Name.StartsWith(\"Dom\")", "Name desc")
//!         .await?;
//!
//!     restaurants
//!         .update_by_id(inserted.id.as_ref().unwrap(), Update::new().set(Restaurant::BOROUGH, "Queens"))
//!         .await?;
//!
//!     store.shutdown().await
//! }
//! ```
//!
//! # Blocking use
//!
//! [`BlockingDocumentStore`](blocking::BlockingDocumentStore) wraps a store with its own
//! runtime and exposes every repository operation as a blocking call.
//!
//! # Backends
//!
//! - [`memory`] - In-process storage for development and testing
//! - `mongodb` - MongoDB storage (requires the `mongodb` feature)

pub mod prelude;

pub use docrepo_core::{
    backend, binding, blocking, codec, collection, criteria, document, dynamic, error, eval, field, page,
    query, repository, schema, store, update,
};

pub use docrepo_macros::{Document, Embedded};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend.
pub mod memory {
    pub use docrepo_memory::{InMemoryStore, InMemoryStoreBuilder, MemoryStoreError};
}

/// MongoDB storage backend.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docrepo_mongodb::{DATABASE_ENV, MongoDbStore, MongoDbStoreBuilder, URI_ENV};
}
