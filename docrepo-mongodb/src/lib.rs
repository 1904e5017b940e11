//! MongoDB backend for docrepo.
//!
//! Filters, sorts, paging and updates are translated into MongoDB query syntax and executed
//! by the server, so this backend never needs client-side evaluation.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docrepo = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! Connection settings come either from the builder arguments or from the environment
//! (`DOCREPO_MONGODB_URI` and `DOCREPO_MONGODB_DATABASE`).
//!
//! # Example
//!
//! ```ignore
//! use docrepo::{backend::StoreBackendBuilder, mongodb::MongoDbStoreBuilder, store::DocumentStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::connect(MongoDbStoreBuilder::from_env()?, Default::default()).await?;
//!     let restaurants = store.repository::<Restaurant>();
//!     println!("{}", restaurants.count().await?);
//!
//!     store.shutdown().await?;
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrepo_mongodb;

mod query;
mod sanitizer;
pub mod store;

pub use store::{DATABASE_ENV, MongoDbStore, MongoDbStoreBuilder, URI_ENV};
