//! In-memory document storage backend for docrepo.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is meant for development,
//! testing and small datasets.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Arrival order** - Unsorted queries return documents in insertion order
//! - **Full query support** - Filtering, stable multi-key sorting and paging
//! - **Configurable operator support** - Operators can be reported as unsupported to exercise
//!   client-side evaluation
//!
//! # Quick Start
//!
//! ```ignore
//! use docrepo::{memory::InMemoryStore, prelude::*};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(InMemoryStore::new());
//!     let users = store.repository::<User>();
//!
//!     let alice = users.insert_one(User::new("Alice")).await?;
//!     assert!(alice.id.is_some());
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrepo_memory;

pub mod error;
pub mod store;

pub use error::MemoryStoreError;
pub use store::{InMemoryStore, InMemoryStoreBuilder};
