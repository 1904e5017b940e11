//! A typed repository layer over document stores.
//!
//! This crate is the core of the docrepo project and provides:
//!
//! - **Document contract** ([`document`], [`schema`], [`codec`]) - identity, modification
//!   timestamp, shape and the stored representation of documents
//! - **Criteria** ([`criteria`], [`field`], [`dynamic`]) - one immutable filter/sort/page
//!   representation, built either from typed field constants or from dynamic strings
//! - **Repositories** ([`repository`], [`blocking`]) - async and blocking query and mutation
//!   operations for a document type
//! - **Store backend abstraction** ([`backend`], [`collection`], [`eval`]) - the store
//!   capability, with client-side evaluation for predicates a store cannot run natively
//! - **Collection binding** ([`binding`]) - which collection each document type lives in
//! - **Error handling** ([`error`])
//!
//! # Example
//!
//! ```ignore
//! use docrepo::prelude::*;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! #[document(collection = "restaurants")]
//! pub struct Restaurant {
//!     pub id: Option<String>,
//!     pub modified_on: Option<bson::DateTime>,
//!     pub borough: String,
//!     pub name: String,
//! }
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! let repo = store.repository::<Restaurant>();
//! let found = repo
//!     .find(Restaurant::BOROUGH.eq("Manhattan").and(Restaurant::NAME.contains("Do")))
//!     .await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrepo_core;

pub mod backend;
pub mod binding;
pub mod blocking;
pub mod codec;
pub mod collection;
pub mod criteria;
pub mod document;
pub mod dynamic;
pub mod error;
pub mod eval;
pub mod field;
mod lexer;
pub mod page;
pub mod query;
pub mod repository;
mod resolve;
pub mod schema;
pub mod store;
pub mod update;

pub use bson;
