//! Convenient re-exports of commonly used types from docrepo.
//!
//! ```ignore
//! use docrepo::prelude::*;
//! ```
//!
//! This provides access to:
//! - The document contract and its derive macros
//! - Stores, repositories and their blocking forms
//! - Typed fields, criteria, updates and pages
//! - Error types

pub use docrepo_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    binding::CollectionRegistry,
    blocking::{BlockingDocumentStore, BlockingRepository},
    collection::Collection,
    criteria::{Criteria, CriteriaBuilder},
    document::{Document, DocumentKey},
    error::{DocumentStoreError, DocumentStoreResult},
    field::{Field, FieldValue, Nested, OrderBy, Predicate, TextField},
    page::{Page, PageWindow},
    query::{Expr, FieldOp, Filter, Sort, SortDirection, StoreQuery},
    repository::Repository,
    schema::Shape,
    store::DocumentStore,
    update::Update,
};
pub use docrepo_memory::InMemoryStore;
pub use docrepo_macros::{Document, Embedded};
pub use serde::{Deserialize, Serialize};
