//! Storage backend abstraction for repositories.
//!
//! A [`StoreBackend`] stores BSON documents in named collections and evaluates resolved
//! [`StoreQuery`] values. Everything typed (field resolution, identity conversion, timestamps,
//! collection naming) happens above this trait, so a backend only deals in stored paths and
//! store-native `_id` values.
//!
//! # Examples
//!
//! ```ignore
//! use docrepo::backend::StoreBackend;
//! use docrepo::query::{Filter, StoreQuery};
//! use bson::doc;
//!
//! let backend = InMemoryStore::new();
//! let ids = backend.insert_many(vec![doc! { "name": "Ludo Cafe" }], "restaurants").await?;
//! let found = backend
//!     .find(StoreQuery::builder().filter(Filter::eq("_id", ids[0].clone())).build(), "restaurants")
//!     .await?;
//! assert_eq!(found.len(), 1);
//! ```

use async_trait::async_trait;
use bson::{Bson, Document as BsonDocument};
use std::fmt::Debug;

use crate::{
    error::DocumentStoreResult,
    query::{Expr, StoreQuery},
    update::UpdateSpec,
};

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// Implementations must support concurrent calls from multiple async tasks.
///
/// # Error Handling
///
/// Native failures are wrapped, never swallowed: write failures as
/// [`DocumentStoreError::Write`](crate::error::DocumentStoreError::Write) and everything else as
/// [`DocumentStoreError::Backend`](crate::error::DocumentStoreError::Backend), keeping the native
/// error as the source.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Returns `false` if this backend cannot evaluate `filter` natively.
    ///
    /// Queries with unsupported filters are evaluated on the client side instead.
    fn supports(&self, filter: &Expr) -> bool {
        let _ = filter;
        true
    }

    /// Returns the documents matching `query`, filtered then sorted then windowed.
    ///
    /// Without sort keys documents come back in arrival order.
    async fn find(&self, query: StoreQuery, collection: &str) -> DocumentStoreResult<Vec<BsonDocument>>;

    /// Counts the documents matching `filter`, or all documents.
    async fn count(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64>;

    /// Inserts documents as one batch and returns their `_id` values in input order.
    ///
    /// Documents without `_id` get a store-assigned one. The collection is created on demand.
    ///
    /// # Errors
    ///
    /// Fails with a write error if any `_id` already exists. Whether earlier documents of the
    /// batch remain inserted is backend-specific.
    async fn insert_many(&self, documents: Vec<BsonDocument>, collection: &str) -> DocumentStoreResult<Vec<Bson>>;

    /// Applies `update` to every document matching `filter`, or all documents.
    ///
    /// Returns whether the store acknowledged the write, not whether anything matched.
    async fn update_many(
        &self,
        filter: Option<Expr>,
        update: UpdateSpec,
        collection: &str,
    ) -> DocumentStoreResult<bool>;

    /// Replaces the first document matching `filter` wholesale, keeping its `_id`.
    ///
    /// Returns `true` if a document matched.
    async fn replace_one(
        &self,
        filter: Expr,
        replacement: BsonDocument,
        collection: &str,
    ) -> DocumentStoreResult<bool>;

    /// Deletes the first document matching `filter`. Returns whether the store acknowledged it.
    async fn delete_one(&self, filter: Expr, collection: &str) -> DocumentStoreResult<bool>;

    /// Deletes every document matching `filter`, or all documents.
    async fn delete_many(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<bool>;

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()>;

    /// Drops a collection and all its documents. Dropping a missing collection is not an error.
    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()>;

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>>;

    /// Releases connections and other resources.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend,
{
    fn supports(&self, filter: &Expr) -> bool {
        (*self).supports(filter)
    }

    async fn find(&self, query: StoreQuery, collection: &str) -> DocumentStoreResult<Vec<BsonDocument>> {
        (*self).find(query, collection).await
    }

    async fn count(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64> {
        (*self).count(filter, collection).await
    }

    async fn insert_many(&self, documents: Vec<BsonDocument>, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        (*self).insert_many(documents, collection).await
    }

    async fn update_many(
        &self,
        filter: Option<Expr>,
        update: UpdateSpec,
        collection: &str,
    ) -> DocumentStoreResult<bool> {
        (*self)
            .update_many(filter, update, collection)
            .await
    }

    async fn replace_one(
        &self,
        filter: Expr,
        replacement: BsonDocument,
        collection: &str,
    ) -> DocumentStoreResult<bool> {
        (*self)
            .replace_one(filter, replacement, collection)
            .await
    }

    async fn delete_one(&self, filter: Expr, collection: &str) -> DocumentStoreResult<bool> {
        (*self).delete_one(filter, collection).await
    }

    async fn delete_many(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<bool> {
        (*self).delete_many(filter, collection).await
    }

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        (*self).create_collection(name).await
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        (*self).drop_collection(name).await
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        (*self).list_collections().await
    }
}

/// Factory for backends that need asynchronous setup, such as opening a connection.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
