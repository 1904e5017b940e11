//! Main document store interface.
//!
//! A [`DocumentStore`] owns a backend and the [`CollectionRegistry`] that binds document types
//! to collections, and hands out [`Repository`] and [`Collection`] handles borrowing both.
//!
//! # Example
//!
//! ```ignore
//! use docrepo::{memory::InMemoryStore, store::DocumentStore};
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! let restaurants = store.repository::<Restaurant>();
//! let inserted = restaurants.insert_one(restaurant).await?;
//! ```

use crate::{
    backend::{StoreBackend, StoreBackendBuilder},
    binding::CollectionRegistry,
    collection::Collection,
    document::Document,
    error::DocumentStoreResult,
    repository::Repository,
};

/// A document store bound to a specific backend implementation.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
    registry: CollectionRegistry,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with the given backend and an empty registry.
    pub fn new(backend: B) -> Self {
        Self::with_registry(backend, CollectionRegistry::new())
    }

    pub fn with_registry(backend: B, registry: CollectionRegistry) -> Self {
        Self { backend, registry }
    }

    /// Builds the backend, then the store around it.
    ///
    /// # Errors
    ///
    /// Returns the builder's error, typically [`DocumentStoreError::Initialization`](crate::error::DocumentStoreError::Initialization).
    pub async fn connect<Builder>(builder: Builder, registry: CollectionRegistry) -> DocumentStoreResult<Self>
    where
        Builder: StoreBackendBuilder<Backend = B>,
    {
        Ok(Self::with_registry(builder.build().await?, registry))
    }

    /// A repository for `D`, bound to the collection the registry resolves for it.
    pub fn repository<D: Document>(&self) -> Repository<'_, D, B> {
        Repository::new(Collection::new(self.registry.resolve::<D>(None), &self.backend))
    }

    /// A repository for `D` bound to an explicitly named collection.
    pub fn repository_named<D: Document>(&self, collection: &str) -> Repository<'_, D, B> {
        Repository::new(Collection::new(
            self.registry.resolve::<D>(Some(collection)),
            &self.backend,
        ))
    }

    /// Gets an untyped collection with the given name.
    pub fn collection(&self, name: &str) -> Collection<'_, B> {
        Collection::new(name, &self.backend)
    }

    pub fn registry(&self) -> &CollectionRegistry {
        &self.registry
    }

    pub async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.backend.create_collection(name).await
    }

    /// Drops a collection and every document in it.
    pub async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.backend.drop_collection(name).await
    }

    pub async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        self.backend.list_collections().await
    }

    /// Gets a reference to the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Shuts down the store and releases the backend's resources.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await
    }
}
