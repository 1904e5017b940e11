//! Blocking wrappers over the async store and repositories.
//!
//! [`BlockingDocumentStore`] owns a current-thread tokio runtime and drives the same async
//! operations to completion on it, so blocking and async calls go through one implementation
//! and return identical results for identical data.
//!
//! Blocking calls must not be made from inside an async runtime; tokio panics if they are.

use tokio::runtime::{Builder as RuntimeBuilder, Runtime};

use crate::{
    backend::{StoreBackend, StoreBackendBuilder},
    binding::CollectionRegistry,
    criteria::Criteria,
    document::Document,
    error::{DocumentStoreError, DocumentStoreResult},
    field::{Field, FieldValue, Predicate},
    page::Page,
    repository::Repository,
    store::DocumentStore,
    update::Update,
};

#[derive(Debug)]
pub struct BlockingDocumentStore<B: StoreBackend> {
    store: DocumentStore<B>,
    runtime: Runtime,
}

impl<B: StoreBackend> BlockingDocumentStore<B> {
    pub fn new(store: DocumentStore<B>) -> DocumentStoreResult<Self> {
        let runtime = runtime()?;

        Ok(Self { store, runtime })
    }

    /// Builds the backend on the store's own runtime.
    pub fn connect<Builder>(builder: Builder, registry: CollectionRegistry) -> DocumentStoreResult<Self>
    where
        Builder: StoreBackendBuilder<Backend = B>,
    {
        let runtime = runtime()?;
        let store = runtime.block_on(DocumentStore::connect(builder, registry))?;

        Ok(Self { store, runtime })
    }

    /// The async store this wraps.
    pub fn store(&self) -> &DocumentStore<B> {
        &self.store
    }

    /// Runs a future to completion on this store's runtime.
    pub fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    pub fn repository<D: Document>(&self) -> BlockingRepository<'_, D, B> {
        BlockingRepository { inner: self.store.repository(), runtime: &self.runtime }
    }

    pub fn repository_named<D: Document>(&self, collection: &str) -> BlockingRepository<'_, D, B> {
        BlockingRepository {
            inner: self.store.repository_named(collection),
            runtime: &self.runtime,
        }
    }

    pub fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        self.runtime.block_on(self.store.list_collections())
    }

    pub fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.runtime.block_on(self.store.drop_collection(name))
    }

    pub fn shutdown(self) -> DocumentStoreResult<()> {
        let Self { store, runtime } = self;
        runtime.block_on(store.shutdown())
    }
}

fn runtime() -> DocumentStoreResult<Runtime> {
    RuntimeBuilder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| DocumentStoreError::Initialization(format!("cannot start runtime: {err}")))
}

/// The blocking form of [`Repository`]. Every operation waits for the store's response.
#[derive(Debug)]
pub struct BlockingRepository<'a, D: Document, B: StoreBackend> {
    inner: Repository<'a, D, B>,
    runtime: &'a Runtime,
}

impl<'a, D: Document, B: StoreBackend> BlockingRepository<'a, D, B> {
    /// The async repository this wraps.
    pub fn as_async(&self) -> &Repository<'a, D, B> {
        &self.inner
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn query(&self, criteria: &Criteria<D>) -> DocumentStoreResult<Vec<D>> {
        self.runtime.block_on(self.inner.query(criteria))
    }

    pub fn get_by_id(&self, id: &D::Key) -> DocumentStoreResult<Option<D>> {
        self.runtime.block_on(self.inner.get_by_id(id))
    }

    pub fn to_list(&self) -> DocumentStoreResult<Vec<D>> {
        self.runtime.block_on(self.inner.to_list())
    }

    pub fn find(&self, criteria: impl Into<Criteria<D>>) -> DocumentStoreResult<Vec<D>> {
        self.runtime.block_on(self.inner.find(criteria))
    }

    pub fn find_str(&self, filter: &str) -> DocumentStoreResult<Vec<D>> {
        self.runtime.block_on(self.inner.find_str(filter))
    }

    pub fn find_str_ordered(&self, filter: &str, order: &str) -> DocumentStoreResult<Vec<D>> {
        self.runtime
            .block_on(self.inner.find_str_ordered(filter, order))
    }

    pub fn first_or_default(&self, criteria: impl Into<Criteria<D>>) -> DocumentStoreResult<Option<D>> {
        self.runtime
            .block_on(self.inner.first_or_default(criteria))
    }

    pub fn first_or_default_str(&self, filter: &str) -> DocumentStoreResult<Option<D>> {
        self.runtime
            .block_on(self.inner.first_or_default_str(filter))
    }

    pub fn last(&self, criteria: impl Into<Criteria<D>>) -> DocumentStoreResult<Option<D>> {
        self.runtime.block_on(self.inner.last(criteria))
    }

    pub fn last_str(&self, filter: &str) -> DocumentStoreResult<Option<D>> {
        self.runtime.block_on(self.inner.last_str(filter))
    }

    pub fn page(&self, criteria: impl Into<Criteria<D>>, page_number: u64, page_size: u64) -> DocumentStoreResult<Vec<D>> {
        self.runtime
            .block_on(self.inner.page(criteria, page_number, page_size))
    }

    pub fn page_str(&self, filter: &str, order: &str, page_number: u64, page_size: u64) -> DocumentStoreResult<Vec<D>> {
        self.runtime
            .block_on(self.inner.page_str(filter, order, page_number, page_size))
    }

    pub fn paginate(
        &self,
        criteria: impl Into<Criteria<D>>,
        page_number: u64,
        page_size: u64,
    ) -> DocumentStoreResult<Page<D>> {
        self.runtime
            .block_on(self.inner.paginate(criteria, page_number, page_size))
    }

    pub fn count(&self) -> DocumentStoreResult<usize> {
        self.runtime.block_on(self.inner.count())
    }

    pub fn count_where(&self, predicate: impl Into<Predicate<D>>) -> DocumentStoreResult<usize> {
        self.runtime.block_on(self.inner.count_where(predicate))
    }

    pub fn count_str(&self, filter: &str) -> DocumentStoreResult<usize> {
        self.runtime.block_on(self.inner.count_str(filter))
    }

    pub fn long_count(&self) -> DocumentStoreResult<u64> {
        self.runtime.block_on(self.inner.long_count())
    }

    pub fn long_count_where(&self, predicate: impl Into<Predicate<D>>) -> DocumentStoreResult<u64> {
        self.runtime
            .block_on(self.inner.long_count_where(predicate))
    }

    pub fn insert_one(&self, document: D) -> DocumentStoreResult<D> {
        self.runtime.block_on(self.inner.insert_one(document))
    }

    pub fn insert_many(&self, documents: Vec<D>) -> DocumentStoreResult<Vec<D>> {
        self.runtime.block_on(self.inner.insert_many(documents))
    }

    pub fn update_by_id(&self, id: &D::Key, update: Update<D>) -> DocumentStoreResult<bool> {
        self.runtime.block_on(self.inner.update_by_id(id, update))
    }

    pub fn update(&self, predicate: impl Into<Predicate<D>>, update: Update<D>) -> DocumentStoreResult<bool> {
        self.runtime.block_on(self.inner.update(predicate, update))
    }

    pub fn update_field<T: FieldValue>(
        &self,
        predicate: impl Into<Predicate<D>>,
        field: Field<D, T>,
        value: impl Into<T::Value>,
    ) -> DocumentStoreResult<bool> {
        self.runtime
            .block_on(self.inner.update_field(predicate, field, value))
    }

    pub fn replace_one(&self, document: &D) -> DocumentStoreResult<bool> {
        self.runtime.block_on(self.inner.replace_one(document))
    }

    pub fn delete(&self, document: &D) -> DocumentStoreResult<bool> {
        self.runtime.block_on(self.inner.delete(document))
    }

    pub fn delete_by_id(&self, id: &D::Key) -> DocumentStoreResult<bool> {
        self.runtime.block_on(self.inner.delete_by_id(id))
    }

    pub fn delete_many(&self, predicate: impl Into<Predicate<D>>) -> DocumentStoreResult<bool> {
        self.runtime.block_on(self.inner.delete_many(predicate))
    }
}
