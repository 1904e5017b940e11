//! In-memory storage implementation.
//!
//! Documents are kept per collection in insertion order, keyed by their `_id`. Queries are
//! evaluated with the core client-side evaluator, which sorts stably, so ties always keep
//! arrival order.

use std::{collections::HashMap, collections::HashSet, sync::Arc};

use async_trait::async_trait;
use bson::{Bson, DateTime, Document as BsonDocument, oid::ObjectId};
use indexmap::IndexMap;
use log::{debug, trace};
use mea::rwlock::RwLock;

use docrepo_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    eval,
    query::{Expr, FieldOp, StoreQuery},
    update::UpdateSpec,
};

use crate::error::MemoryStoreError;

type CollectionMap = IndexMap<String, BsonDocument>;
type StoreMap = HashMap<String, CollectionMap>;

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, so clones share the
/// same data. Every query scans the collection.
///
/// # Example
///
/// ```ignore
/// use docrepo_memory::InMemoryStore;
/// use docrepo::backend::StoreBackend;
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// let ids = store.insert_many(vec![doc! { "name": "Alice" }], "users").await?;
/// assert_eq!(store.count(None, "users").await?, 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> (`_id` key -> document), in insertion order
    store: Arc<RwLock<StoreMap>>,
    /// Operators reported as not natively supported.
    unsupported: Arc<HashSet<FieldOp>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store that evaluates every operator.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }
}

fn key_of(id: &Bson) -> String {
    id.to_string()
}

fn matching_keys<'a>(collection: &'a CollectionMap, filter: Option<&Expr>) -> impl Iterator<Item = &'a String> {
    collection
        .iter()
        .filter(move |(_, doc)| filter.is_none_or(|f| eval::matches(doc, f)))
        .map(|(key, _)| key)
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    fn supports(&self, filter: &Expr) -> bool {
        !filter.any_op(&|op| self.unsupported.contains(&op))
    }

    async fn find(&self, query: StoreQuery, collection: &str) -> DocumentStoreResult<Vec<BsonDocument>> {
        let store = self.store.read().await;
        let Some(collection_map) = store.get(collection) else {
            return Ok(vec![]);
        };

        Ok(eval::apply_query(collection_map.values().cloned(), &query))
    }

    async fn count(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64> {
        let store = self.store.read().await;
        let Some(collection_map) = store.get(collection) else {
            return Ok(0);
        };

        Ok(matching_keys(collection_map, filter.as_ref()).count() as u64)
    }

    async fn insert_many(&self, documents: Vec<BsonDocument>, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        let mut store = self.store.write().await;
        let collection_map = store.entry(collection.to_string()).or_default();

        let mut batch = Vec::with_capacity(documents.len());
        let mut seen = HashSet::new();

        for document in documents {
            let (id, document) = match document.get("_id").cloned() {
                Some(id) => (id, document),
                None => {
                    let id = Bson::ObjectId(ObjectId::new());
                    let mut with_id = BsonDocument::new();
                    with_id.insert("_id", id.clone());
                    for (key, value) in document {
                        with_id.insert(key, value);
                    }
                    (id, with_id)
                }
            };

            let key = key_of(&id);
            if collection_map.contains_key(&key) || !seen.insert(key.clone()) {
                return Err(DocumentStoreError::write(MemoryStoreError::DuplicateKey {
                    id: key,
                    collection: collection.to_string(),
                }));
            }

            batch.push((key, id, document));
        }

        trace!("inserting {} documents into {}", batch.len(), collection);

        Ok(batch
            .into_iter()
            .map(|(key, id, document)| {
                collection_map.insert(key, document);
                id
            })
            .collect())
    }

    async fn update_many(
        &self,
        filter: Option<Expr>,
        update: UpdateSpec,
        collection: &str,
    ) -> DocumentStoreResult<bool> {
        let mut store = self.store.write().await;
        let Some(collection_map) = store.get_mut(collection) else {
            return Ok(true);
        };

        let now = DateTime::now();
        let keys: Vec<String> = matching_keys(collection_map, filter.as_ref())
            .cloned()
            .collect();

        // Apply to copies first so a failing document leaves the collection untouched.
        let mut updated = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(current) = collection_map.get(&key) {
                let mut next = current.clone();
                update
                    .apply(&mut next, now)
                    .map_err(|err| DocumentStoreError::write(MemoryStoreError::Update(err)))?;
                updated.push((key, next));
            }
        }

        trace!("updating {} documents in {}", updated.len(), collection);
        for (key, next) in updated {
            collection_map.insert(key, next);
        }

        Ok(true)
    }

    async fn replace_one(
        &self,
        filter: Expr,
        replacement: BsonDocument,
        collection: &str,
    ) -> DocumentStoreResult<bool> {
        let mut store = self.store.write().await;
        let Some(collection_map) = store.get_mut(collection) else {
            return Ok(false);
        };

        let Some(key) = matching_keys(collection_map, Some(&filter)).next().cloned() else {
            return Ok(false);
        };
        let Some(id) = collection_map.get(&key).and_then(|doc| doc.get("_id")).cloned() else {
            return Ok(false);
        };

        if replacement.get("_id").is_some_and(|new_id| new_id != &id) {
            return Err(DocumentStoreError::write(MemoryStoreError::IdentityChanged(key)));
        }

        let mut next = BsonDocument::new();
        next.insert("_id", id);
        for (field, value) in replacement {
            if field != "_id" {
                next.insert(field, value);
            }
        }

        collection_map.insert(key, next);
        Ok(true)
    }

    async fn delete_one(&self, filter: Expr, collection: &str) -> DocumentStoreResult<bool> {
        let mut store = self.store.write().await;
        let Some(collection_map) = store.get_mut(collection) else {
            return Ok(true);
        };

        let key = matching_keys(collection_map, Some(&filter)).next().cloned();
        if let Some(key) = key {
            collection_map.shift_remove(&key);
        }

        Ok(true)
    }

    async fn delete_many(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<bool> {
        let mut store = self.store.write().await;
        let Some(collection_map) = store.get_mut(collection) else {
            return Ok(true);
        };

        let before = collection_map.len();
        collection_map.retain(|_, doc| !filter.as_ref().is_none_or(|f| eval::matches(doc, f)));
        trace!("deleted {} documents from {}", before - collection_map.len(), collection);

        Ok(true)
    }

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        debug!("creating collection {name}");
        self.store
            .write()
            .await
            .entry(name.to_string())
            .or_default();

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        debug!("dropping collection {name}");
        self.store.write().await.remove(name);

        Ok(())
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        let mut names: Vec<String> = self.store.read().await.keys().cloned().collect();
        names.sort();

        Ok(names)
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use docrepo_memory::InMemoryStore;
/// use docrepo::{backend::StoreBackendBuilder, query::FieldOp};
///
/// // A store that makes repositories evaluate `Contains` on the client side.
/// let store = InMemoryStore::builder()
///     .unsupported_operator(FieldOp::Contains)
///     .build()
///     .await?;
/// ```
#[derive(Default, Debug)]
pub struct InMemoryStoreBuilder {
    unsupported: HashSet<FieldOp>,
}

impl InMemoryStoreBuilder {
    /// Reports `op` as not natively supported, so predicates using it run client-side.
    pub fn unsupported_operator(mut self, op: FieldOp) -> Self {
        self.unsupported.insert(op);
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore {
            store: Arc::default(),
            unsupported: Arc::new(self.unsupported),
        })
    }
}
