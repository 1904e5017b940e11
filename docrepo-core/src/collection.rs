//! Untyped collection handles.
//!
//! A [`Collection`] pairs a collection name with a backend and routes every operation to it.
//! When the backend reports that it cannot evaluate a filter natively, the collection evaluates
//! it on the client side: reads fetch the collection and run the whole query locally, writes
//! select the matching identities locally and send an identity filter to the store. Results are
//! the same either way.

use bson::{Bson, Document as BsonDocument};
use log::{debug, trace};

use crate::{
    backend::StoreBackend,
    error::DocumentStoreResult,
    eval,
    query::{Expr, FieldOp, StoreQuery},
    update::UpdateSpec,
};

/// An untyped collection with a reference to a storage backend.
#[derive(Debug)]
pub struct Collection<'a, B: StoreBackend> {
    name: String,
    backend: &'a B,
}

impl<'a, B: StoreBackend> Collection<'a, B> {
    pub(crate) fn new(name: impl Into<String>, backend: &'a B) -> Self {
        Self { name: name.into(), backend }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn native(&self, filter: Option<&Expr>) -> bool {
        filter.is_none_or(|f| self.backend.supports(f))
    }

    /// Runs a query, evaluating it locally if the backend cannot.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if the backend read fails.
    pub async fn find(&self, query: StoreQuery) -> DocumentStoreResult<Vec<BsonDocument>> {
        if self.native(query.filter.as_ref()) {
            trace!("find on {}: {:?}", self.name, query);
            return self.backend.find(query, &self.name).await;
        }

        debug!("find on {} evaluated client-side: {:?}", self.name, query.filter);
        let all = self.backend.find(StoreQuery::new(), &self.name).await?;
        Ok(eval::apply_query(all, &query))
    }

    pub async fn count(&self, filter: Option<Expr>) -> DocumentStoreResult<u64> {
        if self.native(filter.as_ref()) {
            return self.backend.count(filter, &self.name).await;
        }

        debug!("count on {} evaluated client-side: {:?}", self.name, filter);
        let all = self.backend.find(StoreQuery::new(), &self.name).await?;
        let matching = match &filter {
            Some(f) => all.iter().filter(|doc| eval::matches(doc, f)).count(),
            None => all.len(),
        };
        Ok(matching as u64)
    }

    /// Inserts documents as one batch and returns their `_id` values in input order.
    pub async fn insert_many(&self, documents: Vec<BsonDocument>) -> DocumentStoreResult<Vec<Bson>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        trace!("inserting {} documents into {}", documents.len(), self.name);
        self.backend.insert_many(documents, &self.name).await
    }

    pub async fn update_many(&self, filter: Option<Expr>, update: UpdateSpec) -> DocumentStoreResult<bool> {
        if self.native(filter.as_ref()) {
            return self.backend.update_many(filter, update, &self.name).await;
        }

        match self.matching_ids(filter, None).await? {
            Some(ids) => self.backend.update_many(Some(ids), update, &self.name).await,
            None => Ok(true),
        }
    }

    /// Replaces the first document matching `filter`. Returns `true` if one matched.
    pub async fn replace_one(&self, filter: Expr, replacement: BsonDocument) -> DocumentStoreResult<bool> {
        if self.native(Some(&filter)) {
            return self.backend.replace_one(filter, replacement, &self.name).await;
        }

        match self.matching_ids(Some(filter), Some(1)).await? {
            Some(ids) => self.backend.replace_one(ids, replacement, &self.name).await,
            None => Ok(false),
        }
    }

    pub async fn delete_one(&self, filter: Expr) -> DocumentStoreResult<bool> {
        if self.native(Some(&filter)) {
            return self.backend.delete_one(filter, &self.name).await;
        }

        match self.matching_ids(Some(filter), Some(1)).await? {
            Some(ids) => self.backend.delete_one(ids, &self.name).await,
            None => Ok(true),
        }
    }

    pub async fn delete_many(&self, filter: Option<Expr>) -> DocumentStoreResult<bool> {
        if self.native(filter.as_ref()) {
            return self.backend.delete_many(filter, &self.name).await;
        }

        match self.matching_ids(filter, None).await? {
            Some(ids) => self.backend.delete_many(Some(ids), &self.name).await,
            None => Ok(true),
        }
    }

    /// Selects matching documents locally and returns a filter on their identities, or `None`
    /// when nothing matches.
    async fn matching_ids(&self, filter: Option<Expr>, limit: Option<u64>) -> DocumentStoreResult<Option<Expr>> {
        debug!("write on {} selected client-side: {:?}", self.name, filter);

        let query = StoreQuery { filter, sort: Vec::new(), skip: None, limit };
        let all = self.backend.find(StoreQuery::new(), &self.name).await?;
        let ids: Vec<Expr> = eval::apply_query(all, &query)
            .into_iter()
            .filter_map(|mut doc| doc.remove("_id"))
            .map(|id| Expr::field("_id".to_string(), FieldOp::Eq, id))
            .collect();

        Ok(match ids.len() {
            0 => None,
            1 => ids.into_iter().next(),
            _ => Some(Expr::Or(ids)),
        })
    }
}
