//! Typed repositories.
//!
//! A [`Repository`] binds a document type to its collection and exposes the query and
//! mutation operations over it. Criteria from either surface (typed [`Predicate`]s and
//! [`OrderBy`](crate::field::OrderBy) keys, or dynamic strings) are resolved against the
//! document shape, then run through the collection, which decides between native and
//! client-side evaluation.
//!
//! # Example
//!
//! ```ignore
//! let repo = store.repository::<Restaurant>();
//!
//! let matches = repo
//!     .find_str(r#"borough.Equals("Manhattan") AND name.Contains("Do")"#)
//!     .await?;
//! let third = repo.page(Criteria::new(), 3, 35).await?;
//! let newest = repo.last(Restaurant::BOROUGH.eq("Bronx")).await?;
//! ```

use std::fmt;

use bson::{DateTime, Document as BsonDocument};
use log::trace;

use crate::{
    backend::StoreBackend,
    codec,
    collection::Collection,
    criteria::Criteria,
    document::{Document, DocumentKey},
    error::{DocumentStoreError, DocumentStoreResult},
    field::{Field, FieldValue, Predicate},
    page::{Page, PageWindow},
    query::{Expr, FieldOp, Sort, StoreQuery},
    resolve::FieldResolver,
    update::Update,
};

/// Query and mutation operations for documents of type `D`.
///
/// Holds no state besides the resolved collection name, so one repository can serve
/// concurrent callers.
pub struct Repository<'a, D: Document, B: StoreBackend> {
    collection: Collection<'a, B>,
    resolver: FieldResolver<D>,
}

impl<'a, D: Document, B: StoreBackend> Repository<'a, D, B> {
    pub(crate) fn new(collection: Collection<'a, B>) -> Self {
        Self { collection, resolver: FieldResolver::new() }
    }

    /// The collection this repository is bound to.
    pub fn name(&self) -> &str {
        self.collection.name()
    }

    /// The untyped collection handle.
    pub fn collection(&self) -> &Collection<'a, B> {
        &self.collection
    }

    fn compile(&self, criteria: &Criteria<D>) -> DocumentStoreResult<StoreQuery> {
        let mut query = criteria.to_query();

        query.filter = query
            .filter
            .map(|filter| self.resolver.resolve_expr(&filter))
            .transpose()?;
        query.sort = query
            .sort
            .iter()
            .map(|sort| self.resolver.resolve_sort(sort))
            .collect::<DocumentStoreResult<_>>()?;

        trace!("compiled criteria for {}: {:?}", self.name(), query);
        Ok(query)
    }

    fn compile_filter(&self, predicate: Predicate<D>) -> DocumentStoreResult<Expr> {
        self.resolver.resolve_expr(predicate.expr())
    }

    fn id_filter(id: &D::Key) -> Expr {
        Expr::field("_id".to_string(), FieldOp::Eq, id.to_bson())
    }

    fn required_id(document: &D) -> DocumentStoreResult<&D::Key> {
        document.id().ok_or_else(|| {
            DocumentStoreError::InvalidArgument(format!(
                "{} has no identity; insert it before replacing or deleting it",
                D::type_name()
            ))
        })
    }

    /// Runs a criteria and decodes the results.
    pub async fn query(&self, criteria: &Criteria<D>) -> DocumentStoreResult<Vec<D>> {
        let query = self.compile(criteria)?;

        self.collection
            .find(query)
            .await?
            .into_iter()
            .map(codec::decode)
            .collect()
    }

    pub async fn get_by_id(&self, id: &D::Key) -> DocumentStoreResult<Option<D>> {
        let query = StoreQuery {
            filter: Some(Self::id_filter(id)),
            limit: Some(1),
            ..StoreQuery::default()
        };

        match self.collection.find(query).await?.into_iter().next() {
            Some(stored) => Ok(Some(codec::decode(stored)?)),
            None => Ok(None),
        }
    }

    /// Every document in arrival order.
    pub async fn to_list(&self) -> DocumentStoreResult<Vec<D>> {
        self.query(&Criteria::new()).await
    }

    /// Documents matching a predicate or a full criteria.
    pub async fn find(&self, criteria: impl Into<Criteria<D>>) -> DocumentStoreResult<Vec<D>> {
        self.query(&criteria.into()).await
    }

    /// Documents matching a dynamic filter string, in arrival order.
    pub async fn find_str(&self, filter: &str) -> DocumentStoreResult<Vec<D>> {
        self.query(&Criteria::parse(filter)?).await
    }

    /// Documents matching a dynamic filter string, sorted by a dynamic order string.
    pub async fn find_str_ordered(&self, filter: &str, order: &str) -> DocumentStoreResult<Vec<D>> {
        self.query(&Criteria::parse_ordered(filter, order)?).await
    }

    /// The first document of the criteria's result, or `None` when it is empty.
    ///
    /// A page window on the criteria is kept: the first document of that window is returned.
    pub async fn first_or_default(&self, criteria: impl Into<Criteria<D>>) -> DocumentStoreResult<Option<D>> {
        let criteria = criteria.into();
        let window = match criteria.page_window() {
            Some(window) => window.first(),
            None => PageWindow::new(0, 1)?,
        };

        Ok(self.query(&criteria.with_page(window)).await?.into_iter().next())
    }

    pub async fn first_or_default_str(&self, filter: &str) -> DocumentStoreResult<Option<D>> {
        self.first_or_default(Criteria::parse(filter)?).await
    }

    /// The last document of the criteria's result, or `None` when it is empty.
    ///
    /// Without sort keys this is the document with the greatest identity. With sort keys every
    /// key is reversed and identity descending breaks the remaining ties; the result is then
    /// page 1 of size 1. Any page window on the criteria is replaced.
    pub async fn last(&self, criteria: impl Into<Criteria<D>>) -> DocumentStoreResult<Option<D>> {
        let criteria = criteria.into();
        let mut sort: Vec<Sort> = criteria
            .sort()
            .iter()
            .map(|key| Sort { field: key.field.clone(), direction: key.direction.reversed() })
            .collect();
        sort.push(Sort::desc("_id"));

        let reversed = criteria.with_sort(sort).with_page(PageWindow::page(1, 1)?);
        Ok(self.query(&reversed).await?.into_iter().next())
    }

    pub async fn last_str(&self, filter: &str) -> DocumentStoreResult<Option<D>> {
        self.last(Criteria::parse(filter)?).await
    }

    /// Page `page_number` (1-indexed) of `page_size` documents.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidArgument`] if either argument is below 1.
    pub async fn page(
        &self,
        criteria: impl Into<Criteria<D>>,
        page_number: u64,
        page_size: u64,
    ) -> DocumentStoreResult<Vec<D>> {
        self.query(&criteria.into().page(page_number, page_size)?).await
    }

    pub async fn page_str(
        &self,
        filter: &str,
        order: &str,
        page_number: u64,
        page_size: u64,
    ) -> DocumentStoreResult<Vec<D>> {
        self.page(Criteria::parse_ordered(filter, order)?, page_number, page_size)
            .await
    }

    /// Like [`page`](Self::page), with the total count and neighbouring page numbers.
    pub async fn paginate(
        &self,
        criteria: impl Into<Criteria<D>>,
        page_number: u64,
        page_size: u64,
    ) -> DocumentStoreResult<Page<D>> {
        let criteria = criteria.into().page(page_number, page_size)?;
        let filter = self.compile(&criteria)?.filter;

        let count = self.collection.count(filter).await?;
        let items = self.query(&criteria).await?;

        Ok(Page::assemble(items, count, page_number, page_size))
    }

    pub async fn count(&self) -> DocumentStoreResult<usize> {
        Ok(saturate(self.long_count().await?))
    }

    pub async fn count_where(&self, predicate: impl Into<Predicate<D>>) -> DocumentStoreResult<usize> {
        Ok(saturate(self.long_count_where(predicate).await?))
    }

    pub async fn count_str(&self, filter: &str) -> DocumentStoreResult<usize> {
        self.count_where(crate::dynamic::compile_filter::<D>(filter)?)
            .await
    }

    pub async fn long_count(&self) -> DocumentStoreResult<u64> {
        self.collection.count(None).await
    }

    pub async fn long_count_where(&self, predicate: impl Into<Predicate<D>>) -> DocumentStoreResult<u64> {
        let filter = self.compile_filter(predicate.into())?;
        self.collection.count(Some(filter)).await
    }

    /// Inserts a document and returns it with its identity and timestamp filled in.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Write`] if the store rejects the document, for example
    /// because its identity already exists.
    pub async fn insert_one(&self, document: D) -> DocumentStoreResult<D> {
        let mut inserted = self.insert_many(vec![document]).await?;
        inserted.pop().ok_or_else(|| {
            DocumentStoreError::backend(format!("store returned no identity for the inserted {}", D::type_name()))
        })
    }

    /// Inserts documents as one batch and returns them with identities and timestamps filled in.
    pub async fn insert_many(&self, documents: Vec<D>) -> DocumentStoreResult<Vec<D>> {
        let now = DateTime::now();
        let mut documents = documents;

        let encoded = documents
            .iter_mut()
            .map(|document| {
                document.set_modified_on(now);
                codec::encode(document)
            })
            .collect::<DocumentStoreResult<Vec<BsonDocument>>>()?;

        let ids = self.collection.insert_many(encoded).await?;
        if ids.len() != documents.len() {
            return Err(DocumentStoreError::backend(format!(
                "store returned {} identities for {} documents",
                ids.len(),
                documents.len()
            )));
        }

        for (document, id) in documents.iter_mut().zip(ids) {
            document.set_id(D::Key::from_bson(id)?);
        }

        Ok(documents)
    }

    /// Updates the document with identity `id`. Returns whether the store acknowledged the write.
    pub async fn update_by_id(&self, id: &D::Key, update: Update<D>) -> DocumentStoreResult<bool> {
        let spec = update.resolve(&self.resolver)?;
        self.collection
            .update_many(Some(Self::id_filter(id)), spec)
            .await
    }

    /// Updates every document matching `predicate`.
    ///
    /// Matching nothing is not an error; the result reports acknowledgment only.
    pub async fn update(&self, predicate: impl Into<Predicate<D>>, update: Update<D>) -> DocumentStoreResult<bool> {
        let filter = self.compile_filter(predicate.into())?;
        let spec = update.resolve(&self.resolver)?;

        self.collection.update_many(Some(filter), spec).await
    }

    /// Sets one field on every document matching `predicate`.
    pub async fn update_field<T: FieldValue>(
        &self,
        predicate: impl Into<Predicate<D>>,
        field: Field<D, T>,
        value: impl Into<T::Value>,
    ) -> DocumentStoreResult<bool> {
        self.update(predicate, Update::new().set(field, value)).await
    }

    /// Replaces the stored document with the same identity.
    ///
    /// Returns `false` when no document has that identity.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidArgument`] if `document` has no identity.
    pub async fn replace_one(&self, document: &D) -> DocumentStoreResult<bool> {
        let filter = Self::id_filter(Self::required_id(document)?);

        let mut stamped = document.clone();
        stamped.set_modified_on(DateTime::now());

        self.collection
            .replace_one(filter, codec::encode(&stamped)?)
            .await
    }

    /// Deletes a document by its identity. Returns whether the store acknowledged the delete.
    pub async fn delete(&self, document: &D) -> DocumentStoreResult<bool> {
        self.delete_by_id(Self::required_id(document)?).await
    }

    pub async fn delete_by_id(&self, id: &D::Key) -> DocumentStoreResult<bool> {
        self.collection.delete_one(Self::id_filter(id)).await
    }

    /// Deletes every document matching `predicate`.
    pub async fn delete_many(&self, predicate: impl Into<Predicate<D>>) -> DocumentStoreResult<bool> {
        let filter = self.compile_filter(predicate.into())?;
        self.collection.delete_many(Some(filter)).await
    }
}

impl<D: Document, B: StoreBackend> fmt::Debug for Repository<'_, D, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("document", &D::type_name())
            .field("collection", &self.collection)
            .finish()
    }
}

fn saturate(count: u64) -> usize {
    usize::try_from(count).unwrap_or(usize::MAX)
}
