use async_trait::async_trait;
use bson::{Bson, Document};
use futures::TryStreamExt;
use log::{debug, trace};
use mongodb::{
    Client, Collection as MongoCollection,
    options::{ClientOptions, FindOptions},
};
use std::env;

use docrepo_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, StoreQuery},
    update::UpdateSpec,
};

use crate::{query::MongoQueryTranslator, sanitizer::ValueSanitizer};

/// Environment variable holding the connection string read by [`MongoDbStoreBuilder::from_env`].
pub const URI_ENV: &str = "DOCREPO_MONGODB_URI";
/// Environment variable naming the database. Optional when the URI carries a default database.
pub const DATABASE_ENV: &str = "DOCREPO_MONGODB_DATABASE";

#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(&ValueSanitizer::sanitize_string(collection_name))
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn find(&self, query: StoreQuery, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        let filter = MongoQueryTranslator::filter(query.filter.as_ref())?;
        trace!("find in {collection}: {filter}");

        let mut options = FindOptions::default();
        options.sort = MongoQueryTranslator::sort(&query.sort);
        options.skip = query.skip;
        options.limit = query
            .limit
            .map(|limit| i64::try_from(limit).unwrap_or(i64::MAX));

        Ok(self
            .get_collection(collection)
            .find(filter)
            .with_options(options)
            .await
            .map_err(DocumentStoreError::backend)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(DocumentStoreError::backend)?
            .into_iter()
            .map(ValueSanitizer::restore_document)
            .collect())
    }

    async fn count(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64> {
        self.get_collection(collection)
            .count_documents(MongoQueryTranslator::filter(filter.as_ref())?)
            .await
            .map_err(DocumentStoreError::backend)
    }

    async fn insert_many(&self, documents: Vec<Document>, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let count = documents.len();
        trace!("inserting {count} documents into {collection}");

        let mut result = self
            .get_collection(collection)
            .insert_many(
                documents
                    .into_iter()
                    .map(ValueSanitizer::sanitize_document),
            )
            .await
            .map_err(DocumentStoreError::write)?;

        (0..count)
            .map(|index| {
                result.inserted_ids.remove(&index).ok_or_else(|| {
                    DocumentStoreError::backend(format!("no inserted id reported for document {index}"))
                })
            })
            .collect()
    }

    async fn update_many(
        &self,
        filter: Option<Expr>,
        update: UpdateSpec,
        collection: &str,
    ) -> DocumentStoreResult<bool> {
        let filter = MongoQueryTranslator::filter(filter.as_ref())?;
        let update = MongoQueryTranslator::update(&update);
        trace!("update in {collection}: {filter} with {update}");

        self.get_collection(collection)
            .update_many(filter, update)
            .await
            .map_err(DocumentStoreError::write)?;

        Ok(true)
    }

    async fn replace_one(
        &self,
        filter: Expr,
        replacement: Document,
        collection: &str,
    ) -> DocumentStoreResult<bool> {
        let result = self
            .get_collection(collection)
            .replace_one(
                MongoQueryTranslator::filter(Some(&filter))?,
                ValueSanitizer::sanitize_document(replacement),
            )
            .await
            .map_err(DocumentStoreError::write)?;

        Ok(result.matched_count > 0)
    }

    async fn delete_one(&self, filter: Expr, collection: &str) -> DocumentStoreResult<bool> {
        self.get_collection(collection)
            .delete_one(MongoQueryTranslator::filter(Some(&filter))?)
            .await
            .map_err(DocumentStoreError::write)?;

        Ok(true)
    }

    async fn delete_many(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<bool> {
        let result = self
            .get_collection(collection)
            .delete_many(MongoQueryTranslator::filter(filter.as_ref())?)
            .await
            .map_err(DocumentStoreError::write)?;
        trace!("deleted {} documents from {collection}", result.deleted_count);

        Ok(true)
    }

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        debug!("creating collection {name} in {}", self.database);

        self.client
            .database(&self.database)
            .create_collection(ValueSanitizer::sanitize_string(name))
            .await
            .map_err(DocumentStoreError::backend)
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        debug!("dropping collection {name} in {}", self.database);

        self.get_collection(name)
            .drop()
            .await
            .map_err(DocumentStoreError::backend)
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        let mut names: Vec<String> = self
            .client
            .database(&self.database)
            .list_collection_names()
            .await
            .map_err(DocumentStoreError::backend)?
            .iter()
            .map(|name| ValueSanitizer::restore_string(name))
            .collect();
        names.sort();

        Ok(names)
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        debug!("shutting down MongoDB client");
        self.client.shutdown().await;

        Ok(())
    }
}

/// Connects a [`MongoDbStore`].
#[derive(Debug, Clone)]
pub struct MongoDbStoreBuilder {
    dsn: String,
    database: Option<String>,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: Some(database.to_string()),
        }
    }

    /// Reads the connection settings from [`URI_ENV`] and [`DATABASE_ENV`].
    ///
    /// Without [`DATABASE_ENV`] the database named in the connection string is used.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Initialization`] if [`URI_ENV`] is not set.
    pub fn from_env() -> DocumentStoreResult<Self> {
        let dsn = env::var(URI_ENV)
            .map_err(|_| DocumentStoreError::Initialization(format!("{URI_ENV} is not set")))?;

        Ok(Self {
            dsn,
            database: env::var(DATABASE_ENV).ok().filter(|name| !name.is_empty()),
        })
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        let database = self
            .database
            .or_else(|| options.default_database.clone())
            .ok_or_else(|| {
                DocumentStoreError::Initialization("no database named in settings or connection string".into())
            })?;
        debug!("connecting to MongoDB database {database}");

        Ok(MongoDbStore::new(
            Client::with_options(options).map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            database,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn build_requires_a_database() {
        let builder = MongoDbStoreBuilder {
            dsn: "mongodb://localhost:27017".into(),
            database: None,
        };

        assert!(matches!(
            builder.build().await,
            Err(DocumentStoreError::Initialization(_))
        ));
    }

    #[tokio::test]
    async fn build_falls_back_to_connection_string_database() {
        let builder = MongoDbStoreBuilder {
            dsn: "mongodb://localhost:27017/restaurants_db".into(),
            database: None,
        };

        let store = builder.build().await.unwrap();
        assert_eq!(store.database(), "restaurants_db");
    }
}
