//! MongoDB client and collection wrapper

use bson::{doc, Bson, DateTime, Document};
use futures_util::StreamExt;
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::{IndexOptions, ReturnDocument},
    results::UpdateResult,
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, info};

use crate::db::schemas::Metadata;
use crate::types::{EngineError, Result};

/// MongoDB error code for unique index violations
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// Whether `err` is a unique index violation
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY_CODE,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and ping
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        info!(db = db_name, "Connecting to MongoDB");

        // Fail fast when MongoDB is unreachable
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| EngineError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        let mongo = Self {
            client,
            db_name: db_name.to_string(),
        };
        mongo.ping().await?;

        info!("Connected to MongoDB database '{}'", db_name);
        Ok(mongo)
    }

    pub async fn ping(&self) -> Result<()> {
        self.client
            .database(&self.db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| EngineError::Database(format!("MongoDB ping failed: {}", e)))?;
        Ok(())
    }

    /// Get a typed collection with its indexes applied
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
{
    pub async fn new(client: &Client, db_name: &str, collection_name: &str) -> Result<Self> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    async fn apply_indexes(&self) -> Result<()> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| EngineError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document, setting metadata timestamps.
    ///
    /// Returns `Ok(false)` when a unique index rejects the document.
    pub async fn insert_one(&self, mut item: T) -> Result<bool> {
        let now = DateTime::now();
        let metadata = item.mut_metadata();
        metadata.is_deleted = false;
        metadata.created_at = Some(now);
        metadata.updated_at = Some(now);

        match self.inner.insert_one(item).await {
            Ok(_) => Ok(true),
            Err(e) if is_duplicate_key(&e) => Ok(false),
            Err(e) => Err(EngineError::Database(format!("Insert failed: {}", e))),
        }
    }

    /// Find one live document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>> {
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        self.inner
            .find_one(full_filter)
            .await
            .map_err(|e| EngineError::Database(format!("Find failed: {}", e)))
    }

    /// Find live documents, optionally sorted and limited
    pub async fn find_many(
        &self,
        filter: Document,
        sort: Option<Document>,
        limit: Option<i64>,
    ) -> Result<Vec<T>> {
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        let mut find = self.inner.find(full_filter);
        if let Some(sort) = sort {
            find = find.sort(sort);
        }
        if let Some(limit) = limit {
            find = find.limit(limit);
        }

        let cursor = find
            .await
            .map_err(|e| EngineError::Database(format!("Find failed: {}", e)))?;

        let results: Vec<T> = cursor
            .filter_map(|doc| async {
                match doc {
                    Ok(d) => Some(d),
                    Err(e) => {
                        error!("Error reading document: {}", e);
                        None
                    }
                }
            })
            .collect()
            .await;

        Ok(results)
    }

    pub async fn update_one(&self, filter: Document, update: Document) -> Result<UpdateResult> {
        self.inner
            .update_one(filter, update)
            .await
            .map_err(|e| EngineError::Database(format!("Update failed: {}", e)))
    }

    pub async fn update_many(&self, filter: Document, update: Document) -> Result<UpdateResult> {
        self.inner
            .update_many(filter, update)
            .await
            .map_err(|e| EngineError::Database(format!("Update failed: {}", e)))
    }

    /// Apply `update` and return the document as it is afterwards
    pub async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
    ) -> Result<Option<T>> {
        self.inner
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| EngineError::Database(format!("Update failed: {}", e)))
    }

    /// Replace a document, refreshing `metadata.updated_at`.
    ///
    /// Returns `Ok(None)` when a unique index rejects the replacement.
    pub async fn replace_one(&self, filter: Document, mut item: T) -> Result<Option<UpdateResult>> {
        item.mut_metadata().updated_at = Some(DateTime::now());

        match self.inner.replace_one(filter, item).await {
            Ok(result) => Ok(Some(result)),
            Err(e) if is_duplicate_key(&e) => Ok(None),
            Err(e) => Err(EngineError::Database(format!("Replace failed: {}", e))),
        }
    }

    /// Replace or insert by filter.
    ///
    /// Returns `Ok(false)` when a unique index rejects the write.
    pub async fn upsert_one(&self, filter: Document, mut item: T) -> Result<bool> {
        let now = DateTime::now();
        let metadata = item.mut_metadata();
        metadata.updated_at = Some(now);
        if metadata.created_at.is_none() {
            metadata.created_at = Some(now);
        }

        match self.inner.replace_one(filter, item).upsert(true).await {
            Ok(_) => Ok(true),
            Err(e) if is_duplicate_key(&e) => Ok(false),
            Err(e) => Err(EngineError::Database(format!("Upsert failed: {}", e))),
        }
    }

    pub async fn distinct(&self, field: &str, filter: Document) -> Result<Vec<Bson>> {
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        self.inner
            .distinct(field, full_filter)
            .await
            .map_err(|e| EngineError::Database(format!("Distinct failed: {}", e)))
    }
}
