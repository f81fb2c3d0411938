//! MongoDB client and collection wrapper
//!
//! Thin typed layer over the driver: schemas declare their own indexes
//! via [`IntoIndexes`], and inserts stamp the shared metadata block.

use bson::{doc, DateTime, Document};
use mongodb::{
    options::IndexOptions, results::UpdateResult, Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, info};

use crate::db::schemas::Metadata;
use crate::error::{GrapevineError, Result};

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and verify reachability with a short timeout
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // serverSelectionTimeoutMS avoids hanging on an unreachable server
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| GrapevineError::Database(format!("failed to connect: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| GrapevineError::Database(format!("ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection with its indexes applied
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Liveness check for the readiness probe
    pub async fn ping(&self) -> Result<()> {
        self.client
            .database(&self.db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(|e| GrapevineError::Database(format!("ping failed: {}", e)))
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
    /// Create a new collection handle and apply schema indexes
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
            .map_err(|e| GrapevineError::Database(format!("failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document, stamping metadata timestamps
    pub async fn insert_one(&self, mut item: T) -> Result<()> {
        let metadata = item.mut_metadata();
        metadata.created_at = Some(DateTime::now());
        metadata.updated_at = Some(DateTime::now());

        self.inner
            .insert_one(item)
            .await
            .map(|_| ())
            .map_err(|e| GrapevineError::Database(format!("insert failed: {}", e)))
    }

    /// Find one document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>> {
        self.inner
            .find_one(filter)
            .await
            .map_err(|e| GrapevineError::Database(format!("find failed: {}", e)))
    }

    /// Find many documents by filter
    pub async fn find_many(&self, filter: Document) -> Result<Vec<T>> {
        self.find_sorted(filter, doc! {}, None).await
    }

    /// Find many documents with an explicit sort order and optional limit
    pub async fn find_sorted(
        &self,
        filter: Document,
        sort: Document,
        limit: Option<i64>,
    ) -> Result<Vec<T>> {
        use futures_util::StreamExt;

        let mut find = self.inner.find(filter);
        if !sort.is_empty() {
            find = find.sort(sort);
        }
        if let Some(n) = limit {
            find = find.limit(n);
        }

        let cursor = find
            .await
            .map_err(|e| GrapevineError::Database(format!("find failed: {}", e)))?;

        let results: Vec<T> = cursor
            .filter_map(|item| async {
                match item {
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

    /// Apply an update to the first matching document
    pub async fn update_one(&self, filter: Document, update: Document) -> Result<UpdateResult> {
        self.inner
            .update_one(filter, update)
            .await
            .map_err(|e| GrapevineError::Database(format!("update failed: {}", e)))
    }
}
