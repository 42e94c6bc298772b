pub mod collection;
pub mod config;
pub mod document;
pub mod engine;
pub mod errors;
pub mod pipeline;
pub mod query;
pub mod types;
pub mod utils;

use crate::collection::Collection;
use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::errors::DbError;
use crate::query::{
    BulkWriteReport, Cursor, DeleteReport, FindOneAndModifyOptions, FindOptions, UpdateReport,
};
use crate::types::DocumentId;
use bson::Document as BsonDocument;
use std::sync::Arc;

/// The main database struct.
///
/// Methods take filters, updates and pipelines as documents and parse them with the engine's
/// [`config::QueryConfig`] before anything runs.
#[derive(Debug, Clone)]
pub struct Database {
    engine: Arc<Engine>,
}

impl Database {
    /// Creates an empty database, applying the telemetry and logging sections of `config`.
    ///
    /// # Errors
    /// Returns an error if logging is enabled and its directory cannot be prepared.
    pub fn new(config: EngineConfig) -> Result<Self, DbError> {
        crate::query::telemetry::configure(&config.telemetry);
        crate::utils::logger::init_from_config(&config.logging)?;
        Ok(Self { engine: Arc::new(Engine::new(config)) })
    }

    /// Creates a database from the configuration found by [`EngineConfig::load`].
    ///
    /// # Errors
    /// Returns an error if a configuration file exists but cannot be read or is invalid.
    pub fn open_default() -> Result<Self, DbError> {
        Self::new(EngineConfig::load(None)?)
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        self.engine.config()
    }

    /// Returns the named collection, creating it if needed.
    pub fn collection(&self, name: &str) -> Arc<Collection> {
        self.engine.create_collection(name)
    }

    /// Retrieves a collection by its name.
    #[must_use]
    pub fn get_collection(&self, name: &str) -> Option<Arc<Collection>> {
        self.engine.get_collection(name)
    }

    /// Deletes a collection by its name.
    pub fn drop_collection(&self, name: &str) -> bool {
        self.engine.delete_collection(name)
    }

    /// Lists the names of all collections.
    #[must_use]
    pub fn list_collection_names(&self) -> Vec<String> {
        self.engine.list_collection_names()
    }

    /// Rename a collection.
    ///
    /// # Errors
    /// Returns `NoSuchCollection` if `old` does not exist.
    pub fn rename_collection(&self, old: &str, new: &str) -> Result<(), DbError> {
        self.engine.rename_collection(old, new)
    }

    fn existing(&self, name: &str) -> Result<Arc<Collection>, DbError> {
        self.engine.get_collection(name).ok_or_else(|| DbError::NoSuchCollection(name.to_string()))
    }

    fn query_config(&self) -> &config::QueryConfig {
        &self.engine.config().query
    }

    // --- Query API (façade over query and pipeline modules) ---

    /// # Errors
    /// Returns `DuplicateKey` or `InvalidDocumentId` when the `_id` cannot be stored.
    pub fn insert_one(&self, collection: &str, doc: BsonDocument) -> Result<DocumentId, DbError> {
        query::insert_one(&self.collection(collection), doc)
    }

    /// # Errors
    /// See [`Database::insert_one`]; nothing is inserted on error.
    pub fn insert_many(
        &self,
        collection: &str,
        docs: Vec<BsonDocument>,
    ) -> Result<Vec<DocumentId>, DbError> {
        query::insert_many(&self.collection(collection), docs)
    }

    /// # Errors
    /// Returns `NoSuchCollection` or `MalformedFilter`.
    pub fn find(
        &self,
        collection: &str,
        filter: &BsonDocument,
        opts: &FindOptions,
    ) -> Result<Cursor, DbError> {
        let col = self.existing(collection)?;
        let filter = query::parse_filter_with(filter, self.query_config())?;
        Ok(query::find_docs(&col, &filter, opts))
    }

    /// # Errors
    /// Returns `NoSuchCollection` or `MalformedFilter`.
    pub fn find_one(
        &self,
        collection: &str,
        filter: &BsonDocument,
    ) -> Result<Option<BsonDocument>, DbError> {
        let col = self.existing(collection)?;
        let filter = query::parse_filter_with(filter, self.query_config())?;
        Ok(query::find_one(&col, &filter))
    }

    /// # Errors
    /// Returns `NoSuchCollection` or `MalformedFilter`.
    pub fn count(&self, collection: &str, filter: &BsonDocument) -> Result<usize, DbError> {
        let col = self.existing(collection)?;
        let filter = query::parse_filter_with(filter, self.query_config())?;
        Ok(query::count_docs(&col, &filter))
    }

    /// # Errors
    /// Returns `NoSuchCollection`, `MalformedFilter` or `MalformedUpdate`; on error no document
    /// is changed.
    pub fn update_many(
        &self,
        collection: &str,
        filter: &BsonDocument,
        update: &BsonDocument,
    ) -> Result<UpdateReport, DbError> {
        let col = self.existing(collection)?;
        let cfg = self.query_config();
        let filter = query::parse_filter_with(filter, cfg)?;
        let update = query::parse_update_with(update, cfg)?;
        query::update_many(&col, &filter, &update)
    }

    /// # Errors
    /// Returns `NoSuchCollection`, `MalformedFilter` or `MalformedUpdate`.
    pub fn update_one(
        &self,
        collection: &str,
        filter: &BsonDocument,
        update: &BsonDocument,
    ) -> Result<UpdateReport, DbError> {
        let col = self.existing(collection)?;
        let cfg = self.query_config();
        let filter = query::parse_filter_with(filter, cfg)?;
        let update = query::parse_update_with(update, cfg)?;
        query::update_one(&col, &filter, &update)
    }

    /// # Errors
    /// Returns `NoSuchCollection`, `MalformedFilter` or `MalformedUpdate`.
    pub fn find_one_and_update(
        &self,
        collection: &str,
        filter: &BsonDocument,
        update: &BsonDocument,
        opts: &FindOneAndModifyOptions,
    ) -> Result<Option<BsonDocument>, DbError> {
        let col = self.existing(collection)?;
        let cfg = self.query_config();
        let filter = query::parse_filter_with(filter, cfg)?;
        let update = query::parse_update_with(update, cfg)?;
        query::find_one_and_update(&col, &filter, &update, opts)
    }

    /// # Errors
    /// Returns `NoSuchCollection`, `MalformedFilter` or `MalformedUpdate`.
    pub fn find_one_and_replace(
        &self,
        collection: &str,
        filter: &BsonDocument,
        replacement: &BsonDocument,
        opts: &FindOneAndModifyOptions,
    ) -> Result<Option<BsonDocument>, DbError> {
        let col = self.existing(collection)?;
        let filter = query::parse_filter_with(filter, self.query_config())?;
        query::find_one_and_replace(&col, &filter, replacement, opts)
    }

    /// # Errors
    /// Returns `NoSuchCollection` or `MalformedFilter`.
    pub fn delete_many(&self, collection: &str, filter: &BsonDocument) -> Result<DeleteReport, DbError> {
        let col = self.existing(collection)?;
        let filter = query::parse_filter_with(filter, self.query_config())?;
        Ok(query::delete_many(&col, &filter))
    }

    /// # Errors
    /// Returns `NoSuchCollection` or `MalformedFilter`.
    pub fn delete_one(&self, collection: &str, filter: &BsonDocument) -> Result<DeleteReport, DbError> {
        let col = self.existing(collection)?;
        let filter = query::parse_filter_with(filter, self.query_config())?;
        Ok(query::delete_one(&col, &filter))
    }

    /// Runs driver-style write models in order as one unit. Creates the collection if needed.
    ///
    /// # Errors
    /// Returns the parse error of a malformed model, or the first failing operation's error;
    /// nothing is committed on error.
    pub fn bulk_write(&self, collection: &str, ops: &[BsonDocument]) -> Result<BulkWriteReport, DbError> {
        let models = query::parse_write_models(ops, self.query_config())?;
        query::bulk_write(&self.collection(collection), models)
    }

    /// # Errors
    /// Returns `NoSuchCollection` or `MalformedPipeline`.
    pub fn aggregate(
        &self,
        collection: &str,
        pipeline: &[BsonDocument],
    ) -> Result<Vec<BsonDocument>, DbError> {
        let col = self.existing(collection)?;
        let pipeline = pipeline::parse_pipeline_with(pipeline, self.query_config())?;
        pipeline::aggregate(&col, &pipeline)
    }
}

/// Installs the rolling-file logger from `NEXUS_QUERY_LOG_*` environment variables.
///
/// # Errors
/// Returns an error if the log directory or an appender cannot be created.
pub fn init() -> Result<(), DbError> {
    utils::logger::configure_from_env()
}
