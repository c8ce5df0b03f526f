//! Registry of lazily-constructed collection handles keyed by resource id.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::config::{Options, ResourceConfig};
use crate::driver::{CollectionHandle, Driver, SharedHandle};
use crate::error::{ResourceError, ResourceResult};

/// Input accepted by [`ResourceManager::set_resource`]
#[derive(Debug, Clone)]
pub enum ResourceInput {
    /// A ready-made handle, stored as is
    Handle(SharedHandle),
    /// Configuration fields merged into the record
    Config(ResourceConfig),
}

impl ResourceInput {
    /// Wrap a concrete handle
    pub fn handle(handle: impl CollectionHandle + 'static) -> Self {
        ResourceInput::Handle(Arc::new(handle))
    }
}

impl From<SharedHandle> for ResourceInput {
    fn from(handle: SharedHandle) -> Self {
        ResourceInput::Handle(handle)
    }
}

impl From<ResourceConfig> for ResourceInput {
    fn from(config: ResourceConfig) -> Self {
        ResourceInput::Config(config)
    }
}

/// Decode a dynamic value into configuration input
///
/// Only JSON objects are accepted. Known keys must carry the right type,
/// unknown keys are ignored.
impl TryFrom<Value> for ResourceInput {
    type Error = ResourceError;

    fn try_from(value: Value) -> ResourceResult<Self> {
        if !value.is_object() {
            return Err(ResourceError::InvalidArgument(format!(
                "expected a collection handle or a configuration mapping, got {}",
                json_kind(&value)
            )));
        }

        serde_json::from_value(value)
            .map(ResourceInput::Config)
            .map_err(|e| ResourceError::InvalidArgument(format!("invalid resource configuration: {}", e)))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Default)]
struct ResourceRecord {
    handle: Option<SharedHandle>,
    server: Option<String>,
    connection_options: Options,
    driver_options: Options,
    database: Option<String>,
    collection: Option<String>,
}

impl ResourceRecord {
    fn merge(&mut self, config: ResourceConfig) {
        if let Some(server) = config.server {
            self.server = Some(server);
        }
        if let Some(options) = config.connection_options {
            self.connection_options = options;
        }
        if let Some(options) = config.driver_options {
            self.driver_options = options;
        }
        if let Some(database) = config.database {
            self.database = Some(database);
        }
        if let Some(collection) = config.collection {
            self.collection = Some(collection);
        }
    }

    fn snapshot(&self) -> ResourceConfig {
        ResourceConfig {
            server: self.server.clone(),
            connection_options: Some(self.connection_options.clone()),
            driver_options: Some(self.driver_options.clone()),
            database: self.database.clone(),
            collection: self.collection.clone(),
        }
    }
}

/// Maps resource ids to collection handles built on first use
///
/// Records are created by any setter and live until [`remove_resource`](Self::remove_resource).
/// Once a handle is built it is reused: changing a configuration field
/// afterwards does not rebuild it. Re-registering the resource through
/// [`set_resource`](Self::set_resource) with configuration input does.
///
/// All operations go through a single lock, so concurrent `get_resource`
/// calls for the same id construct at most one handle.
///
/// # Example
///
/// ```ignore
/// use mongo_resource_manager::{ResourceManager, ResourceConfig};
///
/// let manager = ResourceManager::mongodb();
/// manager
///     .set_resource(
///         "cache",
///         ResourceConfig::new()
///             .with_server("mongodb://localhost:27017")
///             .with_database("app")
///             .with_collection("cache"),
///     )
///     .await?;
///
/// let collection = manager.get_resource("cache").await?;
/// ```
pub struct ResourceManager {
    driver: Arc<dyn Driver>,
    records: Mutex<HashMap<String, ResourceRecord>>,
}

impl ResourceManager {
    /// Create an empty manager building handles with `driver`
    pub fn new(driver: impl Driver + 'static) -> Self {
        Self::with_driver(Arc::new(driver))
    }

    /// Create an empty manager sharing an existing driver
    pub fn with_driver(driver: Arc<dyn Driver>) -> Self {
        Self {
            driver,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Create an empty manager backed by the MongoDB driver
    #[cfg(feature = "mongodb")]
    pub fn mongodb() -> Self {
        Self::new(crate::mongodb::MongoDriver::new())
    }

    /// Register a handle or merge configuration for `id`
    ///
    /// A handle replaces whatever handle was cached and leaves configuration
    /// alone. Configuration input merges the provided fields and drops the
    /// cached handle, so the next [`get_resource`](Self::get_resource) builds
    /// a fresh one.
    ///
    /// Fails with [`ResourceError::InvalidArgument`] when `input` cannot be
    /// decoded; the record is not created in that case.
    pub async fn set_resource<I>(&self, id: &str, input: I) -> ResourceResult<()>
    where
        I: TryInto<ResourceInput>,
        ResourceError: From<<I as TryInto<ResourceInput>>::Error>,
    {
        let input = input.try_into()?;

        let mut records = self.records.lock().await;
        let record = records.entry(id.to_string()).or_default();
        match input {
            ResourceInput::Handle(handle) => record.handle = Some(handle),
            ResourceInput::Config(config) => {
                record.merge(config);
                record.handle = None;
            }
        }
        Ok(())
    }

    /// Whether a record exists for `id`; never builds a handle
    pub async fn has_resource(&self, id: &str) -> bool {
        self.records.lock().await.contains_key(id)
    }

    /// Return the handle for `id`, building and caching it on first use
    ///
    /// Construction makes a single attempt. On failure nothing is cached and
    /// the configuration is left as it was.
    #[instrument(skip(self))]
    pub async fn get_resource(&self, id: &str) -> ResourceResult<SharedHandle> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| ResourceError::UnknownResource(id.to_string()))?;

        if let Some(handle) = &record.handle {
            debug!("Reusing cached handle");
            return Ok(Arc::clone(handle));
        }

        let handle = self.construct(id, record).await?;
        debug!(
            database = handle.database_name(),
            collection = handle.collection_name(),
            "Constructed handle"
        );
        record.handle = Some(Arc::clone(&handle));
        Ok(handle)
    }

    async fn construct(&self, id: &str, record: &ResourceRecord) -> ResourceResult<SharedHandle> {
        let failed = |source| ResourceError::ConstructionFailed {
            id: id.to_string(),
            source,
        };

        let connection = self
            .driver
            .open_connection(
                record.server.as_deref().unwrap_or_default(),
                &record.connection_options,
                &record.driver_options,
            )
            .await
            .map_err(failed)?;

        connection
            .select_collection(
                record.database.as_deref().unwrap_or_default(),
                record.collection.as_deref().unwrap_or_default(),
            )
            .map_err(failed)
    }

    /// Drop the record for `id`, returning whether one existed
    pub async fn remove_resource(&self, id: &str) -> bool {
        self.records.lock().await.remove(id).is_some()
    }

    /// Registered ids, sorted
    pub async fn resource_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.records.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Snapshot of every configuration field of `id`
    pub async fn get_config(&self, id: &str) -> ResourceResult<ResourceConfig> {
        self.read(id, ResourceRecord::snapshot).await
    }

    pub async fn set_server(&self, id: &str, server: impl Into<String>) {
        let server = server.into();
        self.write(id, |record| record.server = Some(server)).await
    }

    /// `None` when the record exists but no server was set
    pub async fn get_server(&self, id: &str) -> ResourceResult<Option<String>> {
        self.read(id, |record| record.server.clone()).await
    }

    pub async fn set_connection_options(&self, id: &str, options: Options) {
        self.write(id, |record| record.connection_options = options).await
    }

    pub async fn get_connection_options(&self, id: &str) -> ResourceResult<Options> {
        self.read(id, |record| record.connection_options.clone()).await
    }

    pub async fn set_driver_options(&self, id: &str, options: Options) {
        self.write(id, |record| record.driver_options = options).await
    }

    pub async fn get_driver_options(&self, id: &str) -> ResourceResult<Options> {
        self.read(id, |record| record.driver_options.clone()).await
    }

    pub async fn set_database(&self, id: &str, database: impl Into<String>) {
        let database = database.into();
        self.write(id, |record| record.database = Some(database)).await
    }

    pub async fn get_database(&self, id: &str) -> ResourceResult<Option<String>> {
        self.read(id, |record| record.database.clone()).await
    }

    pub async fn set_collection(&self, id: &str, collection: impl Into<String>) {
        let collection = collection.into();
        self.write(id, |record| record.collection = Some(collection)).await
    }

    pub async fn get_collection(&self, id: &str) -> ResourceResult<Option<String>> {
        self.read(id, |record| record.collection.clone()).await
    }

    async fn read<T>(&self, id: &str, f: impl FnOnce(&ResourceRecord) -> T) -> ResourceResult<T> {
        let records = self.records.lock().await;
        records
            .get(id)
            .map(f)
            .ok_or_else(|| ResourceError::UnknownResource(id.to_string()))
    }

    // Creates the record when missing. Never touches a cached handle.
    async fn write(&self, id: &str, f: impl FnOnce(&mut ResourceRecord)) {
        let mut records = self.records.lock().await;
        f(records.entry(id.to_string()).or_default());
    }
}

#[cfg(feature = "mongodb")]
impl Default for ResourceManager {
    fn default() -> Self {
        Self::mongodb()
    }
}
