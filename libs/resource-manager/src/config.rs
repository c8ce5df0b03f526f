use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable '{0}' is required but not set")]
    MissingEnvVar(String),

    #[error("Failed to parse environment variable '{key}': {details}")]
    ParseError { key: String, details: String },
}

/// Trait for configuration that can be loaded from environment variables
pub trait FromEnv: Sized {
    fn from_env() -> Result<Self, ConfigError>;
}

/// A scalar connection or driver option value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl OptionValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            OptionValue::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{}", b),
            OptionValue::Int(n) => write!(f, "{}", n),
            OptionValue::Float(x) => write!(f, "{}", x),
            OptionValue::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        OptionValue::Float(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::String(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::String(value)
    }
}

/// Option mapping passed to the connection step or the driver layer
pub type Options = BTreeMap<String, OptionValue>;

/// Configuration fields for one resource
///
/// Every field is optional: when used as `set_resource` input only the
/// provided fields are merged into the record. Keys follow the mapping shape
/// accepted at the boundary (`server`, `connectionOptions`, `driverOptions`,
/// `database`, `collection`); unknown keys are ignored on deserialization.
///
/// # Example
///
/// ```ignore
/// use mongo_resource_manager::ResourceConfig;
///
/// let config = ResourceConfig::new()
///     .with_server("mongodb://localhost:27017")
///     .with_connection_option("connectTimeoutMS", 500)
///     .with_database("cache")
///     .with_collection("entries");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceConfig {
    /// Connection URI, e.g. `mongodb://[username:password@]host[:port][/database][?options]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    /// Options for the connection step (timeouts, replica set, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_options: Option<Options>,

    /// Options for the driver layer underneath the connection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_options: Option<Options>,

    /// Logical database name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    /// Collection name within the database
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

impl ResourceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    pub fn with_connection_options(mut self, options: Options) -> Self {
        self.connection_options = Some(options);
        self
    }

    /// Add a single connection option, keeping the ones already set
    pub fn with_connection_option(
        mut self,
        key: impl Into<String>,
        value: impl Into<OptionValue>,
    ) -> Self {
        self.connection_options
            .get_or_insert_with(Options::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_driver_options(mut self, options: Options) -> Self {
        self.driver_options = Some(options);
        self
    }

    /// Add a single driver option, keeping the ones already set
    pub fn with_driver_option(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.driver_options
            .get_or_insert_with(Options::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Load a ResourceConfig from environment variables
///
/// Environment variables:
/// - `MONGODB_URL` or `MONGO_URL` (required) - MongoDB connection string
/// - `MONGODB_DATABASE` or `MONGO_DATABASE` (optional) - Database name
/// - `MONGODB_COLLECTION` (optional) - Collection name
/// - `MONGODB_CONNECT_TIMEOUT_MS` (optional) - `connectTimeoutMS` connection option
/// - `MONGODB_SERVER_SELECTION_TIMEOUT_MS` (optional) - `serverSelectionTimeoutMS` connection option
/// - `MONGODB_APP_NAME` (optional) - `appName` driver option
impl FromEnv for ResourceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let server = env::var("MONGODB_URL")
            .or_else(|_| env::var("MONGO_URL"))
            .map_err(|_| ConfigError::MissingEnvVar("MONGODB_URL or MONGO_URL".to_string()))?;

        let mut config = ResourceConfig::new().with_server(server);

        if let Ok(database) = env::var("MONGODB_DATABASE").or_else(|_| env::var("MONGO_DATABASE")) {
            config = config.with_database(database);
        }

        if let Ok(collection) = env::var("MONGODB_COLLECTION") {
            config = config.with_collection(collection);
        }

        if let Some(timeout) = env_millis("MONGODB_CONNECT_TIMEOUT_MS")? {
            config = config.with_connection_option("connectTimeoutMS", timeout);
        }

        if let Some(timeout) = env_millis("MONGODB_SERVER_SELECTION_TIMEOUT_MS")? {
            config = config.with_connection_option("serverSelectionTimeoutMS", timeout);
        }

        if let Ok(app_name) = env::var("MONGODB_APP_NAME") {
            config = config.with_driver_option("appName", app_name);
        }

        Ok(config)
    }
}

fn env_millis(key: &str) -> Result<Option<i64>, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<u32>()
            .map(|ms| Some(i64::from(ms)))
            .map_err(|e| ConfigError::ParseError {
                key: key.to_string(),
                details: format!("{}", e),
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_config_builder() {
        let config = ResourceConfig::new()
            .with_server("mongodb://localhost:27017")
            .with_connection_option("connectTimeoutMS", 5)
            .with_connection_option("replicaSet", "rs0")
            .with_database("cache")
            .with_collection("entries");

        assert_eq!(config.server.as_deref(), Some("mongodb://localhost:27017"));
        let options = config.connection_options.unwrap();
        assert_eq!(options.get("connectTimeoutMS"), Some(&OptionValue::Int(5)));
        assert_eq!(options.get("replicaSet"), Some(&OptionValue::from("rs0")));
        assert_eq!(config.database.as_deref(), Some("cache"));
        assert_eq!(config.collection.as_deref(), Some("entries"));
        assert!(config.driver_options.is_none());
    }

    #[test]
    fn test_resource_config_deserializes_camel_case_and_ignores_unknown_keys() {
        let config: ResourceConfig = serde_json::from_value(serde_json::json!({
            "server": "mongodb://test:1234",
            "connectionOptions": { "connectTimeoutMS": 5, "ssl": true },
            "foo": "bar"
        }))
        .unwrap();

        assert_eq!(config.server.as_deref(), Some("mongodb://test:1234"));
        let options = config.connection_options.unwrap();
        assert_eq!(options.get("ssl"), Some(&OptionValue::Bool(true)));
        assert_eq!(options.get("connectTimeoutMS"), Some(&OptionValue::Int(5)));
        assert!(config.database.is_none());
    }

    #[test]
    fn test_option_values_must_be_scalars() {
        let result: Result<ResourceConfig, _> = serde_json::from_value(serde_json::json!({
            "driverOptions": { "context": { "tls": true } }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_option_value_display() {
        assert_eq!(OptionValue::from(true).to_string(), "true");
        assert_eq!(OptionValue::from(250).to_string(), "250");
        assert_eq!(OptionValue::from(0.5).to_string(), "0.5");
        assert_eq!(OptionValue::from("rs0").to_string(), "rs0");
    }

    #[test]
    fn test_empty_config() {
        assert!(ResourceConfig::new().is_empty());
        assert!(!ResourceConfig::new().with_database("").is_empty());
    }

    #[test]
    fn test_resource_config_from_env() {
        temp_env::with_vars(
            [
                ("MONGODB_URL", Some("mongodb://localhost:27017")),
                ("MONGODB_DATABASE", Some("testdb")),
                ("MONGODB_COLLECTION", Some("cache")),
                ("MONGODB_CONNECT_TIMEOUT_MS", Some("250")),
                ("MONGODB_SERVER_SELECTION_TIMEOUT_MS", None),
                ("MONGODB_APP_NAME", Some("cache-worker")),
            ],
            || {
                let config = ResourceConfig::from_env().unwrap();
                assert_eq!(config.server.as_deref(), Some("mongodb://localhost:27017"));
                assert_eq!(config.database.as_deref(), Some("testdb"));
                assert_eq!(config.collection.as_deref(), Some("cache"));

                let connection_options = config.connection_options.unwrap();
                assert_eq!(
                    connection_options.get("connectTimeoutMS"),
                    Some(&OptionValue::Int(250))
                );
                assert!(!connection_options.contains_key("serverSelectionTimeoutMS"));

                let driver_options = config.driver_options.unwrap();
                assert_eq!(
                    driver_options.get("appName"),
                    Some(&OptionValue::from("cache-worker"))
                );
            },
        );
    }

    #[test]
    fn test_resource_config_from_env_fallback() {
        temp_env::with_vars(
            [
                ("MONGODB_URL", None::<&str>),
                ("MONGO_URL", Some("mongodb://fallback:27017")),
                ("MONGODB_DATABASE", None::<&str>),
                ("MONGO_DATABASE", Some("fallbackdb")),
                ("MONGODB_COLLECTION", None::<&str>),
                ("MONGODB_CONNECT_TIMEOUT_MS", None::<&str>),
                ("MONGODB_SERVER_SELECTION_TIMEOUT_MS", None::<&str>),
                ("MONGODB_APP_NAME", None::<&str>),
            ],
            || {
                let config = ResourceConfig::from_env().unwrap();
                assert_eq!(config.server.as_deref(), Some("mongodb://fallback:27017"));
                assert_eq!(config.database.as_deref(), Some("fallbackdb"));
                assert!(config.collection.is_none());
                assert!(config.connection_options.is_none());
                assert!(config.driver_options.is_none());
            },
        );
    }

    #[test]
    fn test_resource_config_from_env_missing_url() {
        temp_env::with_vars(
            [("MONGODB_URL", None::<&str>), ("MONGO_URL", None::<&str>)],
            || {
                let err = ResourceConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("MONGODB_URL"));
                assert!(err.to_string().contains("required"));
            },
        );
    }

    #[test]
    fn test_resource_config_from_env_bad_timeout() {
        temp_env::with_vars(
            [
                ("MONGODB_URL", Some("mongodb://localhost:27017")),
                ("MONGODB_CONNECT_TIMEOUT_MS", Some("soon")),
            ],
            || {
                let err = ResourceConfig::from_env().unwrap_err();
                assert!(matches!(err, ConfigError::ParseError { ref key, .. } if key == "MONGODB_CONNECT_TIMEOUT_MS"));
            },
        );
    }
}
