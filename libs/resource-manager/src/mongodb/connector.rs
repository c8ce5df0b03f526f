use async_trait::async_trait;
use mongodb::{Client, bson::doc, options::ClientOptions};
use std::sync::Arc;
use tracing::info;

use super::MongoCollection;
use crate::config::{OptionValue, Options};
use crate::driver::{Connection, Driver, SharedHandle};
use crate::error::{DriverError, DriverResult};

/// Driver opening MongoDB connections
///
/// Connection options are MongoDB URI options (`connectTimeoutMS`,
/// `serverSelectionTimeoutMS`, `replicaSet`, `tls`, ...) and are appended
/// to the server URI before parsing. When no server selection timeout is
/// configured the connect timeout is used for it, so an unreachable server
/// fails after a single attempt instead of the driver's 30 second default.
///
/// Driver options tune the client itself:
/// - `appName` (string)
/// - `maxPoolSize`, `minPoolSize` (integer)
/// - `retryReads`, `retryWrites` (bool)
/// - `pingOnConnect` (bool, default: true) - verify the server with `ping`
///
/// # Example
/// ```ignore
/// use mongo_resource_manager::mongodb::MongoDriver;
/// use mongo_resource_manager::{Driver, Options};
///
/// let connection = MongoDriver::new()
///     .open_connection("mongodb://localhost:27017", &Options::new(), &Options::new())
///     .await?;
/// let handle = connection.select_collection("app", "cache")?;
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoDriver;

impl MongoDriver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Driver for MongoDriver {
    async fn open_connection(
        &self,
        server: &str,
        connection_options: &Options,
        driver_options: &Options,
    ) -> DriverResult<Box<dyn Connection>> {
        let settings = DriverSettings::from_options(driver_options)?;
        let ping_on_connect = settings.ping_on_connect;

        info!("Attempting to connect to MongoDB at {}", redact_credentials(server));

        let mut options = ClientOptions::parse(connection_string(server, connection_options)).await?;
        if options.server_selection_timeout.is_none() {
            options.server_selection_timeout = options.connect_timeout;
        }
        settings.apply(&mut options);

        let client = Client::with_options(options)?;

        if ping_on_connect {
            client
                .database("admin")
                .run_command(doc! { "ping": 1 })
                .await
                .map_err(|e| DriverError::ConnectionFailed(e.to_string()))?;
        }

        info!("Successfully connected to MongoDB");
        Ok(Box::new(MongoConnection::new(client)))
    }
}

/// Connection wrapping a MongoDB [`Client`]
#[derive(Debug, Clone)]
pub struct MongoConnection {
    client: Client,
}

impl MongoConnection {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl Connection for MongoConnection {
    /// An empty database name selects the default database of the server URI.
    fn select_collection(&self, database: &str, collection: &str) -> DriverResult<SharedHandle> {
        if collection.is_empty() {
            return Err(DriverError::InvalidNamespace(
                "collection name is empty".to_string(),
            ));
        }

        let database = if database.is_empty() {
            self.client.default_database().ok_or_else(|| {
                DriverError::InvalidNamespace(
                    "database name is empty and the server URI names no default database"
                        .to_string(),
                )
            })?
        } else {
            self.client.database(database)
        };

        Ok(Arc::new(MongoCollection::new(database, collection)))
    }
}

/// Client-level settings parsed from driver options
#[derive(Debug)]
struct DriverSettings {
    app_name: Option<String>,
    max_pool_size: Option<u32>,
    min_pool_size: Option<u32>,
    retry_reads: Option<bool>,
    retry_writes: Option<bool>,
    ping_on_connect: bool,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            app_name: None,
            max_pool_size: None,
            min_pool_size: None,
            retry_reads: None,
            retry_writes: None,
            ping_on_connect: true,
        }
    }
}

impl DriverSettings {
    fn from_options(options: &Options) -> DriverResult<Self> {
        let mut settings = Self::default();

        for (key, value) in options {
            match key.as_str() {
                "appName" => settings.app_name = Some(expect_str(key, value)?.to_string()),
                "maxPoolSize" => settings.max_pool_size = Some(expect_pool_size(key, value)?),
                "minPoolSize" => settings.min_pool_size = Some(expect_pool_size(key, value)?),
                "retryReads" => settings.retry_reads = Some(expect_bool(key, value)?),
                "retryWrites" => settings.retry_writes = Some(expect_bool(key, value)?),
                "pingOnConnect" => settings.ping_on_connect = expect_bool(key, value)?,
                _ => return Err(invalid_option(key, "unsupported driver option")),
            }
        }

        Ok(settings)
    }

    fn apply(self, options: &mut ClientOptions) {
        if self.app_name.is_some() {
            options.app_name = self.app_name;
        }
        if self.max_pool_size.is_some() {
            options.max_pool_size = self.max_pool_size;
        }
        if self.min_pool_size.is_some() {
            options.min_pool_size = self.min_pool_size;
        }
        if self.retry_reads.is_some() {
            options.retry_reads = self.retry_reads;
        }
        if self.retry_writes.is_some() {
            options.retry_writes = self.retry_writes;
        }
    }
}

fn invalid_option(key: &str, reason: &str) -> DriverError {
    DriverError::InvalidOption {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn expect_str<'a>(key: &str, value: &'a OptionValue) -> DriverResult<&'a str> {
    value
        .as_str()
        .ok_or_else(|| invalid_option(key, "expected a string"))
}

fn expect_bool(key: &str, value: &OptionValue) -> DriverResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| invalid_option(key, "expected a boolean"))
}

fn expect_pool_size(key: &str, value: &OptionValue) -> DriverResult<u32> {
    value
        .as_i64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| invalid_option(key, "expected a non-negative integer"))
}

/// Append connection options to `server` as URI query options
fn connection_string(server: &str, options: &Options) -> String {
    if options.is_empty() {
        return server.to_string();
    }

    let query = options
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(&value.to_string())
            )
        })
        .collect::<Vec<_>>()
        .join("&");

    let separator = if server.ends_with('?') || server.ends_with('&') {
        ""
    } else if server.contains('?') {
        "&"
    } else if has_path(server) {
        "?"
    } else {
        "/?"
    };

    format!("{}{}{}", server, separator, query)
}

fn has_path(server: &str) -> bool {
    server
        .split_once("://")
        .is_some_and(|(_, rest)| rest.contains('/'))
}

/// Hide the userinfo part of a connection string
fn redact_credentials(server: &str) -> String {
    let Some((scheme, rest)) = server.split_once("://") else {
        return server.to_string();
    };

    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{}://***@{}", scheme, &rest[at + 1..]),
        None => server.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::CollectionHandle;
    use std::time::Duration;

    fn options(pairs: &[(&str, OptionValue)]) -> Options {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_connection_string_without_options() {
        assert_eq!(
            connection_string("mongodb://localhost:27017", &Options::new()),
            "mongodb://localhost:27017"
        );
    }

    #[test]
    fn test_connection_string_appends_query() {
        let opts = options(&[
            ("connectTimeoutMS", OptionValue::Int(5)),
            ("appName", OptionValue::from("cache worker")),
        ]);

        assert_eq!(
            connection_string("mongodb://localhost:27017", &opts),
            "mongodb://localhost:27017/?appName=cache%20worker&connectTimeoutMS=5"
        );
        assert_eq!(
            connection_string("mongodb://localhost:27017/app", &opts),
            "mongodb://localhost:27017/app?appName=cache%20worker&connectTimeoutMS=5"
        );
        assert_eq!(
            connection_string("mongodb://localhost:27017/app?tls=false", &opts),
            "mongodb://localhost:27017/app?tls=false&appName=cache%20worker&connectTimeoutMS=5"
        );
    }

    #[test]
    fn test_redact_credentials() {
        assert_eq!(
            redact_credentials("mongodb://user:s3cret@db:27017/app"),
            "mongodb://***@db:27017/app"
        );
        assert_eq!(redact_credentials("mongodb://db:27017"), "mongodb://db:27017");
        assert_eq!(redact_credentials("not a uri"), "not a uri");
    }

    #[test]
    fn test_driver_settings_parse() {
        let settings = DriverSettings::from_options(&options(&[
            ("appName", OptionValue::from("worker")),
            ("maxPoolSize", OptionValue::Int(20)),
            ("retryWrites", OptionValue::Bool(false)),
            ("pingOnConnect", OptionValue::Bool(false)),
        ]))
        .unwrap();

        assert_eq!(settings.app_name.as_deref(), Some("worker"));
        assert_eq!(settings.max_pool_size, Some(20));
        assert_eq!(settings.min_pool_size, None);
        assert_eq!(settings.retry_writes, Some(false));
        assert!(!settings.ping_on_connect);
    }

    #[test]
    fn test_driver_settings_reject_unknown_and_mistyped_options() {
        let err = DriverSettings::from_options(&options(&[("context", OptionValue::from("tls"))]))
            .unwrap_err();
        assert!(matches!(err, DriverError::InvalidOption { ref key, .. } if key == "context"));

        let err = DriverSettings::from_options(&options(&[("maxPoolSize", OptionValue::Int(-1))]))
            .unwrap_err();
        assert!(matches!(err, DriverError::InvalidOption { ref key, .. } if key == "maxPoolSize"));

        let err = DriverSettings::from_options(&options(&[("retryReads", OptionValue::from("yes"))]))
            .unwrap_err();
        assert!(matches!(err, DriverError::InvalidOption { .. }));
    }

    #[tokio::test]
    async fn test_driver_settings_apply() {
        let mut client_options = ClientOptions::parse("mongodb://localhost:27017")
            .await
            .unwrap();
        let settings = DriverSettings::from_options(&options(&[
            ("appName", OptionValue::from("worker")),
            ("minPoolSize", OptionValue::Int(2)),
        ]))
        .unwrap();

        settings.apply(&mut client_options);

        assert_eq!(client_options.app_name.as_deref(), Some("worker"));
        assert_eq!(client_options.min_pool_size, Some(2));
        assert_eq!(client_options.max_pool_size, None);
    }

    #[tokio::test]
    async fn test_connection_options_reach_client_options() {
        let opts = options(&[("connectTimeoutMS", OptionValue::Int(250))]);
        let client_options = ClientOptions::parse(connection_string("mongodb://localhost:27017", &opts))
            .await
            .unwrap();

        assert_eq!(client_options.connect_timeout, Some(Duration::from_millis(250)));
    }

    #[tokio::test]
    async fn test_select_collection_uses_default_database() {
        let client = Client::with_uri_str("mongodb://localhost:27017/app").await.unwrap();
        let connection = MongoConnection::new(client);

        let handle = connection.select_collection("", "cache").unwrap();
        assert_eq!(handle.database_name(), "app");
        assert_eq!(handle.collection_name(), "cache");

        let handle = connection.select_collection("other", "cache").unwrap();
        assert_eq!(handle.database_name(), "other");
    }

    #[tokio::test]
    async fn test_select_collection_rejects_empty_names() {
        let client = Client::with_uri_str("mongodb://localhost:27017").await.unwrap();
        let connection = MongoConnection::new(client);

        assert!(matches!(
            connection.select_collection("app", ""),
            Err(DriverError::InvalidNamespace(_))
        ));
        assert!(matches!(
            connection.select_collection("", "cache"),
            Err(DriverError::InvalidNamespace(_))
        ));
    }

    #[tokio::test]
    #[ignore] // Requires actual MongoDB
    async fn test_open_connection() {
        let mongo_url = std::env::var("MONGODB_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

        let result = MongoDriver::new()
            .open_connection(&mongo_url, &Options::new(), &Options::new())
            .await;
        assert!(result.is_ok());
    }
}
