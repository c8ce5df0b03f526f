//! Resource manager for MongoDB collection handles
//!
//! Callers register configuration (server, connection options, driver
//! options, database, collection) or a ready-made handle under an id, then
//! ask for the handle by id. The manager builds it on first use through a
//! [`Driver`] and caches it for the lifetime of the record.
//!
//! # Features
//!
//! - `mongodb` (default) - [`mongodb::MongoDriver`] built on the official driver
//!
//! # Examples
//!
//! ## Lazy construction
//!
//! ```ignore
//! use mongo_resource_manager::ResourceManager;
//! use serde_json::json;
//!
//! let manager = ResourceManager::mongodb();
//! manager
//!     .set_resource(
//!         "cache",
//!         json!({
//!             "server": "mongodb://localhost:27017",
//!             "connectionOptions": { "connectTimeoutMS": 500 },
//!             "database": "app",
//!             "collection": "cache"
//!         }),
//!     )
//!     .await?;
//!
//! let handle = manager.get_resource("cache").await?;
//! ```
//!
//! ## Configuration from the environment
//!
//! ```ignore
//! use mongo_resource_manager::{FromEnv, ResourceConfig, ResourceManager};
//!
//! let manager = ResourceManager::mongodb();
//! manager.set_resource("cache", ResourceConfig::from_env()?).await?;
//! ```
//!
//! ## Custom drivers
//!
//! ```ignore
//! use mongo_resource_manager::{Driver, ResourceManager};
//!
//! let manager = ResourceManager::new(MyDriver::default());
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod health;
pub mod manager;

#[cfg(feature = "mongodb")]
pub mod mongodb;

// Re-exports for convenience
pub use config::{ConfigError, FromEnv, OptionValue, Options, ResourceConfig};
pub use driver::{CollectionHandle, Connection, Driver, SharedHandle};
pub use error::{DriverError, DriverResult, ResourceError, ResourceResult};
pub use health::{HealthStatus, check_health, check_health_detailed};
pub use manager::{ResourceInput, ResourceManager};
