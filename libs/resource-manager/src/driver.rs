//! Collaborator boundary between the resource manager and a database driver.
//!
//! The manager only ever talks to these traits, so the MongoDB driver can be
//! swapped for another implementation or mocked in tests.

use async_trait::async_trait;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::config::Options;
use crate::error::DriverResult;

/// Opaque handle to a usable database collection
///
/// Implementations expose only what the rest of the system needs; callers
/// that need the concrete driver type can downcast through [`as_any`](Self::as_any).
#[async_trait]
pub trait CollectionHandle: fmt::Debug + Send + Sync {
    /// Name of the database the collection lives in
    fn database_name(&self) -> &str;

    /// Name of the collection
    fn collection_name(&self) -> &str;

    /// Round-trip a lightweight command to the server
    async fn ping(&self) -> DriverResult<()>;

    fn as_any(&self) -> &dyn Any;
}

/// Shared handle stored by the manager and returned to callers
pub type SharedHandle = Arc<dyn CollectionHandle>;

/// An open connection produced by [`Driver::open_connection`]
#[cfg_attr(test, mockall::automock)]
pub trait Connection: Send + Sync {
    /// Select a collection within a database on this connection
    ///
    /// Empty names are passed through; the driver decides what they mean.
    fn select_collection(&self, database: &str, collection: &str) -> DriverResult<SharedHandle>;
}

/// Driver able to open connections to a server
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Driver: Send + Sync {
    /// Open a connection to `server`
    ///
    /// A single attempt is made. Implementations must honour timeouts found
    /// in `connection_options` so that unreachable endpoints fail promptly.
    async fn open_connection(
        &self,
        server: &str,
        connection_options: &Options,
        driver_options: &Options,
    ) -> DriverResult<Box<dyn Connection>>;
}
