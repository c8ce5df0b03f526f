use std::convert::Infallible;

/// Errors reported by the driver collaborator while opening a connection
/// or selecting a collection.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// MongoDB driver errors (URI parsing, server selection, command failures)
    #[cfg(feature = "mongodb")]
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// The endpoint could not be reached or refused the connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// An option key or value the driver does not accept
    #[error("Invalid option '{key}': {reason}")]
    InvalidOption { key: String, reason: String },

    /// Database or collection name that cannot be resolved
    #[error("Invalid namespace: {0}")]
    InvalidNamespace(String),
}

pub type DriverResult<T> = Result<T, DriverError>;

/// Errors surfaced by [`ResourceManager`](crate::ResourceManager) operations.
///
/// Every error is scoped to the identifier it was raised for; no other
/// record is affected.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// Input to `set_resource` is neither a collection handle nor a configuration mapping
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No record is registered under the identifier
    #[error("No resource with id '{0}'")]
    UnknownResource(String),

    /// The driver failed to build the handle; the record is left untouched
    #[error("Failed to construct resource '{id}': {source}")]
    ConstructionFailed {
        id: String,
        #[source]
        source: DriverError,
    },
}

impl ResourceError {
    pub fn is_unknown_resource(&self) -> bool {
        matches!(self, ResourceError::UnknownResource(_))
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, ResourceError::InvalidArgument(_))
    }

    pub fn is_construction_failed(&self) -> bool {
        matches!(self, ResourceError::ConstructionFailed { .. })
    }
}

// Lets `set_resource` take anything convertible into a `ResourceInput`,
// infallibly or not.
impl From<Infallible> for ResourceError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

/// Result type alias for resource manager operations
pub type ResourceResult<T> = Result<T, ResourceError>;
