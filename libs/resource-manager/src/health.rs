use std::time::Instant;

use crate::driver::CollectionHandle;

/// Health check status for a collection handle
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Whether the server answered
    pub healthy: bool,
    /// Optional message (e.g., error details)
    pub message: Option<String>,
    /// Response time in milliseconds
    pub response_time_ms: u64,
}

/// Check a handle with a single ping
///
/// # Example
/// ```ignore
/// use mongo_resource_manager::health::check_health;
///
/// let handle = manager.get_resource("cache").await?;
/// let healthy = check_health(handle.as_ref()).await;
/// ```
pub async fn check_health(handle: &dyn CollectionHandle) -> bool {
    handle.ping().await.is_ok()
}

/// Check a handle with timing information and error details
pub async fn check_health_detailed(handle: &dyn CollectionHandle) -> HealthStatus {
    let start = Instant::now();
    let result = handle.ping().await;
    let response_time_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(()) => HealthStatus {
            healthy: true,
            message: None,
            response_time_ms,
        },
        Err(e) => HealthStatus {
            healthy: false,
            message: Some(e.to_string()),
            response_time_ms,
        },
    }
}
