//! Error types for the live dashboard service

/// Errors that can occur in the live dashboard service
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("Snapshot query failed: {0}")]
    SnapshotQueryFailed(String),

    #[error("Subscription channel error: {0}")]
    SubscriptionChannel(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Dashboard error: {0}")]
    Dashboard(String),
}

/// Result type alias for live dashboard operations
pub type Result<T> = std::result::Result<T, DashboardError>;
