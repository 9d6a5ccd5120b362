//! One-shot read of the newest rows

use crate::config::{BackendConfig, TableConfig};
use crate::error::DashboardError;
use crate::io::HttpClient;
use crate::measurement::Measurement;

/// Fetch the newest `snapshot_limit` rows ordered by timestamp descending.
///
/// A single attempt; transport errors, non-2xx replies and undecodable
/// bodies all come back as [`DashboardError::SnapshotQueryFailed`].
pub async fn load_snapshot(
    http: &dyn HttpClient,
    backend: &BackendConfig,
    table: &TableConfig,
) -> crate::Result<Vec<Measurement>> {
    let url = backend.snapshot_url(table);
    let bearer = format!("Bearer {}", backend.api_key);
    let headers = [
        ("apikey", backend.api_key.as_str()),
        ("Authorization", bearer.as_str()),
        ("Accept", "application/json"),
    ];

    let response = http
        .get(url.as_str(), &headers)
        .await
        .map_err(|e| DashboardError::SnapshotQueryFailed(e.to_string()))?;

    if !response.is_success() {
        return Err(DashboardError::SnapshotQueryFailed(format!(
            "{} returned status {}: {}",
            table.qualified_name(),
            response.status,
            response.body
        )));
    }

    let rows: Vec<Measurement> = serde_json::from_str(&response.body).map_err(|e| {
        DashboardError::SnapshotQueryFailed(format!("Decoding {} rows: {}", table.name, e))
    })?;

    tracing::debug!(
        "Loaded {} rows from {}",
        rows.len(),
        table.qualified_name()
    );
    Ok(rows)
}
