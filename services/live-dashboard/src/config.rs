//! Configuration types for the live dashboard service
//!
//! Non-secret settings come from an optional JSON file. The backend URL and
//! access key are resolved from the process environment when the backend
//! client is first built.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use url::Url;

use crate::error::DashboardError;

/// Environment variable holding the backend project URL
pub const URL_ENV: &str = "SUPABASE_URL";

/// Environment variable holding the backend anon access key
pub const KEY_ENV: &str = "SUPABASE_ANON_KEY";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub table: TableConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// The watched table and how much of it is kept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_table")]
    pub name: String,
    #[serde(default = "default_order_column")]
    pub order_column: String,
    #[serde(default = "default_snapshot_limit")]
    pub snapshot_limit: usize,
    #[serde(default = "default_view_capacity")]
    pub view_capacity: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            schema: default_schema(),
            name: default_table(),
            order_column: default_order_column(),
            snapshot_limit: default_snapshot_limit(),
            view_capacity: default_view_capacity(),
        }
    }
}

impl TableConfig {
    /// `schema.table`, as shown on the dashboard
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    /// Realtime channel topic for this table
    pub fn topic(&self) -> String {
        format!("realtime:{}:{}", self.schema, self.name)
    }
}

/// Change stream settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_seconds: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_seconds: default_heartbeat_interval(),
        }
    }
}

/// Dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_dashboard_port")]
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_dashboard_port(),
        }
    }
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_table() -> String {
    "measurements".to_string()
}

fn default_order_column() -> String {
    "ts".to_string()
}

fn default_snapshot_limit() -> usize {
    50
}

fn default_view_capacity() -> usize {
    crate::view::VIEW_CAPACITY
}

fn default_heartbeat_interval() -> u64 {
    25
}

fn default_true() -> bool {
    true
}

fn default_dashboard_port() -> u16 {
    11120
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        DashboardError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}

/// Connection parameters for the backend
#[derive(Clone, PartialEq)]
pub struct BackendConfig {
    pub url: Url,
    pub api_key: String,
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url.as_str())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl BackendConfig {
    /// Resolve from the process environment
    pub fn from_env() -> crate::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = lookup(URL_ENV).unwrap_or_default();
        let api_key = lookup(KEY_ENV).unwrap_or_default();

        let url = Url::parse(raw_url.trim()).map_err(|e| {
            tracing::debug!("{} is not a valid URL: {}", URL_ENV, e);
            missing()
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            tracing::debug!("{} has unsupported scheme '{}'", URL_ENV, url.scheme());
            return Err(missing());
        }

        let api_key = api_key.trim().to_string();
        if api_key.is_empty() {
            tracing::debug!("{} is empty", KEY_ENV);
            return Err(missing());
        }

        Ok(Self { url, api_key })
    }

    /// PostgREST URL returning the newest `limit` rows of `table`
    pub fn snapshot_url(&self, table: &TableConfig) -> Url {
        let mut url = self.url.clone();
        let path = format!("{}/rest/v1/{}", url.path().trim_end_matches('/'), table.name);
        url.set_path(&path);
        url.query_pairs_mut()
            .clear()
            .append_pair("select", "*")
            .append_pair("order", &format!("{}.desc", table.order_column))
            .append_pair("limit", &table.snapshot_limit.to_string());
        url
    }

    /// Realtime websocket URL
    pub fn realtime_url(&self) -> crate::Result<Url> {
        let mut url = self.url.clone();
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme).map_err(|_| {
            DashboardError::Config(format!("Cannot derive websocket URL from {}", self.url))
        })?;
        let path = format!(
            "{}/realtime/v1/websocket",
            url.path().trim_end_matches('/')
        );
        url.set_path(&path);
        url.query_pairs_mut()
            .clear()
            .append_pair("apikey", &self.api_key)
            .append_pair("vsn", "1.0.0");
        Ok(url)
    }
}

fn missing() -> DashboardError {
    DashboardError::ConfigurationMissing(format!("{} and {} must be set", URL_ENV, KEY_ENV))
}
