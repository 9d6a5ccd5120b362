//! Backend client and its memoizing factory

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::config::{BackendConfig, Config, RealtimeConfig, TableConfig};
use crate::error::DashboardError;
use crate::io::{HttpClient, ReqwestHttpClient, SocketConnector, WsSocketConnector};
use crate::measurement::Measurement;
use crate::realtime::{ChangeStreamSubscriber, Subscription};
use crate::snapshot::load_snapshot;

/// Resolves backend connection parameters
pub type ConfigResolver = Box<dyn Fn() -> crate::Result<BackendConfig> + Send + Sync>;

/// Handle to the remote backend
pub struct BackendClient {
    backend: BackendConfig,
    table: TableConfig,
    realtime: RealtimeConfig,
    http: Arc<dyn HttpClient>,
    sockets: Arc<dyn SocketConnector>,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("backend", &self.backend)
            .field("table", &self.table.qualified_name())
            .finish()
    }
}

impl BackendClient {
    pub fn new(
        backend: BackendConfig,
        table: TableConfig,
        realtime: RealtimeConfig,
        http: Arc<dyn HttpClient>,
        sockets: Arc<dyn SocketConnector>,
    ) -> Self {
        Self {
            backend,
            table,
            realtime,
            http,
            sockets,
        }
    }

    pub fn backend(&self) -> &BackendConfig {
        &self.backend
    }

    pub fn table(&self) -> &TableConfig {
        &self.table
    }

    /// Fetch the newest rows of the table, newest timestamp first
    pub async fn load_snapshot(&self) -> crate::Result<Vec<Measurement>> {
        load_snapshot(self.http.as_ref(), &self.backend, &self.table).await
    }

    /// Open the change stream for the table
    pub async fn subscribe(&self) -> crate::Result<Subscription> {
        ChangeStreamSubscriber::new(
            self.backend.clone(),
            self.table.clone(),
            self.realtime.clone(),
            Arc::clone(&self.sockets),
        )
        .subscribe()
        .await
    }
}

/// Builds the backend client once and hands out the cached instance
///
/// A failed construction is not cached; the next call resolves the
/// configuration again.
pub struct ClientFactory {
    resolve: ConfigResolver,
    table: TableConfig,
    realtime: RealtimeConfig,
    http: Arc<dyn HttpClient>,
    sockets: Arc<dyn SocketConnector>,
    cell: OnceCell<Arc<BackendClient>>,
}

impl ClientFactory {
    pub fn new(
        resolve: ConfigResolver,
        config: &Config,
        http: Arc<dyn HttpClient>,
        sockets: Arc<dyn SocketConnector>,
    ) -> Self {
        Self {
            resolve,
            table: config.table.clone(),
            realtime: config.realtime.clone(),
            http,
            sockets,
            cell: OnceCell::new(),
        }
    }

    /// Factory resolving the backend from the process environment
    pub fn from_env(config: &Config) -> Self {
        Self::new(
            Box::new(BackendConfig::from_env),
            config,
            Arc::new(ReqwestHttpClient::default()),
            Arc::new(WsSocketConnector),
        )
    }

    /// Get the shared client, constructing it on first use
    pub async fn client(&self) -> crate::Result<Arc<BackendClient>> {
        self.cell
            .get_or_try_init(|| async {
                let backend = (self.resolve)()?;
                tracing::info!("Created backend client for {}", backend.url);
                Ok::<_, DashboardError>(Arc::new(BackendClient::new(
                    backend,
                    self.table.clone(),
                    self.realtime.clone(),
                    Arc::clone(&self.http),
                    Arc::clone(&self.sockets),
                )))
            })
            .await
            .map(Arc::clone)
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}
