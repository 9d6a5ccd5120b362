//! Live Dashboard - live view of a measurements table
//!
//! Loads a snapshot of the most recent rows, follows row changes over the
//! Realtime websocket, and serves the merged view as a web dashboard.

pub mod client;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod io;
pub mod measurement;
pub mod presentation;
pub mod realtime;
pub mod session;
pub mod snapshot;
pub mod state;
pub mod status;
pub mod view;

pub use config::{load_config, Config};
pub use error::{DashboardError, Result};
pub use measurement::Measurement;
pub use view::LocalView;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::client::ClientFactory;
use crate::session::Session;
use crate::state::StateHandle;

/// Serve the dashboard until `cancel` fires
pub async fn serve_dashboard(state: StateHandle, port: u16, cancel: CancellationToken) -> Result<()> {
    let router = dashboard::build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        DashboardError::Dashboard(format!("Failed to bind dashboard to port {}: {}", port, e))
    })?;
    tracing::info!("Dashboard listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
        })
        .await?;

    tracing::debug!("Dashboard stopped");
    Ok(())
}

/// Run the live dashboard with the given configuration
pub async fn run(config: Config) -> Result<()> {
    let cancel = CancellationToken::new();
    let factory = Arc::new(ClientFactory::from_env(&config));
    let state = state::new_state_handle(config.table.qualified_name(), config.table.view_capacity);

    // Setup shutdown handler
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => tracing::error!("Failed to listen for ctrl-c: {}", e),
        }
        cancel_for_signal.cancel();
    });

    let dashboard = if config.dashboard.enabled {
        let dashboard_state = Arc::clone(&state);
        let port = config.dashboard.port;
        let cancel_for_dashboard = cancel.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = serve_dashboard(dashboard_state, port, cancel_for_dashboard).await {
                tracing::error!("{}. Continuing without dashboard.", e);
            }
        }))
    } else {
        None
    };

    let session = Session::new(factory, state);
    session.start().await;
    tracing::info!("Live dashboard started for {}", config.table.qualified_name());

    cancel.cancelled().await;

    session.teardown().await;
    if let Some(dashboard) = dashboard {
        dashboard.await.ok();
    }
    tracing::info!("Live dashboard stopped");

    Ok(())
}
