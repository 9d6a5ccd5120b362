//! Shared dashboard state written by the session flows and read by the dashboard

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::measurement::Measurement;
use crate::realtime::FeedEvent;
use crate::status::ConnectionStatus;
use crate::view::LocalView;

/// Error notice shown inline on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    ConfigurationMissing,
    SnapshotQueryFailed,
}

impl Notice {
    /// Fixed, localized message for the notice
    pub fn message(&self) -> &'static str {
        match self {
            Notice::ConfigurationMissing => "Fehlende Umgebungsvariablen für Supabase.",
            Notice::SnapshotQueryFailed => "Fehler beim Laden der Messwerte.",
        }
    }
}

/// State accessible by the session flows and the dashboard
#[derive(Debug, Clone, Serialize)]
pub struct DashboardState {
    pub table: String,
    pub rows: LocalView,
    pub status: ConnectionStatus,
    pub initial_loading: bool,
    pub notice: Option<Notice>,
}

impl DashboardState {
    pub fn new(table: impl Into<String>, view_capacity: usize) -> Self {
        Self {
            table: table.into(),
            rows: LocalView::with_capacity(view_capacity),
            status: ConnectionStatus::Initializing,
            initial_loading: true,
            notice: None,
        }
    }

    /// Replace the view with the snapshot and finish loading
    pub fn snapshot_loaded(&mut self, rows: Vec<Measurement>) {
        self.rows.apply_snapshot(rows);
        self.initial_loading = false;
    }

    /// Record a failed first load; loading and the notice never show together
    pub fn snapshot_failed(&mut self, notice: Notice) {
        self.notice = Some(notice);
        self.initial_loading = false;
    }

    pub fn apply_feed_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Change(row) => self.rows.apply_change(row),
            FeedEvent::Status(channel) => {
                let status = ConnectionStatus::from_channel(channel);
                if status != self.status {
                    tracing::info!("Realtime status {} -> {}", self.status, status);
                }
                self.status = status;
            }
        }
    }

    pub fn latest(&self) -> Option<&Measurement> {
        self.rows.latest()
    }

    /// Configuration failures replace the dashboard content
    pub fn configuration_missing(&self) -> bool {
        self.notice == Some(Notice::ConfigurationMissing)
    }
}

/// Thread-safe shared state handle
pub type StateHandle = Arc<RwLock<DashboardState>>;

pub fn new_state_handle(table: impl Into<String>, view_capacity: usize) -> StateHandle {
    Arc::new(RwLock::new(DashboardState::new(table, view_capacity)))
}
