//! BDD test world for the live dashboard service

use std::sync::Arc;

use cucumber::World;
use live_dashboard::session::Session;
use live_dashboard::state::StateHandle;
use live_dashboard::LocalView;

#[derive(Debug, Default, World)]
pub struct LiveDashboardWorld {
    // View testing
    pub view: Option<LocalView>,

    // Dashboard testing
    pub dashboard_state: Option<StateHandle>,
    pub response_status: Option<u16>,
    pub response_body: Option<String>,

    // Session testing
    pub snapshot_body: Option<String>,
    pub session: Option<Arc<Session>>,
}
