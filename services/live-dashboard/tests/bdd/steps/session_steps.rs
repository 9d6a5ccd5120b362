//! BDD step definitions for the session feature

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cucumber::gherkin::Step;
use cucumber::{given, then, when};

use live_dashboard::client::{ClientFactory, ConfigResolver};
use live_dashboard::config::{BackendConfig, Config, KEY_ENV, URL_ENV};
use live_dashboard::io::{HttpClient, HttpResponse, SocketConnector, SocketPair};
use live_dashboard::session::Session;
use live_dashboard::state::{new_state_handle, DashboardState};
use live_dashboard::status::ConnectionStatus;
use live_dashboard::DashboardError;

use crate::world::LiveDashboardWorld;

/// Answers every GET with a fixed body
struct FixedHttpClient {
    status: u16,
    body: String,
}

#[async_trait]
impl HttpClient for FixedHttpClient {
    async fn get(&self, _url: &str, _headers: &[(&str, &str)]) -> live_dashboard::Result<HttpResponse> {
        Ok(HttpResponse {
            status: self.status,
            body: self.body.clone(),
        })
    }
}

/// Realtime endpoint that is never reachable
struct UnreachableConnector;

#[async_trait]
impl SocketConnector for UnreachableConnector {
    async fn connect(&self, _url: &str) -> live_dashboard::Result<SocketPair> {
        Err(DashboardError::SubscriptionChannel(
            "connection refused".to_string(),
        ))
    }
}

fn configured() -> ConfigResolver {
    Box::new(|| {
        BackendConfig::from_lookup(|name| match name {
            URL_ENV => Some("https://example.supabase.co".to_string()),
            KEY_ENV => Some("anon".to_string()),
            _ => None,
        })
    })
}

fn unconfigured() -> ConfigResolver {
    Box::new(|| BackendConfig::from_lookup(|_| None))
}

async fn start_session(world: &mut LiveDashboardWorld, resolve: ConfigResolver, status: u16) {
    let body = world.snapshot_body.clone().unwrap_or_else(|| "[]".to_string());
    let factory = ClientFactory::new(
        resolve,
        &Config::default(),
        Arc::new(FixedHttpClient { status, body }),
        Arc::new(UnreachableConnector),
    );
    let state = new_state_handle("public.measurements", 200);
    let session = Arc::new(Session::new(Arc::new(factory), state.clone()));
    session.start().await;
    world.dashboard_state = Some(state);
    world.session = Some(session);
}

async fn settled(world: &LiveDashboardWorld) -> DashboardState {
    let state = world.dashboard_state.as_ref().expect("state not set");
    for _ in 0..200 {
        {
            let s = state.read().await;
            if !s.initial_loading && s.status != ConnectionStatus::Initializing {
                return s.clone();
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("session never settled");
}

#[given("the backend holds the snapshot:")]
fn backend_snapshot(world: &mut LiveDashboardWorld, step: &Step) {
    world.snapshot_body = step.docstring.clone();
}

#[when("a session starts against the configured backend")]
async fn session_configured(world: &mut LiveDashboardWorld) {
    start_session(world, configured(), 200).await;
}

#[when("a session starts against a backend that rejects the query")]
async fn session_rejected(world: &mut LiveDashboardWorld) {
    start_session(world, configured(), 500).await;
}

#[when("a session starts without backend configuration")]
async fn session_unconfigured(world: &mut LiveDashboardWorld) {
    start_session(world, unconfigured(), 200).await;
}

#[when("the session is torn down twice")]
async fn teardown_twice(world: &mut LiveDashboardWorld) {
    let session = world.session.as_ref().expect("session not started");
    session.teardown().await;
    session.teardown().await;
}

#[then(expr = "the session view ids should be {string}")]
async fn session_ids(world: &mut LiveDashboardWorld, expected: String) {
    let state = settled(world).await;
    let expected: Vec<i64> = expected
        .split(',')
        .map(|id| id.trim().parse().expect("id"))
        .collect();
    assert_eq!(state.rows.ids(), expected);
}

#[then("the session view should be empty")]
async fn session_empty(world: &mut LiveDashboardWorld) {
    let state = settled(world).await;
    assert!(state.rows.is_empty());
}

#[then(expr = "the connection status should be {string}")]
async fn connection_status(world: &mut LiveDashboardWorld, expected: String) {
    let state = settled(world).await;
    assert_eq!(state.status.to_string(), expected);
}

#[then(expr = "the notice should read {string}")]
async fn notice_reads(world: &mut LiveDashboardWorld, expected: String) {
    let state = settled(world).await;
    let notice = state.notice.expect("no notice");
    assert_eq!(notice.message(), expected);
}

#[then("no notice should be shown")]
async fn no_notice(world: &mut LiveDashboardWorld) {
    let state = settled(world).await;
    assert!(state.notice.is_none());
}

#[then("the session should be inactive")]
fn session_inactive(world: &mut LiveDashboardWorld) {
    let session = world.session.as_ref().expect("session not started");
    assert!(!session.is_active());
}
