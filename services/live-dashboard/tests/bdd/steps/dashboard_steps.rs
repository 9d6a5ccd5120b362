//! BDD step definitions for the dashboard feature

use axum::body::Body;
use axum::http::Request;
use cucumber::{given, then, when};
use tower::ServiceExt;

use live_dashboard::dashboard::build_router;
use live_dashboard::measurement::Measurement;
use live_dashboard::realtime::FeedEvent;
use live_dashboard::state::{new_state_handle, Notice, StateHandle};
use live_dashboard::status::ChannelStatus;

use crate::world::LiveDashboardWorld;

fn parse_channel_status(s: &str) -> ChannelStatus {
    match s {
        "subscribed" => ChannelStatus::Subscribed,
        "channel error" => ChannelStatus::ChannelError,
        "closed" => ChannelStatus::Closed,
        other => panic!("Unknown channel status: {}", other),
    }
}

fn state(world: &LiveDashboardWorld) -> StateHandle {
    world
        .dashboard_state
        .as_ref()
        .expect("state not set")
        .clone()
}

#[given("a dashboard that is still loading")]
fn dashboard_loading(world: &mut LiveDashboardWorld) {
    world.dashboard_state = Some(new_state_handle("public.measurements", 200));
}

#[given(expr = "a dashboard with measurement {int} at {string} with value {float} from {string}")]
async fn dashboard_with_measurement(
    world: &mut LiveDashboardWorld,
    id: i64,
    ts: String,
    value: f64,
    source: String,
) {
    let handle = new_state_handle("public.measurements", 200);
    handle
        .write()
        .await
        .snapshot_loaded(vec![Measurement::new(id, ts, value, source)]);
    world.dashboard_state = Some(handle);
}

#[given("a dashboard whose snapshot was empty")]
async fn dashboard_empty(world: &mut LiveDashboardWorld) {
    let handle = new_state_handle("public.measurements", 200);
    handle.write().await.snapshot_loaded(Vec::new());
    world.dashboard_state = Some(handle);
}

#[given("a dashboard whose snapshot query failed")]
async fn dashboard_snapshot_failed(world: &mut LiveDashboardWorld) {
    let handle = new_state_handle("public.measurements", 200);
    handle
        .write()
        .await
        .snapshot_failed(Notice::SnapshotQueryFailed);
    world.dashboard_state = Some(handle);
}

#[given("a dashboard without backend configuration")]
async fn dashboard_unconfigured(world: &mut LiveDashboardWorld) {
    let handle = new_state_handle("public.measurements", 200);
    handle
        .write()
        .await
        .snapshot_failed(Notice::ConfigurationMissing);
    world.dashboard_state = Some(handle);
}

#[given(expr = "the realtime channel reported {string}")]
async fn channel_reported(world: &mut LiveDashboardWorld, status: String) {
    let handle = state(world);
    handle
        .write()
        .await
        .apply_feed_event(FeedEvent::Status(parse_channel_status(&status)));
}

#[when(expr = "{string} is requested")]
async fn request_path(world: &mut LiveDashboardWorld, path: String) {
    let app = build_router(state(world));
    let response = app
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    world.response_status = Some(response.status().as_u16());
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    world.response_body = Some(String::from_utf8(body.to_vec()).unwrap());
}

#[then(expr = "the response status should be {int}")]
fn response_status(world: &mut LiveDashboardWorld, expected: u16) {
    assert_eq!(world.response_status, Some(expected));
}

#[then(expr = "the response should contain {string}")]
fn response_contains(world: &mut LiveDashboardWorld, expected: String) {
    let body = world.response_body.as_ref().expect("no response body");
    assert!(
        body.contains(&expected),
        "Expected response to contain '{}', but it didn't.\nResponse body:\n{}",
        expected,
        body
    );
}

#[then(expr = "the response should not contain {string}")]
fn response_not_contains(world: &mut LiveDashboardWorld, unexpected: String) {
    let body = world.response_body.as_ref().expect("no response body");
    assert!(
        !body.contains(&unexpected),
        "Expected response not to contain '{}'.\nResponse body:\n{}",
        unexpected,
        body
    );
}

#[then(expr = "the JSON field {string} should be {string}")]
fn json_field(world: &mut LiveDashboardWorld, field: String, expected: String) {
    let body = world.response_body.as_ref().expect("no response body");
    let json: serde_json::Value = serde_json::from_str(body).unwrap();
    let actual = match &json[field.as_str()] {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    assert_eq!(actual, expected);
}

#[then(expr = "the JSON array should have {int} entries")]
fn json_array_len(world: &mut LiveDashboardWorld, expected: usize) {
    let body = world.response_body.as_ref().expect("no response body");
    let json: Vec<serde_json::Value> = serde_json::from_str(body).unwrap();
    assert_eq!(json.len(), expected);
}
