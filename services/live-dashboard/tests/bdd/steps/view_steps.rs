//! BDD step definitions for the measurement view feature

use cucumber::gherkin::Step;
use cucumber::{given, then, when};

use live_dashboard::{LocalView, Measurement};

use crate::world::LiveDashboardWorld;

fn view_mut(world: &mut LiveDashboardWorld) -> &mut LocalView {
    world.view.get_or_insert_with(LocalView::new)
}

fn parse_rows(step: &Step) -> Vec<Measurement> {
    let table = step.table.as_ref().expect("step needs a table");
    table
        .rows
        .iter()
        .skip(1)
        .map(|row| {
            Measurement::new(
                row[0].parse().expect("id"),
                row[1].clone(),
                row[2].parse().expect("value"),
                row[3].clone(),
            )
        })
        .collect()
}

#[given("an empty measurement view")]
fn empty_view(world: &mut LiveDashboardWorld) {
    world.view = Some(LocalView::new());
}

#[given(expr = "a measurement view with capacity {int}")]
fn view_with_capacity(world: &mut LiveDashboardWorld, capacity: usize) {
    world.view = Some(LocalView::with_capacity(capacity));
}

#[when(expr = "the change {int} at {string} with value {float} from {string} arrives")]
fn change_arrives(world: &mut LiveDashboardWorld, id: i64, ts: String, value: f64, source: String) {
    view_mut(world).apply_change(Measurement::new(id, ts, value, source));
}

#[when(expr = "changes with ids {int} to {int} arrive in order")]
fn changes_in_order(world: &mut LiveDashboardWorld, first: i64, last: i64) {
    let view = view_mut(world);
    for id in first..=last {
        view.apply_change(Measurement::new(id, format!("t{}", id), id as f64, "S"));
    }
}

#[when("the snapshot is applied:")]
fn snapshot_applied(world: &mut LiveDashboardWorld, step: &Step) {
    view_mut(world).apply_snapshot(parse_rows(step));
}

#[then(expr = "the view should have {int} rows")]
fn view_len(world: &mut LiveDashboardWorld, expected: usize) {
    let v = world.view.as_ref().expect("view not set");
    assert_eq!(v.len(), expected);
}

#[then(expr = "the view ids should be {string}")]
fn view_ids(world: &mut LiveDashboardWorld, expected: String) {
    let v = world.view.as_ref().expect("view not set");
    let expected: Vec<i64> = expected
        .split(',')
        .map(|id| id.trim().parse().expect("id"))
        .collect();
    assert_eq!(v.ids(), expected);
}

#[then(expr = "the view ids should run from {int} down to {int}")]
fn view_ids_descending(world: &mut LiveDashboardWorld, high: i64, low: i64) {
    let v = world.view.as_ref().expect("view not set");
    let expected: Vec<i64> = (low..=high).rev().collect();
    assert_eq!(v.ids(), expected);
}

#[then(expr = "the latest measurement should be {int} with value {float} at {string}")]
fn latest_is(world: &mut LiveDashboardWorld, id: i64, value: f64, ts: String) {
    let v = world.view.as_ref().expect("view not set");
    let latest = v.latest().expect("view is empty");
    assert_eq!(latest.id, id);
    assert_eq!(latest.value, value);
    assert_eq!(latest.ts, ts);
}

#[then("the view should be exactly:")]
fn view_exactly(world: &mut LiveDashboardWorld, step: &Step) {
    let expected = parse_rows(step);
    let v = world.view.as_ref().expect("view not set");
    assert_eq!(v.rows(), expected.as_slice());
}
