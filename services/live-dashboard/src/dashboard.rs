//! Web dashboard with JSON API endpoints

use axum::extract::State;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;

use crate::presentation::{
    escape_html, format_percent, format_timestamp, status_color, status_label, LOADING, NO_DATA,
    NO_DATA_LOADED,
};
use crate::state::{DashboardState, StateHandle};

/// Dashboard application state
#[derive(Clone)]
pub struct AppState {
    pub state: StateHandle,
}

/// Build the dashboard axum router
pub fn build_router(state: StateHandle) -> Router {
    let app_state = AppState { state };

    Router::new()
        .route("/", get(index_handler))
        .route("/api/state", get(state_handler))
        .route("/api/measurements", get(measurements_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}

const CELL: &str = r#"style="padding: 0.5rem;""#;
const CARD: &str = r#"style="flex: 1; border: 1px solid #dee2e6; border-radius: 0.5rem; padding: 1rem;""#;

fn latest_card(state: &DashboardState) -> String {
    match state.latest() {
        Some(latest) => format!(
            r#"<div style="font-size: 2.5rem; font-weight: 600;">{}</div>
            <div>Quelle: {}</div>
            <div>Zeit: {}</div>"#,
            format_percent(latest.value),
            escape_html(&latest.source),
            escape_html(&format_timestamp(&latest.ts)),
        ),
        None if state.initial_loading => format!("<div>{}</div>", LOADING),
        None => format!("<div>{}</div>", NO_DATA_LOADED),
    }
}

fn status_card(state: &DashboardState) -> String {
    let notice = state
        .notice
        .map(|n| {
            format!(
                r#"<div style="margin-top: 0.5rem; color: #721c24; background-color: #f8d7da; padding: 0.5rem; border-radius: 0.25rem;">{}</div>"#,
                n.message()
            )
        })
        .unwrap_or_default();

    format!(
        r#"<div>Realtime: <span style="display: inline-block; width: 0.75rem; height: 0.75rem; border-radius: 50%; background-color: {color};"></span> {label}</div>
            <div>Datensätze: {count}</div>
            <div>Schema/Tabelle: {table}</div>
            {notice}"#,
        color = status_color(state.status),
        label = status_label(state.status),
        count = state.rows.len(),
        table = escape_html(&state.table),
        notice = notice,
    )
}

fn table_rows(state: &DashboardState) -> String {
    if state.rows.is_empty() {
        if state.initial_loading {
            return String::new();
        }
        return format!(r#"<tr><td colspan="3" {}>{}</td></tr>"#, CELL, NO_DATA);
    }

    state
        .rows
        .rows()
        .iter()
        .map(|m| {
            format!(
                r#"<tr style="border-bottom: 1px solid #dee2e6;">
                    <td {cell}>{}</td>
                    <td {cell}>{}</td>
                    <td {cell}>{}</td>
                </tr>"#,
                escape_html(&format_timestamp(&m.ts)),
                format_percent(m.value),
                escape_html(&m.source),
                cell = CELL,
            )
        })
        .collect()
}

fn configuration_page(state: &DashboardState) -> String {
    let message = state.notice.map(|n| n.message()).unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Live-Dashboard • {table}</title>
</head>
<body style="font-family: system-ui, sans-serif; max-width: 960px; margin: 0 auto; padding: 1rem;">
    <div style="color: #721c24; background-color: #f8d7da; padding: 1rem; border-radius: 0.5rem;">{message}</div>
</body>
</html>"#,
        table = escape_html(&state.table),
        message = message,
    )
}

/// Render the full dashboard page for the current state
pub fn render_page(state: &DashboardState) -> String {
    if state.configuration_missing() {
        return configuration_page(state);
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Live-Dashboard • {table}</title>
    <script>
        const LABELS = {{
            'active': ['aktiv', '#28a745'],
            'error': ['Fehler', '#dc3545'],
            'closed': ['geschlossen', '#ffc107'],
            'initializing': ['verbinden…', '#ffc107'],
        }};
        const NOTICES = {{
            'configuration_missing': 'Fehlende Umgebungsvariablen für Supabase.',
            'snapshot_query_failed': 'Fehler beim Laden der Messwerte.',
        }};
        function esc(text) {{
            const div = document.createElement('div');
            div.textContent = String(text);
            return div.innerHTML;
        }}
        function fmtTime(ts) {{
            const d = new Date(ts);
            if (isNaN(d.getTime())) return esc(ts);
            return d.toLocaleString('de-DE', {{ dateStyle: 'short', timeStyle: 'medium' }});
        }}
        function fmtValue(v) {{
            return Number(v).toFixed(2) + ' %';
        }}
        function refreshData() {{
            fetch('/api/state')
                .then(r => r.json())
                .then(data => {{
                    if (data.notice === 'configuration_missing') {{
                        window.location.reload();
                        return;
                    }}
                    const latest = data.rows[0];
                    document.getElementById('latest').innerHTML = latest
                        ? `<div style="font-size: 2.5rem; font-weight: 600;">${{fmtValue(latest.value)}}</div>
                           <div>Quelle: ${{esc(latest.source)}}</div>
                           <div>Zeit: ${{fmtTime(latest.ts)}}</div>`
                        : `<div>${{data.initial_loading ? 'Lade…' : 'Keine Daten geladen.'}}</div>`;
                    const [label, color] = LABELS[data.status] || LABELS['initializing'];
                    const notice = data.notice
                        ? `<div style="margin-top: 0.5rem; color: #721c24; background-color: #f8d7da; padding: 0.5rem; border-radius: 0.25rem;">${{NOTICES[data.notice]}}</div>`
                        : '';
                    document.getElementById('status').innerHTML =
                        `<div>Realtime: <span style="display: inline-block; width: 0.75rem; height: 0.75rem; border-radius: 50%; background-color: ${{color}};"></span> ${{label}}</div>
                         <div>Datensätze: ${{data.rows.length}}</div>
                         <div>Schema/Tabelle: ${{esc(data.table)}}</div>
                         ${{notice}}`;
                    const tbody = document.getElementById('rows-body');
                    if (data.rows.length === 0) {{
                        tbody.innerHTML = data.initial_loading
                            ? ''
                            : `<tr><td colspan="3" style="padding: 0.5rem;">Keine Daten vorhanden.</td></tr>`;
                        return;
                    }}
                    tbody.innerHTML = data.rows.map(m => `<tr style="border-bottom: 1px solid #dee2e6;">
                        <td style="padding: 0.5rem;">${{fmtTime(m.ts)}}</td>
                        <td style="padding: 0.5rem;">${{fmtValue(m.value)}}</td>
                        <td style="padding: 0.5rem;">${{esc(m.source)}}</td>
                    </tr>`).join('');
                }});
        }}
        setInterval(refreshData, 2000);
    </script>
</head>
<body style="font-family: system-ui, sans-serif; max-width: 960px; margin: 0 auto; padding: 1rem;">
    <h1>Live-Dashboard • {table}</h1>
    <div style="display: flex; gap: 1rem;">
        <section {card}>
            <h2>Aktueller Wert</h2>
            <div id="latest">{latest}</div>
        </section>
        <section {card}>
            <h2>Status</h2>
            <div id="status">{status}</div>
        </section>
    </div>
    <section>
        <h2>Letzte Werte</h2>
        <table style="width: 100%; border-collapse: collapse;">
            <thead>
                <tr style="border-bottom: 2px solid #dee2e6;">
                    <th style="padding: 0.5rem; text-align: left;">Zeit</th>
                    <th style="padding: 0.5rem; text-align: left;">Wert</th>
                    <th style="padding: 0.5rem; text-align: left;">Quelle</th>
                </tr>
            </thead>
            <tbody id="rows-body">{rows}</tbody>
        </table>
    </section>
</body>
</html>"#,
        table = escape_html(&state.table),
        card = CARD,
        latest = latest_card(state),
        status = status_card(state),
        rows = table_rows(state),
    )
}

async fn index_handler(State(app): State<AppState>) -> impl IntoResponse {
    let state = app.state.read().await;
    Html(render_page(&state))
}

async fn state_handler(State(app): State<AppState>) -> impl IntoResponse {
    let state = app.state.read().await;
    axum::Json(state.clone())
}

async fn measurements_handler(State(app): State<AppState>) -> impl IntoResponse {
    let state = app.state.read().await;
    axum::Json(state.rows.rows().to_vec())
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}
