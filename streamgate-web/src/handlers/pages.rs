//! Landing page and health check.

use axum::Json;
use axum::extract::State;
use axum::response::Html;
use serde_json::{Value, json};

use crate::server::AppState;

const HOME_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Streamgate</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
               max-width: 800px; margin: 0 auto; padding: 20px; background: #1a1a2e; color: #eee; }
        h1 { color: #0088cc; }
        .info { background: #16213e; padding: 20px; border-radius: 10px; }
    </style>
</head>
<body>
    <h1>Streamgate</h1>
    <div class="info">
        <p>This server streams stored media straight from the remote store.</p>
        <p>Open a <code>/watch/&lt;id&gt;</code> link in any player to start playback.</p>
    </div>
</body>
</html>
"#;

/// `GET /`
pub async fn home_page() -> Html<&'static str> {
    Html(HOME_PAGE)
}

/// `GET /health`
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "streamgate",
        "backend": state.cache.client().client_name(),
        "active_streams": state.active_streams(),
        "max_streams": state.streaming.max_concurrent_streams,
        "cache": state.cache.statistics(),
        "uptime_secs": state.started_at.elapsed().as_secs(),
    }))
}
