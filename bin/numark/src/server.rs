//! Development server with live reload support.

use std::{fs, io, path::Path, sync::Arc};

use axum::{
    Json, Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::services::ServeDir;
use walkdir::WalkDir;

use crate::rebuild::{RebuildOutcome, Rebuilder};

/// Message pushed to live-reload clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LiveReloadMessage {
    /// The site was rebuilt.
    Reload,
    /// The last rebuild failed.
    Error { message: String },
}

/// Server state shared by all handlers.
#[derive(Debug, Clone)]
pub struct ServerState {
    pub rebuilder: Arc<Rebuilder>,
    pub site_title: String,
}

impl ServerState {
    pub fn new(rebuilder: Arc<Rebuilder>, site_title: impl Into<String>) -> Self {
        Self {
            rebuilder,
            site_title: site_title.into(),
        }
    }
}

/// Create the development server router.
pub fn create_router(output_dir: &Path, state: ServerState) -> Router {
    Router::new()
        .route("/__livereload", get(livereload_handler))
        .route("/_dev/status", get(status_handler))
        .route("/_dev/rebuild", post(rebuild_handler))
        .fallback_service(ServeDir::new(output_dir))
        .with_state(state)
}

async fn livereload_handler(ws: WebSocketUpgrade, State(state): State<ServerState>) -> Response {
    let rx = state.rebuilder.subscribe();
    ws.on_upgrade(move |socket| forward_messages(socket, rx))
}

/// Push build notifications to one client until either side goes away.
async fn forward_messages(mut socket: WebSocket, mut rx: broadcast::Receiver<LiveReloadMessage>) {
    loop {
        tokio::select! {
            message = rx.recv() => match message {
                Ok(message) => {
                    let Ok(text) = serde_json::to_string(&message) else {
                        continue;
                    };
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "live-reload client lagged");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

async fn status_handler(State(state): State<ServerState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "running",
        "building": state.rebuilder.is_building(),
        "config": { "title": state.site_title },
    }))
}

async fn rebuild_handler(State(state): State<ServerState>) -> Response {
    match state.rebuilder.rebuild().await {
        RebuildOutcome::Built(_) => Json(json!({ "success": true })).into_response(),
        RebuildOutcome::Skipped => (
            StatusCode::CONFLICT,
            Json(json!({ "error": "a build is already in progress" })),
        )
            .into_response(),
        RebuildOutcome::Failed(message) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": message })),
        )
            .into_response(),
    }
}

/// Client that reloads the page on `reload` and logs build errors.
pub const LIVERELOAD_SCRIPT: &str = r#"<script>
(function() {
    var scheme = location.protocol === 'https:' ? 'wss://' : 'ws://';
    function connect() {
        var socket = new WebSocket(scheme + location.host + '/__livereload');
        socket.onmessage = function(event) {
            var message = JSON.parse(event.data);
            if (message.type === 'reload') {
                window.location.reload();
            } else if (message.type === 'error') {
                console.error('[numark] build failed: ' + message.message);
            }
        };
        socket.onclose = function() {
            setTimeout(connect, 1000);
        };
    }
    connect();
})();
</script>
"#;

/// Insert the live-reload client before `</body>` in every HTML file under
/// `output_dir`. Returns how many files changed.
pub fn inject_livereload(output_dir: &Path) -> io::Result<usize> {
    let mut injected = 0;

    for entry in WalkDir::new(output_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "html"))
    {
        let path = entry.path();
        let content = fs::read_to_string(path)?;

        if content.contains("/__livereload") {
            continue;
        }
        if let Some(pos) = content.rfind("</body>") {
            let mut modified = String::with_capacity(content.len() + LIVERELOAD_SCRIPT.len());
            modified.push_str(&content[..pos]);
            modified.push_str(LIVERELOAD_SCRIPT);
            modified.push_str(&content[pos..]);
            fs::write(path, modified)?;
            injected += 1;
        }
    }

    Ok(injected)
}
