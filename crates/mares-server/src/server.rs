//! Preview server implementation.

use std::path::{Path, PathBuf};

use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::services::ServeDir;

use crate::watcher::FileWatcher;
use crate::websocket::{client_script, ReloadHub, ReloadMessage, CLIENT_PATH, RELOAD_PATH};

/// Configuration for the preview server.
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// Directory to serve
    pub root: PathBuf,

    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Watch `root` and reload browsers on change
    pub live_reload: bool,

    /// Open browser on start
    pub open: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("build"),
            host: "localhost".to_string(),
            port: 8000,
            live_reload: true,
            open: false,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Directory not found: {0}. Run 'mares generate' first.")]
    MissingDir(PathBuf),

    #[error("Failed to bind to {0}: {1}")]
    BindError(String, String),

    #[error("File watch error: {0}")]
    WatchError(String),
}

/// Static file server over the generated site.
pub struct PreviewServer {
    config: PreviewConfig,
}

impl PreviewServer {
    pub fn new(config: PreviewConfig) -> Self {
        Self { config }
    }

    /// Serve until the process is stopped.
    pub async fn start(self) -> Result<(), ServerError> {
        let root = &self.config.root;
        if !root.is_dir() {
            return Err(ServerError::MissingDir(root.clone()));
        }

        let addr = format!("{}:{}", self.config.host, self.config.port);

        let hub = if self.config.live_reload {
            let hub = ReloadHub::new();
            let (watcher, mut rx) =
                FileWatcher::new(root).map_err(|e| ServerError::WatchError(e.to_string()))?;

            let hub_clone = hub.clone();
            tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    tracing::debug!("Change detected: {:?}", event);
                    hub_clone.send(ReloadMessage::Reload);
                }
                // Keep watcher alive
                drop(watcher);
            });
            Some(hub)
        } else {
            None
        };

        let app = router(root, hub);

        let listener = tokio::net::TcpListener::bind((self.config.host.as_str(), self.config.port))
            .await
            .map_err(|e| ServerError::BindError(addr.clone(), e.to_string()))?;

        let url = format!("http://{}", addr);
        tracing::info!("Serving {} at {}", root.display(), url);
        if self.config.live_reload {
            tracing::info!("Live reload enabled");
        }

        if self.config.open {
            if let Err(e) = open::that(&url) {
                tracing::warn!("Failed to open browser: {}", e);
            }
        }

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        Ok(())
    }
}

/// Build the router: static files, plus the reload endpoints when a hub is given.
fn router(root: &Path, hub: Option<ReloadHub>) -> Router {
    let files = ServeDir::new(root);

    match hub {
        Some(hub) => Router::new()
            .route(RELOAD_PATH, get(ws_handler))
            .route(CLIENT_PATH, get(client_script_handler))
            .with_state(hub)
            .fallback_service(files)
            .layer(middleware::map_response(inject_client)),
        None => Router::new().fallback_service(files),
    }
}

/// Handler for the reload WebSocket endpoint.
async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<ReloadHub>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, hub))
}

/// Forward hub messages to one browser until it disconnects.
async fn handle_ws(mut socket: WebSocket, hub: ReloadHub) {
    let mut rx = hub.subscribe();

    if send(&mut socket, &ReloadMessage::Connected).await.is_err() {
        return;
    }

    while let Some(msg) = next_message(&mut rx).await {
        if send(&mut socket, &msg).await.is_err() {
            break;
        }
    }
}

/// Next message for a browser, `None` once the hub is gone.
async fn next_message(rx: &mut broadcast::Receiver<ReloadMessage>) -> Option<ReloadMessage> {
    match rx.recv().await {
        Ok(msg) => Some(msg),
        // A slow socket missed messages; one reload covers them
        Err(RecvError::Lagged(_)) => Some(ReloadMessage::Reload),
        Err(RecvError::Closed) => None,
    }
}

async fn send(socket: &mut WebSocket, msg: &ReloadMessage) -> Result<(), ()> {
    let json = serde_json::to_string(msg).map_err(|_| ())?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

/// Handler for the client script.
async fn client_script_handler() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript")], client_script())
}

/// Add the client script tag to HTML responses.
async fn inject_client(response: Response) -> Response {
    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));
    if !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to buffer response: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = inject_script(&String::from_utf8_lossy(&bytes));
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

/// Insert the client script before the last `</body>`, or append it.
fn inject_script(html: &str) -> String {
    let tag = format!(r#"<script src="{}"></script>"#, CLIENT_PATH);

    match html.rfind("</body>") {
        Some(pos) => format!("{}{}{}", &html[..pos], tag, &html[pos..]),
        None => format!("{}{}", html, tag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::net::SocketAddr;

    use tempfile::tempdir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    async fn spawn(app: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    async fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            path
        );
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[test]
    fn injects_before_closing_body() {
        assert_eq!(
            inject_script("<html><body>hi</body></html>"),
            r#"<html><body>hi<script src="/__livereload.js"></script></body></html>"#
        );
    }

    #[test]
    fn appends_when_no_body_tag() {
        assert_eq!(
            inject_script("<p>fragment</p>"),
            r#"<p>fragment</p><script src="/__livereload.js"></script>"#
        );
    }

    #[test]
    fn default_config_matches_cli_defaults() {
        let config = PreviewConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 8000);
        assert!(config.live_reload);
    }

    #[tokio::test]
    async fn lagging_browser_still_gets_reload() {
        let hub = ReloadHub::new();
        let mut rx = hub.subscribe();
        for _ in 0..40 {
            hub.send(ReloadMessage::Connected);
        }

        assert_eq!(next_message(&mut rx).await, Some(ReloadMessage::Reload));
        assert_eq!(next_message(&mut rx).await, Some(ReloadMessage::Connected));

        drop(hub);
        while next_message(&mut rx).await.is_some() {}
    }

    #[tokio::test]
    async fn serves_html_with_reload_client() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<html><body>hi</body></html>").unwrap();
        fs::write(dir.path().join("style.css"), "body{}").unwrap();

        let addr = spawn(router(dir.path(), Some(ReloadHub::new()))).await;

        let page = get(addr, "/").await;
        assert!(page.starts_with("HTTP/1.1 200"));
        assert!(page.contains(r#"hi<script src="/__livereload.js"></script></body>"#));

        let css = get(addr, "/style.css").await;
        assert!(css.ends_with("body{}"));

        let script = get(addr, CLIENT_PATH).await;
        assert!(script.contains("location.reload()"));
    }

    #[tokio::test]
    async fn serves_plain_files_without_reload() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<html><body>hi</body></html>").unwrap();

        let addr = spawn(router(dir.path(), None)).await;

        let page = get(addr, "/").await;
        assert!(page.contains("<body>hi</body>"));
        assert!(!page.contains("__livereload"));
    }

    #[tokio::test]
    async fn start_fails_for_missing_directory() {
        let dir = tempdir().unwrap();
        let server = PreviewServer::new(PreviewConfig {
            root: dir.path().join("missing"),
            ..Default::default()
        });

        assert!(matches!(
            server.start().await,
            Err(ServerError::MissingDir(_))
        ));
    }
}
