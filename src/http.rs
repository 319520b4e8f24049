//! HTTP server for the embedded surface page.
//!
//! Serves the single-page surface with the WebSocket parameters and theme
//! variables baked into template placeholders. Plain HTTP only; remote
//! setups put the wss:// surface port behind the TLS acceptor instead.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;

/// Embedded HTML for the surface page
const WEB_INDEX_HTML: &str = include_str!("web/index.html");

/// Embedded CSS for the surface page
const WEB_STYLE_CSS: &str = include_str!("web/style.css");

/// Embedded JavaScript for the surface page
const WEB_APP_JS: &str = include_str!("web/app.js");

/// HTTP server state for the surface page
pub struct HttpServer {
    pub running: Arc<RwLock<bool>>,
    pub shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    pub port: u16,
}

impl HttpServer {
    pub fn new(port: u16) -> Self {
        Self {
            running: Arc::new(RwLock::new(false)),
            shutdown_tx: None,
            port,
        }
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Parse an HTTP request line and return the method and path
fn parse_http_request(request: &str) -> Option<(&str, &str)> {
    let first_line = request.lines().next()?;
    let mut parts = first_line.split_whitespace();
    let method = parts.next()?;
    let path = parts.next()?;
    Some((method, path))
}

/// Extract Host header from HTTP request (without port)
fn get_host_from_request(request: &str) -> String {
    for line in request.lines() {
        if line.to_lowercase().starts_with("host:") {
            let host = line[5..].trim();
            if let Some(colon_pos) = host.rfind(':') {
                return host[..colon_pos].to_string();
            }
            return host.to_string();
        }
    }
    String::new()
}

/// Build an HTTP response with the given status, content type, and body
fn build_http_response(status: u16, status_text: &str, content_type: &str, body: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: {}; charset=utf-8\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        status, status_text, content_type, body.len(), body
    )
    .into_bytes()
}

/// Build the surface page with parameters injected into the template
fn build_index_page(host: &str, ws_port: u16, ws_use_tls: bool, theme_css: &str) -> String {
    WEB_INDEX_HTML
        .replace("{{WS_HOST}}", host)
        .replace("{{WS_PORT}}", &ws_port.to_string())
        .replace("{{WS_PROTOCOL}}", if ws_use_tls { "wss" } else { "ws" })
        .replace("{{THEME_CSS_VARS}}", theme_css)
}

/// Handle an HTTP connection
async fn handle_http_client(
    mut stream: TcpStream,
    ws_port: u16,
    ws_use_tls: bool,
    theme_css: Arc<String>,
) {
    let mut buf = [0u8; 4096];
    let n = match stream.read(&mut buf).await {
        Ok(n) if n > 0 => n,
        _ => return,
    };

    let request = String::from_utf8_lossy(&buf[..n]);

    if let Some((method, path)) = parse_http_request(&request) {
        if method != "GET" {
            let response =
                build_http_response(405, "Method Not Allowed", "text/plain", "Method Not Allowed");
            let _ = stream.write_all(&response).await;
            return;
        }

        let host = get_host_from_request(&request);
        let response = match path {
            "/" | "/index.html" => {
                let html = build_index_page(&host, ws_port, ws_use_tls, &theme_css);
                build_http_response(200, "OK", "text/html", &html)
            }
            "/style.css" => build_http_response(200, "OK", "text/css", WEB_STYLE_CSS),
            "/app.js" => build_http_response(200, "OK", "application/javascript", WEB_APP_JS),
            "/favicon.ico" => build_http_response(204, "No Content", "image/x-icon", ""),
            _ => build_http_response(404, "Not Found", "text/plain", "Not Found"),
        };

        let _ = stream.write_all(&response).await;
    }
}

/// Start the HTTP server
pub async fn start_http_server(
    server: &mut HttpServer,
    ws_port: u16,
    ws_use_tls: bool,
    theme_css: String,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = format!("0.0.0.0:{}", server.port);
    let listener = TcpListener::bind(&addr).await?;

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    server.shutdown_tx = Some(shutdown_tx);

    let running = Arc::clone(&server.running);
    let theme_css = Arc::new(theme_css);
    *running.write().await = true;

    tokio::spawn(async move {
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, _)) => {
                            let theme_css = Arc::clone(&theme_css);
                            tokio::spawn(async move {
                                handle_http_client(stream, ws_port, ws_use_tls, theme_css).await;
                            });
                        }
                        Err(_) => break,
                    }
                }
                _ = &mut shutdown_rx => break,
            }
        }
        *running.write().await = false;
    });

    Ok(())
}
