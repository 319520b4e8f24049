//! WebSocket push server for browser surfaces.
//!
//! Surfaces connect here, authenticate with a SHA-256 password hash, get a
//! full snapshot of the pane/popup/channel state, and from then on receive
//! incremental render operations. Input lines and option toggles flow back
//! the other way as app events.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use tokio_tungstenite::{accept_async, tungstenite::Message as WsRawMessage};

use crate::AppEvent;

// ============================================================================
// Surface Protocol Types
// ============================================================================

/// One open popup in the initial snapshot.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PopupStateMsg {
    pub id: String,
    pub html: String,
}

/// Channel subscription info mirrored to the surface.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChannelInfoMsg {
    pub channel_id: i64,
    pub name: String,
    pub subscribed: bool,
}

/// The option flags a surface can show and toggle.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct OptionsMsg {
    pub helppopup: bool,
    pub mappopup: bool,
    pub nocolor: bool,
    pub screenreader: bool,
}

/// Protocol messages between the host and a surface.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(tag = "type")]
pub enum WsMessage {
    // Authentication
    AuthRequest { password_hash: String },
    AuthResponse { success: bool, error: Option<String> },

    // Initial state (host -> surface after auth)
    InitialState {
        pane_html: String,
        prompt_html: String,
        popups: Vec<PopupStateMsg>,
        channels: Vec<ChannelInfoMsg>,
        options: OptionsMsg,
        server_connected: bool,
        server_url: String,
    },

    // Incremental render operations (host -> surface)
    BlockAppended { cls: String, html: String },
    PromptUpdate { html: String },
    PopupOpened { id: String, html: String },
    PopupClosed { id: String },
    ChannelInfo { channel_id: i64, name: String, subscribed: bool },
    OptionsUpdated { options: OptionsMsg },
    ServerConnected { url: String },
    ServerDisconnected,

    // Surface -> host
    InputLine { text: String },
    SetOption { key: String, value: bool },
    RequestMap,
    ClosePopup { id: String },

    // Keepalive
    Ping,
    Pong,
}

/// Information about a connected surface client
pub struct WsClientInfo {
    pub authenticated: bool,
    pub tx: mpsc::UnboundedSender<WsMessage>,
}

pub type ClientMap = Arc<RwLock<HashMap<u64, WsClientInfo>>>;

/// WebSocket server state
pub struct WebSocketServer {
    pub clients: ClientMap,
    pub next_client_id: Arc<std::sync::Mutex<u64>>,
    pub password_hash: String,
    pub running: Arc<RwLock<bool>>,
    pub shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    pub port: u16,
    #[cfg(feature = "native-tls-backend")]
    pub tls_acceptor: Option<Arc<tokio_native_tls::TlsAcceptor>>,
    #[cfg(feature = "rustls-backend")]
    pub tls_acceptor: Option<Arc<tokio_rustls::TlsAcceptor>>,
}

impl WebSocketServer {
    /// An empty password disables authentication (local use).
    pub fn new(password: &str, port: u16) -> Self {
        let password_hash = if password.is_empty() {
            String::new()
        } else {
            hash_password(password)
        };
        Self {
            clients: Arc::new(RwLock::new(HashMap::new())),
            next_client_id: Arc::new(std::sync::Mutex::new(1)),
            password_hash,
            running: Arc::new(RwLock::new(false)),
            shutdown_tx: None,
            port,
            #[cfg(feature = "native-tls-backend")]
            tls_acceptor: None,
            #[cfg(feature = "rustls-backend")]
            tls_acceptor: None,
        }
    }

    /// Configure TLS for wss:// surfaces
    #[cfg(feature = "native-tls-backend")]
    pub fn configure_tls(
        &mut self,
        cert_file: &str,
        key_file: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let cert_data = std::fs::read(cert_file)?;
        let key_data = std::fs::read(key_file)?;
        let identity = native_tls::Identity::from_pkcs8(&cert_data, &key_data)?;
        let tls_acceptor = native_tls::TlsAcceptor::new(identity)?;
        self.tls_acceptor = Some(Arc::new(tokio_native_tls::TlsAcceptor::from(tls_acceptor)));
        Ok(())
    }

    /// Configure TLS for wss:// surfaces (rustls version)
    #[cfg(feature = "rustls-backend")]
    pub fn configure_tls(
        &mut self,
        cert_file: &str,
        key_file: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        use rustls_pemfile::{certs, private_key};
        use std::io::BufReader;

        let cert_file_handle = std::fs::File::open(cert_file)
            .map_err(|e| format!("Failed to open cert file '{}': {}", cert_file, e))?;
        let mut cert_reader = BufReader::new(cert_file_handle);
        let certs: Vec<rustls::pki_types::CertificateDer<'static>> =
            certs(&mut cert_reader).filter_map(|r| r.ok()).collect();
        if certs.is_empty() {
            return Err(format!("No certificates found in cert file '{}'", cert_file).into());
        }

        let key_file_handle = std::fs::File::open(key_file)
            .map_err(|e| format!("Failed to open key file '{}': {}", key_file, e))?;
        let mut key_reader = BufReader::new(key_file_handle);
        let key = private_key(&mut key_reader)
            .map_err(|e| format!("Failed to parse key file '{}': {}", key_file, e))?
            .ok_or_else(|| format!("No private key found in key file '{}'", key_file))?;

        let config = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| format!("Failed to build TLS config: {}", e))?;

        self.tls_acceptor = Some(Arc::new(tokio_rustls::TlsAcceptor::from(Arc::new(config))));
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Hash a password using SHA-256
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Send a message to every authenticated surface.
pub async fn broadcast(clients: &ClientMap, msg: &WsMessage) {
    let clients_guard = clients.read().await;
    for client in clients_guard.values() {
        if client.authenticated {
            let _ = client.tx.send(msg.clone());
        }
    }
}

/// Send a message to one surface.
pub async fn send_to(clients: &ClientMap, client_id: u64, msg: WsMessage) {
    let clients_guard = clients.read().await;
    if let Some(client) = clients_guard.get(&client_id) {
        let _ = client.tx.send(msg);
    }
}

/// Number of authenticated surfaces currently attached.
pub async fn attached_count(clients: &ClientMap) -> usize {
    clients.read().await.values().filter(|c| c.authenticated).count()
}

/// Start the surface WebSocket server
pub async fn start_websocket_server(
    server: &mut WebSocketServer,
    event_tx: mpsc::Sender<AppEvent>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = format!("0.0.0.0:{}", server.port);
    let listener = TcpListener::bind(&addr).await?;

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    server.shutdown_tx = Some(shutdown_tx);

    let clients = Arc::clone(&server.clients);
    let next_client_id = Arc::clone(&server.next_client_id);
    let password_hash = server.password_hash.clone();
    let running = Arc::clone(&server.running);
    #[cfg(feature = "native-tls-backend")]
    let tls_acceptor = server.tls_acceptor.clone();
    #[cfg(feature = "rustls-backend")]
    let tls_acceptor = server.tls_acceptor.clone();

    *running.write().await = true;

    tokio::spawn(async move {
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, _client_addr)) => {
                            let client_id = {
                                let mut id = next_client_id.lock().unwrap();
                                let current = *id;
                                *id += 1;
                                current
                            };

                            let clients = Arc::clone(&clients);
                            let password_hash = password_hash.clone();
                            let event_tx = event_tx.clone();
                            #[cfg(any(feature = "native-tls-backend", feature = "rustls-backend"))]
                            let tls_acceptor = tls_acceptor.clone();

                            tokio::spawn(async move {
                                #[cfg(any(feature = "native-tls-backend", feature = "rustls-backend"))]
                                if let Some(acceptor) = tls_acceptor {
                                    match acceptor.accept(stream).await {
                                        Ok(tls_stream) => {
                                            let _ = handle_ws_client(
                                                tls_stream, client_id, clients, password_hash, event_tx,
                                            ).await;
                                        }
                                        Err(_e) => {
                                            // TLS handshake failed
                                        }
                                    }
                                    return;
                                }
                                let _ = handle_ws_client(
                                    stream, client_id, clients, password_hash, event_tx,
                                ).await;
                            });
                        }
                        Err(_) => {
                            break;
                        }
                    }
                }
                _ = &mut shutdown_rx => {
                    break;
                }
            }
        }
        *running.write().await = false;
    });

    Ok(())
}

/// Handle a single surface connection
pub async fn handle_ws_client<S>(
    stream: S,
    client_id: u64,
    clients: ClientMap,
    password_hash: String,
    event_tx: mpsc::Sender<AppEvent>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    use futures::{SinkExt, StreamExt};

    let ws_stream = accept_async(stream).await?;
    let (mut ws_sink, mut ws_source) = ws_stream.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();

    // No password configured: the surface is trusted immediately
    let open_access = password_hash.is_empty();
    {
        let mut clients_guard = clients.write().await;
        clients_guard.insert(client_id, WsClientInfo {
            authenticated: open_access,
            tx: tx.clone(),
        });
    }

    let _ = event_tx.send(AppEvent::WsClientConnected(client_id)).await;

    if open_access {
        let _ = tx.send(WsMessage::AuthResponse { success: true, error: None });
        // Trigger the initial snapshot as if an auth had just succeeded
        let _ = event_tx
            .send(AppEvent::WsClientMessage(
                client_id,
                Box::new(WsMessage::AuthRequest { password_hash: String::new() }),
            ))
            .await;
    }

    // Writer task: drain the per-client channel into the socket
    let clients_for_sender = Arc::clone(&clients);
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&msg) {
                if ws_sink.send(WsRawMessage::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
        let _ = clients_for_sender.write().await.remove(&client_id);
    });

    // Process incoming messages
    while let Some(msg_result) = ws_source.next().await {
        match msg_result {
            Ok(WsRawMessage::Text(text)) => {
                if let Ok(ws_msg) = serde_json::from_str::<WsMessage>(&text) {
                    match &ws_msg {
                        WsMessage::AuthRequest { password_hash: client_hash } => {
                            let auth_success = open_access || *client_hash == password_hash;
                            if auth_success {
                                let mut clients_guard = clients.write().await;
                                if let Some(client) = clients_guard.get_mut(&client_id) {
                                    client.authenticated = true;
                                }
                            }
                            let response = WsMessage::AuthResponse {
                                success: auth_success,
                                error: if auth_success {
                                    None
                                } else {
                                    Some("Invalid password".to_string())
                                },
                            };
                            let _ = tx.send(response);

                            if auth_success {
                                // Forward to the app to send the initial snapshot
                                let _ = event_tx
                                    .send(AppEvent::WsClientMessage(client_id, Box::new(ws_msg)))
                                    .await;
                            }
                        }
                        WsMessage::Ping => {
                            let _ = tx.send(WsMessage::Pong);
                        }
                        _ => {
                            let is_authed = {
                                let clients_guard = clients.read().await;
                                clients_guard
                                    .get(&client_id)
                                    .map(|c| c.authenticated)
                                    .unwrap_or(false)
                            };
                            if is_authed {
                                let _ = event_tx
                                    .send(AppEvent::WsClientMessage(client_id, Box::new(ws_msg)))
                                    .await;
                            }
                        }
                    }
                }
            }
            Ok(WsRawMessage::Close(_)) => {
                break;
            }
            Ok(WsRawMessage::Ping(data)) => {
                // Pong is handled automatically by tungstenite
                let _ = data;
            }
            Err(_) => {
                break;
            }
            _ => {}
        }
    }

    // Clean up
    send_task.abort();
    {
        let mut clients_guard = clients.write().await;
        clients_guard.remove(&client_id);
    }
    let _ = event_tx.send(AppEvent::WsClientDisconnected(client_id)).await;

    Ok(())
}
