//! Upstream connection to the game server.
//!
//! One websocket connection speaking the `[cmd, args, kwargs]` protocol.
//! A reader task decodes frames into app events, a writer task drains the
//! outgoing frame channel, and a keepalive task pings on an interval so
//! idle connections survive proxies.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::protocol;
use crate::{debug_log, AppEvent};

/// Seconds between protocol keepalive pings.
pub const KEEPALIVE_SECS: u64 = 30;

/// Handle to a live upstream session. Dropping the handle closes the
/// outgoing channel, which shuts the writer down.
pub struct SessionHandle {
    tx: mpsc::Sender<String>,
}

impl SessionHandle {
    /// Queue one raw frame for the server. Errors are reported through the
    /// reader task's disconnect event, not here.
    pub async fn send_frame(&self, frame: String) {
        let _ = self.tx.send(frame).await;
    }
}

/// Connect to the game server and spawn the session tasks. Decoded
/// commands and the final disconnect arrive on `event_tx`.
pub async fn connect(
    url: &str,
    event_tx: mpsc::Sender<AppEvent>,
    debug_enabled: bool,
) -> Result<SessionHandle, Box<dyn std::error::Error + Send + Sync>> {
    let (ws_stream, _response) = connect_async(url).await?;
    let (mut sink, mut source) = ws_stream.split();

    let (out_tx, mut out_rx) = mpsc::channel::<String>(100);

    // Writer task: drain the outgoing channel into the socket
    tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    // Keepalive task: protocol-level ping, answered with a pong frame
    let ping_tx = out_tx.clone();
    let keepalive_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(KEEPALIVE_SECS));
        interval.tick().await; // consume the immediate first tick
        loop {
            interval.tick().await;
            if ping_tx.send(protocol::encode_ping()).await.is_err() {
                break;
            }
        }
    });

    // Reader task: decode frames into app events until the server goes away
    tokio::spawn(async move {
        while let Some(msg) = source.next().await {
            match msg {
                Ok(Message::Text(text)) => match protocol::decode_server_cmd(&text) {
                    Some(cmd) => {
                        if event_tx.send(AppEvent::ServerCmd(cmd)).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        debug_log(
                            debug_enabled,
                            &format!("undecodable frame from server: {}", text),
                        );
                    }
                },
                Ok(Message::Close(_)) => break,
                Ok(Message::Ping(_)) => {
                    // pong is handled automatically by tungstenite
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
        keepalive_task.abort();
        let _ = event_tx.send(AppEvent::SessionDisconnected).await;
    });

    Ok(SessionHandle { tx: out_tx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_refused() {
        let (event_tx, _event_rx) = mpsc::channel(8);
        // nothing listens on port 1
        let result = connect("ws://127.0.0.1:1/", event_tx, false).await;
        assert!(result.is_err());
    }
}
