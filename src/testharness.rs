// Test harness module - in-process regression testing for the app core.
// Spawns a scripted game server on an ephemeral port, connects a real
// session to it, drives the App with the decoded events, and captures
// the resulting surface operations for assertions.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};

use crate::persistence::Settings;
use crate::websocket::WsMessage;
use crate::{protocol, session, App, AppEvent};

/// Events captured during test execution
#[derive(Debug, Clone, PartialEq)]
pub enum TestEvent {
    /// Session connected to the scripted server
    Connected,
    /// A block landed in the main pane (class, html)
    BlockAppended(String, String),
    /// A popup was opened (target id, html)
    PopupOpened(String, String),
    /// Prompt line updated (html)
    PromptReceived(String),
    /// Channel announcement (id, name, subscribed)
    ChannelInfo(i64, String, bool),
    /// Server went away
    Disconnected,
}

/// Actions the scripted server performs in order
#[derive(Debug, Clone)]
pub enum ServerAction {
    /// Send one raw protocol frame
    SendFrame(String),
    /// Wait until an incoming frame contains the substring
    WaitForFrame(String, Duration),
    /// Wait a fixed time
    Sleep(Duration),
    /// Close the connection
    Disconnect,
}

/// Run a scenario against the app core and return all captured events.
pub async fn run_test_scenario(settings: Settings, actions: Vec<ServerAction>) -> Vec<TestEvent> {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server_task = tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(_) => return,
        };
        let (mut sink, mut source) = ws_stream.split();

        for action in actions {
            match action {
                ServerAction::SendFrame(frame) => {
                    if sink.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                ServerAction::WaitForFrame(expected, timeout) => {
                    let deadline = tokio::time::Instant::now() + timeout;
                    loop {
                        let remaining =
                            deadline.saturating_duration_since(tokio::time::Instant::now());
                        if remaining.is_zero() {
                            break;
                        }
                        match tokio::time::timeout(remaining, source.next()).await {
                            Ok(Some(Ok(Message::Text(text)))) => {
                                if text.contains(expected.as_str()) {
                                    break;
                                }
                            }
                            Ok(Some(Ok(_))) => {}
                            _ => break,
                        }
                    }
                }
                ServerAction::Sleep(dur) => {
                    tokio::time::sleep(dur).await;
                }
                ServerAction::Disconnect => {
                    let _ = sink.close().await;
                    break;
                }
            }
        }
    });

    let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(64);
    let url = format!("ws://127.0.0.1:{}/", port);
    let session = session::connect(&url, event_tx, false)
        .await
        .expect("connect to scripted server");

    let mut app = App::with_settings(settings);
    app.server_connected = true;
    let mut events = vec![TestEvent::Connected];

    // Mirror the startup the real app performs
    session.send_frame(protocol::encode_get_channels()).await;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }
        match tokio::time::timeout(remaining, event_rx.recv()).await {
            Ok(Some(AppEvent::ServerCmd(cmd))) => {
                for op in app.handle_server_cmd(cmd) {
                    match op {
                        WsMessage::BlockAppended { cls, html } => {
                            events.push(TestEvent::BlockAppended(cls, html));
                        }
                        WsMessage::PopupOpened { id, html } => {
                            events.push(TestEvent::PopupOpened(id, html));
                        }
                        WsMessage::PromptUpdate { html } => {
                            events.push(TestEvent::PromptReceived(html));
                        }
                        WsMessage::ChannelInfo { channel_id, name, subscribed } => {
                            events.push(TestEvent::ChannelInfo(channel_id, name, subscribed));
                        }
                        _ => {}
                    }
                }
            }
            Ok(Some(AppEvent::SessionDisconnected)) => {
                events.push(TestEvent::Disconnected);
                break;
            }
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => break,
        }
    }

    server_task.abort();
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(parts: &str) -> ServerAction {
        ServerAction::SendFrame(parts.to_string())
    }

    #[tokio::test]
    async fn test_scenario_basic_routing() {
        let events = run_test_scenario(
            Settings::default(),
            vec![
                frame(r#"["text", ["You see a sword."], {}]"#),
                frame(r#"["text", ["Ouch!"], {"cls": "combat"}]"#),
                ServerAction::Disconnect,
            ],
        )
        .await;

        assert_eq!(
            events,
            vec![
                TestEvent::Connected,
                TestEvent::BlockAppended("out".to_string(), "You see a sword.".to_string()),
                TestEvent::BlockAppended("combat".to_string(), "Ouch!".to_string()),
                TestEvent::Disconnected,
            ]
        );
    }

    #[tokio::test]
    async fn test_scenario_help_popup_enabled() {
        let mut settings = Settings::default();
        settings.help_popup = true;

        let events = run_test_scenario(
            settings,
            vec![
                frame(r#"["text", ["Topics: combat"], {"type": "help"}]"#),
                frame(r#"["text", ["back in the room"], {}]"#),
                ServerAction::Disconnect,
            ],
        )
        .await;

        assert_eq!(
            events,
            vec![
                TestEvent::Connected,
                TestEvent::PopupOpened("#helpdialog".to_string(), "Topics: combat".to_string()),
                TestEvent::BlockAppended("out".to_string(), "back in the room".to_string()),
                TestEvent::Disconnected,
            ]
        );
    }

    #[tokio::test]
    async fn test_scenario_map_to_main_when_disabled() {
        let events = run_test_scenario(
            Settings::default(),
            vec![
                frame(r#"["text", ["Room map text"], {"type": "map"}]"#),
                ServerAction::Disconnect,
            ],
        )
        .await;

        assert_eq!(
            events,
            vec![
                TestEvent::Connected,
                TestEvent::BlockAppended("out".to_string(), "Room map text".to_string()),
                TestEvent::Disconnected,
            ]
        );
    }

    #[tokio::test]
    async fn test_scenario_prompt_and_channels() {
        let events = run_test_scenario(
            Settings::default(),
            vec![
                ServerAction::WaitForFrame("get_channels".to_string(), Duration::from_secs(2)),
                frame(r#"["chaninfo", [1, "public", true], {}]"#),
                frame(r#"["prompt", ["HP: 10>"], {}]"#),
                ServerAction::Disconnect,
            ],
        )
        .await;

        assert_eq!(
            events,
            vec![
                TestEvent::Connected,
                TestEvent::ChannelInfo(1, "public".to_string(), true),
                TestEvent::PromptReceived("HP: 10&gt;".to_string()),
                TestEvent::Disconnected,
            ]
        );
    }

    #[tokio::test]
    async fn test_scenario_ansi_text_converted() {
        let events = run_test_scenario(
            Settings::default(),
            vec![
                frame("[\"text\", [\"\\u001b[31mred\\u001b[0m alert\"], {}]"),
                ServerAction::Disconnect,
            ],
        )
        .await;

        assert_eq!(
            events,
            vec![
                TestEvent::Connected,
                TestEvent::BlockAppended(
                    "out".to_string(),
                    "<span class=\"color-001\">red</span> alert".to_string(),
                ),
                TestEvent::Disconnected,
            ]
        );
    }
}
