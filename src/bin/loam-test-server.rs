// Standalone fake game server for regression testing loam
// Speaks the [cmdname, args, kwargs] websocket protocol with scripted scenarios.
// Usage: loam-test-server [--ports=19001-19004] [--scenarios=routing_basics,prompt_login,channels,idle]

use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsSource = SplitStream<WebSocketStream<TcpStream>>;

#[derive(Clone, Debug)]
enum ServerAction {
    /// Send a `text` push with optional type/cls kwargs
    SendText(String, Option<&'static str>, Option<&'static str>),
    /// Send an arbitrary pre-built frame
    SendFrame(String),
    /// Wait until an input line containing the string arrives
    WaitForInput(String, Duration),
    Sleep(Duration),
    Disconnect,
}

#[derive(Clone, Debug)]
struct PortScenario {
    actions: Vec<ServerAction>,
}

fn text_frame(text: &str, kind: Option<&str>, cls: Option<&str>) -> String {
    let mut kwargs = serde_json::Map::new();
    if let Some(kind) = kind {
        kwargs.insert("type".to_string(), json!(kind));
    }
    if let Some(cls) = cls {
        kwargs.insert("cls".to_string(), json!(cls));
    }
    json!(["text", [text], kwargs]).to_string()
}

fn get_scenario(name: &str) -> PortScenario {
    match name {
        "routing_basics" => PortScenario {
            actions: vec![
                ServerAction::SendText("Welcome to the test world!".to_string(), None, None),
                ServerAction::SendText("You are hit!".to_string(), None, Some("combat")),
                ServerAction::SendText(
                    "Help topics: combat, movement, channels".to_string(),
                    Some("help"),
                    None,
                ),
                ServerAction::SendText("#-#-#\n  |\n#-#".to_string(), Some("map"), None),
                ServerAction::SendText(
                    "\x1b[31mThe torch gutters.\x1b[0m See |lclook torch|ltthe torch|le.".to_string(),
                    None,
                    None,
                ),
                ServerAction::Sleep(Duration::from_secs(2)),
                ServerAction::Disconnect,
            ],
        },
        "prompt_login" => PortScenario {
            actions: vec![
                ServerAction::SendFrame(
                    json!(["prompt", ["By what name do you wish to be known? "], {}]).to_string(),
                ),
                ServerAction::WaitForInput("connect".to_string(), Duration::from_secs(5)),
                ServerAction::SendText("Welcome back, tester!".to_string(), None, None),
                ServerAction::SendFrame(json!(["prompt", ["HP: 10> "], {}]).to_string()),
                ServerAction::Sleep(Duration::from_secs(1)),
                ServerAction::Disconnect,
            ],
        },
        "channels" => PortScenario {
            actions: vec![
                ServerAction::WaitForInput("get_channels".to_string(), Duration::from_secs(5)),
                ServerAction::SendFrame(json!(["chaninfo", [1, "public", true], {}]).to_string()),
                ServerAction::SendFrame(json!(["chaninfo", [2, "newbie", false], {}]).to_string()),
                ServerAction::SendText("[public] Soandso: hello".to_string(), None, None),
                ServerAction::Sleep(Duration::from_secs(2)),
                ServerAction::Disconnect,
            ],
        },
        "idle" => PortScenario {
            actions: vec![
                ServerAction::Sleep(Duration::from_secs(30)),
                ServerAction::Disconnect,
            ],
        },
        _ => PortScenario {
            actions: vec![
                ServerAction::SendText("Hello!".to_string(), None, None),
                ServerAction::Sleep(Duration::from_secs(2)),
                ServerAction::Disconnect,
            ],
        },
    }
}

/// Read one frame, answering protocol pings in place. Returns the text
/// payload or None when the connection is gone.
async fn read_frame(sink: &mut WsSink, source: &mut WsSource) -> Option<String> {
    loop {
        match source.next().await? {
            Ok(Message::Text(text)) => {
                if text.starts_with("[\"ping\"") {
                    let pong = json!(["pong", "", ""]).to_string();
                    if sink.send(Message::Text(pong.into())).await.is_err() {
                        return None;
                    }
                    continue;
                }
                return Some(text.to_string());
            }
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

async fn run_server_port(port: u16, scenario: PortScenario) {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {}: {}", addr, e));

    println!("Listening on port {}", port);

    if let Ok((stream, _)) = listener.accept().await {
        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("Handshake failed on port {}: {}", port, e);
                return;
            }
        };
        let (mut sink, mut source) = ws_stream.split();

        for action in &scenario.actions {
            match action {
                ServerAction::SendText(text, kind, cls) => {
                    let frame = text_frame(text, *kind, *cls);
                    if sink.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                ServerAction::SendFrame(frame) => {
                    if sink.send(Message::Text(frame.clone().into())).await.is_err() {
                        break;
                    }
                }
                ServerAction::WaitForInput(expected, timeout) => {
                    let deadline = tokio::time::Instant::now() + *timeout;
                    loop {
                        let remaining =
                            deadline.saturating_duration_since(tokio::time::Instant::now());
                        if remaining.is_zero() {
                            break;
                        }
                        match tokio::time::timeout(remaining, read_frame(&mut sink, &mut source))
                            .await
                        {
                            Ok(Some(text)) => {
                                if text.contains(expected.as_str()) {
                                    break;
                                }
                            }
                            _ => break,
                        }
                    }
                }
                ServerAction::Sleep(dur) => {
                    tokio::time::sleep(*dur).await;
                }
                ServerAction::Disconnect => {
                    let _ = sink.close().await;
                    break;
                }
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut start_port: u16 = 19001;
    let mut scenario_names: Vec<&str> = vec!["routing_basics", "prompt_login", "channels", "idle"];

    for arg in &args[1..] {
        if let Some(ports_str) = arg.strip_prefix("--ports=") {
            if let Some((start, _end)) = ports_str.split_once('-') {
                if let Ok(p) = start.parse::<u16>() {
                    start_port = p;
                }
            }
        } else if let Some(scenarios_str) = arg.strip_prefix("--scenarios=") {
            scenario_names = scenarios_str.split(',').collect();
        }
    }

    let mut handles = Vec::new();
    for (i, name) in scenario_names.iter().enumerate() {
        let port = start_port + i as u16;
        let scenario = get_scenario(name);
        handles.push(tokio::spawn(run_server_port(port, scenario)));
    }

    println!(
        "Test server running on ports {}-{}",
        start_port,
        start_port + scenario_names.len() as u16 - 1
    );

    for handle in handles {
        let _ = handle.await;
    }
}
