// loam - a host-side webclient for MUD servers speaking the Evennia-style
// JSON websocket protocol. The host owns routing, the output pane, popup
// state and options; browser surfaces are thin mirrors fed over a local
// websocket, with the page itself served over HTTP.

pub mod http;
pub mod pane;
pub mod persistence;
pub mod popup;
pub mod protocol;
pub mod router;
pub mod session;
pub mod text2html;
pub mod theme;
pub mod websocket;

#[cfg(test)]
pub mod testharness;

use std::io;
use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::pane::MessagePane;
use crate::persistence::{load_settings_from_path, save_settings_to_path, Settings};
use crate::popup::{PopupId, PopupManager};
use crate::protocol::{ServerCmd, TextEvent, WireOptions};
use crate::router::{Renderer, TextMeta};
use crate::text2html::RenderFlags;
use crate::websocket::{
    attached_count, broadcast, send_to, ChannelInfoMsg, OptionsMsg, PopupStateMsg,
    WebSocketServer, WsMessage,
};

/// Events driving the app loop, from the upstream session and the surfaces.
pub enum AppEvent {
    ServerCmd(ServerCmd),
    SessionDisconnected,
    WsClientConnected(u64),
    WsClientDisconnected(u64),
    WsClientMessage(u64, Box<WsMessage>),
}

// ============================================================================
// Paths and debug logging
// ============================================================================

fn get_settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".loam.dat")
}

fn get_debug_log_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join("loam.debug.log")
}

#[cfg(unix)]
fn local_timestamp() -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as libc::time_t;
    let mut tm: libc::tm = unsafe { std::mem::zeroed() };
    unsafe {
        libc::localtime_r(&now, &mut tm);
    }
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        tm.tm_year + 1900,
        tm.tm_mon + 1,
        tm.tm_mday,
        tm.tm_hour,
        tm.tm_min,
        tm.tm_sec
    )
}

#[cfg(not(unix))]
fn local_timestamp() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("@{}", secs)
}

/// Write a debug message to loam.debug.log if debug is enabled
pub fn debug_log(debug_enabled: bool, message: &str) {
    if !debug_enabled {
        return;
    }
    use std::io::Write;
    let path = get_debug_log_path();
    match std::fs::OpenOptions::new().create(true).append(true).open(&path) {
        Ok(mut file) => {
            let _ = writeln!(file, "[{}] {}", local_timestamp(), message);
        }
        Err(e) => {
            eprintln!("Failed to open debug log {:?}: {}", path, e);
        }
    }
}

// ============================================================================
// App core
// ============================================================================

/// The client-side state the host owns. Pure with respect to IO: every
/// mutation returns the render operations surfaces need to stay in sync.
pub struct App {
    pane: MessagePane,
    popups: PopupManager,
    channels: Vec<ChannelInfoMsg>,
    settings: Settings,
    server_connected: bool,
    /// Authenticated surfaces currently attached; new main-pane blocks
    /// count as unseen while this is zero.
    attached_surfaces: usize,
}

impl App {
    fn with_settings(settings: Settings) -> Self {
        Self {
            pane: MessagePane::new(settings.scrollback),
            popups: PopupManager::new(),
            channels: Vec::new(),
            settings,
            server_connected: false,
            attached_surfaces: 0,
        }
    }

    fn options_msg(&self) -> OptionsMsg {
        OptionsMsg {
            helppopup: self.settings.help_popup,
            mappopup: self.settings.map_popup,
            nocolor: self.settings.nocolor,
            screenreader: self.settings.screenreader,
        }
    }

    /// Full snapshot for a surface that just attached.
    fn initial_state(&self) -> WsMessage {
        WsMessage::InitialState {
            pane_html: self.pane.to_html(),
            prompt_html: self.pane.prompt().to_string(),
            popups: self
                .popups
                .iter()
                .map(|(id, html)| PopupStateMsg { id: id.0.to_string(), html: html.to_string() })
                .collect(),
            channels: self.channels.clone(),
            options: self.options_msg(),
            server_connected: self.server_connected,
            server_url: self.settings.server_url.clone(),
        }
    }

    /// Apply one decoded server command; returns the surface operations.
    fn handle_server_cmd(&mut self, cmd: ServerCmd) -> Vec<WsMessage> {
        match cmd {
            ServerCmd::Text(event) => self.handle_text_event(event),
            ServerCmd::Prompt { text } => {
                let flags = RenderFlags {
                    nocolor: self.settings.nocolor,
                    screenreader: self.settings.screenreader,
                    ..Default::default()
                };
                let html = text2html::render_text(&text, &flags);
                self.pane.set_prompt(&html);
                vec![WsMessage::PromptUpdate { html }]
            }
            // a dedicated map push behaves like a map-typed text event
            ServerCmd::Map { text } => self.handle_text_event(TextEvent {
                text,
                meta: TextMeta { kind: Some("map".to_string()), cls: None },
                options: WireOptions::default(),
            }),
            ServerCmd::ChanInfo { channel_id, name, subscribed } => {
                let info = ChannelInfoMsg { channel_id, name, subscribed };
                match self.channels.iter_mut().find(|c| c.channel_id == channel_id) {
                    Some(existing) => *existing = info.clone(),
                    None => self.channels.push(info.clone()),
                }
                vec![WsMessage::ChannelInfo {
                    channel_id: info.channel_id,
                    name: info.name,
                    subscribed: info.subscribed,
                }]
            }
            ServerCmd::Pong => {
                debug_log(self.settings.debug_enabled, "keepalive pong");
                Vec::new()
            }
            ServerCmd::Unknown { cmd } => {
                debug_log(
                    self.settings.debug_enabled,
                    &format!("unhandled server command '{}'", cmd),
                );
                Vec::new()
            }
        }
    }

    fn handle_text_event(&mut self, event: TextEvent) -> Vec<WsMessage> {
        // per-message options override the session defaults
        let flags = RenderFlags {
            raw: event.options.raw.unwrap_or(false),
            client_raw: event.options.client_raw.unwrap_or(false),
            nocolor: event.options.nocolor.unwrap_or(self.settings.nocolor),
            screenreader: event.options.screenreader.unwrap_or(self.settings.screenreader),
        };
        let html = text2html::render_text(&event.text, &flags);
        self.deliver(&html, &event.meta)
    }

    /// A host-generated line for the main pane (connection notices etc).
    fn append_system_message(&mut self, text: &str) -> Vec<WsMessage> {
        let html = text2html::html_escape(text);
        let meta = TextMeta { kind: None, cls: Some("system".to_string()) };
        self.deliver(&html, &meta)
    }

    fn deliver(&mut self, html: &str, meta: &TextMeta) -> Vec<WsMessage> {
        let mut ops = Vec::new();
        let options = self.settings.route_options();
        let mut renderer = AppRenderer {
            pane: &mut self.pane,
            popups: &mut self.popups,
            ops: &mut ops,
            surface_attached: self.attached_surfaces > 0,
        };
        router::deliver(html, meta, &options, &mut renderer);
        ops
    }

    /// Toggle one of the surface-visible options. Returns false for keys
    /// no surface should be sending.
    fn set_option(&mut self, key: &str, value: bool) -> bool {
        match key {
            "helppopup" => self.settings.help_popup = value,
            "mappopup" => self.settings.map_popup = value,
            "nocolor" => self.settings.nocolor = value,
            "screenreader" => self.settings.screenreader = value,
            _ => return false,
        }
        true
    }
}

/// Renderer implementation bridging the router to the pane, the popup
/// state, and the surface operation stream.
struct AppRenderer<'a> {
    pane: &'a mut MessagePane,
    popups: &'a mut PopupManager,
    ops: &'a mut Vec<WsMessage>,
    surface_attached: bool,
}

impl Renderer for AppRenderer<'_> {
    fn append_main(&mut self, text: &str, cls: &str) {
        self.pane.append(cls, text);
        self.ops.push(WsMessage::BlockAppended {
            cls: cls.to_string(),
            html: text.to_string(),
        });
    }

    fn scroll_main_to_bottom(&mut self) {
        self.pane.scroll_to_bottom();
    }

    fn on_new_line(&mut self, _text: &str) {
        // unread tracking: blocks nobody watched land as unseen
        if !self.surface_attached {
            self.pane.bump_unseen();
        }
    }

    fn open_popup(&mut self, id: PopupId, text: &str) {
        self.popups.open(id, text);
        self.ops.push(WsMessage::PopupOpened {
            id: id.0.to_string(),
            html: text.to_string(),
        });
    }
}

// ============================================================================
// CLI
// ============================================================================

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    server_url: Option<String>,
    http_port: Option<u16>,
    ws_port: Option<u16>,
    password: Option<String>,
    no_http: bool,
    debug: bool,
    help: bool,
    version: bool,
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut cli = CliArgs::default();
    for arg in args {
        if let Some(port) = arg.strip_prefix("--http-port=") {
            cli.http_port =
                Some(port.parse().map_err(|_| format!("Invalid HTTP port: {}", port))?);
        } else if let Some(port) = arg.strip_prefix("--ws-port=") {
            cli.ws_port =
                Some(port.parse().map_err(|_| format!("Invalid WebSocket port: {}", port))?);
        } else if let Some(password) = arg.strip_prefix("--password=") {
            cli.password = Some(password.to_string());
        } else if arg == "--no-http" {
            cli.no_http = true;
        } else if arg == "--debug" {
            cli.debug = true;
        } else if arg == "--help" || arg == "-h" {
            cli.help = true;
        } else if arg == "--version" || arg == "-V" {
            cli.version = true;
        } else if arg.starts_with('-') {
            return Err(format!("Unknown option: {}", arg));
        } else if cli.server_url.is_none() {
            cli.server_url = Some(arg.clone());
        } else {
            return Err(format!("Unexpected argument: {}", arg));
        }
    }
    Ok(cli)
}

fn print_usage() {
    println!("Usage: loam [options] [ws://game-server:port/]");
    println!();
    println!("Options:");
    println!("  --http-port=PORT   Serve the surface page on PORT (default 4001)");
    println!("  --ws-port=PORT     Surface websocket on PORT (default 4002)");
    println!("  --password=PASS    Require PASS from attaching surfaces");
    println!("  --no-http          Don't serve the surface page");
    println!("  --debug            Write loam.debug.log");
    println!("  --help             Show this help");
    println!("  --version          Show version");
    println!();
    println!("The server URL is remembered in ~/.loam.dat once given.");
}

// ============================================================================
// Event loop
// ============================================================================

async fn run_app(cli: CliArgs) -> io::Result<()> {
    let settings_path = get_settings_path();
    let mut settings = load_settings_from_path(&settings_path).unwrap_or_else(|e| {
        eprintln!("Failed to read {:?}: {} (using defaults)", settings_path, e);
        Settings::default()
    });

    // CLI overrides, remembered for the next run
    if let Some(url) = cli.server_url {
        settings.server_url = url;
    }
    if let Some(port) = cli.http_port {
        settings.http_port = port;
    }
    if let Some(port) = cli.ws_port {
        settings.ws_port = port;
    }
    if let Some(password) = cli.password {
        settings.surface_password = password;
    }
    if cli.no_http {
        settings.http_enabled = false;
    }
    if cli.debug {
        settings.debug_enabled = true;
    }

    if settings.server_url.is_empty() {
        eprintln!("No game server URL configured.");
        print_usage();
        std::process::exit(2);
    }

    let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(256);
    let mut app = App::with_settings(settings.clone());

    // Surface websocket server. With ws_enabled off the client map stays
    // empty and broadcasts are no-ops.
    let mut ws_server = WebSocketServer::new(&settings.surface_password, settings.ws_port);
    if settings.ws_enabled {
        websocket::start_websocket_server(&mut ws_server, event_tx.clone())
            .await
            .map_err(|e| io::Error::other(format!("Surface websocket failed to start: {}", e)))?;
    }
    let clients = ws_server.clients.clone();

    // Surface page server
    let mut http_server = None;
    if settings.http_enabled && settings.ws_enabled {
        let mut server = http::HttpServer::new(settings.http_port);
        http::start_http_server(
            &mut server,
            settings.ws_port,
            false,
            settings.theme.colors().to_css_vars(),
        )
        .await
        .map_err(|e| io::Error::other(format!("Surface page server failed to start: {}", e)))?;
        println!("Surface page at http://localhost:{}/", settings.http_port);
        http_server = Some(server);
    }

    // Upstream connection
    let session = session::connect(&settings.server_url, event_tx.clone(), settings.debug_enabled)
        .await
        .map_err(|e| {
            io::Error::other(format!("Failed to connect to {}: {}", settings.server_url, e))
        })?;
    app.server_connected = true;
    println!("Connected to {}", settings.server_url);
    broadcast(&clients, &WsMessage::ServerConnected { url: settings.server_url.clone() }).await;

    // Autologin, then ask for the channel list
    if !settings.user.is_empty() && !settings.password.is_empty() {
        let line = format!("connect {} {}", settings.user, settings.password);
        session.send_frame(protocol::encode_input_line(&line)).await;
    }
    session.send_frame(protocol::encode_get_channels()).await;

    save_settings_to_path(&app.settings, &settings_path)?;

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                match event {
                    AppEvent::ServerCmd(cmd) => {
                        for op in app.handle_server_cmd(cmd) {
                            broadcast(&clients, &op).await;
                        }
                    }
                    AppEvent::SessionDisconnected => {
                        if app.server_connected {
                            app.server_connected = false;
                            for op in app.append_system_message("Connection to server closed.") {
                                broadcast(&clients, &op).await;
                            }
                            broadcast(&clients, &WsMessage::ServerDisconnected).await;
                        }
                    }
                    AppEvent::WsClientConnected(client_id) => {
                        debug_log(app.settings.debug_enabled,
                            &format!("surface {} connected", client_id));
                    }
                    AppEvent::WsClientDisconnected(client_id) => {
                        debug_log(app.settings.debug_enabled,
                            &format!("surface {} disconnected", client_id));
                        app.attached_surfaces = attached_count(&clients).await;
                    }
                    AppEvent::WsClientMessage(client_id, msg) => {
                        handle_surface_message(&mut app, &clients, &session, client_id, *msg).await;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    // Remember option changes made through surfaces
    if let Err(e) = save_settings_to_path(&app.settings, &settings_path) {
        eprintln!("Failed to save settings: {}", e);
    }
    if let Some(mut server) = http_server {
        server.stop();
    }
    ws_server.stop();

    Ok(())
}

async fn handle_surface_message(
    app: &mut App,
    clients: &websocket::ClientMap,
    session: &session::SessionHandle,
    client_id: u64,
    msg: WsMessage,
) {
    match msg {
        WsMessage::AuthRequest { .. } => {
            // auth already checked by the socket handler; attach the surface
            app.attached_surfaces = attached_count(clients).await;
            app.pane.mark_seen();
            send_to(clients, client_id, app.initial_state()).await;
        }
        WsMessage::InputLine { text } => {
            if app.server_connected {
                session.send_frame(protocol::encode_input_line(&text)).await;
            } else {
                for op in app.append_system_message("Not connected.") {
                    broadcast(clients, &op).await;
                }
            }
        }
        WsMessage::SetOption { key, value } => {
            if app.set_option(&key, value) {
                if let Err(e) = save_settings_to_path(&app.settings, &get_settings_path()) {
                    eprintln!("Failed to save settings: {}", e);
                }
                broadcast(clients, &WsMessage::OptionsUpdated { options: app.options_msg() })
                    .await;
            } else {
                debug_log(app.settings.debug_enabled,
                    &format!("surface {} sent unknown option '{}'", client_id, key));
            }
        }
        WsMessage::RequestMap => {
            if app.server_connected {
                session.send_frame(protocol::encode_get_map()).await;
            }
        }
        WsMessage::ClosePopup { id } => {
            if let Some(popup_id) = PopupId::from_target(&id) {
                if app.popups.close(popup_id) {
                    broadcast(clients, &WsMessage::PopupClosed { id }).await;
                }
            }
        }
        _ => {}
    }
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cli = match parse_args(&args[1..]) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{}", e);
            print_usage();
            std::process::exit(2);
        }
    };

    if cli.help {
        print_usage();
        return Ok(());
    }
    if cli.version {
        println!("loam {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    run_app(cli).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_app() -> App {
        App::with_settings(Settings::default())
    }

    fn text_cmd(text: &str, kind: Option<&str>, cls: Option<&str>) -> ServerCmd {
        ServerCmd::Text(TextEvent {
            text: text.to_string(),
            meta: TextMeta {
                kind: kind.map(str::to_string),
                cls: cls.map(str::to_string),
            },
            options: WireOptions::default(),
        })
    }

    #[test]
    fn test_text_appends_block_and_scrolls() {
        let mut app = new_app();
        let ops = app.handle_server_cmd(text_cmd("You see a sword.", None, None));

        assert_eq!(ops.len(), 1);
        match &ops[0] {
            WsMessage::BlockAppended { cls, html } => {
                assert_eq!(cls, "out");
                assert_eq!(html, "You see a sword.");
            }
            other => panic!("unexpected op: {:?}", other),
        }
        assert_eq!(app.pane.to_html(), "<div class=\"out\">You see a sword.</div>");
        assert!(app.pane.is_at_bottom());
        assert_eq!(app.pane.scroll_offset(), app.pane.max_scroll());
    }

    #[test]
    fn test_text_cls_override() {
        let mut app = new_app();
        app.handle_server_cmd(text_cmd("Ouch!", None, Some("combat")));
        assert_eq!(app.pane.last_block().unwrap().cls, "combat");
    }

    #[test]
    fn test_help_popup_enabled_leaves_pane_untouched() {
        let mut app = new_app();
        app.settings.help_popup = true;
        let ops = app.handle_server_cmd(text_cmd("Topics: combat", Some("help"), None));

        assert_eq!(ops.len(), 1);
        match &ops[0] {
            WsMessage::PopupOpened { id, html } => {
                assert_eq!(id, "#helpdialog");
                assert_eq!(html, "Topics: combat");
            }
            other => panic!("unexpected op: {:?}", other),
        }
        assert!(app.pane.is_empty());
        assert_eq!(app.popups.content(popup::HELP_DIALOG), Some("Topics: combat"));
    }

    #[test]
    fn test_help_popup_disabled_goes_to_main() {
        let mut app = new_app();
        let ops = app.handle_server_cmd(text_cmd("Topics: combat", Some("help"), None));
        assert!(matches!(&ops[0], WsMessage::BlockAppended { cls, .. } if cls == "out"));
        assert!(!app.popups.is_open(popup::HELP_DIALOG));
    }

    #[test]
    fn test_map_routing_follows_option() {
        let mut app = new_app();

        // mappopup off: map-typed text lands in the main pane with class out
        let ops = app.handle_server_cmd(text_cmd("Room map text", Some("map"), None));
        assert!(matches!(&ops[0], WsMessage::BlockAppended { cls, .. } if cls == "out"));

        // mappopup on: same event opens the map dialog, pane unchanged
        app.settings.map_popup = true;
        let pane_len = app.pane.len();
        let ops = app.handle_server_cmd(text_cmd("Room map text", Some("map"), None));
        assert!(matches!(&ops[0], WsMessage::PopupOpened { id, .. } if id == "#mapdialog"));
        assert_eq!(app.pane.len(), pane_len);
    }

    #[test]
    fn test_map_command_behaves_like_map_typed_text() {
        let mut app = new_app();
        app.settings.map_popup = true;
        let ops = app.handle_server_cmd(ServerCmd::Map { text: "#-#".to_string() });
        assert!(matches!(&ops[0], WsMessage::PopupOpened { id, .. } if id == "#mapdialog"));
        assert_eq!(app.popups.content(popup::MAP_DIALOG), Some("#-#"));
    }

    #[test]
    fn test_ansi_converted_before_routing() {
        let mut app = new_app();
        app.handle_server_cmd(text_cmd("\x1b[31mred\x1b[0m", None, None));
        assert_eq!(
            app.pane.last_block().unwrap().html,
            "<span class=\"color-001\">red</span>"
        );
    }

    #[test]
    fn test_raw_option_escapes_only() {
        let mut app = new_app();
        let cmd = ServerCmd::Text(TextEvent {
            text: "<b>hi</b>".to_string(),
            meta: TextMeta::default(),
            options: WireOptions { raw: Some(true), ..Default::default() },
        });
        app.handle_server_cmd(cmd);
        assert_eq!(app.pane.last_block().unwrap().html, "&lt;b&gt;hi&lt;/b&gt;");
    }

    #[test]
    fn test_client_raw_passes_html_through() {
        let mut app = new_app();
        let cmd = ServerCmd::Text(TextEvent {
            text: "<b>hi</b>".to_string(),
            meta: TextMeta::default(),
            options: WireOptions {
                raw: Some(true),
                client_raw: Some(true),
                ..Default::default()
            },
        });
        app.handle_server_cmd(cmd);
        assert_eq!(app.pane.last_block().unwrap().html, "<b>hi</b>");
    }

    #[test]
    fn test_prompt_updates_slot_not_pane() {
        let mut app = new_app();
        let ops = app.handle_server_cmd(ServerCmd::Prompt { text: "HP: 10>".to_string() });
        assert!(matches!(&ops[0], WsMessage::PromptUpdate { html } if html == "HP: 10&gt;"));
        assert_eq!(app.pane.prompt(), "HP: 10&gt;");
        assert!(app.pane.is_empty());
    }

    #[test]
    fn test_chaninfo_updates_channel_list() {
        let mut app = new_app();
        app.handle_server_cmd(ServerCmd::ChanInfo {
            channel_id: 3,
            name: "public".to_string(),
            subscribed: true,
        });
        assert_eq!(app.channels.len(), 1);

        // a re-announce replaces rather than duplicates
        app.handle_server_cmd(ServerCmd::ChanInfo {
            channel_id: 3,
            name: "public".to_string(),
            subscribed: false,
        });
        assert_eq!(app.channels.len(), 1);
        assert!(!app.channels[0].subscribed);
    }

    #[test]
    fn test_unseen_tracking_without_surfaces() {
        let mut app = new_app();
        app.handle_server_cmd(text_cmd("a", None, None));
        app.handle_server_cmd(text_cmd("b", None, None));
        assert_eq!(app.pane.unseen_blocks(), 2);

        app.attached_surfaces = 1;
        app.pane.mark_seen();
        app.handle_server_cmd(text_cmd("c", None, None));
        assert_eq!(app.pane.unseen_blocks(), 0);
    }

    #[test]
    fn test_popup_routing_skips_unseen_tracking() {
        let mut app = new_app();
        app.settings.help_popup = true;
        app.handle_server_cmd(text_cmd("help text", Some("help"), None));
        assert_eq!(app.pane.unseen_blocks(), 0);
    }

    #[test]
    fn test_system_message_class() {
        let mut app = new_app();
        let ops = app.append_system_message("Connection to server closed.");
        assert!(matches!(&ops[0], WsMessage::BlockAppended { cls, .. } if cls == "system"));
    }

    #[test]
    fn test_set_option() {
        let mut app = new_app();
        assert!(app.set_option("helppopup", true));
        assert!(app.set_option("mappopup", true));
        assert!(app.set_option("nocolor", true));
        assert!(app.set_option("screenreader", true));
        assert!(!app.set_option("debug_enabled", true));
        assert!(app.settings.help_popup && app.settings.map_popup);
    }

    #[test]
    fn test_initial_state_snapshot() {
        let mut app = new_app();
        app.settings.help_popup = true;
        app.handle_server_cmd(text_cmd("hello", None, None));
        app.handle_server_cmd(text_cmd("topics", Some("help"), None));
        app.handle_server_cmd(ServerCmd::Prompt { text: ">".to_string() });

        match app.initial_state() {
            WsMessage::InitialState { pane_html, prompt_html, popups, options, .. } => {
                assert_eq!(pane_html, "<div class=\"out\">hello</div>");
                assert_eq!(prompt_html, "&gt;");
                assert_eq!(popups.len(), 1);
                assert_eq!(popups[0].id, "#helpdialog");
                assert!(options.helppopup);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_args() {
        let args: Vec<String> = vec![
            "--http-port=8080".to_string(),
            "--ws-port=8081".to_string(),
            "--password=secret".to_string(),
            "--no-http".to_string(),
            "--debug".to_string(),
            "ws://mud.example.com:4002/".to_string(),
        ];
        let cli = parse_args(&args).unwrap();
        assert_eq!(cli.http_port, Some(8080));
        assert_eq!(cli.ws_port, Some(8081));
        assert_eq!(cli.password.as_deref(), Some("secret"));
        assert!(cli.no_http);
        assert!(cli.debug);
        assert_eq!(cli.server_url.as_deref(), Some("ws://mud.example.com:4002/"));
    }

    #[test]
    fn test_parse_args_rejects_bad_input() {
        assert!(parse_args(&["--http-port=notaport".to_string()]).is_err());
        assert!(parse_args(&["--frobnicate".to_string()]).is_err());
        assert!(parse_args(&["url1".to_string(), "url2".to_string()]).is_err());
    }

    #[test]
    fn test_parse_args_empty() {
        let cli = parse_args(&[]).unwrap();
        assert_eq!(cli, CliArgs::default());
    }
}
