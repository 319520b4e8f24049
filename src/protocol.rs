//! Wire protocol for Evennia-style webclient connections.
//!
//! Every frame is a JSON array `[cmdname, args, kwargs]`. Inbound commands
//! the host understands are `text`, `prompt`, `map`, `chaninfo` and the
//! `pong` keepalive reply; anything else is carried through as `Unknown`
//! so the caller can log it. Decoding is total — a malformed frame decodes
//! to `None`, never a panic.

use serde_json::{json, Map, Value};

use crate::router::TextMeta;

/// Per-message rendering options from the `options` kwargs entry. `None`
/// means the message didn't say, and the session default applies.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WireOptions {
    pub raw: Option<bool>,
    pub client_raw: Option<bool>,
    pub nocolor: Option<bool>,
    pub screenreader: Option<bool>,
}

/// One decoded `text` push.
#[derive(Debug, Clone, PartialEq)]
pub struct TextEvent {
    pub text: String,
    pub meta: TextMeta,
    pub options: WireOptions,
}

/// A decoded server-to-client command.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerCmd {
    Text(TextEvent),
    Prompt { text: String },
    Map { text: String },
    ChanInfo { channel_id: i64, name: String, subscribed: bool },
    Pong,
    Unknown { cmd: String },
}

/// Pull the display string out of an `args` value: either the first
/// element of a list or a bare string.
fn first_arg_string(args: Option<&Value>) -> Option<String> {
    match args? {
        Value::Array(items) => items.first()?.as_str().map(str::to_string),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn kwargs_object(kwargs: Option<&Value>) -> Option<&Map<String, Value>> {
    kwargs?.as_object()
}

/// Booleans on the wire are sometimes integers; accept both.
fn as_flag(value: &Value) -> Option<bool> {
    value.as_bool().or_else(|| value.as_i64().map(|n| n != 0))
}

fn decode_wire_options(kwargs: Option<&Map<String, Value>>) -> WireOptions {
    let mut options = WireOptions::default();
    let Some(opts) = kwargs.and_then(|k| k.get("options")).and_then(Value::as_object) else {
        return options;
    };
    options.raw = opts.get("raw").and_then(as_flag);
    options.client_raw = opts.get("client_raw").and_then(as_flag);
    options.nocolor = opts.get("nocolor").and_then(as_flag);
    options.screenreader = opts.get("screenreader").and_then(as_flag);
    options
}

/// Decode one inbound frame. Returns None when the frame is not a
/// well-formed command array or a required argument is missing.
pub fn decode_server_cmd(raw: &str) -> Option<ServerCmd> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let frame = value.as_array()?;
    let cmd = frame.first()?.as_str()?;
    let args = frame.get(1);
    let kwargs = kwargs_object(frame.get(2));

    match cmd {
        "text" => {
            let text = first_arg_string(args)?;
            let meta = TextMeta {
                kind: kwargs
                    .and_then(|k| k.get("type"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                cls: kwargs
                    .and_then(|k| k.get("cls"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
            };
            Some(ServerCmd::Text(TextEvent {
                text,
                meta,
                options: decode_wire_options(kwargs),
            }))
        }
        "prompt" => Some(ServerCmd::Prompt { text: first_arg_string(args)? }),
        "map" => Some(ServerCmd::Map { text: first_arg_string(args)? }),
        "chaninfo" => {
            let items = args?.as_array()?;
            Some(ServerCmd::ChanInfo {
                channel_id: items.first()?.as_i64()?,
                name: items.get(1)?.as_str()?.to_string(),
                subscribed: items.get(2).and_then(as_flag)?,
            })
        }
        // the server answers ping with a loosely-shaped ["pong", "", ""]
        "pong" => Some(ServerCmd::Pong),
        _ => Some(ServerCmd::Unknown { cmd: cmd.to_string() }),
    }
}

// ============================================================================
// Outbound frames
// ============================================================================

/// An input line typed by the user.
pub fn encode_input_line(line: &str) -> String {
    json!(["text", [line], {}]).to_string()
}

/// Protocol keepalive.
pub fn encode_ping() -> String {
    json!(["ping", [], {}]).to_string()
}

/// Ask the server for the character's visible map.
pub fn encode_get_map() -> String {
    json!(["get_map", [], {}]).to_string()
}

/// Ask the server for the account's channel subscriptions.
pub fn encode_get_channels() -> String {
    json!(["get_channels", [], {}]).to_string()
}
