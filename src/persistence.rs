//! Settings persistence.
//!
//! Settings live in a flat `[section]` / `key=value` dot-file under the
//! user's home directory. Missing keys keep their defaults and unknown
//! keys are ignored, so the file survives version skew in both directions.
//! Stored passwords are obfuscated with AES-GCM and base64.

use std::io::{self, Write as IoWrite};
use std::path::Path;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::router::RouteOptions;
use crate::theme::Theme;

/// Encryption key for password storage (padded to 32 bytes for AES-256)
pub(crate) const PASSWORD_ENCRYPTION_KEY: &[u8; 32] = b"loamwebclientpassphrase#\0\0\0\0\0\0\0\0";

/// All user-configurable state. Read at dispatch time, mutated only by
/// user actions (CLI, commands, surface settings messages).
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    // Routing preferences (the webclient option flags)
    pub help_popup: bool,
    pub map_popup: bool,

    // Rendering defaults, overridable per message
    pub nocolor: bool,
    pub screenreader: bool,

    pub debug_enabled: bool,
    pub theme: Theme,
    pub scrollback: usize,

    // Surface servers
    pub http_enabled: bool,
    pub http_port: u16,
    pub ws_enabled: bool,
    pub ws_port: u16,
    pub surface_password: String,

    // Upstream game server
    pub server_url: String,
    pub user: String,
    pub password: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            help_popup: false,
            map_popup: false,
            nocolor: false,
            screenreader: false,
            debug_enabled: false,
            theme: Theme::Dark,
            scrollback: 1000,
            http_enabled: true,
            http_port: 4001,
            ws_enabled: true,
            ws_port: 4002,
            surface_password: String::new(),
            server_url: String::new(),
            user: String::new(),
            password: String::new(),
        }
    }
}

impl Settings {
    /// Snapshot of the routing flags for a single dispatch.
    pub fn route_options(&self) -> RouteOptions {
        RouteOptions {
            help_popup: self.help_popup,
            map_popup: self.map_popup,
        }
    }
}

/// Encrypt a password using AES-256-GCM and return base64-encoded result
pub fn encrypt_password(password: &str) -> String {
    if password.is_empty() {
        return String::new();
    }

    let cipher = Aes256Gcm::new(PASSWORD_ENCRYPTION_KEY.into());

    // Nonce derived from the password itself; the key is known, this is
    // obfuscation-at-rest rather than real secrecy
    let mut nonce_bytes = [0u8; 12];
    nonce_bytes[0] = (password.len() & 0xFF) as u8;
    nonce_bytes[1] = ((password.len() >> 8) & 0xFF) as u8;
    for (i, b) in password.bytes().take(10).enumerate() {
        nonce_bytes[2 + i] = b;
    }
    let nonce = Nonce::from_slice(&nonce_bytes);

    match cipher.encrypt(nonce, password.as_bytes()) {
        Ok(ciphertext) => {
            let mut combined = nonce_bytes.to_vec();
            combined.extend(ciphertext);
            format!("ENC:{}", BASE64.encode(&combined))
        }
        Err(_) => password.to_string(),
    }
}

/// Decrypt a password. Returns the original string if it's not encrypted
/// or decryption fails (legacy plain passwords keep working).
pub fn decrypt_password(stored: &str) -> String {
    if stored.is_empty() {
        return String::new();
    }
    if !stored.starts_with("ENC:") {
        return stored.to_string();
    }

    let encoded = &stored[4..];
    let combined = match BASE64.decode(encoded) {
        Ok(data) => data,
        Err(_) => return stored.to_string(),
    };
    if combined.len() < 12 {
        return stored.to_string();
    }

    let (nonce_bytes, ciphertext) = combined.split_at(12);
    let nonce = Nonce::from_slice(nonce_bytes);
    let cipher = Aes256Gcm::new(PASSWORD_ENCRYPTION_KEY.into());

    match cipher.decrypt(nonce, ciphertext) {
        Ok(plaintext) => String::from_utf8_lossy(&plaintext).to_string(),
        Err(_) => stored.to_string(),
    }
}

/// Save settings to a specific path (the app passes the default path;
/// tests pass their own).
pub fn save_settings_to_path(settings: &Settings, path: &Path) -> io::Result<()> {
    let mut file = std::fs::File::create(path)?;

    writeln!(file, "[global]")?;
    writeln!(file, "helppopup={}", settings.help_popup)?;
    writeln!(file, "mappopup={}", settings.map_popup)?;
    writeln!(file, "nocolor={}", settings.nocolor)?;
    writeln!(file, "screenreader={}", settings.screenreader)?;
    writeln!(file, "debug_enabled={}", settings.debug_enabled)?;
    writeln!(file, "theme={}", settings.theme.name())?;
    writeln!(file, "scrollback={}", settings.scrollback)?;
    writeln!(file, "http_enabled={}", settings.http_enabled)?;
    writeln!(file, "http_port={}", settings.http_port)?;
    writeln!(file, "ws_enabled={}", settings.ws_enabled)?;
    writeln!(file, "ws_port={}", settings.ws_port)?;
    if !settings.surface_password.is_empty() {
        writeln!(file, "surface_password={}", encrypt_password(&settings.surface_password))?;
    }

    writeln!(file)?;
    writeln!(file, "[server]")?;
    if !settings.server_url.is_empty() {
        writeln!(file, "url={}", settings.server_url)?;
    }
    if !settings.user.is_empty() {
        writeln!(file, "user={}", settings.user)?;
    }
    if !settings.password.is_empty() {
        writeln!(file, "password={}", encrypt_password(&settings.password))?;
    }

    Ok(())
}

/// Load settings from a specific path. A missing file yields defaults.
pub fn load_settings_from_path(path: &Path) -> io::Result<Settings> {
    let mut settings = Settings::default();
    if !path.exists() {
        return Ok(settings);
    }

    let content = std::fs::read_to_string(path)?;
    let mut section = String::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            section = line[1..line.len() - 1].to_string();
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };

        match (section.as_str(), key) {
            ("global", "helppopup") => settings.help_popup = value == "true",
            ("global", "mappopup") => settings.map_popup = value == "true",
            ("global", "nocolor") => settings.nocolor = value == "true",
            ("global", "screenreader") => settings.screenreader = value == "true",
            ("global", "debug_enabled") => settings.debug_enabled = value == "true",
            ("global", "theme") => settings.theme = Theme::from_name(value),
            ("global", "scrollback") => {
                settings.scrollback = value.parse().unwrap_or(settings.scrollback)
            }
            ("global", "http_enabled") => settings.http_enabled = value == "true",
            ("global", "http_port") => {
                settings.http_port = value.parse().unwrap_or(settings.http_port)
            }
            ("global", "ws_enabled") => settings.ws_enabled = value == "true",
            ("global", "ws_port") => settings.ws_port = value.parse().unwrap_or(settings.ws_port),
            ("global", "surface_password") => settings.surface_password = decrypt_password(value),
            ("server", "url") => settings.server_url = value.to_string(),
            ("server", "user") => settings.user = value.to_string(),
            ("server", "password") => settings.password = decrypt_password(value),
            _ => {} // unknown key: ignore
        }
    }

    Ok(settings)
}
