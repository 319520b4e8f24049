//! ANSI and link-markup to HTML conversion.
//!
//! Game servers ship raw ANSI text over the wire; everything a surface
//! shows goes through here first. SGR color state becomes nested-free
//! spans (`color-NNN` classes for the 16 base colors, inline styles for
//! the xterm-256 range), `|lc ... |lt ... |le` link markup becomes
//! clickable command spans, and bare URLs become links.

use std::sync::OnceLock;

use regex::Regex;

/// Per-message rendering flags, merged from session defaults and the
/// message's own `options` kwargs before delivery.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderFlags {
    /// No parsing at all beyond HTML escaping.
    pub raw: bool,
    /// With `raw`: skip even the escaping (content is already HTML).
    pub client_raw: bool,
    /// Strip color state; keep structure.
    pub nocolor: bool,
    /// Screenreader mode: strip ANSI and decorative separator lines.
    pub screenreader: bool,
}

/// Escape the characters HTML cares about. Quote escaping is handled at
/// the attribute sites that need it.
pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Strip ANSI escape codes from a string. CSI sequences are skipped to
/// their final byte; lone escapes drop the following character.
pub fn strip_ansi(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\x1b' {
            result.push(c);
            continue;
        }
        if chars.peek() == Some(&'[') {
            chars.next();
            for next in chars.by_ref() {
                if next.is_ascii_alphabetic() || next == '~' {
                    break;
                }
            }
        } else {
            chars.next();
        }
    }
    result
}

// ============================================================================
// SGR state tracking
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct SgrState {
    fg: Option<u16>,
    bg: Option<u16>,
    bold: bool,
    underline: bool,
    blink: bool,
    inverse: bool,
}

impl SgrState {
    fn is_plain(&self) -> bool {
        *self == SgrState::default()
    }

    /// Apply one SGR parameter list to the state.
    fn apply(&mut self, params: &[u16]) {
        let mut i = 0;
        while i < params.len() {
            match params[i] {
                0 => *self = SgrState::default(),
                1 => self.bold = true,
                4 => self.underline = true,
                5 => self.blink = true,
                7 => self.inverse = true,
                22 => self.bold = false,
                24 => self.underline = false,
                25 => self.blink = false,
                27 => self.inverse = false,
                30..=37 => self.fg = Some(params[i] - 30),
                39 => self.fg = None,
                40..=47 => self.bg = Some(params[i] - 40),
                49 => self.bg = None,
                90..=97 => self.fg = Some(params[i] - 90 + 8),
                100..=107 => self.bg = Some(params[i] - 100 + 8),
                38 | 48 if params.get(i + 1) == Some(&5) => {
                    if let Some(&n) = params.get(i + 2) {
                        if params[i] == 38 {
                            self.fg = Some(n.min(255));
                        } else {
                            self.bg = Some(n.min(255));
                        }
                    }
                    i += 2;
                }
                // 24-bit color: consume the components, render nothing
                38 | 48 if params.get(i + 1) == Some(&2) => {
                    i += 4;
                }
                _ => {}
            }
            i += 1;
        }
    }

    /// Render the opening span tag for this state, or None when plain.
    fn open_tag(&self) -> Option<String> {
        if self.is_plain() {
            return None;
        }
        let mut classes: Vec<String> = Vec::new();
        let mut styles: Vec<String> = Vec::new();

        // Bold lifts the 8 base colors to their bright versions, matching
        // terminal hilite behavior
        let fg = match (self.fg, self.bold) {
            (Some(n), true) if n < 8 => Some(n + 8),
            (fg, _) => fg,
        };
        match fg {
            Some(n) if n < 16 => classes.push(format!("color-{:03}", n)),
            Some(n) => styles.push(format!("color:{}", xterm_to_hex(n as u8))),
            None if self.bold => classes.push("bold".to_string()),
            None => {}
        }
        match self.bg {
            Some(n) if n < 16 => classes.push(format!("bgcolor-{:03}", n)),
            Some(n) => styles.push(format!("background-color:{}", xterm_to_hex(n as u8))),
            None => {}
        }
        if self.underline {
            classes.push("underline".to_string());
        }
        if self.blink {
            classes.push("blink".to_string());
        }
        if self.inverse {
            classes.push("inverse".to_string());
        }

        let mut tag = String::from("<span");
        if !classes.is_empty() {
            tag.push_str(" class=\"");
            tag.push_str(&classes.join(" "));
            tag.push('"');
        }
        if !styles.is_empty() {
            tag.push_str(" style=\"");
            tag.push_str(&styles.join(";"));
            tag.push('"');
        }
        tag.push('>');
        Some(tag)
    }
}

/// Map an xterm-256 index to its hex color.
fn xterm_to_hex(n: u8) -> String {
    let (r, g, b) = match n {
        0 => (0, 0, 0),
        1 => (128, 0, 0),
        2 => (0, 128, 0),
        3 => (128, 128, 0),
        4 => (0, 0, 128),
        5 => (128, 0, 128),
        6 => (0, 128, 128),
        7 => (192, 192, 192),
        8 => (128, 128, 128),
        9 => (255, 0, 0),
        10 => (0, 255, 0),
        11 => (255, 255, 0),
        12 => (0, 0, 255),
        13 => (255, 0, 255),
        14 => (0, 255, 255),
        15 => (255, 255, 255),
        16..=231 => {
            let n = n - 16;
            let comp = |v: u8| if v == 0 { 0 } else { 55 + 40 * v };
            (comp(n / 36), comp((n / 6) % 6), comp(n % 6))
        }
        232..=255 => {
            let v = 8 + 10 * (n - 232);
            (v, v, v)
        }
    };
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

// ============================================================================
// HTML assembly
// ============================================================================

/// Escape one text run and convert whitespace that HTML would collapse.
fn escape_run(text: &str, out: &mut String) {
    let mut prev_space = false;
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\n' => out.push_str("<br>"),
            '\r' => {}
            '\t' => out.push_str("&nbsp;&nbsp;&nbsp;&nbsp;"),
            ' ' if prev_space => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
        prev_space = c == ' ';
    }
}

fn link_markup_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\|lc(.*?)\|lt(.*?)\|le").unwrap())
}

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?:https?://|www\.)[^\s<>"']+"#).unwrap())
}

fn screenreader_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // decorative separator lines carry no information for a reader
    RE.get_or_init(|| Regex::new(r"(?m)^[ \t]*[-=_~+*#|]{3,}[ \t]*$\n?").unwrap())
}

/// Replace `|lc <command> |lt <text> |le` link markup with clickable
/// command spans. The surface script sends `data-command` back as input.
fn sub_link_markup(html: &str) -> String {
    link_markup_re()
        .replace_all(html, |caps: &regex::Captures| {
            let cmd = caps[1].trim().replace('"', "&quot;");
            let text = caps[2].trim().to_string();
            format!("<span class=\"mxplink\" data-command=\"{}\">{}</span>", cmd, text)
        })
        .into_owned()
}

/// Wrap bare URLs in anchor tags. Tag interiors are left alone so hrefs
/// and data attributes never get re-linked.
fn linkify_urls(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(tag_start) = rest.find('<') {
        let (text, after) = rest.split_at(tag_start);
        out.push_str(&linkify_text(text));
        match after.find('>') {
            Some(tag_end) => {
                out.push_str(&after[..=tag_end]);
                rest = &after[tag_end + 1..];
            }
            None => {
                out.push_str(after);
                return out;
            }
        }
    }
    out.push_str(&linkify_text(rest));
    out
}

fn linkify_text(text: &str) -> String {
    url_re()
        .replace_all(text, |caps: &regex::Captures| {
            let url = &caps[0];
            let href = if url.starts_with("www.") {
                format!("http://{}", url)
            } else {
                url.to_string()
            };
            format!("<a href=\"{}\" target=\"_blank\">{}</a>", href, url)
        })
        .into_owned()
}

/// Convert ANSI text to HTML. With `strip_colors` the SGR codes are
/// consumed but produce no spans.
pub fn parse_html(text: &str, strip_colors: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut state = SgrState::default();
    let mut span_open = false;
    let mut run = String::new();
    let mut chars = text.chars().peekable();

    let flush = |run: &mut String, out: &mut String, state: &SgrState, span_open: &mut bool| {
        if run.is_empty() {
            return;
        }
        if !strip_colors && !*span_open {
            if let Some(tag) = state.open_tag() {
                out.push_str(&tag);
                *span_open = true;
            }
        }
        escape_run(run, out);
        run.clear();
    };

    while let Some(c) = chars.next() {
        if c != '\x1b' {
            run.push(c);
            continue;
        }
        if chars.peek() != Some(&'[') {
            // lone escape: drop it and the following character
            chars.next();
            continue;
        }
        chars.next();
        // collect the CSI sequence body up to its final byte
        let mut body = String::new();
        let mut final_byte = None;
        for next in chars.by_ref() {
            if next.is_ascii_alphabetic() || next == '~' {
                final_byte = Some(next);
                break;
            }
            body.push(next);
        }
        if final_byte != Some('m') {
            continue; // non-SGR sequence: cursor movement, erase, ...
        }
        // emit pending text under the old state, close its span
        flush(&mut run, &mut out, &state, &mut span_open);
        if span_open {
            out.push_str("</span>");
            span_open = false;
        }
        let params: Vec<u16> = if body.is_empty() {
            vec![0]
        } else {
            body.split(';')
                .map(|p| p.parse::<u16>().unwrap_or(0))
                .collect()
        };
        state.apply(&params);
    }
    flush(&mut run, &mut out, &state, &mut span_open);
    if span_open {
        out.push_str("</span>");
    }

    linkify_urls(&sub_link_markup(&out))
}

/// Pre-process and convert one text payload the way the wire expects:
/// screenreader cleanup first, then either raw escaping or the full
/// conversion. Mirrors the portal-side send path of the original server.
pub fn render_text(text: &str, flags: &RenderFlags) -> String {
    let cleaned;
    let text = if flags.screenreader {
        cleaned = screenreader_re().replace_all(&strip_ansi(text), "").into_owned();
        cleaned.as_str()
    } else {
        text
    };

    if flags.raw {
        if flags.client_raw {
            text.to_string()
        } else {
            html_escape(text)
        }
    } else {
        parse_html(text, flags.nocolor)
    }
}
