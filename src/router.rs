//! Routing of incoming text events to a render surface.
//!
//! Every `text` event from the game server ends up either in the main
//! message pane or in one of the named popup dialogs, depending on the
//! event's `type` tag and the user's popup preferences. The routing logic
//! is pure: it works against a `Renderer` capability and a read-only
//! options snapshot, so it can be exercised without any live surface.

use crate::popup::{PopupId, HELP_DIALOG, MAP_DIALOG};

/// Where a single event gets rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    Main,
    HelpPopup,
    MapPopup,
}

/// Read-only snapshot of the popup preference flags, taken at dispatch time.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteOptions {
    pub help_popup: bool,
    pub map_popup: bool,
}

/// Per-event metadata decoded from the wire `kwargs` map.
/// An absent kwargs map decodes to the default (both fields unset).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextMeta {
    /// The event's `type` tag (`"help"`, `"map"`, ...), if any.
    pub kind: Option<String>,
    /// Style class override for the main-pane block.
    pub cls: Option<String>,
}

/// Default style class for main-pane blocks when the event carries no `cls`.
pub const DEFAULT_CLASS: &str = "out";

/// Render capability injected into [`deliver`]. The app implements this
/// against the pane and popup models; tests implement it with a recorder.
pub trait Renderer {
    /// Append one styled block to the end of the main pane.
    fn append_main(&mut self, text: &str, cls: &str);
    /// Pin the main pane's scroll position to its maximum extent. Instant.
    fn scroll_main_to_bottom(&mut self);
    /// Notification hook fired after a block lands in the main pane.
    fn on_new_line(&mut self, text: &str);
    /// Hand the content to the popup collaborator for the given dialog.
    fn open_popup(&mut self, id: PopupId, text: &str);
}

/// Resolve the render target for an event. First match wins; the help rule
/// is checked before the map rule, so an event carrying both tags (which a
/// well-formed server never sends) lands in the help popup.
pub fn resolve_target(meta: &TextMeta, options: &RouteOptions) -> RenderTarget {
    match meta.kind.as_deref() {
        Some("help") if options.help_popup => RenderTarget::HelpPopup,
        Some("map") if options.map_popup => RenderTarget::MapPopup,
        _ => RenderTarget::Main,
    }
}

/// Route and render one text event. Infallible: missing metadata defaults
/// rather than rejects, and each call is independent of every other.
pub fn deliver(text: &str, meta: &TextMeta, options: &RouteOptions, renderer: &mut dyn Renderer) {
    match resolve_target(meta, options) {
        RenderTarget::Main => {
            let cls = meta.cls.as_deref().unwrap_or(DEFAULT_CLASS);
            renderer.append_main(text, cls);
            renderer.scroll_main_to_bottom();
            renderer.on_new_line(text);
        }
        RenderTarget::HelpPopup => renderer.open_popup(HELP_DIALOG, text),
        RenderTarget::MapPopup => renderer.open_popup(MAP_DIALOG, text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every renderer call in order.
    #[derive(Default)]
    struct Recorder {
        main: Vec<(String, String)>,
        scrolls: usize,
        new_lines: Vec<String>,
        popups: Vec<(PopupId, String)>,
    }

    impl Renderer for Recorder {
        fn append_main(&mut self, text: &str, cls: &str) {
            self.main.push((text.to_string(), cls.to_string()));
        }
        fn scroll_main_to_bottom(&mut self) {
            self.scrolls += 1;
        }
        fn on_new_line(&mut self, text: &str) {
            self.new_lines.push(text.to_string());
        }
        fn open_popup(&mut self, id: PopupId, text: &str) {
            self.popups.push((id, text.to_string()));
        }
    }

    fn meta(kind: Option<&str>, cls: Option<&str>) -> TextMeta {
        TextMeta {
            kind: kind.map(str::to_string),
            cls: cls.map(str::to_string),
        }
    }

    #[test]
    fn test_default_class_without_metadata() {
        let mut r = Recorder::default();
        deliver("You see a sword.", &TextMeta::default(), &RouteOptions::default(), &mut r);
        assert_eq!(r.main, vec![("You see a sword.".to_string(), "out".to_string())]);
        assert_eq!(r.scrolls, 1);
        assert_eq!(r.new_lines, vec!["You see a sword.".to_string()]);
        assert!(r.popups.is_empty());
    }

    #[test]
    fn test_default_class_when_cls_key_absent() {
        // kwargs present but without a cls key still defaults to "out"
        let mut r = Recorder::default();
        deliver("hello", &meta(Some("say"), None), &RouteOptions::default(), &mut r);
        assert_eq!(r.main[0].1, "out");
    }

    #[test]
    fn test_cls_override() {
        let mut r = Recorder::default();
        deliver("Ouch!", &meta(None, Some("combat")), &RouteOptions::default(), &mut r);
        assert_eq!(r.main, vec![("Ouch!".to_string(), "combat".to_string())]);
    }

    #[test]
    fn test_help_routed_to_popup_when_enabled() {
        let opts = RouteOptions { help_popup: true, map_popup: false };
        let mut r = Recorder::default();
        deliver("Help topics: ...", &meta(Some("help"), None), &opts, &mut r);
        assert_eq!(r.popups, vec![(HELP_DIALOG, "Help topics: ...".to_string())]);
        assert!(r.main.is_empty());
        assert_eq!(r.scrolls, 0);
        assert!(r.new_lines.is_empty());
    }

    #[test]
    fn test_help_routed_to_main_when_disabled() {
        let mut r = Recorder::default();
        deliver("Help topics: ...", &meta(Some("help"), None), &RouteOptions::default(), &mut r);
        assert!(r.popups.is_empty());
        assert_eq!(r.main[0].1, "out");
    }

    #[test]
    fn test_map_routed_to_popup_when_enabled() {
        let opts = RouteOptions { help_popup: false, map_popup: true };
        let mut r = Recorder::default();
        deliver("Room map text", &meta(Some("map"), None), &opts, &mut r);
        assert_eq!(r.popups, vec![(MAP_DIALOG, "Room map text".to_string())]);
        assert!(r.main.is_empty());
    }

    #[test]
    fn test_map_routed_to_main_when_disabled() {
        let mut r = Recorder::default();
        deliver("Room map text", &meta(Some("map"), None), &RouteOptions::default(), &mut r);
        assert_eq!(r.main, vec![("Room map text".to_string(), "out".to_string())]);
        assert_eq!(r.scrolls, 1);
    }

    #[test]
    fn test_unknown_type_routed_to_main() {
        let opts = RouteOptions { help_popup: true, map_popup: true };
        let mut r = Recorder::default();
        deliver("hi", &meta(Some("chat"), None), &opts, &mut r);
        assert!(r.popups.is_empty());
        assert_eq!(r.main.len(), 1);
    }

    #[test]
    fn test_help_wins_over_map() {
        // resolve_target checks help first, so with both flags on a "help"
        // event never reaches the map rule
        let opts = RouteOptions { help_popup: true, map_popup: true };
        assert_eq!(resolve_target(&meta(Some("help"), None), &opts), RenderTarget::HelpPopup);
        assert_eq!(resolve_target(&meta(Some("map"), None), &opts), RenderTarget::MapPopup);
    }

    #[test]
    fn test_exactly_one_block_per_main_event() {
        let mut r = Recorder::default();
        for i in 0..5 {
            deliver(&format!("line {}", i), &TextMeta::default(), &RouteOptions::default(), &mut r);
        }
        assert_eq!(r.main.len(), 5);
        assert_eq!(r.scrolls, 5);
        assert_eq!(r.new_lines.len(), 5);
    }
}
