//! Popup dialog state.
//!
//! The host owns which dialogs are open and what they currently show; the
//! browser surface only mirrors that state. Dialogs are identified by the
//! fixed target ids the surface markup uses.

/// Type-safe popup identifier. The inner string is the DOM id the surface
/// script resolves (`#helpdialog`, `#mapdialog`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PopupId(pub &'static str);

pub const HELP_DIALOG: PopupId = PopupId("#helpdialog");
pub const MAP_DIALOG: PopupId = PopupId("#mapdialog");

/// All dialogs the surface knows how to show.
pub const KNOWN_POPUPS: &[PopupId] = &[HELP_DIALOG, MAP_DIALOG];

impl PopupId {
    /// Look up a popup by its target id string.
    pub fn from_target(target: &str) -> Option<PopupId> {
        KNOWN_POPUPS.iter().copied().find(|p| p.0 == target)
    }
}

/// Outcome of an open request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// The dialog was closed and is now open.
    Opened,
    /// The dialog was already open; its content was replaced.
    Replaced,
}

/// Tracks open dialogs and their current content, in open order.
#[derive(Default)]
pub struct PopupManager {
    open: Vec<(PopupId, String)>,
}

impl PopupManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a dialog with the given content. Re-opening an open dialog
    /// replaces its content in place (the dialog is reused, not stacked).
    pub fn open(&mut self, id: PopupId, content: &str) -> OpenOutcome {
        if let Some(entry) = self.open.iter_mut().find(|(open_id, _)| *open_id == id) {
            entry.1 = content.to_string();
            OpenOutcome::Replaced
        } else {
            self.open.push((id, content.to_string()));
            OpenOutcome::Opened
        }
    }

    /// Close a dialog. Returns false if it wasn't open.
    pub fn close(&mut self, id: PopupId) -> bool {
        let before = self.open.len();
        self.open.retain(|(open_id, _)| *open_id != id);
        self.open.len() != before
    }

    pub fn is_open(&self, id: PopupId) -> bool {
        self.open.iter().any(|(open_id, _)| *open_id == id)
    }

    pub fn content(&self, id: PopupId) -> Option<&str> {
        self.open
            .iter()
            .find(|(open_id, _)| *open_id == id)
            .map(|(_, content)| content.as_str())
    }

    /// Open dialogs in open order, for the initial surface snapshot.
    pub fn iter(&self) -> impl Iterator<Item = (PopupId, &str)> {
        self.open.iter().map(|(id, content)| (*id, content.as_str()))
    }
}
