//! Events produced toward the UI collaborator.

use serde::{Deserialize, Serialize};

use crate::domain::{TabId, TabUpdate};

/// Notification for the window chrome.
///
/// Serialized with an `event` tag holding the kebab-case event name, e.g.
/// `{"event":"tab-closed","id":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ShellEvent {
    TabCreated {
        id: TabId,
        title: String,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        favicon: Option<String>,
    },
    TabSwitched {
        id: TabId,
        url: String,
    },
    TabUpdated {
        id: TabId,
        update: TabUpdate,
    },
    TabClosed {
        id: TabId,
    },
    TabLoading {
        id: TabId,
        loading: bool,
    },
    SetUiVisibility {
        visible: bool,
    },
    WindowMaximizedStatus {
        maximized: bool,
    },
    ShowHistory,
    ShowDownloads,
    MenuVisibility {
        visible: bool,
    },
}

impl ShellEvent {
    /// Wire name of the event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TabCreated { .. } => "tab-created",
            Self::TabSwitched { .. } => "tab-switched",
            Self::TabUpdated { .. } => "tab-updated",
            Self::TabClosed { .. } => "tab-closed",
            Self::TabLoading { .. } => "tab-loading",
            Self::SetUiVisibility { .. } => "set-ui-visibility",
            Self::WindowMaximizedStatus { .. } => "window-maximized-status",
            Self::ShowHistory => "show-history",
            Self::ShowDownloads => "show-downloads",
            Self::MenuVisibility { .. } => "menu-visibility",
        }
    }

    pub(crate) fn updated(id: &TabId, update: TabUpdate) -> Self {
        Self::TabUpdated { id: id.clone(), update }
    }
}
