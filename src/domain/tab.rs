//! Tab domain model.
//!
//! A [`Tab`] is the transient, in-memory record of one content surface. It is owned
//! exclusively by the tab registry; everything else refers to tabs by [`TabId`] and
//! resolves them through the registry.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::address;

/// Opaque, unique identifier for a tab.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(String);

impl TabId {
    /// Allocates a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Wraps an existing identifier, e.g. one read back from a snapshot.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TabId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

/// Activation state of a live tab.
///
/// A tab is `Active` as soon as it is created and toggles to `Inactive` when another
/// tab is switched to. Closing is terminal and removes the record entirely.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabState {
    Active,
    Inactive,
}

/// In-memory metadata for one open tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub id: TabId,
    pub url: String,
    pub title: String,
    pub favicon: Option<String>,
    /// Creation ordinal; the registry orders tabs by it.
    pub position: u64,
    pub state: TabState,
    pub loading: bool,
    /// Title reported by the page for the navigation in flight, if any.
    pub page_title: Option<String>,
    /// `rel="icon"` candidates reported for the navigation in flight.
    pub favicon_candidates: Vec<String>,
}

impl Tab {
    /// Creates an active tab pointed at `url`.
    ///
    /// Internal targets get their synthetic title and the built-in icon; any other
    /// target starts out titled "New Tab" without a favicon until the page reports one.
    #[must_use]
    pub fn new(id: TabId, url: &str, position: u64) -> Self {
        let (title, favicon) = if address::is_internal(url) {
            (
                address::internal_title(url).to_string(),
                Some(address::APP_ICON_URL.to_string()),
            )
        } else {
            (address::NEW_TAB_TITLE.to_string(), None)
        };

        Self {
            id,
            url: url.to_string(),
            title,
            favicon,
            position,
            state: TabState::Active,
            loading: false,
            page_title: None,
            favicon_candidates: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TabState::Active
    }

    #[must_use]
    pub fn is_internal(&self) -> bool {
        address::is_internal(&self.url)
    }

    /// Forgets per-navigation metadata when a new document starts loading.
    pub fn begin_navigation(&mut self) {
        self.page_title = None;
        self.favicon_candidates.clear();
    }
}

/// Partial metadata change, carried by the `tab-updated` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loading: Option<bool>,
}

impl TabUpdate {
    #[must_use]
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn favicon(favicon: impl Into<String>) -> Self {
        Self {
            favicon: Some(favicon.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.url.is_none() && self.title.is_none() && self.favicon.is_none() && self.loading.is_none()
    }
}
