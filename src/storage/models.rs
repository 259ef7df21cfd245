//! Storage record models for the persistence layer.
//!
//! These are the durable row types. They are separate from the in-memory
//! [`crate::domain::Tab`]: the store only ever sees snapshot copies of tabs.
//! All timestamps are Unix epoch milliseconds.

use serde::{Deserialize, Serialize};

/// One visited URL. At most one row exists per distinct `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub url: String,
    pub title: String,
    /// Time of the most recent visit.
    pub timestamp: i64,
    pub visit_count: i64,
}

/// A saved page, either at the root or inside a [`BookmarkFolder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    pub url: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    pub position: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A node of the bookmark folder forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkFolder {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub position: i64,
    pub created_at: i64,
}

/// One open tab as captured at the last session save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabSnapshot {
    pub id: String,
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    pub position: i64,
    pub active: bool,
}

impl TabSnapshot {
    pub fn new(id: impl Into<String>, url: impl Into<String>, title: impl Into<String>, position: i64) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            title: title.into(),
            favicon: None,
            position,
            active: false,
        }
    }
}

/// Current wall-clock time in epoch milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
