//! Store worker message types for cross-thread communication.
//!
//! This module defines the request and response protocol between the event-loop
//! thread and the background thread that owns the durable store. Every store
//! operation has one request variant and one success response; any failure comes
//! back as [`StoreResponse::Error`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::storage::models::{Bookmark, BookmarkFolder, HistoryEntry, TabSnapshot};

/// Correlates a submitted request with its completion.
///
/// Tickets are allocated in increasing order, and completions arrive in the same
/// order because the worker processes requests strictly FIFO.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticket(pub u64);

impl std::fmt::Display for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Messages sent from the event loop to the store worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StoreRequest {
    /// Record a completed visit. Internal URLs are ignored by the store.
    RecordVisit { url: String, title: String },

    ListHistory { limit: usize },

    ClearHistory,

    GetSetting { key: String },

    SetSetting { key: String, value: String },

    GetAllSettings,

    AddBookmark {
        url: String,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        favicon: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        folder_id: Option<String>,
    },

    RemoveBookmark { id: String },

    /// `None` lists root-level bookmarks.
    ListBookmarks {
        #[serde(default)]
        folder_id: Option<String>,
    },

    SearchBookmarks { query: String },

    CreateFolder {
        name: String,
        #[serde(default)]
        parent_id: Option<String>,
    },

    /// `None` lists root-level folders.
    ListFolders {
        #[serde(default)]
        parent_id: Option<String>,
    },

    RemoveFolder { id: String },

    MoveFolder {
        id: String,
        #[serde(default)]
        new_parent: Option<String>,
    },

    /// Replace the open-tab snapshot.
    SaveTabSnapshot { tabs: Vec<TabSnapshot> },

    LoadTabSnapshot,

    ClearTabSnapshot,

    /// Close the store and stop the worker once this request is answered.
    Shutdown,
}

impl StoreRequest {
    /// Short operation name used in log fields and error messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RecordVisit { .. } => "record visit",
            Self::ListHistory { .. } => "list history",
            Self::ClearHistory => "clear history",
            Self::GetSetting { .. } => "get setting",
            Self::SetSetting { .. } => "set setting",
            Self::GetAllSettings => "get all settings",
            Self::AddBookmark { .. } => "add bookmark",
            Self::RemoveBookmark { .. } => "remove bookmark",
            Self::ListBookmarks { .. } => "list bookmarks",
            Self::SearchBookmarks { .. } => "search bookmarks",
            Self::CreateFolder { .. } => "create folder",
            Self::ListFolders { .. } => "list folders",
            Self::RemoveFolder { .. } => "remove folder",
            Self::MoveFolder { .. } => "move folder",
            Self::SaveTabSnapshot { .. } => "save tab snapshot",
            Self::LoadTabSnapshot => "load tab snapshot",
            Self::ClearTabSnapshot => "clear tab snapshot",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Responses sent from the store worker back to the event loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StoreResponse {
    VisitRecorded,

    History { entries: Vec<HistoryEntry> },

    HistoryCleared,

    Setting { key: String, value: Option<String> },

    SettingSaved { key: String },

    Settings { settings: BTreeMap<String, String> },

    BookmarkAdded { bookmark: Bookmark },

    BookmarkRemoved { id: String },

    Bookmarks { bookmarks: Vec<Bookmark> },

    FolderCreated { folder: BookmarkFolder },

    Folders { folders: Vec<BookmarkFolder> },

    FolderRemoved { id: String },

    FolderMoved { id: String },

    SnapshotSaved { count: usize },

    Snapshot { tabs: Vec<TabSnapshot> },

    SnapshotCleared,

    /// The worker closed the store and is exiting.
    Stopped,

    /// The operation failed.
    Error {
        /// Human-readable error message, prefixed with the operation name.
        message: String,
        /// The failure only reports an unknown id.
        #[serde(default)]
        not_found: bool,
    },
}

impl StoreResponse {
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// A response paired with the ticket of the request that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub ticket: Ticket,
    pub response: StoreResponse,
}
