//! Storage backend abstraction.
//!
//! This module defines the [`Storage`] trait over the five durable entity kinds:
//! history, settings, bookmarks, bookmark folders and the open-tab snapshot. The
//! trait maps one method to one use case; it is not a generic ORM.
//!
//! Every method fails with [`StoreError::NotOpen`](crate::domain::StoreError::NotOpen)
//! when the backend has not been opened. Driver errors (constraint violations, I/O)
//! are surfaced to the caller unchanged.

use std::collections::BTreeMap;

use crate::domain::error::Result;
use crate::storage::models::{Bookmark, BookmarkFolder, HistoryEntry, TabSnapshot};

/// Default cap for [`Storage::list_history`].
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// Abstraction over persistent storage backends.
///
/// Implementations are owned by a single thread at a time (the store worker), so
/// the trait requires `Send` but not `Sync`.
///
/// # Implementations
///
/// - [`SqliteStorage`](crate::storage::SqliteStorage): single-file SQLite database
pub trait Storage: Send {
    /// Opens the backing store and creates the schema if needed.
    ///
    /// Safe to call on a store whose tables already exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema applied.
    fn open(&mut self) -> Result<()>;

    /// Releases the backing store. A no-op when already closed.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to close cleanly.
    fn close(&mut self) -> Result<()>;

    /// Returns `true` while the store is open.
    fn is_open(&self) -> bool;

    /// Records a visit, de-duplicating by exact URL.
    ///
    /// Internal-scheme URLs are ignored. An existing row gets the new title, a fresh
    /// timestamp and `visit_count + 1`; otherwise a row with `visit_count = 1` is
    /// inserted. Callers treat a failure as best-effort and never propagate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup or write fails.
    fn record_visit(&mut self, url: &str, title: &str) -> Result<()>;

    /// Lists history, most recent first, capped at `limit`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn list_history(&self, limit: usize) -> Result<Vec<HistoryEntry>>;

    /// Deletes every history row.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn clear_history(&mut self) -> Result<()>;

    /// Reads a single setting.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn get_setting(&self, key: &str) -> Result<Option<String>>;

    /// Inserts or replaces a setting, refreshing its `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn set_setting(&mut self, key: &str, value: &str) -> Result<()>;

    /// Reads every setting as a key/value map.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn get_all_settings(&self) -> Result<BTreeMap<String, String>>;

    /// Creates a bookmark with a fresh id and timestamps and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::NotFound`](crate::domain::ShellError::NotFound) if
    /// `folder_id` names no folder, or a driver error if the insert fails.
    fn add_bookmark(
        &mut self,
        url: &str,
        title: &str,
        favicon: Option<&str>,
        folder_id: Option<&str>,
    ) -> Result<Bookmark>;

    /// Deletes a bookmark. Unknown ids are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn remove_bookmark(&mut self, id: &str) -> Result<()>;

    /// Lists root bookmarks (`None`) or the bookmarks of one folder, ordered by
    /// `position` ascending then `created_at` descending.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn list_bookmarks(&self, folder_id: Option<&str>) -> Result<Vec<Bookmark>>;

    /// Case-insensitive substring search over title and URL, most recently updated
    /// first. A blank query yields no results.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn search_bookmarks(&self, query: &str) -> Result<Vec<Bookmark>>;

    /// Creates a folder at the root (`None`) or under `parent_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::NotFound`](crate::domain::ShellError::NotFound) if
    /// `parent_id` names no folder, or a driver error if the insert fails.
    fn create_bookmark_folder(&mut self, name: &str, parent_id: Option<&str>) -> Result<BookmarkFolder>;

    /// Lists root folders (`None`) or the children of `parent_id`, ordered by
    /// `position` then `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn list_bookmark_folders(&self, parent_id: Option<&str>) -> Result<Vec<BookmarkFolder>>;

    /// Deletes a folder together with every descendant folder and every bookmark
    /// inside any of them. Unknown ids are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the cascade fails; nothing is deleted in that case.
    fn remove_bookmark_folder(&mut self, id: &str) -> Result<()>;

    /// Re-parents a folder, refusing moves that would create a cycle.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Cycle`](crate::domain::StoreError::Cycle) for a move
    /// under itself or a descendant, or `NotFound` for unknown ids.
    fn move_bookmark_folder(&mut self, id: &str, new_parent: Option<&str>) -> Result<()>;

    /// Replaces the open-tab snapshot with `tabs` in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails; the previous snapshot is kept.
    fn save_tab_snapshot(&mut self, tabs: &[TabSnapshot]) -> Result<()>;

    /// Loads the open-tab snapshot ordered by `position`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn load_tab_snapshot(&self) -> Result<Vec<TabSnapshot>>;

    /// Empties the open-tab snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn clear_tab_snapshot(&mut self) -> Result<()>;
}
