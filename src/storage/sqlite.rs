//! SQLite storage backend.
//!
//! A single-file database (or an in-memory one, for tests) holding history,
//! settings, bookmarks, bookmark folders and the open-tab snapshot. The connection
//! is opened explicitly with [`Storage::open`] and every operation on a closed store
//! fails with [`StoreError::NotOpen`].
//!
//! Multi-statement writes (snapshot replacement, folder cascade) run inside a
//! transaction so a failure leaves the previous state intact.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::domain::address;
use crate::domain::error::{Result, ShellError, StoreError};
use crate::storage::backend::Storage;
use crate::storage::models::{now_millis, Bookmark, BookmarkFolder, HistoryEntry, TabSnapshot};
use crate::storage::schema;

/// SQLite-backed [`Storage`].
pub struct SqliteStorage {
    /// Database file; `None` for an in-memory database.
    path: Option<PathBuf>,
    conn: Option<Connection>,
}

impl SqliteStorage {
    /// Creates a closed store backed by the file at `path`.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path: Some(path), conn: None }
    }

    /// Creates a closed store backed by a private in-memory database.
    #[must_use]
    pub const fn in_memory() -> Self {
        Self { path: None, conn: None }
    }

    /// Creates and opens a store at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory, database or schema cannot be created.
    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self> {
        let mut storage = Self::new(path.into());
        storage.open()?;
        Ok(storage)
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(ShellError::Store(StoreError::NotOpen))
    }

    fn conn_mut(&mut self) -> Result<&mut Connection> {
        self.conn.as_mut().ok_or(ShellError::Store(StoreError::NotOpen))
    }
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorage")
            .field("path", &self.path)
            .field("open", &self.conn.is_some())
            .finish()
    }
}

fn history_from_row(row: &Row<'_>) -> rusqlite::Result<HistoryEntry> {
    Ok(HistoryEntry {
        id: row.get("id")?,
        url: row.get("url")?,
        title: row.get("title")?,
        timestamp: row.get("timestamp")?,
        visit_count: row.get("visit_count")?,
    })
}

fn bookmark_from_row(row: &Row<'_>) -> rusqlite::Result<Bookmark> {
    Ok(Bookmark {
        id: row.get("id")?,
        url: row.get("url")?,
        title: row.get("title")?,
        favicon: row.get("favicon")?,
        folder_id: row.get("folder_id")?,
        position: row.get("position")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn folder_from_row(row: &Row<'_>) -> rusqlite::Result<BookmarkFolder> {
    Ok(BookmarkFolder {
        id: row.get("id")?,
        name: row.get("name")?,
        parent_id: row.get("parent_id")?,
        position: row.get("position")?,
        created_at: row.get("created_at")?,
    })
}

fn snapshot_from_row(row: &Row<'_>) -> rusqlite::Result<TabSnapshot> {
    Ok(TabSnapshot {
        id: row.get("id")?,
        url: row.get("url")?,
        title: row.get("title")?,
        favicon: row.get("favicon")?,
        position: row.get("position")?,
        active: row.get("active")?,
    })
}

fn folder_exists(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    conn.query_row("SELECT 1 FROM bookmark_folders WHERE id = ?1", params![id], |_| Ok(()))
        .optional()
        .map(|found| found.is_some())
}

/// Ids of `root` and every folder below it, parents before children.
///
/// Empty when `root` does not exist. Tolerates cyclic rows already on disk.
fn folder_subtree(conn: &Connection, root: &str) -> rusqlite::Result<Vec<String>> {
    if !folder_exists(conn, root)? {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare("SELECT id FROM bookmark_folders WHERE parent_id = ?1")?;
    let mut seen = HashSet::from([root.to_string()]);
    let mut ordered = vec![root.to_string()];
    let mut queue = VecDeque::from([root.to_string()]);

    while let Some(parent) = queue.pop_front() {
        let children = stmt
            .query_map(params![parent], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for child in children {
            if seen.insert(child.clone()) {
                ordered.push(child.clone());
                queue.push_back(child);
            }
        }
    }

    Ok(ordered)
}

/// Escapes `LIKE` wildcards so the query matches literally.
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

impl Storage for SqliteStorage {
    fn open(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Ok(());
        }

        let conn = match &self.path {
            Some(path) => {
                tracing::debug!(path = ?path, "opening sqlite store");
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                let conn = Connection::open(path)?;
                let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
                tracing::trace!(journal_mode = %mode, "journal mode set");
                conn
            }
            None => {
                tracing::debug!("opening in-memory sqlite store");
                Connection::open_in_memory()?
            }
        };

        schema::apply(&conn)?;
        self.conn = Some(conn);
        tracing::debug!("sqlite store ready");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let Some(conn) = self.conn.take() else {
            tracing::trace!("close on already closed store");
            return Ok(());
        };

        conn.close().map_err(|(_, err)| ShellError::from(err))?;
        tracing::debug!("sqlite store closed");
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    fn record_visit(&mut self, url: &str, title: &str) -> Result<()> {
        let _span = tracing::debug_span!("sqlite_record_visit", url = %url).entered();

        if address::is_internal(url) {
            tracing::trace!("internal url, not recorded");
            return Ok(());
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO history (url, title, timestamp, visit_count) VALUES (?1, ?2, ?3, 1)
             ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                timestamp = MAX(history.timestamp, excluded.timestamp),
                visit_count = history.visit_count + 1",
            params![url, title, now_millis()],
        )?;

        tracing::debug!("visit recorded");
        Ok(())
    }

    fn list_history(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, url, title, timestamp, visit_count FROM history
             ORDER BY timestamp DESC, id DESC LIMIT ?1",
        )?;
        let entries = stmt
            .query_map(params![limit_param(limit)], history_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        tracing::debug!(count = entries.len(), "history listed");
        Ok(entries)
    }

    fn clear_history(&mut self) -> Result<()> {
        let removed = self.conn()?.execute("DELETE FROM history", [])?;
        tracing::info!(removed, "history cleared");
        Ok(())
    }

    fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn()?
            .query_row("SELECT value FROM settings WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set_setting(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now_millis()],
        )?;
        tracing::debug!(key = %key, "setting saved");
        Ok(())
    }

    fn get_all_settings(&self) -> Result<BTreeMap<String, String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
        let settings = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;
        Ok(settings)
    }

    fn add_bookmark(
        &mut self,
        url: &str,
        title: &str,
        favicon: Option<&str>,
        folder_id: Option<&str>,
    ) -> Result<Bookmark> {
        let _span = tracing::debug_span!("sqlite_add_bookmark", url = %url).entered();
        let conn = self.conn()?;

        if let Some(folder) = folder_id {
            if !folder_exists(conn, folder)? {
                return Err(ShellError::NotFound(format!("bookmark folder {folder}")));
            }
        }

        let now = now_millis();
        let bookmark = Bookmark {
            id: uuid::Uuid::new_v4().to_string(),
            url: Some(url.to_string()),
            title: title.to_string(),
            favicon: favicon.map(str::to_string),
            folder_id: folder_id.map(str::to_string),
            position: 0,
            created_at: now,
            updated_at: now,
        };

        conn.execute(
            "INSERT INTO bookmarks (id, url, title, favicon, folder_id, position, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                bookmark.id,
                bookmark.url,
                bookmark.title,
                bookmark.favicon,
                bookmark.folder_id,
                bookmark.position,
                bookmark.created_at,
                bookmark.updated_at,
            ],
        )?;

        tracing::debug!(bookmark_id = %bookmark.id, "bookmark added");
        Ok(bookmark)
    }

    fn remove_bookmark(&mut self, id: &str) -> Result<()> {
        let removed = self.conn()?.execute("DELETE FROM bookmarks WHERE id = ?1", params![id])?;
        tracing::debug!(bookmark_id = %id, removed, "bookmark removed");
        Ok(())
    }

    fn list_bookmarks(&self, folder_id: Option<&str>) -> Result<Vec<Bookmark>> {
        let conn = self.conn()?;
        let bookmarks = if let Some(folder) = folder_id {
            let mut stmt = conn.prepare(
                "SELECT * FROM bookmarks WHERE folder_id = ?1
                 ORDER BY position ASC, created_at DESC",
            )?;
            let rows = stmt.query_map(params![folder], bookmark_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        } else {
            let mut stmt = conn.prepare(
                "SELECT * FROM bookmarks WHERE folder_id IS NULL
                 ORDER BY position ASC, created_at DESC",
            )?;
            let rows = stmt.query_map([], bookmark_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(bookmarks)
    }

    fn search_bookmarks(&self, query: &str) -> Result<Vec<Bookmark>> {
        let conn = self.conn()?;
        let query = query.trim();
        if query.is_empty() {
            tracing::debug!("blank bookmark query, no results");
            return Ok(Vec::new());
        }

        let pattern = format!("%{}%", escape_like(query));
        let mut stmt = conn.prepare(
            r"SELECT * FROM bookmarks
              WHERE title LIKE ?1 ESCAPE '\' OR url LIKE ?1 ESCAPE '\'
              ORDER BY updated_at DESC",
        )?;
        let bookmarks = stmt
            .query_map(params![pattern], bookmark_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        tracing::debug!(count = bookmarks.len(), "bookmark search complete");
        Ok(bookmarks)
    }

    fn create_bookmark_folder(&mut self, name: &str, parent_id: Option<&str>) -> Result<BookmarkFolder> {
        let conn = self.conn()?;

        if let Some(parent) = parent_id {
            if !folder_exists(conn, parent)? {
                return Err(ShellError::NotFound(format!("bookmark folder {parent}")));
            }
        }

        let folder = BookmarkFolder {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            parent_id: parent_id.map(str::to_string),
            position: 0,
            created_at: now_millis(),
        };

        conn.execute(
            "INSERT INTO bookmark_folders (id, name, parent_id, position, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![folder.id, folder.name, folder.parent_id, folder.position, folder.created_at],
        )?;

        tracing::debug!(folder_id = %folder.id, name = %folder.name, "bookmark folder created");
        Ok(folder)
    }

    fn list_bookmark_folders(&self, parent_id: Option<&str>) -> Result<Vec<BookmarkFolder>> {
        let conn = self.conn()?;
        let folders = if let Some(parent) = parent_id {
            let mut stmt = conn.prepare(
                "SELECT * FROM bookmark_folders WHERE parent_id = ?1 ORDER BY position ASC, name ASC",
            )?;
            let rows = stmt.query_map(params![parent], folder_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        } else {
            let mut stmt = conn.prepare(
                "SELECT * FROM bookmark_folders WHERE parent_id IS NULL ORDER BY position ASC, name ASC",
            )?;
            let rows = stmt.query_map([], folder_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(folders)
    }

    fn remove_bookmark_folder(&mut self, id: &str) -> Result<()> {
        let _span = tracing::debug_span!("sqlite_remove_bookmark_folder", folder_id = %id).entered();
        let conn = self.conn_mut()?;
        let tx = conn.transaction()?;

        let subtree = folder_subtree(&tx, id)?;
        let mut bookmarks_removed = 0;
        for folder in &subtree {
            bookmarks_removed += tx.execute("DELETE FROM bookmarks WHERE folder_id = ?1", params![folder])?;
        }
        for folder in subtree.iter().rev() {
            tx.execute("DELETE FROM bookmark_folders WHERE id = ?1", params![folder])?;
        }
        tx.commit()?;

        tracing::debug!(
            folders_removed = subtree.len(),
            bookmarks_removed,
            "bookmark folder removed"
        );
        Ok(())
    }

    fn move_bookmark_folder(&mut self, id: &str, new_parent: Option<&str>) -> Result<()> {
        let conn = self.conn()?;

        if !folder_exists(conn, id)? {
            return Err(ShellError::NotFound(format!("bookmark folder {id}")));
        }

        if let Some(parent) = new_parent {
            if !folder_exists(conn, parent)? {
                return Err(ShellError::NotFound(format!("bookmark folder {parent}")));
            }
            if folder_subtree(conn, id)?.iter().any(|folder| folder == parent) {
                return Err(StoreError::Cycle {
                    folder: id.to_string(),
                    parent: parent.to_string(),
                }
                .into());
            }
        }

        conn.execute(
            "UPDATE bookmark_folders SET parent_id = ?1 WHERE id = ?2",
            params![new_parent, id],
        )?;
        tracing::debug!(folder_id = %id, parent_id = ?new_parent, "bookmark folder moved");
        Ok(())
    }

    fn save_tab_snapshot(&mut self, tabs: &[TabSnapshot]) -> Result<()> {
        let _span = tracing::debug_span!("sqlite_save_tab_snapshot", count = tabs.len()).entered();
        let conn = self.conn_mut()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM open_tabs", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO open_tabs (id, url, title, favicon, position, active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for tab in tabs {
                insert.execute(params![tab.id, tab.url, tab.title, tab.favicon, tab.position, tab.active])?;
            }
        }
        tx.commit()?;

        tracing::debug!("tab snapshot saved");
        Ok(())
    }

    fn load_tab_snapshot(&self) -> Result<Vec<TabSnapshot>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, url, title, favicon, position, active FROM open_tabs ORDER BY position ASC",
        )?;
        let tabs = stmt
            .query_map([], snapshot_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        tracing::debug!(count = tabs.len(), "tab snapshot loaded");
        Ok(tabs)
    }

    fn clear_tab_snapshot(&mut self) -> Result<()> {
        self.conn()?.execute("DELETE FROM open_tabs", [])?;
        Ok(())
    }
}

impl Drop for SqliteStorage {
    fn drop(&mut self) {
        if self.conn.is_some() {
            tracing::debug!("closing store on drop");
            if let Err(e) = self.close() {
                tracing::error!(error = %e, "failed to close store on drop");
            }
        }
    }
}
