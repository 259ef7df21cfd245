//! Storage layer for durable browsing data.
//!
//! History, settings, bookmarks, bookmark folders and the open-tab snapshot live in
//! a single SQLite database behind the [`Storage`] trait. The store is owned by the
//! background worker (see [`crate::worker`]); nothing else touches the connection.
//!
//! # Modules
//!
//! - `backend`: Storage trait abstraction for backend implementations
//! - `models`: Durable record types separate from the in-memory tab model
//! - `schema`: Table layout and pragmas
//! - `sqlite`: SQLite implementation

pub mod backend;
pub mod models;
pub mod schema;
pub mod sqlite;

pub use backend::{Storage, DEFAULT_HISTORY_LIMIT};
pub use models::{now_millis, Bookmark, BookmarkFolder, HistoryEntry, TabSnapshot};
pub use sqlite::SqliteStorage;
