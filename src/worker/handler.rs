//! Store worker implementation.
//!
//! [`StoreWorker`] owns the [`Storage`] backend and turns each [`StoreRequest`] into
//! a [`StoreResponse`]. [`run`] is the body of the background thread: it opens the
//! store, answers requests in arrival order, and closes the store when asked to
//! shut down or when the event loop drops its end of the channel.

use std::sync::mpsc::{Receiver, Sender};

use crate::domain::error::Result;
use crate::storage::backend::Storage;
use crate::worker::messages::{Completion, StoreRequest, StoreResponse, Ticket};

/// A request in flight to the worker thread.
///
/// Carries the span that was current at submission so the worker's log lines nest
/// under the operation that caused them.
#[derive(Debug)]
pub(crate) struct Envelope {
    pub ticket: Ticket,
    pub request: StoreRequest,
    pub parent: tracing::Span,
}

/// Worker state for handling storage operations.
pub struct StoreWorker {
    storage: Box<dyn Storage>,
}

impl StoreWorker {
    #[must_use]
    pub fn new(storage: Box<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Opens the backend. A failure is logged; later requests then fail with
    /// `NotOpen` and callers fall back to their degraded paths.
    pub fn open(&mut self) {
        if let Err(e) = self.storage.open() {
            tracing::error!(error = %e, "failed to open store");
        }
    }

    /// Closes the backend.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the close fails.
    pub fn close(&mut self) -> Result<()> {
        self.storage.close()
    }

    /// Helper for handling storage operation results with consistent logging.
    fn handle_db_result<T, F>(operation: &str, result: Result<T>, on_success: F) -> StoreResponse
    where
        F: FnOnce(T) -> StoreResponse,
    {
        match result {
            Ok(value) => {
                tracing::debug!(operation = operation, "storage operation successful");
                on_success(value)
            }
            Err(e) => {
                tracing::warn!(operation = operation, error = %e, "storage operation failed");
                StoreResponse::Error {
                    message: format!("{operation}: {e}"),
                    not_found: e.is_not_found(),
                }
            }
        }
    }

    /// Processes one request and returns its response.
    pub fn handle_message(&mut self, request: StoreRequest) -> StoreResponse {
        let operation = request.name();
        let span = tracing::debug_span!("worker_handle_message", operation = operation);
        let _guard = span.entered();

        let storage = &mut self.storage;
        match request {
            StoreRequest::RecordVisit { url, title } => {
                Self::handle_db_result(operation, storage.record_visit(&url, &title), |()| {
                    StoreResponse::VisitRecorded
                })
            }

            StoreRequest::ListHistory { limit } => {
                Self::handle_db_result(operation, storage.list_history(limit), |entries| {
                    StoreResponse::History { entries }
                })
            }

            StoreRequest::ClearHistory => {
                Self::handle_db_result(operation, storage.clear_history(), |()| StoreResponse::HistoryCleared)
            }

            StoreRequest::GetSetting { key } => {
                Self::handle_db_result(operation, storage.get_setting(&key), |value| {
                    StoreResponse::Setting { key, value }
                })
            }

            StoreRequest::SetSetting { key, value } => {
                Self::handle_db_result(operation, storage.set_setting(&key, &value), |()| {
                    StoreResponse::SettingSaved { key }
                })
            }

            StoreRequest::GetAllSettings => {
                Self::handle_db_result(operation, storage.get_all_settings(), |settings| {
                    StoreResponse::Settings { settings }
                })
            }

            StoreRequest::AddBookmark {
                url,
                title,
                favicon,
                folder_id,
            } => Self::handle_db_result(
                operation,
                storage.add_bookmark(&url, &title, favicon.as_deref(), folder_id.as_deref()),
                |bookmark| StoreResponse::BookmarkAdded { bookmark },
            ),

            StoreRequest::RemoveBookmark { id } => {
                Self::handle_db_result(operation, storage.remove_bookmark(&id), |()| {
                    StoreResponse::BookmarkRemoved { id }
                })
            }

            StoreRequest::ListBookmarks { folder_id } => {
                Self::handle_db_result(operation, storage.list_bookmarks(folder_id.as_deref()), |bookmarks| {
                    StoreResponse::Bookmarks { bookmarks }
                })
            }

            StoreRequest::SearchBookmarks { query } => {
                Self::handle_db_result(operation, storage.search_bookmarks(&query), |bookmarks| {
                    StoreResponse::Bookmarks { bookmarks }
                })
            }

            StoreRequest::CreateFolder { name, parent_id } => Self::handle_db_result(
                operation,
                storage.create_bookmark_folder(&name, parent_id.as_deref()),
                |folder| StoreResponse::FolderCreated { folder },
            ),

            StoreRequest::ListFolders { parent_id } => Self::handle_db_result(
                operation,
                storage.list_bookmark_folders(parent_id.as_deref()),
                |folders| StoreResponse::Folders { folders },
            ),

            StoreRequest::RemoveFolder { id } => {
                Self::handle_db_result(operation, storage.remove_bookmark_folder(&id), |()| {
                    StoreResponse::FolderRemoved { id }
                })
            }

            StoreRequest::MoveFolder { id, new_parent } => Self::handle_db_result(
                operation,
                storage.move_bookmark_folder(&id, new_parent.as_deref()),
                |()| StoreResponse::FolderMoved { id },
            ),

            StoreRequest::SaveTabSnapshot { tabs } => {
                let count = tabs.len();
                Self::handle_db_result(operation, storage.save_tab_snapshot(&tabs), |()| {
                    StoreResponse::SnapshotSaved { count }
                })
            }

            StoreRequest::LoadTabSnapshot => {
                Self::handle_db_result(operation, storage.load_tab_snapshot(), |tabs| {
                    StoreResponse::Snapshot { tabs }
                })
            }

            StoreRequest::ClearTabSnapshot => {
                Self::handle_db_result(operation, storage.clear_tab_snapshot(), |()| {
                    StoreResponse::SnapshotCleared
                })
            }

            StoreRequest::Shutdown => Self::handle_db_result(operation, storage.close(), |()| StoreResponse::Stopped),
        }
    }
}

/// Thread body: serves requests FIFO until shutdown or disconnect.
pub(crate) fn run(mut worker: StoreWorker, requests: Receiver<Envelope>, completions: Sender<Completion>) {
    tracing::debug!("store worker started");
    worker.open();

    while let Ok(Envelope { ticket, request, parent }) = requests.recv() {
        let stop = matches!(request, StoreRequest::Shutdown);
        let response = parent.in_scope(|| worker.handle_message(request));

        if completions.send(Completion { ticket, response }).is_err() {
            tracing::debug!(%ticket, "event loop gone, dropping completion");
            break;
        }
        if stop {
            tracing::debug!("store worker stopping");
            return;
        }
    }

    if let Err(e) = worker.close() {
        tracing::error!(error = %e, "failed to close store");
    }
    tracing::debug!("store worker exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::TabSnapshot;
    use crate::storage::SqliteStorage;

    fn worker() -> StoreWorker {
        let mut worker = StoreWorker::new(Box::new(SqliteStorage::in_memory()));
        worker.open();
        worker
    }

    #[test]
    fn settings_flow_through_the_worker() {
        let mut worker = worker();
        let saved = worker.handle_message(StoreRequest::SetSetting {
            key: "searchEngine".into(),
            value: "brave".into(),
        });
        assert_eq!(saved, StoreResponse::SettingSaved { key: "searchEngine".into() });

        let read = worker.handle_message(StoreRequest::GetSetting { key: "searchEngine".into() });
        assert_eq!(
            read,
            StoreResponse::Setting {
                key: "searchEngine".into(),
                value: Some("brave".into()),
            }
        );
    }

    #[test]
    fn failures_become_error_responses() {
        let mut worker = worker();
        let response = worker.handle_message(StoreRequest::AddBookmark {
            url: "https://a.test".into(),
            title: "A".into(),
            favicon: None,
            folder_id: Some("missing".into()),
        });
        match response {
            StoreResponse::Error { message, not_found } => {
                assert!(message.starts_with("add bookmark"));
                assert!(not_found);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn unopened_store_reports_errors() {
        let mut worker = StoreWorker::new(Box::new(SqliteStorage::in_memory()));
        let response = worker.handle_message(StoreRequest::LoadTabSnapshot);
        assert!(response.is_error());
    }

    #[test]
    fn snapshot_save_reports_count() {
        let mut worker = worker();
        let tabs = vec![TabSnapshot::new("a", "https://a", "A", 0)];
        let response = worker.handle_message(StoreRequest::SaveTabSnapshot { tabs });
        assert_eq!(response, StoreResponse::SnapshotSaved { count: 1 });
    }
}
