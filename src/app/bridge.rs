//! Bridge protocol between the UI collaborator and the shell.
//!
//! Requests carry a caller-chosen `id` and a `cmd` naming the operation, with the
//! operation's arguments alongside:
//!
//! ```json
//! {"id": 7, "cmd": "bookmark.add", "url": "https://docs.rs", "title": "Docs"}
//! ```
//!
//! The top-level `id` belongs to the request. Arguments naming an entity use
//! `tabId`, `bookmarkId`, `folderId` or `parentId`:
//!
//! ```json
//! {"id": 8, "cmd": "tab.close", "tabId": "5f0c…"}
//! ```
//!
//! Every request gets exactly one reply with the same `id`, either
//! `{"id": 7, "ok": <value>}` or `{"id": 7, "error": "<message>"}`. Replies for
//! store-backed commands are sent once the store answers; the rest reply
//! immediately.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::worker::StoreResponse;

/// Overlay menu entries.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MenuAction {
    NewTab,
    Settings,
    History,
    /// Handed to the UI as `show-downloads`; transfers are tracked outside the shell.
    Downloads,
    Exit,
}

/// Operation requested by the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd")]
pub enum BridgeCommand {
    #[serde(rename = "tab.new")]
    TabNew {
        #[serde(default)]
        url: Option<String>,
    },
    #[serde(rename = "tab.switch")]
    TabSwitch {
        #[serde(rename = "tabId")]
        tab_id: String,
    },
    #[serde(rename = "tab.close")]
    TabClose {
        #[serde(rename = "tabId")]
        tab_id: String,
    },

    #[serde(rename = "nav.back")]
    NavBack,
    #[serde(rename = "nav.forward")]
    NavForward,
    #[serde(rename = "nav.reload")]
    NavReload,
    #[serde(rename = "nav.to")]
    NavTo { url: String },
    #[serde(rename = "nav.getState")]
    NavGetState,
    #[serde(rename = "nav.omnibox")]
    NavOmnibox { input: String },

    #[serde(rename = "history.get")]
    HistoryGet {
        #[serde(default)]
        limit: Option<usize>,
    },
    #[serde(rename = "history.clear")]
    HistoryClear,

    #[serde(rename = "settings.get")]
    SettingsGet { key: String },
    #[serde(rename = "settings.set")]
    SettingsSet { key: String, value: String },
    #[serde(rename = "settings.getAll")]
    SettingsGetAll,

    #[serde(rename = "bookmark.add")]
    BookmarkAdd {
        url: String,
        title: String,
        #[serde(default)]
        favicon: Option<String>,
        #[serde(default, rename = "folderId")]
        folder_id: Option<String>,
    },
    #[serde(rename = "bookmark.remove")]
    BookmarkRemove {
        #[serde(rename = "bookmarkId")]
        bookmark_id: String,
    },
    #[serde(rename = "bookmark.get")]
    BookmarkGet {
        #[serde(default, rename = "folderId")]
        folder_id: Option<String>,
    },
    #[serde(rename = "bookmark.search")]
    BookmarkSearch { query: String },
    #[serde(rename = "bookmark.createFolder")]
    BookmarkCreateFolder {
        name: String,
        #[serde(default, rename = "parentId")]
        parent_id: Option<String>,
    },
    #[serde(rename = "bookmark.getFolders")]
    BookmarkGetFolders {
        #[serde(default, rename = "parentId")]
        parent_id: Option<String>,
    },
    #[serde(rename = "bookmark.removeFolder")]
    BookmarkRemoveFolder {
        #[serde(rename = "folderId")]
        folder_id: String,
    },
    #[serde(rename = "bookmark.moveFolder")]
    BookmarkMoveFolder {
        #[serde(rename = "folderId")]
        folder_id: String,
        #[serde(default, rename = "parentId")]
        parent_id: Option<String>,
    },

    #[serde(rename = "window.minimize")]
    WindowMinimize,
    #[serde(rename = "window.maximize")]
    WindowMaximize,
    #[serde(rename = "window.close")]
    WindowClose,
    #[serde(rename = "window.resize")]
    WindowResize { width: u32, height: u32 },
    #[serde(rename = "window.fullscreen")]
    WindowFullscreen { enabled: bool },

    #[serde(rename = "menu.toggle")]
    MenuToggle,
    #[serde(rename = "menu.action")]
    MenuAction { action: MenuAction },
    #[serde(rename = "menu.setHeight")]
    MenuSetHeight { height: u32 },
}

/// What the caller sees when a store-backed command fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OnFailure {
    /// Reject the request with the error message.
    Reject,
    /// Reply successfully with this placeholder value.
    Substitute(Value),
}

impl BridgeCommand {
    /// Failure policy: reads degrade to an empty value, mutations are rejected.
    #[must_use]
    pub fn on_failure(&self) -> OnFailure {
        match self {
            Self::HistoryGet { .. }
            | Self::BookmarkGet { .. }
            | Self::BookmarkSearch { .. }
            | Self::BookmarkGetFolders { .. } => OnFailure::Substitute(Value::Array(Vec::new())),
            Self::SettingsGet { .. } => OnFailure::Substitute(Value::Null),
            Self::SettingsGetAll => OnFailure::Substitute(Value::Object(serde_json::Map::new())),
            _ => OnFailure::Reject,
        }
    }
}

/// A command with its correlation id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeRequest {
    pub id: u64,
    #[serde(flatten)]
    pub command: BridgeCommand,
}

/// Outcome half of a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyResult {
    Ok(Value),
    Error(String),
}

/// Answer to one [`BridgeRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeReply {
    pub id: u64,
    #[serde(flatten)]
    pub result: ReplyResult,
}

impl BridgeReply {
    #[must_use]
    pub const fn ok(id: u64, value: Value) -> Self {
        Self {
            id,
            result: ReplyResult::Ok(value),
        }
    }

    pub fn error(id: u64, message: impl Into<String>) -> Self {
        Self {
            id,
            result: ReplyResult::Error(message.into()),
        }
    }

    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self.result, ReplyResult::Ok(_))
    }

    /// The success value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match &self.result {
            ReplyResult::Ok(value) => Some(value),
            ReplyResult::Error(_) => None,
        }
    }
}

/// A store operation that did not produce a reply value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreFailure {
    pub message: String,
    /// The operation referenced an entity that does not exist.
    pub not_found: bool,
}

/// Converts a successful store response into the reply payload.
///
/// # Errors
///
/// Returns the store's failure for [`StoreResponse::Error`], or the encoder error
/// if a record cannot be serialized.
pub fn response_value(response: StoreResponse) -> Result<Value, StoreFailure> {
    let encoded = match response {
        StoreResponse::Error { message, not_found } => return Err(StoreFailure { message, not_found }),
        StoreResponse::History { entries } => serde_json::to_value(entries),
        StoreResponse::Setting { value, .. } => Ok(value.map_or(Value::Null, Value::String)),
        StoreResponse::Settings { settings } => serde_json::to_value(settings),
        StoreResponse::BookmarkAdded { bookmark } => serde_json::to_value(bookmark),
        StoreResponse::Bookmarks { bookmarks } => serde_json::to_value(bookmarks),
        StoreResponse::FolderCreated { folder } => serde_json::to_value(folder),
        StoreResponse::Folders { folders } => serde_json::to_value(folders),
        StoreResponse::Snapshot { tabs } => serde_json::to_value(tabs),
        StoreResponse::SettingSaved { .. }
        | StoreResponse::BookmarkRemoved { .. }
        | StoreResponse::FolderRemoved { .. }
        | StoreResponse::FolderMoved { .. } => Ok(Value::Bool(true)),
        StoreResponse::VisitRecorded
        | StoreResponse::HistoryCleared
        | StoreResponse::SnapshotSaved { .. }
        | StoreResponse::SnapshotCleared
        | StoreResponse::Stopped => Ok(Value::Null),
    };
    encoded.map_err(|e| StoreFailure {
        message: e.to_string(),
        not_found: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requests_parse_with_camel_case_arguments() {
        let request: BridgeRequest = serde_json::from_value(json!({
            "id": 3,
            "cmd": "bookmark.add",
            "url": "https://docs.rs",
            "title": "Docs",
            "folderId": "f1"
        }))
        .unwrap();

        assert_eq!(request.id, 3);
        assert_eq!(
            request.command,
            BridgeCommand::BookmarkAdd {
                url: "https://docs.rs".into(),
                title: "Docs".into(),
                favicon: None,
                folder_id: Some("f1".into()),
            }
        );
    }

    #[test]
    fn optional_arguments_may_be_omitted() {
        let request: BridgeRequest = serde_json::from_str(r#"{"id":1,"cmd":"tab.new"}"#).unwrap();
        assert_eq!(request.command, BridgeCommand::TabNew { url: None });

        let menu: BridgeRequest =
            serde_json::from_str(r#"{"id":2,"cmd":"menu.action","action":"new-tab"}"#).unwrap();
        assert_eq!(
            menu.command,
            BridgeCommand::MenuAction {
                action: MenuAction::NewTab
            }
        );
    }

    #[test]
    fn entity_arguments_do_not_collide_with_request_id() {
        let close: BridgeRequest =
            serde_json::from_str(r#"{"id":1,"cmd":"tab.close","tabId":"tab-abc"}"#).unwrap();
        assert_eq!(close.id, 1);
        assert_eq!(
            close.command,
            BridgeCommand::TabClose {
                tab_id: "tab-abc".into()
            }
        );

        let switch: BridgeRequest =
            serde_json::from_str(r#"{"id":2,"cmd":"tab.switch","tabId":"tab-abc"}"#).unwrap();
        assert_eq!(switch.id, 2);

        let remove: BridgeRequest =
            serde_json::from_str(r#"{"id":3,"cmd":"bookmark.remove","bookmarkId":"b1"}"#).unwrap();
        assert_eq!(
            remove.command,
            BridgeCommand::BookmarkRemove {
                bookmark_id: "b1".into()
            }
        );

        let moved: BridgeRequest = serde_json::from_value(json!({
            "id": 4,
            "cmd": "bookmark.moveFolder",
            "folderId": "f1",
            "parentId": "f2"
        }))
        .unwrap();
        assert_eq!(moved.id, 4);
        assert_eq!(
            moved.command,
            BridgeCommand::BookmarkMoveFolder {
                folder_id: "f1".into(),
                parent_id: Some("f2".into()),
            }
        );

        let removed: BridgeRequest =
            serde_json::from_str(r#"{"id":5,"cmd":"bookmark.removeFolder","folderId":"f1"}"#).unwrap();
        assert_eq!(
            removed.command,
            BridgeCommand::BookmarkRemoveFolder {
                folder_id: "f1".into()
            }
        );
    }

    #[test]
    fn downloads_menu_entry_parses() {
        let menu: BridgeRequest =
            serde_json::from_str(r#"{"id":1,"cmd":"menu.action","action":"downloads"}"#).unwrap();
        assert_eq!(
            menu.command,
            BridgeCommand::MenuAction {
                action: MenuAction::Downloads
            }
        );
    }

    #[test]
    fn store_errors_keep_not_found_flag() {
        let failure = response_value(StoreResponse::Error {
            message: "Not found: folder f9".into(),
            not_found: true,
        })
        .unwrap_err();
        assert!(failure.not_found);
        assert_eq!(failure.message, "Not found: folder f9");
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(serde_json::from_str::<BridgeRequest>(r#"{"id":1,"cmd":"tab.explode"}"#).is_err());
    }

    #[test]
    fn replies_carry_ok_or_error() {
        let ok = serde_json::to_value(BridgeReply::ok(1, json!(true))).unwrap();
        assert_eq!(ok, json!({"id": 1, "ok": true}));

        let err = serde_json::to_value(BridgeReply::error(2, "boom")).unwrap();
        assert_eq!(err, json!({"id": 2, "error": "boom"}));
    }

    #[test]
    fn reads_degrade_and_mutations_reject() {
        assert_eq!(
            BridgeCommand::HistoryGet { limit: None }.on_failure(),
            OnFailure::Substitute(json!([]))
        );
        assert_eq!(
            BridgeCommand::SettingsGet { key: "k".into() }.on_failure(),
            OnFailure::Substitute(Value::Null)
        );
        assert_eq!(BridgeCommand::SettingsGetAll.on_failure(), OnFailure::Substitute(json!({})));
        assert_eq!(
            BridgeCommand::BookmarkRemove {
                bookmark_id: "b".into()
            }
            .on_failure(),
            OnFailure::Reject
        );
    }

    #[test]
    fn missing_setting_is_null() {
        let value = response_value(StoreResponse::Setting {
            key: "theme".into(),
            value: None,
        })
        .unwrap();
        assert_eq!(value, Value::Null);
    }
}
