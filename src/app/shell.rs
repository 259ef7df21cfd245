//! The shell event loop.
//!
//! [`Shell`] owns the tab registry, the store client, the window state and the
//! engine. It is driven from one thread by three kinds of input: bridge requests
//! from the UI, lifecycle signals from content surfaces, and store completions
//! collected by [`Shell::pump`]. Everything it produces (UI events and bridge
//! replies) is queued in order and handed out by [`Shell::drain_outbox`].

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::app::bridge::{self, BridgeCommand, BridgeReply, BridgeRequest, MenuAction, OnFailure};
use crate::app::events::ShellEvent;
use crate::app::reconciler;
use crate::app::registry::TabRegistry;
use crate::app::session;
use crate::app::window::WindowState;
use crate::domain::address::{self, SearchEngine};
use crate::domain::error::Result;
use crate::domain::TabId;
use crate::engine::{EngineController, SurfaceSignal, WindowCommand};
use crate::worker::{Completion, StoreClient, StoreRequest, StoreResponse, Ticket};
use crate::Config;

/// Message produced for the UI collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ShellOutput {
    Event(ShellEvent),
    Reply(BridgeReply),
}

/// Continuation for a store request in flight.
#[derive(Debug)]
enum Pending {
    /// Answer a bridge request; optionally adopt a new search engine on success.
    Reply {
        id: u64,
        on_failure: OnFailure,
        search_engine: Option<SearchEngine>,
    },
    /// Startup read of the search engine preference.
    SearchEngine,
}

/// Single-threaded orchestrator for one browser window.
pub struct Shell<E: EngineController> {
    engine: E,
    registry: TabRegistry<E::Surface>,
    store: StoreClient,
    window: WindowState,
    search_engine: SearchEngine,
    history_limit: usize,
    pending: HashMap<Ticket, Pending>,
    outbox: VecDeque<ShellOutput>,
    shut_down: bool,
}

impl<E: EngineController> Shell<E> {
    /// Assembles a shell. Call [`Shell::start`] before feeding it input.
    pub fn new(engine: E, store: StoreClient, config: &Config) -> Self {
        let window = WindowState::new(config.window_width, config.window_height, config.chrome_height);
        let registry = TabRegistry::new(window.content_area(), config.new_tab_url.clone());

        Self {
            engine,
            registry,
            store,
            window,
            search_engine: SearchEngine::default(),
            history_limit: config.history_limit,
            pending: HashMap::new(),
            outbox: VecDeque::new(),
            shut_down: false,
        }
    }

    /// Restores the previous session, or opens one default tab if there is none or
    /// it cannot be read.
    ///
    /// Blocks until the snapshot has been read; everything after startup is
    /// asynchronous.
    pub fn start(&mut self) {
        let _span = tracing::info_span!("shell_start").entered();

        let ticket = self.store.submit(StoreRequest::GetSetting {
            key: SearchEngine::SETTING_KEY.to_string(),
        });
        self.pending.insert(ticket, Pending::SearchEngine);

        let ticket = self.store.submit(StoreRequest::LoadTabSnapshot);
        let rows = match self.store.wait(ticket) {
            Ok(StoreResponse::Snapshot { tabs }) => tabs,
            Ok(StoreResponse::Error { message, .. }) => {
                tracing::warn!(error = %message, "session restore failed, starting fresh");
                Vec::new()
            }
            Ok(other) => {
                tracing::warn!(response = ?other, "unexpected snapshot response, starting fresh");
                Vec::new()
            }
            Err(e) => {
                tracing::error!(error = %e, "store unavailable during restore, starting fresh");
                Vec::new()
            }
        };

        session::restore(&mut self.registry, &mut self.engine, &rows);
        self.flush_events();
        self.pump();
    }

    /// Handles one bridge request. Store-backed commands reply later, from
    /// [`Shell::pump`]; all others reply before this returns.
    pub fn handle_request(&mut self, request: BridgeRequest) {
        let BridgeRequest { id, command } = request;
        let span = tracing::debug_span!("bridge_request", id, command = ?command);
        let _guard = span.entered();

        let immediate = match command {
            BridgeCommand::TabNew { url } => {
                let tab = self.registry.create_tab(&mut self.engine, url.as_deref());
                Some(Value::String(tab.to_string()))
            }
            BridgeCommand::TabSwitch { tab_id } => {
                self.registry.switch_to(&TabId::new(tab_id));
                Some(Value::Null)
            }
            BridgeCommand::TabClose { tab_id } => {
                self.close_tab(&TabId::new(tab_id));
                Some(Value::Null)
            }

            BridgeCommand::NavBack => {
                self.registry.back();
                Some(Value::Null)
            }
            BridgeCommand::NavForward => {
                self.registry.forward();
                Some(Value::Null)
            }
            BridgeCommand::NavReload => {
                self.registry.reload();
                Some(Value::Null)
            }
            BridgeCommand::NavTo { url } => {
                self.registry.navigate_to(&url);
                Some(Value::Null)
            }
            BridgeCommand::NavGetState => Some(serde_json::to_value(self.registry.nav_state()).unwrap_or(Value::Null)),
            BridgeCommand::NavOmnibox { input } => {
                let target = address::resolve_input(&input, self.search_engine);
                if let Some(url) = &target {
                    self.registry.navigate_to(url);
                }
                Some(target.map_or(Value::Null, Value::String))
            }

            BridgeCommand::WindowMinimize => {
                self.engine.window_command(WindowCommand::Minimize);
                Some(Value::Null)
            }
            BridgeCommand::WindowMaximize => {
                let maximized = self.window.toggle_maximize();
                self.engine.window_command(if maximized {
                    WindowCommand::Maximize
                } else {
                    WindowCommand::Unmaximize
                });
                self.registry.emit(ShellEvent::WindowMaximizedStatus { maximized });
                Some(Value::Null)
            }
            BridgeCommand::WindowClose => {
                self.request_close();
                Some(Value::Null)
            }
            BridgeCommand::WindowResize { width, height } => {
                self.window.resize(width, height);
                self.relayout();
                Some(Value::Null)
            }
            BridgeCommand::WindowFullscreen { enabled } => {
                if self.window.set_fullscreen(enabled) {
                    self.registry.emit(ShellEvent::SetUiVisibility { visible: !enabled });
                    self.relayout();
                }
                Some(Value::Null)
            }

            BridgeCommand::MenuToggle => {
                let visible = self.window.toggle_menu();
                if visible {
                    self.engine.show_overlay(self.window.menu_bounds());
                } else {
                    self.engine.hide_overlay();
                }
                self.registry.emit(ShellEvent::MenuVisibility { visible });
                Some(Value::Bool(visible))
            }
            BridgeCommand::MenuAction { action } => {
                self.menu_action(action);
                Some(Value::Null)
            }
            BridgeCommand::MenuSetHeight { height } => {
                self.window.set_menu_height(height);
                if self.window.is_menu_visible() {
                    self.engine.show_overlay(self.window.menu_bounds());
                }
                Some(Value::Null)
            }

            store_command => {
                self.submit_store_command(id, store_command);
                None
            }
        };

        self.flush_events();
        if let Some(value) = immediate {
            self.outbox.push_back(ShellOutput::Reply(BridgeReply::ok(id, value)));
        }
    }

    fn submit_store_command(&mut self, id: u64, command: BridgeCommand) {
        let on_failure = command.on_failure();
        let mut search_engine = None;

        let request = match command {
            BridgeCommand::HistoryGet { limit } => StoreRequest::ListHistory {
                limit: limit.unwrap_or(self.history_limit),
            },
            BridgeCommand::HistoryClear => StoreRequest::ClearHistory,
            BridgeCommand::SettingsGet { key } => StoreRequest::GetSetting { key },
            BridgeCommand::SettingsSet { key, value } => {
                if key == SearchEngine::SETTING_KEY {
                    search_engine = Some(SearchEngine::from_setting(Some(&value)));
                }
                StoreRequest::SetSetting { key, value }
            }
            BridgeCommand::SettingsGetAll => StoreRequest::GetAllSettings,
            BridgeCommand::BookmarkAdd {
                url,
                title,
                favicon,
                folder_id,
            } => StoreRequest::AddBookmark {
                url,
                title,
                favicon,
                folder_id,
            },
            BridgeCommand::BookmarkRemove { bookmark_id } => StoreRequest::RemoveBookmark { id: bookmark_id },
            BridgeCommand::BookmarkGet { folder_id } => StoreRequest::ListBookmarks { folder_id },
            BridgeCommand::BookmarkSearch { query } => StoreRequest::SearchBookmarks { query },
            BridgeCommand::BookmarkCreateFolder { name, parent_id } => StoreRequest::CreateFolder { name, parent_id },
            BridgeCommand::BookmarkGetFolders { parent_id } => StoreRequest::ListFolders { parent_id },
            BridgeCommand::BookmarkRemoveFolder { folder_id } => StoreRequest::RemoveFolder { id: folder_id },
            BridgeCommand::BookmarkMoveFolder { folder_id, parent_id } => StoreRequest::MoveFolder {
                id: folder_id,
                new_parent: parent_id,
            },
            other => {
                tracing::error!(command = ?other, "command has no store operation");
                self.outbox
                    .push_back(ShellOutput::Reply(BridgeReply::error(id, "unsupported command")));
                return;
            }
        };

        let ticket = self.store.submit(request);
        self.pending.insert(
            ticket,
            Pending::Reply {
                id,
                on_failure,
                search_engine,
            },
        );
    }

    fn close_tab(&mut self, id: &TabId) {
        if self.registry.close_tab(&mut self.engine, id) {
            self.save_session();
        }
    }

    fn menu_action(&mut self, action: MenuAction) {
        if self.window.hide_menu() {
            self.engine.hide_overlay();
            self.registry.emit(ShellEvent::MenuVisibility { visible: false });
        }

        tracing::debug!(?action, "menu action");
        match action {
            MenuAction::NewTab => {
                self.registry.create_tab(&mut self.engine, None);
            }
            MenuAction::Settings => {
                self.registry.create_tab(&mut self.engine, Some(address::SETTINGS_URL));
            }
            MenuAction::History => self.registry.emit(ShellEvent::ShowHistory),
            MenuAction::Downloads => self.registry.emit(ShellEvent::ShowDownloads),
            MenuAction::Exit => self.request_close(),
        }
    }

    fn request_close(&mut self) {
        self.window.request_close();
        self.engine.window_command(WindowCommand::Close);
    }

    fn relayout(&mut self) {
        self.registry.set_content_area(self.window.content_area());
        if self.window.is_menu_visible() {
            self.engine.show_overlay(self.window.menu_bounds());
        }
    }

    fn save_session(&mut self) {
        let request = session::save_request(&self.registry);
        self.store.submit(request);
    }

    /// Folds one lifecycle signal into its tab. Signals for closed tabs are dropped.
    pub fn handle_signal(&mut self, signal: SurfaceSignal) {
        reconciler::reconcile(&mut self.registry, signal, &mut self.store);
        self.flush_events();
    }

    /// Applies every store completion that is ready, without blocking. Returns how
    /// many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Some(completion) = self.store.poll() {
            self.apply_completion(completion);
            applied += 1;
        }
        applied
    }

    /// Blocks until every submitted store request has completed and been applied.
    pub fn run_until_idle(&mut self) {
        while let Some(completion) = self.store.next_blocking() {
            self.apply_completion(completion);
        }
    }

    fn apply_completion(&mut self, completion: Completion) {
        let Completion { ticket, response } = completion;

        match self.pending.remove(&ticket) {
            Some(Pending::Reply {
                id,
                on_failure,
                search_engine,
            }) => {
                let reply = match bridge::response_value(response) {
                    Ok(value) => {
                        if let Some(engine) = search_engine {
                            tracing::debug!(?engine, "search engine changed");
                            self.search_engine = engine;
                        }
                        BridgeReply::ok(id, value)
                    }
                    Err(failure) => match on_failure {
                        OnFailure::Reject => BridgeReply::error(id, failure.message),
                        OnFailure::Substitute(value) => {
                            if failure.not_found {
                                tracing::debug!(id, error = %failure.message, "read of missing entity, replying with empty value");
                            } else {
                                tracing::warn!(id, error = %failure.message, "store read failed, replying with empty value");
                            }
                            BridgeReply::ok(id, value)
                        }
                    },
                };
                self.outbox.push_back(ShellOutput::Reply(reply));
            }

            Some(Pending::SearchEngine) => match response {
                StoreResponse::Setting { value, .. } => {
                    self.search_engine = SearchEngine::from_setting(value.as_deref());
                    tracing::debug!(engine = ?self.search_engine, "search engine loaded");
                }
                other => tracing::warn!(response = ?other, "could not read search engine preference"),
            },

            None => {
                if let StoreResponse::Error { message, .. } = response {
                    tracing::warn!(%ticket, error = %message, "background store operation failed");
                }
            }
        }
    }

    fn flush_events(&mut self) {
        self.outbox
            .extend(self.registry.drain_events().into_iter().map(ShellOutput::Event));
    }

    /// Removes and returns queued output, oldest first.
    pub fn drain_outbox(&mut self) -> Vec<ShellOutput> {
        self.flush_events();
        self.outbox.drain(..).collect()
    }

    /// Saves the final session, waits for the store to finish, and closes it.
    ///
    /// Safe to call more than once.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails to close.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.shut_down {
            return Ok(());
        }
        let _span = tracing::info_span!("shell_shutdown", tabs = self.registry.len()).entered();
        self.shut_down = true;

        self.save_session();
        self.run_until_idle();
        let closed = self.store.shutdown();
        self.registry.teardown();
        tracing::info!("shell stopped");
        closed
    }

    #[must_use]
    pub fn close_requested(&self) -> bool {
        self.window.close_requested()
    }

    #[must_use]
    pub fn registry(&self) -> &TabRegistry<E::Surface> {
        &self.registry
    }

    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    #[must_use]
    pub fn window(&self) -> &WindowState {
        &self.window
    }

    #[must_use]
    pub fn search_engine(&self) -> SearchEngine {
        self.search_engine
    }
}

impl<E: EngineController> Drop for Shell<E> {
    fn drop(&mut self) {
        if !self.shut_down {
            if let Err(e) = self.shutdown() {
                tracing::warn!(error = %e, "shutdown on drop failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{BridgedEngine, EngineCommand, LifecycleSignal};
    use crate::storage::SqliteStorage;
    use serde_json::json;

    fn shell() -> Shell<BridgedEngine> {
        let store = StoreClient::spawn(Box::new(SqliteStorage::in_memory())).unwrap();
        let mut shell = Shell::new(BridgedEngine::new(), store, &Config::default());
        shell.start();
        shell.drain_outbox();
        shell.engine().drain();
        shell
    }

    fn request(shell: &mut Shell<BridgedEngine>, id: u64, command: Value) -> BridgeReply {
        let mut message = command;
        message["id"] = json!(id);
        shell.handle_request(serde_json::from_value(message).unwrap());
        shell.run_until_idle();
        shell
            .drain_outbox()
            .into_iter()
            .find_map(|out| match out {
                ShellOutput::Reply(reply) if reply.id == id => Some(reply),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn start_opens_default_tab_on_empty_store() {
        let shell = shell();
        assert_eq!(shell.registry().len(), 1);
        assert_eq!(shell.registry().active_tab().unwrap().url, address::NEW_TAB_URL);
    }

    #[test]
    fn unreadable_store_falls_back_to_one_default_tab() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"plain file").unwrap();
        let storage = SqliteStorage::new(blocker.join("browser.db"));

        let store = StoreClient::spawn(Box::new(storage)).unwrap();
        let mut shell = Shell::new(BridgedEngine::new(), store, &Config::default());
        shell.start();

        assert_eq!(shell.registry().len(), 1);
        let tab = shell.registry().active_tab().unwrap();
        assert_eq!(tab.url, address::NEW_TAB_URL);
        assert!(tab.is_active());

        let created = shell
            .drain_outbox()
            .into_iter()
            .filter(|out| matches!(out, ShellOutput::Event(ShellEvent::TabCreated { .. })))
            .count();
        assert_eq!(created, 1);
    }

    #[test]
    fn tab_close_and_switch_take_tab_id_argument() {
        let mut shell = shell();
        let first = shell.registry().active_id().unwrap().clone();
        request(&mut shell, 1, json!({"cmd": "tab.new", "url": "https://a.test"}));
        assert_ne!(shell.registry().active_id(), Some(&first));

        let switched = request(&mut shell, 2, json!({"cmd": "tab.switch", "tabId": first.as_str()}));
        assert!(switched.is_ok());
        assert_eq!(shell.registry().active_id(), Some(&first));

        let closed = request(&mut shell, 3, json!({"cmd": "tab.close", "tabId": first.as_str()}));
        assert!(closed.is_ok());
        assert_eq!(shell.registry().len(), 1);
        assert!(!shell.registry().contains(&first));
    }

    #[test]
    fn downloads_menu_entry_is_forwarded_to_ui() {
        let mut shell = shell();
        shell.handle_request(serde_json::from_value(json!({"id": 1, "cmd": "menu.action", "action": "downloads"})).unwrap());
        let out = shell.drain_outbox();
        assert_eq!(
            out,
            vec![
                ShellOutput::Event(ShellEvent::ShowDownloads),
                ShellOutput::Reply(BridgeReply::ok(1, Value::Null)),
            ]
        );
    }

    #[test]
    fn tab_new_replies_with_id() {
        let mut shell = shell();
        let reply = request(&mut shell, 1, json!({"cmd": "tab.new", "url": "https://a.test"}));
        let id = reply.value().and_then(Value::as_str).unwrap().to_string();
        assert_eq!(shell.registry().active_id().unwrap().as_str(), id);
    }

    #[test]
    fn bookmark_mutation_errors_reject_and_reads_degrade() {
        let mut shell = shell();
        let rejected = request(
            &mut shell,
            1,
            json!({"cmd": "bookmark.add", "url": "https://a.test", "title": "A", "folderId": "nope"}),
        );
        assert!(!rejected.is_ok());

        let listed = request(&mut shell, 2, json!({"cmd": "bookmark.get", "folderId": "nope"}));
        assert_eq!(listed.value(), Some(&json!([])));
    }

    #[test]
    fn search_engine_setting_drives_omnibox() {
        let mut shell = shell();
        request(&mut shell, 1, json!({"cmd": "settings.set", "key": "searchEngine", "value": "duckduckgo"}));
        assert_eq!(shell.search_engine(), SearchEngine::DuckDuckGo);

        let reply = request(&mut shell, 2, json!({"cmd": "nav.omnibox", "input": "rust lang"}));
        let url = reply.value().and_then(Value::as_str).unwrap();
        assert!(url.starts_with("https://duckduckgo.com/"));
        assert!(url.contains("rust+lang"));
    }

    #[test]
    fn fullscreen_hides_chrome() {
        let mut shell = shell();
        request(&mut shell, 1, json!({"cmd": "window.fullscreen", "enabled": true}));
        assert_eq!(shell.registry().content_area().y, 0);

        shell.handle_request(serde_json::from_value(json!({"id": 2, "cmd": "window.fullscreen", "enabled": false})).unwrap());
        let out = shell.drain_outbox();
        assert_eq!(out[0], ShellOutput::Event(ShellEvent::SetUiVisibility { visible: true }));
        assert_eq!(shell.registry().content_area().y, 90);
    }

    #[test]
    fn menu_action_hides_overlay_then_acts() {
        let mut shell = shell();
        request(&mut shell, 1, json!({"cmd": "menu.toggle"}));
        assert!(shell.window().is_menu_visible());
        let commands = shell.engine().drain();
        assert!(matches!(commands.as_slice(), [EngineCommand::ShowMenu { .. }]));

        request(&mut shell, 2, json!({"cmd": "menu.action", "action": "settings"}));
        assert!(!shell.window().is_menu_visible());
        assert_eq!(shell.registry().active_tab().unwrap().title, "Settings");
        assert_eq!(shell.engine().drain()[0], EngineCommand::HideMenu);
    }

    #[test]
    fn exit_requests_close() {
        let mut shell = shell();
        request(&mut shell, 1, json!({"cmd": "menu.action", "action": "exit"}));
        assert!(shell.close_requested());
    }

    #[test]
    fn signals_flow_into_events() {
        let mut shell = shell();
        let id = shell.registry().active_id().unwrap().clone();
        shell.handle_signal(SurfaceSignal::new(id.clone(), LifecycleSignal::LoadStarted));

        let out = shell.drain_outbox();
        assert_eq!(out, vec![ShellOutput::Event(ShellEvent::TabLoading { id, loading: true })]);
    }
}
