//! End-to-end tests driving the shell against an on-disk database.

use serde_json::{json, Value};
use tempfile::TempDir;

use tabshell::engine::{EngineCommand, LifecycleSignal};
use tabshell::{open_shell, BridgeReply, BridgedEngine, Config, Shell, ShellEvent, ShellOutput, SurfaceSignal};

fn config(dir: &TempDir) -> Config {
    Config {
        data_dir: Some(dir.path().to_path_buf()),
        ..Config::default()
    }
}

fn started(dir: &TempDir) -> Shell<BridgedEngine> {
    let mut shell = open_shell(&config(dir)).unwrap();
    shell.start();
    shell
}

/// Sends one request, waits for the store, and returns everything produced.
///
/// `id` is the request correlation id; command arguments never use that key.
fn send(shell: &mut Shell<BridgedEngine>, id: u64, mut command: Value) -> Vec<ShellOutput> {
    assert!(command.get("id").is_none(), "command arguments must not use the request id key");
    command["id"] = json!(id);
    shell.handle_request(serde_json::from_value(command).unwrap());
    shell.run_until_idle();
    shell.drain_outbox()
}

fn reply(outputs: &[ShellOutput], id: u64) -> BridgeReply {
    outputs
        .iter()
        .find_map(|out| match out {
            ShellOutput::Reply(reply) if reply.id == id => Some(reply.clone()),
            _ => None,
        })
        .unwrap()
}

fn ok(shell: &mut Shell<BridgedEngine>, id: u64, command: Value) -> Value {
    let outputs = send(shell, id, command);
    let reply = reply(&outputs, id);
    assert!(reply.is_ok(), "request {id} failed: {reply:?}");
    reply.value().cloned().unwrap()
}

fn signal(shell: &mut Shell<BridgedEngine>, signal: LifecycleSignal) {
    let id = shell.registry().active_id().unwrap().clone();
    shell.handle_signal(SurfaceSignal::new(id, signal));
}

#[test]
fn page_load_records_history_and_updates_tab() {
    let dir = tempfile::tempdir().unwrap();
    let mut shell = started(&dir);
    shell.drain_outbox();

    ok(&mut shell, 1, json!({"cmd": "nav.to", "url": "https://example.com/"}));
    let commands = shell.engine().drain();
    assert!(commands
        .iter()
        .any(|c| matches!(c, EngineCommand::Load { url, .. } if url == "https://example.com/")));

    signal(&mut shell, LifecycleSignal::LoadStarted);
    signal(
        &mut shell,
        LifecycleSignal::UrlChanged {
            url: "https://example.com/".into(),
            same_page: false,
        },
    );
    signal(
        &mut shell,
        LifecycleSignal::LoadFinished {
            url: "https://example.com/".into(),
            title: "Example".into(),
        },
    );
    signal(&mut shell, LifecycleSignal::LoadStopped);
    shell.run_until_idle();

    let tab = shell.registry().active_tab().unwrap();
    assert_eq!(tab.title, "Example");
    assert_eq!(tab.favicon.as_deref(), Some("https://example.com/favicon.ico"));

    let history = ok(&mut shell, 2, json!({"cmd": "history.get"}));
    let entries = history.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["url"], "https://example.com/");
    assert_eq!(entries[0]["title"], "Example");
    assert_eq!(entries[0]["visit_count"], 1);

    shell.shutdown().unwrap();
}

#[test]
fn internal_pages_never_reach_history() {
    let dir = tempfile::tempdir().unwrap();
    let mut shell = started(&dir);

    signal(
        &mut shell,
        LifecycleSignal::LoadFinished {
            url: "tabshell://new-tab".into(),
            title: "whatever".into(),
        },
    );
    shell.run_until_idle();

    assert_eq!(shell.registry().active_tab().unwrap().title, "New Tab");
    assert_eq!(ok(&mut shell, 1, json!({"cmd": "history.get"})), json!([]));
}

#[test]
fn closing_last_tab_opens_a_fresh_one() {
    let dir = tempfile::tempdir().unwrap();
    let mut shell = started(&dir);
    shell.drain_outbox();
    let only = shell.registry().active_id().unwrap().clone();

    let outputs = send(&mut shell, 1, json!({"cmd": "tab.close", "tabId": only.as_str()}));
    let events: Vec<&str> = outputs
        .iter()
        .filter_map(|out| match out {
            ShellOutput::Event(event) => Some(event.name()),
            ShellOutput::Reply(_) => None,
        })
        .collect();
    assert_eq!(events, vec!["tab-closed", "tab-created"]);

    assert_eq!(shell.registry().len(), 1);
    assert_ne!(shell.registry().active_id(), Some(&only));
    assert_eq!(shell.registry().active_tab().unwrap().url, "tabshell://new-tab");
}

#[test]
fn unknown_tab_operations_are_no_ops() {
    let dir = tempfile::tempdir().unwrap();
    let mut shell = started(&dir);
    shell.drain_outbox();

    let outputs = send(&mut shell, 1, json!({"cmd": "tab.close", "tabId": "missing"}));
    assert_eq!(outputs, vec![ShellOutput::Reply(BridgeReply::ok(1, Value::Null))]);

    let outputs = send(&mut shell, 2, json!({"cmd": "tab.switch", "tabId": "missing"}));
    assert_eq!(outputs.len(), 1);
    assert_eq!(shell.registry().len(), 1);
}

#[test]
fn session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let mut shell = started(&dir);
        ok(&mut shell, 1, json!({"cmd": "tab.new", "url": "https://a.test/"}));
        let b = ok(&mut shell, 2, json!({"cmd": "tab.new", "url": "https://b.test/"}));
        assert!(b.is_string());

        let a = shell
            .registry()
            .tabs()
            .find(|t| t.url == "https://a.test/")
            .unwrap()
            .id
            .clone();
        ok(&mut shell, 3, json!({"cmd": "tab.switch", "tabId": a.as_str()}));
        shell.shutdown().unwrap();
    }

    let mut shell = started(&dir);
    let urls: Vec<&str> = shell.registry().tabs().map(|t| t.url.as_str()).collect();
    assert_eq!(urls, vec!["tabshell://new-tab", "https://a.test/", "https://b.test/"]);
    assert_eq!(shell.registry().active_tab().unwrap().url, "https://a.test/");
    assert_eq!(shell.registry().tabs().filter(|t| t.is_active()).count(), 1);

    let created = shell
        .drain_outbox()
        .into_iter()
        .filter(|out| matches!(out, ShellOutput::Event(ShellEvent::TabCreated { .. })))
        .count();
    assert_eq!(created, 3);
}

#[test]
fn close_is_persisted_before_shutdown() {
    let dir = tempfile::tempdir().unwrap();

    {
        let mut shell = started(&dir);
        let extra = ok(&mut shell, 1, json!({"cmd": "tab.new", "url": "https://gone.test/"}));
        ok(&mut shell, 2, json!({"cmd": "tab.close", "tabId": extra}));
        shell.shutdown().unwrap();
    }

    let shell = started(&dir);
    assert_eq!(shell.registry().len(), 1);
    assert!(shell.registry().tabs().all(|t| t.url != "https://gone.test/"));
}

#[test]
fn folder_removal_cascades_through_bridge() {
    let dir = tempfile::tempdir().unwrap();
    let mut shell = started(&dir);

    let work = ok(&mut shell, 1, json!({"cmd": "bookmark.createFolder", "name": "Work"}));
    let work_id = work["id"].as_str().unwrap().to_string();
    let sub = ok(
        &mut shell,
        2,
        json!({"cmd": "bookmark.createFolder", "name": "Rust", "parentId": work_id}),
    );
    let sub_id = sub["id"].as_str().unwrap().to_string();

    ok(
        &mut shell,
        3,
        json!({"cmd": "bookmark.add", "url": "https://docs.rs/", "title": "Docs", "folderId": sub_id}),
    );
    ok(
        &mut shell,
        4,
        json!({"cmd": "bookmark.add", "url": "https://crates.io/", "title": "Crates"}),
    );

    let found = ok(&mut shell, 5, json!({"cmd": "bookmark.search", "query": "docs"}));
    assert_eq!(found.as_array().unwrap().len(), 1);

    let cycle = send(
        &mut shell,
        6,
        json!({"cmd": "bookmark.moveFolder", "folderId": work_id, "parentId": sub_id}),
    );
    assert!(!reply(&cycle, 6).is_ok());

    assert_eq!(ok(&mut shell, 7, json!({"cmd": "bookmark.removeFolder", "folderId": work_id})), json!(true));

    assert_eq!(ok(&mut shell, 8, json!({"cmd": "bookmark.getFolders"})), json!([]));
    assert_eq!(ok(&mut shell, 9, json!({"cmd": "bookmark.get", "folderId": sub_id})), json!([]));
    assert_eq!(ok(&mut shell, 10, json!({"cmd": "bookmark.search", "query": "docs"})), json!([]));

    let root = ok(&mut shell, 11, json!({"cmd": "bookmark.get"}));
    assert_eq!(root.as_array().unwrap().len(), 1);
    assert_eq!(root[0]["title"], "Crates");
}

#[test]
fn settings_persist_across_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let mut shell = started(&dir);
        assert_eq!(ok(&mut shell, 1, json!({"cmd": "settings.get", "key": "theme"})), Value::Null);
        assert_eq!(
            ok(&mut shell, 2, json!({"cmd": "settings.set", "key": "theme", "value": "dark"})),
            json!(true)
        );
        ok(&mut shell, 3, json!({"cmd": "settings.set", "key": "searchEngine", "value": "brave"}));
        shell.shutdown().unwrap();
    }

    let mut shell = started(&dir);
    shell.run_until_idle();
    let all = ok(&mut shell, 1, json!({"cmd": "settings.getAll"}));
    assert_eq!(all, json!({"theme": "dark", "searchEngine": "brave"}));

    let target = ok(&mut shell, 2, json!({"cmd": "nav.omnibox", "input": "borrow checker"}));
    assert!(target.as_str().unwrap().starts_with("https://search.brave.com/"));
}

#[test]
fn history_clear_empties_history() {
    let dir = tempfile::tempdir().unwrap();
    let mut shell = started(&dir);

    for (url, title) in [("https://a.test/", "A"), ("https://b.test/", "B")] {
        signal(
            &mut shell,
            LifecycleSignal::LoadFinished {
                url: url.into(),
                title: title.into(),
            },
        );
    }
    shell.run_until_idle();
    assert_eq!(ok(&mut shell, 1, json!({"cmd": "history.get", "limit": 1})).as_array().unwrap().len(), 1);

    assert_eq!(ok(&mut shell, 2, json!({"cmd": "history.clear"})), Value::Null);
    assert_eq!(ok(&mut shell, 3, json!({"cmd": "history.get"})), json!([]));
}
