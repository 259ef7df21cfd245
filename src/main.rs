//! Headless driver for the shell core.
//!
//! Speaks newline-delimited JSON. Each stdin line is either a bridge request from
//! the UI or a lifecycle signal from the renderer:
//!
//! ```text
//! {"type":"request","id":1,"cmd":"tab.new","url":"https://example.com"}
//! {"type":"signal","tab_id":"…","kind":"loadFinished","url":"https://example.com/","title":"Example"}
//! ```
//!
//! Each stdout line is a UI event, a bridge reply, or a command for the renderer:
//!
//! ```text
//! {"type":"event","event":"tab-created","id":"…","title":"New Tab",…}
//! {"type":"reply","id":1,"ok":"…"}
//! {"type":"engine","command":"load","tab_id":"…","url":"https://example.com"}
//! ```
//!
//! Logs never go to stdout. The process exits when stdin closes or the UI asks
//! the window to close, saving the session on the way out.
//!
//! # Usage
//!
//! ```text
//! tabshell [--config FILE] [--data-dir DIR] [--set KEY=VALUE]...
//! ```

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tabshell::engine::EngineCommand;
use tabshell::{observability, open_shell, BridgeReply, BridgeRequest, BridgedEngine, Config, Shell, ShellOutput, SurfaceSignal};

/// How long the loop waits for input before polling the store again.
const TICK: Duration = Duration::from_millis(16);

/// A parsed stdin line.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Inbound {
    Request(BridgeRequest),
    Signal(SurfaceSignal),
}

/// Renderer command as written to stdout.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum EngineLine {
    Engine(EngineCommand),
}

/// What the reader thread hands to the loop.
#[derive(Debug)]
enum Input {
    Message(Inbound),
    /// Line that did not parse. Requests with a readable `id` still get a reply.
    Invalid { id: Option<u64>, message: String },
}

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    overrides: BTreeMap<String, String>,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, String> {
        let mut parsed = Self::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => parsed.config = Some(PathBuf::from(value_of(&arg, args.next())?)),
                "--data-dir" => parsed.data_dir = Some(PathBuf::from(value_of(&arg, args.next())?)),
                "--set" => {
                    let pair = value_of(&arg, args.next())?;
                    let (key, value) = pair
                        .split_once('=')
                        .ok_or_else(|| format!("--set expects KEY=VALUE, got {pair:?}"))?;
                    parsed.overrides.insert(key.trim().to_string(), value.to_string());
                }
                "-h" | "--help" => {
                    return Err("usage: tabshell [--config FILE] [--data-dir DIR] [--set KEY=VALUE]...".to_string())
                }
                other => return Err(format!("unknown argument {other:?}")),
            }
        }
        Ok(parsed)
    }

    fn into_config(self) -> tabshell::Result<Config> {
        let base = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        let mut config = base.with_overrides(&self.overrides);
        if self.data_dir.is_some() {
            config.data_dir = self.data_dir;
        }
        Ok(config)
    }
}

fn value_of(flag: &str, value: Option<String>) -> Result<String, String> {
    value.ok_or_else(|| format!("{flag} expects a value"))
}

fn main() -> ExitCode {
    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("tabshell: {message}");
            return ExitCode::from(2);
        }
    };

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("tabshell: {e}");
            return ExitCode::from(2);
        }
    };

    observability::init_tracing(&config);

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "shell failed");
            eprintln!("tabshell: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> tabshell::Result<()> {
    let mut shell = open_shell(config)?;
    shell.start();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    flush(&mut shell, &mut out)?;

    let input = spawn_reader()?;
    loop {
        match input.recv_timeout(TICK) {
            Ok(Input::Message(Inbound::Request(request))) => shell.handle_request(request),
            Ok(Input::Message(Inbound::Signal(signal))) => shell.handle_signal(signal),
            Ok(Input::Invalid { id, message }) => {
                tracing::warn!(?id, error = %message, "discarding malformed input");
                if let Some(id) = id {
                    write_line(&mut out, &ShellOutput::Reply(BridgeReply::error(id, message)))?;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                tracing::info!("input closed");
                break;
            }
        }

        shell.pump();
        flush(&mut shell, &mut out)?;

        if shell.close_requested() {
            break;
        }
    }

    let stopped = shell.shutdown();
    flush(&mut shell, &mut out)?;
    stopped
}

/// Reads stdin on its own thread so the loop can keep pumping store completions
/// while waiting for input.
fn spawn_reader() -> io::Result<Receiver<Input>> {
    let (tx, rx) = mpsc::channel();

    std::thread::Builder::new()
        .name("tabshell-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::error!(error = %e, "stdin read failed");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                if tx.send(parse_line(&line)).is_err() {
                    break;
                }
            }
        })?;

    Ok(rx)
}

fn parse_line(line: &str) -> Input {
    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            return Input::Invalid {
                id: None,
                message: e.to_string(),
            }
        }
    };

    let id = value.get("id").and_then(Value::as_u64);
    match serde_json::from_value(value) {
        Ok(message) => Input::Message(message),
        Err(e) => Input::Invalid {
            id,
            message: e.to_string(),
        },
    }
}

fn flush(shell: &mut Shell<BridgedEngine>, out: &mut impl Write) -> tabshell::Result<()> {
    for output in shell.drain_outbox() {
        write_line(out, &output)?;
    }
    for command in shell.engine().drain() {
        write_line(out, &EngineLine::Engine(command))?;
    }
    out.flush()?;
    Ok(())
}

fn write_line(out: &mut impl Write, message: &impl Serialize) -> tabshell::Result<()> {
    serde_json::to_writer(&mut *out, message)?;
    out.write_all(b"\n")?;
    Ok(())
}
