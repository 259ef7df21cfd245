//! Application layer: tab orchestration and the shell event loop.
//!
//! This layer sits between the driver (main.rs) and the domain/storage/worker/
//! engine layers. All of it runs on one thread; the only cross-thread hop is the
//! store worker, reached through [`crate::worker::StoreClient`].
//!
//! # Architecture
//!
//! ```text
//! Bridge requests ─┐                       ┌─> ShellEvent / BridgeReply (outbox)
//! Surface signals ─┼─> Shell ─> Registry ──┤
//! Store completions┘      │      ▲         └─> EngineCommand (engine)
//!                         │      └── Reconciler
//!                         └────────> Session ─> StoreRequest
//! ```
//!
//! # Modules
//!
//! - [`bridge`]: Request/reply protocol spoken with the UI
//! - [`events`]: Events pushed to the UI
//! - [`reconciler`]: Folds lifecycle signals into tab metadata and history
//! - [`registry`]: Owner of live tabs and their surfaces
//! - [`session`]: Snapshot build and restore
//! - [`shell`]: The event loop tying it together
//! - [`window`]: Window geometry and overlay menu state

pub mod bridge;
pub mod events;
pub mod reconciler;
pub mod registry;
pub mod session;
pub mod shell;
pub mod window;

pub use bridge::{BridgeCommand, BridgeReply, BridgeRequest, MenuAction, ReplyResult};
pub use events::ShellEvent;
pub use reconciler::{reconcile, VisitRecorder};
pub use registry::{NavState, TabRegistry, TabSlot};
pub use shell::{Shell, ShellOutput};
pub use window::WindowState;
