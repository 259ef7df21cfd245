//! Background worker thread for asynchronous storage operations.
//!
//! The event loop never touches the database directly. It submits
//! [`StoreRequest`]s through a [`StoreClient`] and applies the matching
//! [`StoreResponse`]s when it next pumps completions, so a slow disk never stalls
//! tab operations.
//!
//! # Architecture
//!
//! - `messages`: Request/response protocol types and tickets
//! - `handler`: Worker implementation and the thread body
//! - `client`: Event-loop handle with non-blocking `submit`/`poll`

pub mod client;
pub mod handler;
pub mod messages;

pub use client::StoreClient;
pub use handler::StoreWorker;
pub use messages::{Completion, StoreRequest, StoreResponse, Ticket};
