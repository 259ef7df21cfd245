//! Domain layer for the shell core.
//!
//! Core types that every other layer speaks in terms of, independent of the storage
//! engine and of the content-rendering collaborator.
//!
//! # Organization
//!
//! - [`address`]: internal scheme, favicon resolution, omnibox input
//! - [`error`]: error types and result alias
//! - [`tab`]: tab identity and in-memory tab record
//!
//! # Examples
//!
//! ```
//! use tabshell::domain::{address, Tab, TabId};
//!
//! let tab = Tab::new(TabId::generate(), address::NEW_TAB_URL, 0);
//! assert_eq!(tab.title, "New Tab");
//! assert!(tab.is_internal());
//! ```

pub mod address;
pub mod error;
pub mod tab;

pub use error::{Result, ShellError, StoreError};
pub use tab::{Tab, TabId, TabState, TabUpdate};
