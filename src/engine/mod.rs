//! Content-surface contract.
//!
//! The shell never renders pages itself. It drives a content-rendering
//! collaborator through [`EngineController`] and [`ContentSurface`], and hears
//! back from it through [`SurfaceSignal`]s fed into the event loop.
//!
//! [`BridgedEngine`] is the headless implementation: it keeps per-surface
//! back/forward bookkeeping and queues [`EngineCommand`]s for a renderer running
//! in another process.

pub mod bridged;

use serde::{Deserialize, Serialize};

use crate::domain::TabId;

pub use bridged::{BridgedEngine, BridgedSurface, EngineCommand};

/// Rectangle in window coordinates.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

/// Host-window operations forwarded to the collaborator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowCommand {
    Minimize,
    Maximize,
    Unmaximize,
    Close,
}

/// One independently navigable rendering unit.
pub trait ContentSurface {
    /// Starts loading `url`; completion arrives later as lifecycle signals.
    fn load_url(&mut self, url: &str);

    fn go_back(&mut self);

    fn go_forward(&mut self);

    fn reload(&mut self);

    fn can_go_back(&self) -> bool;

    fn can_go_forward(&self) -> bool;

    /// URL of the committed document, if any navigation has committed.
    fn current_url(&self) -> Option<&str>;

    fn set_bounds(&mut self, bounds: Bounds);

    /// Adds the surface to, or removes it from, the visible composition.
    fn set_visible(&mut self, visible: bool);

    /// Releases the surface. Further commands are ignored.
    fn destroy(&mut self);

    /// Notes a committed navigation for back/forward bookkeeping.
    fn navigated(&mut self, url: &str, same_page: bool);
}

/// Factory for content surfaces plus the window-level collaborator hooks.
pub trait EngineController {
    type Surface: ContentSurface;

    /// Creates a surface bound to `tab`.
    fn create_surface(&mut self, tab: &TabId) -> Self::Surface;

    /// Shows the overlay menu surface at `bounds`.
    fn show_overlay(&mut self, bounds: Bounds);

    fn hide_overlay(&mut self);

    fn window_command(&mut self, command: WindowCommand);
}

/// Page-lifecycle notification raised by a content surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LifecycleSignal {
    LoadStarted,
    LoadStopped,
    TitleChanged {
        title: String,
    },
    UrlChanged {
        url: String,
        #[serde(default)]
        same_page: bool,
    },
    FaviconChanged {
        #[serde(default)]
        candidates: Vec<String>,
    },
    LoadFinished {
        url: String,
        #[serde(default)]
        title: String,
    },
}

/// A lifecycle signal addressed to one tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceSignal {
    pub tab_id: TabId,
    #[serde(flatten)]
    pub signal: LifecycleSignal,
}

impl SurfaceSignal {
    pub fn new(tab_id: impl Into<TabId>, signal: LifecycleSignal) -> Self {
        Self {
            tab_id: tab_id.into(),
            signal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signals_parse_from_renderer_json() {
        let signal: SurfaceSignal =
            serde_json::from_str(r#"{"tab_id":"t1","kind":"urlChanged","url":"https://a.test"}"#).unwrap();
        assert_eq!(signal.tab_id.as_str(), "t1");
        assert_eq!(
            signal.signal,
            LifecycleSignal::UrlChanged {
                url: "https://a.test".into(),
                same_page: false,
            }
        );
    }
}
