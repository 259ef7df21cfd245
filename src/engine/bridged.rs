//! Headless engine that forwards surface commands to an external renderer.
//!
//! Every surface shares one command queue with its engine. The event loop drains
//! the queue and ships the commands across the process boundary; the renderer
//! answers with lifecycle signals.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::{Bounds, ContentSurface, EngineController, WindowCommand};
use crate::domain::TabId;

/// Instruction for the external renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum EngineCommand {
    Create { tab_id: TabId },
    Load { tab_id: TabId, url: String },
    Back { tab_id: TabId },
    Forward { tab_id: TabId },
    Reload { tab_id: TabId },
    SetBounds { tab_id: TabId, bounds: Bounds },
    Show { tab_id: TabId },
    Hide { tab_id: TabId },
    Destroy { tab_id: TabId },
    ShowMenu { bounds: Bounds },
    HideMenu,
    Window { action: WindowCommand },
}

type CommandQueue = Rc<RefCell<VecDeque<EngineCommand>>>;

/// [`EngineController`] that records commands instead of rendering.
#[derive(Debug, Default)]
pub struct BridgedEngine {
    queue: CommandQueue,
}

impl BridgedEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns every queued command, oldest first.
    pub fn drain(&self) -> Vec<EngineCommand> {
        self.queue.borrow_mut().drain(..).collect()
    }

    fn push(&self, command: EngineCommand) {
        self.queue.borrow_mut().push_back(command);
    }
}

impl EngineController for BridgedEngine {
    type Surface = BridgedSurface;

    fn create_surface(&mut self, tab: &TabId) -> BridgedSurface {
        tracing::trace!(tab_id = %tab, "creating bridged surface");
        self.push(EngineCommand::Create { tab_id: tab.clone() });
        BridgedSurface {
            tab_id: tab.clone(),
            queue: Rc::clone(&self.queue),
            back: Vec::new(),
            forward: Vec::new(),
            current: None,
            visible: false,
            bounds: None,
            destroyed: false,
        }
    }

    fn show_overlay(&mut self, bounds: Bounds) {
        self.push(EngineCommand::ShowMenu { bounds });
    }

    fn hide_overlay(&mut self) {
        self.push(EngineCommand::HideMenu);
    }

    fn window_command(&mut self, action: WindowCommand) {
        self.push(EngineCommand::Window { action });
    }
}

/// Surface handle with local back/forward lists.
///
/// The lists follow committed navigations reported through
/// [`ContentSurface::navigated`]; traversals update them eagerly so the
/// renderer's confirming signal is a no-op.
#[derive(Debug)]
pub struct BridgedSurface {
    tab_id: TabId,
    queue: CommandQueue,
    back: Vec<String>,
    forward: Vec<String>,
    current: Option<String>,
    visible: bool,
    bounds: Option<Bounds>,
    destroyed: bool,
}

impl BridgedSurface {
    #[must_use]
    pub fn tab_id(&self) -> &TabId {
        &self.tab_id
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn send(&self, command: EngineCommand) {
        if self.destroyed {
            tracing::trace!(tab_id = %self.tab_id, "command for destroyed surface dropped");
            return;
        }
        self.queue.borrow_mut().push_back(command);
    }
}

impl ContentSurface for BridgedSurface {
    fn load_url(&mut self, url: &str) {
        self.send(EngineCommand::Load {
            tab_id: self.tab_id.clone(),
            url: url.to_string(),
        });
    }

    fn go_back(&mut self) {
        let Some(target) = self.back.pop() else {
            return;
        };
        if let Some(current) = self.current.replace(target) {
            self.forward.push(current);
        }
        self.send(EngineCommand::Back {
            tab_id: self.tab_id.clone(),
        });
    }

    fn go_forward(&mut self) {
        let Some(target) = self.forward.pop() else {
            return;
        };
        if let Some(current) = self.current.replace(target) {
            self.back.push(current);
        }
        self.send(EngineCommand::Forward {
            tab_id: self.tab_id.clone(),
        });
    }

    fn reload(&mut self) {
        self.send(EngineCommand::Reload {
            tab_id: self.tab_id.clone(),
        });
    }

    fn can_go_back(&self) -> bool {
        !self.back.is_empty()
    }

    fn can_go_forward(&self) -> bool {
        !self.forward.is_empty()
    }

    fn current_url(&self) -> Option<&str> {
        self.current.as_deref()
    }

    fn set_bounds(&mut self, bounds: Bounds) {
        if self.bounds == Some(bounds) {
            return;
        }
        self.bounds = Some(bounds);
        self.send(EngineCommand::SetBounds {
            tab_id: self.tab_id.clone(),
            bounds,
        });
    }

    fn set_visible(&mut self, visible: bool) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;
        let tab_id = self.tab_id.clone();
        self.send(if visible {
            EngineCommand::Show { tab_id }
        } else {
            EngineCommand::Hide { tab_id }
        });
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.send(EngineCommand::Destroy {
            tab_id: self.tab_id.clone(),
        });
        self.destroyed = true;
        self.visible = false;
    }

    fn navigated(&mut self, url: &str, same_page: bool) {
        if self.current.as_deref() == Some(url) {
            return;
        }
        tracing::trace!(tab_id = %self.tab_id, url = %url, same_page, "navigation committed");
        if let Some(previous) = self.current.replace(url.to_string()) {
            self.back.push(previous);
        }
        self.forward.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface() -> (BridgedEngine, BridgedSurface) {
        let mut engine = BridgedEngine::new();
        let surface = engine.create_surface(&TabId::from("t1"));
        engine.drain();
        (engine, surface)
    }

    #[test]
    fn traversal_follows_committed_navigations() {
        let (engine, mut surface) = surface();
        surface.navigated("https://a.test", false);
        surface.navigated("https://b.test", false);
        assert!(surface.can_go_back());
        assert!(!surface.can_go_forward());

        surface.go_back();
        assert_eq!(surface.current_url(), Some("https://a.test"));
        assert!(surface.can_go_forward());

        // Renderer confirms the traversal.
        surface.navigated("https://a.test", false);
        assert!(surface.can_go_forward());

        surface.navigated("https://c.test", false);
        assert!(!surface.can_go_forward());

        let commands = engine.drain();
        assert_eq!(commands, vec![EngineCommand::Back { tab_id: TabId::from("t1") }]);
    }

    #[test]
    fn unavailable_traversal_is_a_noop() {
        let (engine, mut surface) = surface();
        surface.go_back();
        surface.go_forward();
        assert!(engine.drain().is_empty());
    }

    #[test]
    fn visibility_and_bounds_are_deduplicated() {
        let (engine, mut surface) = surface();
        let bounds = Bounds::new(0, 90, 1200, 710);
        surface.set_visible(true);
        surface.set_visible(true);
        surface.set_bounds(bounds);
        surface.set_bounds(bounds);

        let commands = engine.drain();
        assert_eq!(commands.len(), 2);
        assert!(surface.is_visible());
        assert_eq!(surface.bounds(), Some(bounds));
    }

    #[test]
    fn destroyed_surface_sends_nothing_more() {
        let (engine, mut surface) = surface();
        surface.destroy();
        surface.load_url("https://a.test");
        surface.destroy();

        assert_eq!(engine.drain(), vec![EngineCommand::Destroy { tab_id: TabId::from("t1") }]);
        assert!(surface.is_destroyed());
    }

    #[test]
    fn commands_serialize_with_kebab_tags() {
        let json = serde_json::to_value(EngineCommand::SetBounds {
            tab_id: TabId::from("t1"),
            bounds: Bounds::new(0, 90, 800, 600),
        })
        .unwrap();
        assert_eq!(json["command"], "set-bounds");
        assert_eq!(json["bounds"]["height"], 600);
    }
}
