//! Tab/surface registry.
//!
//! The registry is the single owner of every live [`Tab`] record and its content
//! surface. Everything else refers to tabs by [`TabId`] and resolves them here.
//!
//! # Invariants
//!
//! - Exactly one tab is active whenever the registry is non-empty.
//! - Tabs are ordered by creation; closing the active tab activates the first
//!   remaining tab in that order.
//! - Closing the last tab opens a fresh default tab, so the registry is never empty
//!   while the window is open.
//! - Operations on unknown ids are silent no-ops.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::app::events::ShellEvent;
use crate::domain::{Tab, TabId, TabState};
use crate::engine::{Bounds, ContentSurface, EngineController};
use crate::storage::models::TabSnapshot;

/// A tab record together with the surface rendering it.
#[derive(Debug)]
pub struct TabSlot<S> {
    pub tab: Tab,
    pub surface: S,
}

/// Navigation availability for the active tab, as returned by `nav.getState`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavState {
    pub can_go_back: bool,
    pub can_go_forward: bool,
}

/// Owns live tabs keyed by id, in creation order.
#[derive(Debug)]
pub struct TabRegistry<S> {
    slots: HashMap<TabId, TabSlot<S>>,
    order: Vec<TabId>,
    active: Option<TabId>,
    next_position: u64,
    content_area: Bounds,
    new_tab_url: String,
    events: Vec<ShellEvent>,
}

impl<S: ContentSurface> TabRegistry<S> {
    /// Creates an empty registry laying surfaces out in `content_area`.
    pub fn new(content_area: Bounds, new_tab_url: impl Into<String>) -> Self {
        Self {
            slots: HashMap::new(),
            order: Vec::new(),
            active: None,
            next_position: 0,
            content_area,
            new_tab_url: new_tab_url.into(),
            events: Vec::new(),
        }
    }

    /// Opens a tab at `url` (the default new-tab target when absent or blank) and
    /// makes it active.
    pub fn create_tab<E>(&mut self, engine: &mut E, url: Option<&str>) -> TabId
    where
        E: EngineController<Surface = S>,
    {
        let url = url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(self.new_tab_url.as_str())
            .to_string();

        let id = TabId::generate();
        let tab = Tab::new(id.clone(), &url, self.allocate_position());
        self.insert_active(engine, tab);
        id
    }

    /// Reopens a tab captured in a snapshot, keeping its stored title and favicon
    /// for non-internal pages until the page reports fresh ones.
    pub fn restore_tab<E>(&mut self, engine: &mut E, row: &TabSnapshot) -> TabId
    where
        E: EngineController<Surface = S>,
    {
        let id = TabId::generate();
        let mut tab = Tab::new(id.clone(), &row.url, self.allocate_position());
        if !tab.is_internal() {
            if !row.title.is_empty() {
                tab.title.clone_from(&row.title);
            }
            tab.favicon.clone_from(&row.favicon);
        }
        self.insert_active(engine, tab);
        id
    }

    fn allocate_position(&mut self) -> u64 {
        let position = self.next_position;
        self.next_position += 1;
        position
    }

    fn insert_active<E>(&mut self, engine: &mut E, mut tab: Tab)
    where
        E: EngineController<Surface = S>,
    {
        let _span = tracing::debug_span!("create_tab", tab_id = %tab.id, url = %tab.url).entered();

        self.deactivate_current();

        let mut surface = engine.create_surface(&tab.id);
        surface.set_bounds(self.content_area);
        surface.set_visible(true);
        surface.load_url(&tab.url);

        tab.state = TabState::Active;
        let id = tab.id.clone();
        self.events.push(ShellEvent::TabCreated {
            id: id.clone(),
            title: tab.title.clone(),
            url: tab.url.clone(),
            favicon: tab.favicon.clone(),
        });

        self.order.push(id.clone());
        self.slots.insert(id.clone(), TabSlot { tab, surface });
        self.active = Some(id);
        tracing::debug!(tab_count = self.order.len(), "tab created");
    }

    fn deactivate_current(&mut self) {
        let Some(previous) = self.active.take() else {
            return;
        };
        if let Some(slot) = self.slots.get_mut(&previous) {
            slot.tab.state = TabState::Inactive;
            slot.surface.set_visible(false);
        }
    }

    /// Activates `id`. Returns `false` for an unknown id.
    pub fn switch_to(&mut self, id: &TabId) -> bool {
        if !self.slots.contains_key(id) {
            tracing::debug!(tab_id = %id, "switch to unknown tab ignored");
            return false;
        }

        if self.active.as_ref() != Some(id) {
            self.deactivate_current();
        }

        let bounds = self.content_area;
        let Some(slot) = self.slots.get_mut(id) else {
            return false;
        };
        slot.tab.state = TabState::Active;
        slot.surface.set_bounds(bounds);
        slot.surface.set_visible(true);

        let url = slot
            .surface
            .current_url()
            .map_or_else(|| slot.tab.url.clone(), str::to_string);
        self.active = Some(id.clone());
        self.events.push(ShellEvent::TabSwitched { id: id.clone(), url });
        tracing::debug!(tab_id = %id, "tab switched");
        true
    }

    /// Closes `id`, destroying its surface. Returns `false` for an unknown id.
    pub fn close_tab<E>(&mut self, engine: &mut E, id: &TabId) -> bool
    where
        E: EngineController<Surface = S>,
    {
        let Some(mut slot) = self.slots.remove(id) else {
            tracing::debug!(tab_id = %id, "close of unknown tab ignored");
            return false;
        };
        let _span = tracing::debug_span!("close_tab", tab_id = %id).entered();

        self.order.retain(|t| t != id);
        slot.surface.set_visible(false);
        slot.surface.destroy();
        self.events.push(ShellEvent::TabClosed { id: id.clone() });

        if self.active.as_ref() == Some(id) {
            self.active = None;
            match self.order.first().cloned() {
                Some(next) => {
                    self.switch_to(&next);
                }
                None => {
                    tracing::debug!("last tab closed, opening default tab");
                    self.create_tab(engine, None);
                }
            }
        }

        tracing::debug!(tab_count = self.order.len(), "tab closed");
        true
    }

    /// Updates the content area and re-lays out the active surface.
    pub fn set_content_area(&mut self, bounds: Bounds) {
        self.content_area = bounds;
        self.resize_active();
    }

    #[must_use]
    pub fn content_area(&self) -> Bounds {
        self.content_area
    }

    /// Applies the current content area to the active surface.
    pub fn resize_active(&mut self) {
        let bounds = self.content_area;
        if let Some(slot) = self.active_slot_mut() {
            slot.surface.set_bounds(bounds);
        }
    }

    pub fn back(&mut self) {
        if let Some(slot) = self.active_slot_mut() {
            if slot.surface.can_go_back() {
                slot.surface.go_back();
            }
        }
    }

    pub fn forward(&mut self) {
        if let Some(slot) = self.active_slot_mut() {
            if slot.surface.can_go_forward() {
                slot.surface.go_forward();
            }
        }
    }

    pub fn reload(&mut self) {
        if let Some(slot) = self.active_slot_mut() {
            slot.surface.reload();
        }
    }

    /// Loads `url` in the active tab.
    pub fn navigate_to(&mut self, url: &str) {
        if let Some(slot) = self.active_slot_mut() {
            tracing::debug!(tab_id = %slot.tab.id, url = %url, "navigating active tab");
            slot.surface.load_url(url);
        }
    }

    #[must_use]
    pub fn nav_state(&self) -> NavState {
        self.active_slot().map_or_else(NavState::default, |slot| NavState {
            can_go_back: slot.surface.can_go_back(),
            can_go_forward: slot.surface.can_go_forward(),
        })
    }

    /// Tabs in creation order.
    pub fn tabs(&self) -> impl Iterator<Item = &Tab> {
        self.order.iter().filter_map(|id| self.slots.get(id)).map(|slot| &slot.tab)
    }

    #[must_use]
    pub fn get(&self, id: &TabId) -> Option<&Tab> {
        self.slots.get(id).map(|slot| &slot.tab)
    }

    pub fn slot_mut(&mut self, id: &TabId) -> Option<&mut TabSlot<S>> {
        self.slots.get_mut(id)
    }

    #[must_use]
    pub fn surface(&self, id: &TabId) -> Option<&S> {
        self.slots.get(id).map(|slot| &slot.surface)
    }

    #[must_use]
    pub fn active_id(&self) -> Option<&TabId> {
        self.active.as_ref()
    }

    #[must_use]
    pub fn active_tab(&self) -> Option<&Tab> {
        self.active_slot().map(|slot| &slot.tab)
    }

    fn active_slot(&self) -> Option<&TabSlot<S>> {
        self.active.as_ref().and_then(|id| self.slots.get(id))
    }

    fn active_slot_mut(&mut self) -> Option<&mut TabSlot<S>> {
        let id = self.active.as_ref()?;
        self.slots.get_mut(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &TabId) -> bool {
        self.slots.contains_key(id)
    }

    /// Queues an event for the UI.
    pub fn emit(&mut self, event: ShellEvent) {
        self.events.push(event);
    }

    /// Removes and returns queued events, oldest first.
    pub fn drain_events(&mut self) -> Vec<ShellEvent> {
        std::mem::take(&mut self.events)
    }

    /// Destroys every surface without emitting events or opening a default tab.
    pub fn teardown(&mut self) {
        for id in self.order.drain(..) {
            if let Some(mut slot) = self.slots.remove(&id) {
                slot.surface.destroy();
            }
        }
        self.active = None;
    }
}
