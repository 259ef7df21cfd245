//! Primary window geometry and overlay menu state.
//!
//! The window reserves a fixed chrome strip (tab bar plus navigation bar) at the
//! top; the active content surface fills the rest. Fullscreen hides the chrome and
//! gives the surface the whole window. The overlay menu is a transient surface
//! anchored under the navigation bar at the right edge.

use crate::engine::Bounds;

pub const TAB_BAR_HEIGHT: u32 = 40;
pub const NAV_BAR_HEIGHT: u32 = 50;
pub const DEFAULT_CHROME_HEIGHT: u32 = TAB_BAR_HEIGHT + NAV_BAR_HEIGHT;

pub const MENU_WIDTH: u32 = 280;
pub const MENU_MARGIN: u32 = 10;
pub const DEFAULT_MENU_HEIGHT: u32 = 250;

/// Mutable state of the single primary window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowState {
    width: u32,
    height: u32,
    chrome_height: u32,
    maximized: bool,
    fullscreen: bool,
    menu_visible: bool,
    menu_height: u32,
    close_requested: bool,
}

impl WindowState {
    #[must_use]
    pub const fn new(width: u32, height: u32, chrome_height: u32) -> Self {
        Self {
            width,
            height,
            chrome_height,
            maximized: false,
            fullscreen: false,
            menu_visible: false,
            menu_height: DEFAULT_MENU_HEIGHT,
            close_requested: false,
        }
    }

    /// Area below the chrome, or the whole window in fullscreen.
    #[must_use]
    pub fn content_area(&self) -> Bounds {
        let chrome = if self.fullscreen { 0 } else { self.chrome_height.min(self.height) };
        Bounds::new(
            0,
            i32::try_from(chrome).unwrap_or(i32::MAX),
            self.width,
            self.height - chrome,
        )
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        tracing::debug!(width, height, "window resized");
        self.width = width;
        self.height = height;
    }

    #[must_use]
    pub const fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Flips the maximized state and returns the new one.
    pub fn toggle_maximize(&mut self) -> bool {
        self.maximized = !self.maximized;
        self.maximized
    }

    #[must_use]
    pub const fn is_maximized(&self) -> bool {
        self.maximized
    }

    /// Returns `true` if the state changed.
    pub fn set_fullscreen(&mut self, fullscreen: bool) -> bool {
        if self.fullscreen == fullscreen {
            return false;
        }
        self.fullscreen = fullscreen;
        true
    }

    #[must_use]
    pub const fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Overlay placement: right-aligned under the navigation bar.
    #[must_use]
    pub fn menu_bounds(&self) -> Bounds {
        let x = self.width.saturating_sub(MENU_WIDTH + MENU_MARGIN);
        Bounds::new(
            i32::try_from(x).unwrap_or(0),
            i32::try_from(NAV_BAR_HEIGHT).unwrap_or(0),
            MENU_WIDTH,
            self.menu_height,
        )
    }

    /// Flips menu visibility and returns the new state.
    pub fn toggle_menu(&mut self) -> bool {
        self.menu_visible = !self.menu_visible;
        self.menu_visible
    }

    /// Hides the menu. Returns `true` if it was visible.
    pub fn hide_menu(&mut self) -> bool {
        std::mem::replace(&mut self.menu_visible, false)
    }

    #[must_use]
    pub const fn is_menu_visible(&self) -> bool {
        self.menu_visible
    }

    pub fn set_menu_height(&mut self, height: u32) {
        self.menu_height = height;
    }

    pub fn request_close(&mut self) {
        tracing::info!("window close requested");
        self.close_requested = true;
    }

    #[must_use]
    pub const fn close_requested(&self) -> bool {
        self.close_requested
    }
}

impl Default for WindowState {
    fn default() -> Self {
        Self::new(1200, 800, DEFAULT_CHROME_HEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_area_reserves_chrome() {
        let window = WindowState::default();
        assert_eq!(window.content_area(), Bounds::new(0, 90, 1200, 710));
    }

    #[test]
    fn fullscreen_uses_whole_window() {
        let mut window = WindowState::default();
        assert!(window.set_fullscreen(true));
        assert!(!window.set_fullscreen(true));
        assert_eq!(window.content_area(), Bounds::new(0, 0, 1200, 800));
    }

    #[test]
    fn tiny_window_never_underflows() {
        let window = WindowState::new(100, 50, DEFAULT_CHROME_HEIGHT);
        assert_eq!(window.content_area().height, 0);
        assert_eq!(window.menu_bounds().x, 0);
    }

    #[test]
    fn menu_is_anchored_right_under_nav_bar() {
        let mut window = WindowState::default();
        window.set_menu_height(320);
        assert_eq!(window.menu_bounds(), Bounds::new(910, 50, 280, 320));

        assert!(window.toggle_menu());
        assert!(window.hide_menu());
        assert!(!window.hide_menu());
    }

    #[test]
    fn maximize_toggles() {
        let mut window = WindowState::default();
        assert!(window.toggle_maximize());
        assert!(!window.toggle_maximize());
    }
}
