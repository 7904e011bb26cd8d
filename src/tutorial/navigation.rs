//! Navigation coordination between the tutorial and the host app.
//!
//! The controller only forwards a step's logical screen name. Mapping names
//! to real screens, and deciding what to do with names the host cannot
//! switch to, is the host's job.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, info, warn};

/// Host capability for switching the visible top-level screen.
///
/// Calls arrive on the thread that drives the controller.
pub trait NavigationCoordinator: Send + Sync {
    /// Switch to the screen named `screen`. Must not fail; unmapped names
    /// need a deterministic fallback.
    fn switch_to(&self, screen: &str);
}

/// Coordinator for hosts without screen switching.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

impl NavigationCoordinator for NoopNavigator {
    fn switch_to(&self, screen: &str) {
        debug!(screen, "Navigation ignored by no-op navigator");
    }
}

/// Top-level tabs of the app, in tab-bar order.
pub const TAB_SCREENS: [&str; 5] = ["home", "network", "groups", "business-profile", "profile"];

/// Scripted destinations that live outside the tab bar. Switching to them
/// leaves the current tab selected.
pub const OFF_TAB_SCREENS: [&str; 2] = ["resources", "messages"];

/// How a screen name resolves against the tab bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabRoute {
    Tab(usize),
    OffTab,
    Unknown,
}

/// Resolve a logical screen name to a tab.
pub fn route(screen: &str) -> TabRoute {
    if let Some(index) = TAB_SCREENS.iter().position(|s| *s == screen) {
        TabRoute::Tab(index)
    } else if OFF_TAB_SCREENS.contains(&screen) {
        TabRoute::OffTab
    } else {
        TabRoute::Unknown
    }
}

/// Reference coordinator for a tab-bar host.
///
/// Tab screens select their tab. Off-tab destinations and unknown names
/// keep the current tab and log a warning.
#[derive(Debug, Default)]
pub struct TabNavigator {
    selected: AtomicUsize,
}

impl TabNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the selected tab.
    pub fn selected_tab(&self) -> usize {
        self.selected.load(Ordering::Relaxed)
    }

    /// Logical name of the selected tab.
    pub fn selected_screen(&self) -> &'static str {
        TAB_SCREENS[self.selected_tab()]
    }
}

impl NavigationCoordinator for TabNavigator {
    fn switch_to(&self, screen: &str) {
        let current = self.selected_tab();
        match route(screen) {
            TabRoute::Tab(index) => {
                self.selected.store(index, Ordering::Relaxed);
                info!(screen, from = current, to = index, "Tutorial switched tab");
            }
            TabRoute::OffTab => {
                warn!(screen, tab = current, "Screen is not in the tab bar, staying put");
            }
            TabRoute::Unknown => {
                warn!(screen, tab = current, "Unknown tutorial screen, staying put");
            }
        }
    }
}
