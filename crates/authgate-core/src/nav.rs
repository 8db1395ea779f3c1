//! Navigation seam between the core and the surrounding application.
//!
//! The core only ever asks where the user is and sends them to one of a few
//! well-known screens. Rendering those screens is the host's job.

use parking_lot::Mutex;
use tracing::debug;

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const DASHBOARD_PATH: &str = "/dashboard";

pub trait Navigator: Send + Sync {
    fn current_location(&self) -> String;
    fn navigate(&self, path: &str);
}

/// True for the screens where an unauthenticated user is expected
pub fn is_auth_screen(path: &str) -> bool {
    path == LOGIN_PATH || path == REGISTER_PATH
}

/// Navigator that only tracks the location and the history of moves.
#[derive(Debug)]
pub struct MemoryNavigator {
    history: Mutex<Vec<String>>,
}

impl MemoryNavigator {
    pub fn starting_at(path: &str) -> Self {
        Self {
            history: Mutex::new(vec![path.to_string()]),
        }
    }

    /// Every location visited, starting location first
    pub fn history(&self) -> Vec<String> {
        self.history.lock().clone()
    }

    /// Number of navigations performed
    pub fn moves(&self) -> usize {
        self.history.lock().len() - 1
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::starting_at("/")
    }
}

impl Navigator for MemoryNavigator {
    fn current_location(&self) -> String {
        self.history
            .lock()
            .last()
            .cloned()
            .unwrap_or_else(|| "/".to_string())
    }

    fn navigate(&self, path: &str) {
        debug!(to = path, "Navigating");
        self.history.lock().push(path.to_string());
    }
}
