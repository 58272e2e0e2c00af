use std::sync::{Arc, Mutex, PoisonError};

/// Navigator
///
/// Where the client sends the user when the session ends underneath them.
/// A browser shell would change the location; the CLI only logs.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

pub type NavigatorState = Arc<dyn Navigator>;

/// Logs every navigation at INFO level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, path: &str) {
        tracing::info!(path, "Navigation requested");
    }
}

/// Records every navigation, in order. Used by tests to assert redirects.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<String> {
        self.visited().pop()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
    }
}
