//! Process-scoped state shared across invocations.

use std::sync::Arc;

use crate::invoke::Finder;

/// Shared application state.
///
/// Built once before the listener starts and read-only afterwards; handlers
/// get it through Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    finder: Finder,
}

impl AppState {
    pub fn new(finder: Finder) -> Self {
        Self {
            inner: Arc::new(AppStateInner { finder }),
        }
    }

    pub fn finder(&self) -> &Finder {
        &self.inner.finder
    }
}
