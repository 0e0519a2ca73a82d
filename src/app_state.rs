use std::sync::Arc;

use crate::services::resolver::MatchResolver;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<MatchResolver>,
}

impl AppState {
    pub fn new(resolver: MatchResolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
        }
    }
}
