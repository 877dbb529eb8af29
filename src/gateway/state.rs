use crate::status::StatusCache;
use std::sync::Arc;

/// Shared gateway state
#[derive(Clone)]
pub struct AppState {
    /// Status cache, shared with the reconciliation monitors
    pub cache: Arc<StatusCache>,
}

impl AppState {
    pub fn new(cache: Arc<StatusCache>) -> Self {
        Self { cache }
    }
}
