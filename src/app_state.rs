//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::HomeownerService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Homeowner service for all aggregation endpoints.
    pub homeowner_service: Arc<HomeownerService>,
}

impl AppState {
    /// Wraps a service into handler state.
    #[must_use]
    pub fn new(homeowner_service: HomeownerService) -> Self {
        Self {
            homeowner_service: Arc::new(homeowner_service),
        }
    }
}
