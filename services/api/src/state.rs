//! Application state shared across request handlers.

use std::sync::Arc;

use crate::service::{ReviewService, RosterService, ServiceConfig};
use crate::store::Store;

/// Shared application state.
///
/// This is passed to all request handlers via Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn Store>,
    roster: RosterService,
    reviews: ReviewService,
}

impl AppState {
    /// Build the services over `store`.
    pub fn new(store: Arc<dyn Store>, config: &ServiceConfig) -> Self {
        Self::with_services(
            store.clone(),
            RosterService::new(store.clone(), config),
            ReviewService::new(store, config),
        )
    }

    /// Use pre-built services, e.g. a review service with a seeded random source.
    pub fn with_services(store: Arc<dyn Store>, roster: RosterService, reviews: ReviewService) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                store,
                roster,
                reviews,
            }),
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    pub fn roster(&self) -> &RosterService {
        &self.inner.roster
    }

    pub fn reviews(&self) -> &ReviewService {
        &self.inner.reviews
    }
}
