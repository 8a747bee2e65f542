pub mod handlers;
pub mod request_context;
pub mod routes;

use std::sync::Arc;

use crate::convert::ApiVersions;
use crate::logic::MutationOrchestrator;

pub use routes::create_router;

/// Shared state behind every route.
pub struct Frontend<S> {
    pub versions: ApiVersions,
    pub orchestrator: MutationOrchestrator<S>,
}

impl<S> Frontend<S> {
    pub fn new(versions: ApiVersions, orchestrator: MutationOrchestrator<S>) -> Self {
        Self {
            versions,
            orchestrator,
        }
    }
}

pub type AppState<S> = Arc<Frontend<S>>;
