use std::sync::Arc;
use std::time::Duration;

use crate::agent::Agent;
use crate::sessions::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
    pub sessions: Arc<SessionStore>,
    /// Deadline after which a run's cancellation token fires.
    pub run_timeout: Duration,
}
