use crate::relay::Relay;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Every model call goes through the relay; handlers never talk to a vendor directly.
    pub relay: Relay,
}
