//! HTTP route handlers.

pub mod health;
pub mod menu;
pub mod metrics;
pub mod orders;

use engine::OrderEngine;

/// Shared application state passed to order and menu handlers.
pub struct AppState<L, O> {
    pub engine: OrderEngine<L, O>,
}

impl<L, O> AppState<L, O> {
    pub fn new(engine: OrderEngine<L, O>) -> Self {
        Self { engine }
    }
}

/// Parses a path identifier, rejecting malformed ones as bad requests.
pub(crate) fn parse_id<T: std::str::FromStr>(
    raw: &str,
    kind: &str,
) -> Result<T, crate::error::ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| crate::error::ApiError::BadRequest(format!("Invalid {kind} id: {raw}")))
}
