//! REST endpoint handlers organized by resource.

pub mod portfolio;
pub mod prices;
pub mod reward;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(reward::routes())
        .merge(portfolio::routes())
        .merge(prices::routes())
}
