//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: builds the banking service from configuration
//! - `routes/`: handlers, one file per area of the site
//! - `views.rs`: template environment and page rendering
//! - `dto.rs`: view models handed to templates
//! - `errors.rs`: flash-and-redirect and error pages

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use cardbank_auth::InMemorySessionStore;
use cardbank_infra::{AppConfig, BankingService};

use crate::middleware::{self, SessionState};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;
pub mod views;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub banking: BankingService,
    pub views: Arc<views::Views>,
}

/// Build the full HTTP router from configuration (used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let banking = services::build_banking(config).await?;
    let store = InMemorySessionStore::with_idle_ttl(Duration::from_secs(config.session_idle_minutes * 60));
    build_router(banking, SessionState::new(Arc::new(store), &config.secret_key))
}

/// Build the router around an already-wired banking service, with the
/// default session idle timeout.
pub fn build_app_with(banking: BankingService, secret_key: &str) -> anyhow::Result<Router> {
    build_router(banking, SessionState::new(Arc::new(InMemorySessionStore::new()), secret_key))
}

fn build_router(banking: BankingService, sessions: SessionState) -> anyhow::Result<Router> {
    let state = AppState {
        banking,
        views: Arc::new(views::Views::new()?),
    };

    Ok(routes::router()
        .fallback(errors::not_found)
        .with_state(state)
        .layer(axum::middleware::from_fn_with_state(
            sessions,
            middleware::session_middleware,
        ))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http())))
}
