use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use minijinja::context;

use crate::app::{AppState, views};
use crate::context::AuthenticatedUser;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/exchange_rate", get(exchange_rate))
}

pub async fn dashboard(State(state): State<AppState>, user: AuthenticatedUser) -> Response {
    views::page(&state, &user.session, Some(&user.account), "dashboard.html", context! {})
}

/// Placeholder until rates are available.
pub async fn exchange_rate(State(state): State<AppState>, user: AuthenticatedUser) -> Response {
    views::page(&state, &user.session, Some(&user.account), "soon.html", context! {})
}
