//! Public marketing pages.

use axum::Router;
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use minijinja::context;

use crate::app::{AppState, views};
use crate::context::SessionHandle;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/home", get(home))
        .route("/about", get(about))
        .route("/services", get(services))
        .route("/contact", get(contact))
}

pub async fn home(State(state): State<AppState>, session: SessionHandle) -> Response {
    views::page(&state, &session, None, "index.html", context! {})
}

pub async fn about(State(state): State<AppState>, session: SessionHandle) -> Response {
    views::page(&state, &session, None, "about.html", context! {})
}

pub async fn services(State(state): State<AppState>, session: SessionHandle) -> Response {
    views::page(&state, &session, None, "services.html", context! {})
}

pub async fn contact(State(state): State<AppState>, session: SessionHandle) -> Response {
    views::page(&state, &session, None, "contact.html", context! {})
}
