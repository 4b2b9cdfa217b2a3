use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use minijinja::context;
use tracing::{error, warn};

use cardbank_infra::BankingError;

use crate::app::AppState;
use crate::app::views;
use crate::context::SessionHandle;

/// Queue the error's user message as a flash and redirect to `to`.
/// Infrastructure failures are logged at `error`, everything else at
/// `warn`.
pub fn flash_redirect(session: &SessionHandle, err: &BankingError, to: &str) -> Response {
    if err.is_internal() {
        error!(error = %err, "request failed");
    } else {
        warn!(error = %err, "request rejected");
    }
    session.flash(err.flash_level(), err.user_message());
    Redirect::to(to).into_response()
}

/// Generic 500 page.
pub fn internal_error(state: &AppState, err: &dyn std::fmt::Display) -> Response {
    error!(error = %err, "internal error");
    views::render_with_status(
        state,
        StatusCode::INTERNAL_SERVER_ERROR,
        "error.html",
        context! {
            status => 500,
            message => "Something went wrong on our side. Please try again later.",
        },
    )
}

pub fn not_found_page(state: &AppState) -> Response {
    views::render_with_status(
        state,
        StatusCode::NOT_FOUND,
        "error.html",
        context! {
            status => 404,
            message => "The page you are looking for does not exist.",
        },
    )
}

pub async fn not_found(State(state): State<AppState>) -> Response {
    not_found_page(&state)
}
