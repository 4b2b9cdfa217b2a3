//! Registration, login and logout.

use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use minijinja::context;

use cardbank_auth::{FlashLevel, Registration};
use cardbank_infra::BankingError;

use crate::app::dto::LoginForm;
use crate::app::{AppState, errors, views};
use crate::context::SessionHandle;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
        .route("/register", get(register_page).post(register))
}

pub async fn login_page(State(state): State<AppState>, session: SessionHandle) -> Response {
    views::page(&state, &session, None, "login.html", context! {})
}

pub async fn login(
    State(state): State<AppState>,
    session: SessionHandle,
    Form(form): Form<LoginForm>,
) -> Response {
    match state.banking.authenticate(&form.email, &form.password).await {
        Ok(account) => {
            session.log_in(account.id);
            session.flash(FlashLevel::Success, "Login successful.");
            Redirect::to("/dashboard").into_response()
        }
        Err(e) => errors::flash_redirect(&session, &e, "/login"),
    }
}

pub async fn logout(session: SessionHandle) -> Response {
    session.log_out();
    session.flash(FlashLevel::Success, "You have been logged out.");
    Redirect::to("/").into_response()
}

pub async fn register_page(State(state): State<AppState>, session: SessionHandle) -> Response {
    views::page(&state, &session, None, "register.html", context! {})
}

pub async fn register(
    State(state): State<AppState>,
    session: SessionHandle,
    Form(form): Form<Registration>,
) -> Response {
    match state.banking.register(&form).await {
        Ok(account) => {
            session.log_in(account.id);
            session.flash(
                FlashLevel::Success,
                "Registration successful. You are now logged in.",
            );
            Redirect::to("/dashboard").into_response()
        }
        Err(e @ BankingError::EmailTaken) => errors::flash_redirect(&session, &e, "/login"),
        Err(e) => errors::flash_redirect(&session, &e, "/register"),
    }
}
