use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use minijinja::context;

use cardbank_auth::FlashLevel;
use cardbank_infra::DepositForm;

use crate::app::{AppState, errors, views};
use crate::context::AuthenticatedUser;

pub fn router() -> Router<AppState> {
    Router::new().route("/deposit", get(deposit_page).post(deposit))
}

pub async fn deposit_page(State(state): State<AppState>, user: AuthenticatedUser) -> Response {
    views::page(&state, &user.session, Some(&user.account), "deposit.html", context! {})
}

pub async fn deposit(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Form(form): Form<DepositForm>,
) -> Response {
    match state.banking.deposit(user.id(), &form).await {
        Ok(outcome) => {
            user.session.flash(
                FlashLevel::Success,
                format!("Successfully deposited ₦{} to your account.", outcome.amount),
            );
            Redirect::to("/dashboard").into_response()
        }
        Err(e) => errors::flash_redirect(&user.session, &e, "/deposit"),
    }
}
