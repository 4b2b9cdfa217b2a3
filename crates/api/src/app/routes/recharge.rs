//! Simulated airtime purchase.

use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::{Form, Router};
use minijinja::context;

use cardbank_infra::RechargeForm;

use crate::app::dto::RechargeView;
use crate::app::{AppState, errors, views};
use crate::context::AuthenticatedUser;

pub fn router() -> Router<AppState> {
    Router::new().route("/recharge", get(recharge_page).post(recharge))
}

pub async fn recharge_page(State(state): State<AppState>, user: AuthenticatedUser) -> Response {
    views::page(&state, &user.session, Some(&user.account), "recharge.html", context! {})
}

pub async fn recharge(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Form(form): Form<RechargeForm>,
) -> Response {
    match state.banking.recharge(user.id(), &form).await {
        Ok(outcome) => {
            // Show the post-purchase balance.
            let account = state
                .banking
                .account(user.id())
                .await
                .unwrap_or_else(|_| user.account.clone());
            views::page(
                &state,
                &user.session,
                Some(&account),
                "recharge_success.html",
                context! { recharge => RechargeView::from(&outcome) },
            )
        }
        Err(e) => errors::flash_redirect(&user.session, &e, "/recharge"),
    }
}
