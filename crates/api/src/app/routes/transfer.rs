//! Fund transfers and the post-transfer success page.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use minijinja::context;

use cardbank_auth::FlashLevel;
use cardbank_infra::TransferForm;

use crate::app::routes::receipts;
use crate::app::{AppState, errors, views};
use crate::context::AuthenticatedUser;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/transfer", get(transfer_page).post(transfer))
        .route("/success/:filename", get(success))
        .route("/success/:filename/download", get(receipts::download_receipt))
}

pub async fn transfer_page(State(state): State<AppState>, user: AuthenticatedUser) -> Response {
    views::page(&state, &user.session, Some(&user.account), "transfer.html", context! {})
}

pub async fn transfer(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Form(form): Form<TransferForm>,
) -> Response {
    match state.banking.transfer(user.id(), &form).await {
        Ok(outcome) => match outcome.receipt {
            Some(receipt) => Redirect::to(&format!("/success/{}", receipt.file_name)).into_response(),
            None => {
                user.session.flash(
                    FlashLevel::Info,
                    "Transfer completed, but the receipt could not be generated.",
                );
                Redirect::to("/dashboard").into_response()
            }
        },
        Err(e) => errors::flash_redirect(&user.session, &e, "/transfer"),
    }
}

/// Payment confirmation with a link to download the receipt.
pub async fn success(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(filename): Path<String>,
) -> Response {
    match state.banking.find_receipt(user.id(), &filename).await {
        Ok(Some(receipt)) => views::page(
            &state,
            &user.session,
            Some(&user.account),
            "payment.html",
            context! { filename => receipt.file_name },
        ),
        Ok(None) => errors::not_found_page(&state),
        Err(e) => errors::internal_error(&state, &e),
    }
}
