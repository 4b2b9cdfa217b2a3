use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use minijinja::context;

use crate::app::dto::EntryView;
use crate::app::{AppState, errors, views};
use crate::context::AuthenticatedUser;

pub fn router() -> Router<AppState> {
    Router::new().route("/transaction_history", get(transaction_history))
}

/// The user's ledger rows, newest first.
pub async fn transaction_history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Response {
    let entries = match state.banking.history(user.id()).await {
        Ok(entries) => entries,
        Err(e) => return errors::internal_error(&state, &e),
    };
    let transactions: Vec<EntryView> = entries.iter().map(EntryView::from).collect();

    views::page(
        &state,
        &user.session,
        Some(&user.account),
        "transaction_history.html",
        context! { transactions => transactions },
    )
}
