use axum::Router;
use axum::routing::get;

use crate::app::AppState;

pub mod account;
pub mod auth;
pub mod contact;
pub mod deposit;
pub mod history;
pub mod pages;
pub mod receipts;
pub mod recharge;
pub mod system;
pub mod transfer;

/// Every route of the site. Session handling is layered on by the caller.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(system::health))
        .merge(pages::router())
        .merge(contact::router())
        .merge(auth::router())
        .merge(account::router())
        .merge(transfer::router())
        .merge(deposit::router())
        .merge(recharge::router())
        .merge(history::router())
        .merge(receipts::router())
}
