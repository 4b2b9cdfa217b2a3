use axum::extract::State;
use axum::response::Response;
use axum::routing::post;
use axum::{Form, Router};
use minijinja::context;

use cardbank_infra::mailer::ContactMessage;

use crate::app::{AppState, errors, views};
use crate::context::SessionHandle;

pub fn router() -> Router<AppState> {
    Router::new().route("/submitForm", post(submit_form))
}

/// Relay the contact form by email and thank the visitor.
pub async fn submit_form(
    State(state): State<AppState>,
    session: SessionHandle,
    Form(message): Form<ContactMessage>,
) -> Response {
    match state.banking.send_contact_message(&message).await {
        Ok(()) => views::page(
            &state,
            &session,
            None,
            "contact_success.html",
            context! { name => message.name },
        ),
        Err(e) => errors::flash_redirect(&session, &e, "/contact"),
    }
}
