use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::app::{AppState, errors};
use crate::context::AuthenticatedUser;

pub fn router() -> Router<AppState> {
    Router::new().route("/download_receipt/:filename", get(download_receipt))
}

/// Serve a receipt as an attachment. Receipts belonging to someone else,
/// expired ones and unknown names are all 404.
pub async fn download_receipt(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(filename): Path<String>,
) -> Response {
    match state.banking.receipt_file(user.id(), &filename).await {
        Ok(Some(file)) => (
            [
                (header::CONTENT_TYPE, file.receipt.content_type.clone()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", file.receipt.file_name),
                ),
            ],
            file.bytes,
        )
            .into_response(),
        Ok(None) => errors::not_found_page(&state),
        Err(e) => errors::internal_error(&state, &e),
    }
}
