//! Request-scoped context: the session handle and the authenticated user.

use std::sync::{Arc, Mutex, MutexGuard};

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};

use cardbank_auth::{Flash, FlashLevel, SessionData};
use cardbank_core::UserId;
use cardbank_infra::BankingError;
use cardbank_ledger::Account;

use crate::app::AppState;
use crate::app::errors;

#[derive(Debug, Default)]
struct SessionInner {
    data: SessionData,
    rotate: bool,
}

/// The current request's session.
///
/// Inserted by the session middleware; handlers mutate it and the
/// middleware persists the result after the handler returns.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<Mutex<SessionInner>>,
}

impl SessionHandle {
    pub fn new(data: SessionData) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                data,
                rotate: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.lock().data.user_id()
    }

    /// Bind the session to `user_id`. The session id is replaced.
    pub fn log_in(&self, user_id: UserId) {
        let mut inner = self.lock();
        inner.data.log_in(user_id);
        inner.rotate = true;
    }

    /// Forget the user and any pending flashes. The session id is replaced.
    pub fn log_out(&self) {
        let mut inner = self.lock();
        inner.data.clear();
        inner.rotate = true;
    }

    pub fn flash(&self, level: FlashLevel, message: impl Into<String>) {
        self.lock().data.flash(level, message);
    }

    pub fn take_flashes(&self) -> Vec<Flash> {
        self.lock().data.take_flashes()
    }

    /// Final state plus whether the id must be rotated.
    pub(crate) fn finish(&self) -> (SessionData, bool) {
        let inner = self.lock();
        (inner.data.clone(), inner.rotate)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionHandle
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionHandle>()
            .cloned()
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// The logged-in user's account.
///
/// Rejects with a redirect to `/login` (and a flash) when the session has no
/// user or the user no longer exists.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub account: Account,
    pub session: SessionHandle,
}

impl AuthenticatedUser {
    pub fn id(&self) -> UserId {
        self.account.id
    }
}

fn login_required(session: &SessionHandle) -> Response {
    session.flash(FlashLevel::Danger, BankingError::NotAuthenticated.user_message());
    Redirect::to("/login").into_response()
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = SessionHandle::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let Some(user_id) = session.user_id() else {
            return Err(login_required(&session));
        };

        match state.banking.account(user_id).await {
            Ok(account) => Ok(Self { account, session }),
            Err(BankingError::NotAuthenticated) => {
                session.log_out();
                Err(login_required(&session))
            }
            Err(e) => Err(errors::internal_error(state, &e)),
        }
    }
}
