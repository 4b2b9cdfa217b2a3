use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use sha2::{Digest, Sha512};

use cardbank_auth::{SessionData, SessionId, SessionStore, decode_flashes, encode_flashes};

use crate::context::SessionHandle;

pub const SESSION_COOKIE: &str = "cardbank_session";
/// Carries flashes for visitors who are not logged in.
pub const FLASH_COOKIE: &str = "cardbank_flash";

#[derive(Clone)]
pub struct SessionState {
    pub store: Arc<dyn SessionStore>,
    pub key: Key,
}

impl SessionState {
    /// Derive the 64-byte cookie signing key from the configured secret.
    pub fn new(store: Arc<dyn SessionStore>, secret: &str) -> Self {
        let digest = Sha512::digest(secret.as_bytes());
        Self {
            store,
            key: Key::from(digest.as_slice()),
        }
    }
}

fn session_cookie(id: &SessionId) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.as_str().to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn flash_cookie(value: String) -> Cookie<'static> {
    Cookie::build((FLASH_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Load the session named by the signed cookie (or start an empty one),
/// expose it to handlers as a [`SessionHandle`], then persist whatever the
/// handler left in it.
///
/// Only sessions with a logged-in user are stored server-side. Flashes for
/// anonymous visitors ride in a signed cookie, so unauthenticated traffic
/// never grows the store.
pub async fn session_middleware(
    State(state): State<SessionState>,
    mut req: Request,
    next: Next,
) -> Response {
    let mut jar = SignedCookieJar::from_headers(req.headers(), state.key.clone());
    let had_session_cookie = jar.get(SESSION_COOKIE).is_some();
    let had_flash_cookie = jar.get(FLASH_COOKIE).is_some();

    let loaded = jar
        .get(SESSION_COOKIE)
        .and_then(|c| SessionId::parse(c.value()))
        .and_then(|id| state.store.load(&id).map(|data| (id, data)));
    let (current_id, mut data) = match loaded {
        Some((id, data)) => (Some(id), data),
        None => (None, SessionData::default()),
    };
    if let Some(cookie) = jar.get(FLASH_COOKIE) {
        for flash in decode_flashes(cookie.value()) {
            data.flash(flash.level, flash.message);
        }
    }

    let handle = SessionHandle::new(data);
    req.extensions_mut().insert(handle.clone());

    let response = next.run(req).await;

    let (mut data, rotate) = handle.finish();
    if rotate {
        if let Some(old) = &current_id {
            state.store.remove(old);
        }
    }

    if data.user_id().is_none() {
        if let Some(id) = &current_id {
            state.store.remove(id);
        }
        if had_session_cookie {
            jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
        }
        let flashes = data.take_flashes();
        if !flashes.is_empty() {
            jar = jar.add(flash_cookie(encode_flashes(&flashes)));
        } else if had_flash_cookie {
            jar = jar.remove(Cookie::build(FLASH_COOKIE).path("/"));
        }
        return (jar, response).into_response();
    }

    if had_flash_cookie {
        jar = jar.remove(Cookie::build(FLASH_COOKIE).path("/"));
    }
    let (id, is_new) = match current_id {
        Some(id) if !rotate => (id, false),
        _ => (SessionId::generate(), true),
    };
    state.store.save(&id, data);
    if is_new {
        jar = jar.add(session_cookie(&id));
    }
    (jar, response).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request as HttpRequest, header};
    use axum::routing::get;
    use tower::ServiceExt;

    use cardbank_auth::{Flash, FlashLevel, InMemorySessionStore};
    use cardbank_core::UserId;

    #[test]
    fn key_is_stable_for_a_secret() {
        let store = Arc::new(InMemorySessionStore::new());
        let a = SessionState::new(store.clone(), "secret");
        let b = SessionState::new(store, "secret");
        assert_eq!(a.key.master(), b.key.master());
    }

    #[test]
    fn cookie_is_http_only_and_site_wide() {
        let cookie = session_cookie(&SessionId::generate());
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }

    async fn protected(session: SessionHandle) -> &'static str {
        session.flash(FlashLevel::Danger, "Please log in.");
        "redirect"
    }

    async fn show(session: SessionHandle) -> String {
        session
            .take_flashes()
            .into_iter()
            .map(|f| f.message)
            .collect::<Vec<_>>()
            .join("|")
    }

    async fn log_in(session: SessionHandle) -> &'static str {
        session.log_in(UserId::new());
        session.flash(FlashLevel::Success, "Login successful.");
        "in"
    }

    async fn log_out(session: SessionHandle) -> &'static str {
        session.log_out();
        session.flash(FlashLevel::Info, "You have been logged out.");
        "out"
    }

    fn app(store: Arc<InMemorySessionStore>) -> Router {
        let state = SessionState::new(store, "secret");
        Router::new()
            .route("/protected", get(protected))
            .route("/show", get(show))
            .route("/login", get(log_in))
            .route("/logout", get(log_out))
            .layer(axum::middleware::from_fn_with_state(state, session_middleware))
    }

    async fn send(app: &Router, uri: &str, cookies: &[String]) -> Response {
        let mut req = HttpRequest::builder().uri(uri);
        if !cookies.is_empty() {
            req = req.header(header::COOKIE, cookies.join("; "));
        }
        app.clone().oneshot(req.body(Body::empty()).unwrap()).await.unwrap()
    }

    /// `name=value` of a cookie the response sets, ignoring removals.
    fn set_cookie(res: &Response, name: &str) -> Option<String> {
        res.headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .find(|pair| pair.starts_with(&format!("{name}=")) && pair.len() > name.len() + 1)
            .map(str::to_string)
    }

    fn removes_cookie(res: &Response, name: &str) -> bool {
        res.headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.starts_with(&format!("{name}=;")))
    }

    async fn text(res: Response) -> String {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn anonymous_traffic_stores_no_sessions() {
        let store = Arc::new(InMemorySessionStore::new());
        let app = app(store.clone());

        for _ in 0..1000 {
            let res = send(&app, "/protected", &[]).await;
            assert!(set_cookie(&res, FLASH_COOKIE).is_some());
            assert!(set_cookie(&res, SESSION_COOKIE).is_none());
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn anonymous_flash_is_shown_once() {
        let store = Arc::new(InMemorySessionStore::new());
        let app = app(store.clone());

        let res = send(&app, "/protected", &[]).await;
        let flash = set_cookie(&res, FLASH_COOKIE).unwrap();

        let res = send(&app, "/show", &[flash]).await;
        assert!(removes_cookie(&res, FLASH_COOKIE));
        assert_eq!(text(res).await, "Please log in.");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn forged_flash_cookie_is_ignored() {
        let app = app(Arc::new(InMemorySessionStore::new()));
        let unsigned = encode_flashes(&[Flash {
            level: FlashLevel::Success,
            message: "Transfer successful".into(),
        }]);
        let forged = format!("{FLASH_COOKIE}={unsigned}");
        let res = send(&app, "/show", &[forged]).await;
        assert_eq!(text(res).await, "");
    }

    #[tokio::test]
    async fn login_moves_flashes_into_a_stored_session() {
        let store = Arc::new(InMemorySessionStore::new());
        let app = app(store.clone());

        let res = send(&app, "/protected", &[]).await;
        let flash = set_cookie(&res, FLASH_COOKIE).unwrap();

        let res = send(&app, "/login", &[flash.clone()]).await;
        assert!(removes_cookie(&res, FLASH_COOKIE));
        let session = set_cookie(&res, SESSION_COOKIE).unwrap();
        assert_eq!(store.len(), 1);

        let res = send(&app, "/show", &[session.clone()]).await;
        assert_eq!(text(res).await, "Please log in.|Login successful.");

        let res = send(&app, "/logout", &[session]).await;
        assert!(removes_cookie(&res, SESSION_COOKIE));
        assert!(set_cookie(&res, FLASH_COOKIE).is_some());
        assert!(store.is_empty());
    }
}
