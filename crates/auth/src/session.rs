//! Server-side sessions and one-shot flash messages.
//!
//! A session is a small record keyed by an unguessable id that travels in a
//! cookie. It carries the logged-in user (if any) and flash messages queued
//! for the next rendered page.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use rand::RngCore;
use tracing::debug;
use serde::{Deserialize, Serialize};

use cardbank_core::UserId;

const SESSION_ID_BYTES: usize = 32;

/// Idle time after which a stored session is forgotten.
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(2 * 60 * 60);

/// Newest flashes kept when they travel in a cookie.
pub const MAX_COOKIE_FLASHES: usize = 8;

/// Opaque session identifier (64 lowercase hex characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Fresh id from the OS random source.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Accept only well-formed ids; anything else is treated as no session.
    pub fn parse(s: &str) -> Option<Self> {
        let well_formed = s.len() == SESSION_ID_BYTES * 2
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        well_formed.then(|| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Flash message category; doubles as the CSS class in templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Danger,
    Error,
}

impl FlashLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Info => "info",
            FlashLevel::Danger => "danger",
            FlashLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

/// Cookie-safe encoding of pending flashes (hex of JSON), keeping only the
/// newest [`MAX_COOKIE_FLASHES`].
pub fn encode_flashes(flashes: &[Flash]) -> String {
    let start = flashes.len().saturating_sub(MAX_COOKIE_FLASHES);
    serde_json::to_vec(&flashes[start..])
        .map(hex::encode)
        .unwrap_or_default()
}

/// Inverse of [`encode_flashes`]. Garbage decodes to no flashes.
pub fn decode_flashes(raw: &str) -> Vec<Flash> {
    hex::decode(raw)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}

/// Session contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionData {
    user_id: Option<UserId>,
    flashes: Vec<Flash>,
}

impl SessionData {
    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn log_in(&mut self, user_id: UserId) {
        self.user_id = Some(user_id);
    }

    /// Drop everything: identity and pending flashes.
    pub fn clear(&mut self) {
        self.user_id = None;
        self.flashes.clear();
    }

    pub fn flash(&mut self, level: FlashLevel, message: impl Into<String>) {
        self.flashes.push(Flash {
            level,
            message: message.into(),
        });
    }

    /// Remove and return queued flashes (each is shown once).
    pub fn take_flashes(&mut self) -> Vec<Flash> {
        std::mem::take(&mut self.flashes)
    }
}

/// Session persistence.
pub trait SessionStore: Send + Sync {
    fn load(&self, id: &SessionId) -> Option<SessionData>;
    fn save(&self, id: &SessionId, data: SessionData);
    fn remove(&self, id: &SessionId);
}

impl<S> SessionStore for Arc<S>
where
    S: SessionStore + ?Sized,
{
    fn load(&self, id: &SessionId) -> Option<SessionData> {
        (**self).load(id)
    }

    fn save(&self, id: &SessionId, data: SessionData) {
        (**self).save(id, data)
    }

    fn remove(&self, id: &SessionId) {
        (**self).remove(id)
    }
}

#[derive(Debug)]
struct Sessions {
    entries: HashMap<SessionId, (SessionData, Instant)>,
    last_sweep: Instant,
}

/// Process-local session store.
///
/// Entries idle for longer than the configured TTL are invisible to `load`
/// and are dropped by a periodic sweep during `save`.
#[derive(Debug)]
pub struct InMemorySessionStore {
    idle_ttl: Duration,
    inner: RwLock<Sessions>,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::with_idle_ttl(DEFAULT_SESSION_IDLE)
    }
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
        Self {
            idle_ttl,
            inner: RwLock::new(Sessions {
                entries: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn expired(&self, touched: Instant, now: Instant) -> bool {
        now.saturating_duration_since(touched) > self.idle_ttl
    }

    fn load_at(&self, id: &SessionId, now: Instant) -> Option<SessionData> {
        let sessions = self.inner.read().ok()?;
        match sessions.entries.get(id) {
            Some((data, touched)) if !self.expired(*touched, now) => Some(data.clone()),
            _ => None,
        }
    }

    fn save_at(&self, id: &SessionId, data: SessionData, now: Instant) {
        let Ok(mut sessions) = self.inner.write() else {
            return;
        };
        // At most one sweep per TTL.
        if now.saturating_duration_since(sessions.last_sweep) >= self.idle_ttl {
            let before = sessions.entries.len();
            sessions
                .entries
                .retain(|_, (_, touched)| now.saturating_duration_since(*touched) <= self.idle_ttl);
            sessions.last_sweep = now;
            let swept = before - sessions.entries.len();
            if swept > 0 {
                debug!(swept, "expired idle sessions");
            }
        }
        sessions.entries.insert(id.clone(), (data, now));
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self, id: &SessionId) -> Option<SessionData> {
        self.load_at(id, Instant::now())
    }

    fn save(&self, id: &SessionId, data: SessionData) {
        self.save_at(id, data, Instant::now())
    }

    fn remove(&self, id: &SessionId) {
        if let Ok(mut sessions) = self.inner.write() {
            sessions.entries.remove(id);
        }
    }
}
