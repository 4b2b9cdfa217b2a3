//! `cardbank-auth`: credentials and server-side sessions.
//!
//! This crate is intentionally decoupled from HTTP and storage: cookies and
//! request extraction live in the API crate, user records in infra.

pub mod credentials;
pub mod password;
pub mod session;

pub use credentials::{MIN_PASSWORD_LEN, Registration, RegistrationError, normalize_email, validate_registration};
pub use password::{MIN_COST, PasswordError, PasswordHash, PasswordHasher};
pub use session::{
    DEFAULT_SESSION_IDLE, Flash, FlashLevel, InMemorySessionStore, MAX_COOKIE_FLASHES, SessionData, SessionId,
    SessionStore, decode_flashes, encode_flashes,
};
