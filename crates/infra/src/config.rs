//! Process configuration, read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

use cardbank_auth::{DEFAULT_SESSION_IDLE, MIN_COST};
use cardbank_core::Money;
use cardbank_ledger::DEFAULT_OPENING_BALANCE;

use crate::cards::DEFAULT_CARD_ISSUANCE_ATTEMPTS;
use crate::receipts::DEFAULT_RECEIPT_TTL_HOURS;

pub const DEV_SECRET_KEY: &str = "cardbank-dev-secret-key-change-me";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAIL_SERVER: &str = "smtp.gmail.com";
pub const DEFAULT_MAIL_PORT: u16 = 587;
pub const DEFAULT_CONTACT_RECIPIENT: &str = "bwaveict@gmail.com";
pub const DEFAULT_WKHTMLTOPDF: &str = "wkhtmltopdf";
/// Receipt lifetimes beyond a century overflow date arithmetic.
pub const MAX_RECEIPT_TTL_HOURS: i64 = 100 * 365 * 24;
pub const MAX_SESSION_IDLE_MINUTES: u64 = 365 * 24 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has an invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererKind {
    Wkhtmltopdf,
    Html,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailConfig {
    pub server: String,
    pub port: u16,
    /// SMTP login. Without both credentials mail is logged, not sent.
    pub username: Option<String>,
    pub password: Option<String>,
    pub contact_recipient: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptConfig {
    /// Directory for receipt files; in-memory archive when unset.
    pub dir: Option<PathBuf>,
    pub renderer: RendererKind,
    pub wkhtmltopdf_path: PathBuf,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Signs session cookies.
    pub secret_key: String,
    /// Postgres URL; in-memory store when unset.
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub mail: MailConfig,
    pub receipts: ReceiptConfig,
    pub card_issuance_attempts: u32,
    /// bcrypt cost; bcrypt's default when unset.
    pub password_hash_cost: Option<u32>,
    pub opening_balance: Money,
    /// Logged-in sessions idle longer than this are dropped.
    pub session_idle_minutes: u64,
}

impl Default for AppConfig {
    /// Development settings: in-memory everything, no outbound mail.
    fn default() -> Self {
        Self {
            secret_key: DEV_SECRET_KEY.to_string(),
            database_url: None,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            mail: MailConfig {
                server: DEFAULT_MAIL_SERVER.to_string(),
                port: DEFAULT_MAIL_PORT,
                username: None,
                password: None,
                contact_recipient: DEFAULT_CONTACT_RECIPIENT.to_string(),
            },
            receipts: ReceiptConfig {
                dir: None,
                renderer: RendererKind::Wkhtmltopdf,
                wkhtmltopdf_path: PathBuf::from(DEFAULT_WKHTMLTOPDF),
                ttl_hours: DEFAULT_RECEIPT_TTL_HOURS,
            },
            card_issuance_attempts: DEFAULT_CARD_ISSUANCE_ATTEMPTS,
            password_hash_cost: None,
            opening_balance: DEFAULT_OPENING_BALANCE,
            session_idle_minutes: DEFAULT_SESSION_IDLE.as_secs() / 60,
        }
    }
}

impl AppConfig {
    /// Read the process environment. Call `dotenvy::dotenv()` first to pick
    /// up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let secret_key = match get("SECRET_KEY") {
            Some(key) => key,
            None => {
                warn!("SECRET_KEY not set; using insecure dev default");
                defaults.secret_key
            }
        };

        let bind_addr = match get("BIND_ADDR") {
            Some(raw) => raw
                .parse()
                .map_err(|e: std::net::AddrParseError| invalid("BIND_ADDR", &raw, e.to_string()))?,
            None => defaults.bind_addr,
        };

        let mail = MailConfig {
            server: get("MAIL_SERVER").unwrap_or(defaults.mail.server),
            port: parse_or("MAIL_PORT", get("MAIL_PORT"), defaults.mail.port)?,
            username: get("MAIL_USERNAME"),
            password: get("MAIL_PASSWORD"),
            contact_recipient: get("CONTACT_RECIPIENT").unwrap_or(defaults.mail.contact_recipient),
        };

        let renderer = match get("RECEIPT_RENDERER").as_deref() {
            None | Some("wkhtmltopdf") => RendererKind::Wkhtmltopdf,
            Some("html") => RendererKind::Html,
            Some(other) => {
                return Err(invalid("RECEIPT_RENDERER", other, "expected wkhtmltopdf or html"));
            }
        };
        let ttl_hours = parse_or("RECEIPT_TTL_HOURS", get("RECEIPT_TTL_HOURS"), defaults.receipts.ttl_hours)?;
        if ttl_hours <= 0 {
            return Err(invalid("RECEIPT_TTL_HOURS", &ttl_hours.to_string(), "must be positive"));
        }
        if ttl_hours > MAX_RECEIPT_TTL_HOURS {
            return Err(invalid("RECEIPT_TTL_HOURS", &ttl_hours.to_string(), "must be at most 100 years"));
        }
        let receipts = ReceiptConfig {
            dir: get("RECEIPT_DIR").map(PathBuf::from),
            renderer,
            wkhtmltopdf_path: get("WKHTMLTOPDF_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.receipts.wkhtmltopdf_path),
            ttl_hours,
        };

        let card_issuance_attempts = parse_or(
            "CARD_ISSUANCE_ATTEMPTS",
            get("CARD_ISSUANCE_ATTEMPTS"),
            defaults.card_issuance_attempts,
        )?;
        if card_issuance_attempts == 0 {
            return Err(invalid("CARD_ISSUANCE_ATTEMPTS", "0", "must be at least 1"));
        }

        let password_hash_cost = match get("PASSWORD_HASH_COST") {
            Some(raw) => {
                let cost: u32 = raw
                    .parse()
                    .map_err(|e: std::num::ParseIntError| invalid("PASSWORD_HASH_COST", &raw, e.to_string()))?;
                if !(MIN_COST..=31).contains(&cost) {
                    return Err(invalid("PASSWORD_HASH_COST", &raw, "must be between 4 and 31"));
                }
                Some(cost)
            }
            None => None,
        };

        let opening_balance = match get("OPENING_BALANCE") {
            Some(raw) => {
                let money = Money::parse(&raw).map_err(|e| invalid("OPENING_BALANCE", &raw, e.to_string()))?;
                if money.is_negative() {
                    return Err(invalid("OPENING_BALANCE", &raw, "must not be negative"));
                }
                money
            }
            None => defaults.opening_balance,
        };

        let session_idle_minutes = parse_or(
            "SESSION_IDLE_MINUTES",
            get("SESSION_IDLE_MINUTES"),
            defaults.session_idle_minutes,
        )?;
        if !(1..=MAX_SESSION_IDLE_MINUTES).contains(&session_idle_minutes) {
            return Err(invalid(
                "SESSION_IDLE_MINUTES",
                &session_idle_minutes.to_string(),
                "must be between 1 minute and 1 year",
            ));
        }

        Ok(Self {
            secret_key,
            database_url: get("DATABASE_URL").or_else(|| get("DB_URI")),
            bind_addr,
            mail,
            receipts,
            card_issuance_attempts,
            password_hash_cost,
            opening_balance,
            session_idle_minutes,
        })
    }
}

fn parse_or<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw.parse().map_err(|e: T::Err| invalid(var, &raw, e.to_string())),
        None => Ok(default),
    }
}
