//! Process-wide tracing/logging setup.

pub mod subscriber;

pub use subscriber::LogFormat;

/// Initialize tracing with JSON output and `RUST_LOG` filtering
/// (default `info`).
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    subscriber::init(LogFormat::from_env(), "info");
}
