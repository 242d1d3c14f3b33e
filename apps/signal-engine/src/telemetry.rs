//! Tracing Setup
//!
//! Console logging with env-filter support.
//!
//! # Configuration
//!
//! - `RUST_LOG`: Log level filter (default: `info`)
//! - `NODE_ENV`: Set to `development` for ANSI colors and terse targets

use tracing_subscriber::EnvFilter;

/// Initialize console tracing.
///
/// Safe to call once at process start. Subsequent calls are ignored.
pub fn init() {
    let is_development = std::env::var("NODE_ENV")
        .map(|v| v == "development")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(!is_development)
        .with_ansi(is_development)
        .try_init();
}
