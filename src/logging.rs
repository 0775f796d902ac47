//! `env_logger` setup for applications embedding the engine.

use env_logger::Env;

/// Installs a logger honoring `RUST_LOG`, defaulting to `info`.
/// Safe to call more than once.
pub fn init() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
