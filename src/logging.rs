use std::sync::Once;

/// Install the `env_logger` backend for the plugin.
///
/// The host loads the driver without setting up a logger, so the entry point
/// does it. `RUST_LOG` overrides the default `info` filter. Safe to call
/// repeatedly; an already-installed logger is left alone.
pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let env = env_logger::Env::default().default_filter_or("info");
        if env_logger::Builder::from_env(env).try_init().is_err() {
            log::debug!("Logger already installed, keeping it");
        }
    });
}
