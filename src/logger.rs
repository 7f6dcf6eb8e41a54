use tracing::info;
use tracing_subscriber::{prelude::*, fmt, EnvFilter};

// Install a default log subscriber for embedders that have none of
// their own. "RUST_LOG" overrides the default level. Returns false if
// a subscriber was already installed, so calling twice is harmless.
pub fn init_logging() -> bool {
    let level = if cfg!(debug_assertions) { "trace" } else { "info" };

    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => {
            info!("\"RUST_LOG\" variable not set, defaulting to {level}");
            EnvFilter::new(level)
        }
    };

    let fmt_layer = fmt::layer();

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()
        .is_ok()
}
