use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_ONCE: OnceLock<()> = OnceLock::new();
const DEFAULT_FILTER: &str = "info";

/// Install the global tracing subscriber (idempotent, safe to call repeatedly).
///
/// Honours `RUST_LOG`; falls back to `info`.
pub fn init_logging() {
    LOGGER_ONCE.get_or_init(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_writer(std::io::stderr)
            .with_filter(env_filter);

        // Another subscriber may already be installed (tests, embedding apps).
        let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
    });
}
