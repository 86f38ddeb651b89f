//! Tracing setup: human-readable output for local runs, one JSON object per
//! line in release builds so the log collector can index fields.

use tracing_subscriber::EnvFilter;

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if cfg!(debug_assertions) {
        builder.init();
    } else {
        builder.json().flatten_event(true).init();
    }
}
