use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .map_or(default, |v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
}

/// Install the global subscriber. Logs go to stderr so stdout stays JSON.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("ATTENDANCE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if env_bool("ATTENDANCE_LOG_JSON", false) {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
