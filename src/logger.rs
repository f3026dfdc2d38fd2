use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Environment variable consulted before `RUST_LOG`.
pub(crate) const LOG_ENV: &str = "MQTT_LOAD_LOG";

pub(crate) fn init_logging(verbose: bool, no_color: bool) {
    let filter = std::env::var(LOG_ENV)
        .or_else(|_err| std::env::var("RUST_LOG"))
        .map_or_else(
            |_err| EnvFilter::new(default_directive(verbose)),
            |value| {
                EnvFilter::try_new(value).unwrap_or_else(|_err| EnvFilter::new("info"))
            },
        );

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set global default subscriber: {}", err);
    }
}

const fn default_directive(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}
