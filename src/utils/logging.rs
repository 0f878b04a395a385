use std::env;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Initialize the logging system from the `RUST_LOG` environment variable,
/// defaulting to `info`
pub fn init_logging() {
    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    // Keep stdout free for command output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .init();
}

/// Create a span tracking one Cloudflare API call
pub fn api_call_span(resource: &str) -> tracing::Span {
    tracing::info_span!(
        "api_call",
        request_id = %Uuid::new_v4(),
        resource = %resource,
    )
}
