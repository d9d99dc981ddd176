use tracing_subscriber::EnvFilter;

/// Install the stderr tracing subscriber.
///
/// The filter comes from `SHELF_LOG`, then `RUST_LOG`, and defaults to
/// `warn` so best-effort failures are visible without extra noise. Calling
/// this more than once is harmless.
pub fn init_logging() {
    let directives = std::env::var("SHELF_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "warn".to_string());
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
