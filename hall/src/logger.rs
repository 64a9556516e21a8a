#[cfg(not(feature = "console"))]
pub fn init(debug: bool) {
    use tracing_subscriber::EnvFilter;

    // RUST_LOG wins over --debug
    let fallback = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with_target(false)
        .compact()
        .init();
}

/// Task-level introspection through tokio-console; needs `--cfg tokio_unstable`.
#[cfg(feature = "console")]
pub fn init(_debug: bool) {
    console_subscriber::init();
}
