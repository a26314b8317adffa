//! Tracing setup for binaries and integration harnesses.

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `debug` when verbose, `info`
/// otherwise. Call once at process start.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}
