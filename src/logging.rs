use tracing_subscriber::EnvFilter;

/// Initialize tracing once for the daemon. `RUST_LOG` wins when set;
/// otherwise everything at info and up.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
