use tracing_subscriber::EnvFilter;

/// Without `RUST_LOG`, this crate logs at info and everything else at warn.
/// A set `RUST_LOG` is used unchanged.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with_target(false)
        .init();
}

fn env_filter(rust_log: Option<&str>) -> EnvFilter {
    match rust_log.filter(|s| !s.trim().is_empty()) {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::new("warn,collector_service=info"),
    }
}
