use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system.
///
/// `RUST_LOG` wins when set; otherwise `debug` in debug mode and `info` elsewhere.
pub fn init_logger(debug_mode: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(debug_mode)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .compact(),
        )
        .init();
}

fn default_directive(debug_mode: bool) -> &'static str {
    if debug_mode {
        "debug"
    } else {
        "info,tower_http=info"
    }
}
