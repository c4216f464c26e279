use tracing_subscriber::{
    EnvFilter, fmt, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

const CRATE_TARGET: &str = "nalo_sync";

fn default_directives(verbose: bool) -> String {
    if verbose {
        format!("warn,{CRATE_TARGET}=debug")
    } else {
        "off".to_string()
    }
}

/// Sets up tracing on stderr, leaving stdout to the tables. `RUST_LOG` wins over `verbose`.
pub fn init_logging(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .pretty()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(env_filter)
        .init();
}
