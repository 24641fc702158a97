use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Diagnostics go to stderr so the terminal summary on stdout stays clean.
/// `RUST_LOG` wins over the configured level; `-v`/`-vv` win over both.
pub fn init_logging(configured_level: &str, verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => configured_level,
        1 => "debug",
        _ => "trace",
    };

    let subscriber = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("{level},hyper=warn,reqwest=warn"))),
        )
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        );

    subscriber.init();

    Ok(())
}
