use crate::config::LoggingConfig;
use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the logging system based on configuration.
///
/// CLI verbosity flags override the configured level; RUST_LOG overrides
/// everything.
pub fn init_logging(config: &LoggingConfig, cli_verbose: u8) -> Result<()> {
    let log_level: &str = if cli_verbose > 0 {
        match cli_verbose {
            1 => "debug",
            _ => "trace",
        }
    } else {
        &config.level
    };

    let filter = EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("geoproof={}", log_level)),
    );
    let subscriber = tracing_subscriber::registry().with(filter);

    match config.format.as_str() {
        "json" => {
            let json_layer = fmt::layer().json().with_current_span(true);
            subscriber.with(json_layer).init();
        }
        "compact" => {
            let compact_layer = fmt::layer()
                .compact()
                .with_target(false)
                .with_line_number(false)
                .with_file(false);
            subscriber.with(compact_layer).init();
        }
        _ => {
            // Default "pretty" format; source locations only at debug levels.
            let show_location = matches!(log_level, "debug" | "trace");
            let pretty_layer = fmt::layer()
                .with_target(show_location)
                .with_line_number(show_location)
                .with_file(show_location);
            subscriber.with(pretty_layer).init();
        }
    }

    Ok(())
}
