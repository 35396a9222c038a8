// Initializes the tracing subscriber for the CLI binary.

use std::env;
use std::io::IsTerminal;

use tracing_subscriber::fmt::format::FmtSpan;

use s3backup_rs::config::TracingConfig;

const EVENT_FILTER_ENV_VAR: &str = "RUST_LOG";

pub fn init_tracing(config: &TracingConfig) {
    let fmt_span = if config.span_events_tracing {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let subscriber_builder = tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .compact()
        .with_ansi(!config.disable_color_tracing && std::io::stdout().is_terminal())
        .with_span_events(fmt_span);

    let (event_filter, show_target) = event_filter(config, env::var(EVENT_FILTER_ENV_VAR).ok());

    let subscriber_builder = subscriber_builder
        .with_env_filter(event_filter)
        .with_target(show_target);
    if config.json_tracing {
        subscriber_builder.json().init();
    } else {
        subscriber_builder.init();
    }
}

/// Filter directive and whether event targets are shown.
///
/// AWS SDK tracing wins over `RUST_LOG`; without either only the crate's own
/// events pass.
fn event_filter(config: &TracingConfig, rust_log: Option<String>) -> (String, bool) {
    let tracing_level = config.tracing_level;
    if config.aws_sdk_tracing {
        return (
            format!(
                "s3backup_rs={tracing_level},s3backup={tracing_level},aws_smithy_runtime={tracing_level},aws_config={tracing_level},aws_sigv4={tracing_level}"
            ),
            true,
        );
    }

    match rust_log {
        Some(filter) => (filter, true),
        None => (
            format!("s3backup_rs={tracing_level},s3backup={tracing_level}"),
            false,
        ),
    }
}
