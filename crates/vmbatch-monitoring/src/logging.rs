//! Structured logging module using tracing.
//!
//! Events go to stderr: one line per event by default, pretty-printed on
//! request, or as JSON for log aggregation.

use anyhow::Context;
use std::io;
use tracing::{info, Subscriber};
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    prelude::*,
    registry::LookupSpan,
    EnvFilter, Layer,
};

use crate::{LogFormat, MonitoringConfig};

/// Build the filter, `RUST_LOG` takes precedence over the configured one
pub fn env_filter(config: &MonitoringConfig) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.log_filter)
            .with_context(|| format!("Invalid log filter: {}", config.log_filter)),
    }
}

/// Single-line layer used for the default `text` format
pub fn text_layer<S, W>(make_writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    fmt::layer().with_target(true).with_writer(make_writer)
}

/// Initialize structured logging
pub fn init_logging(config: &MonitoringConfig) -> anyhow::Result<()> {
    let filter = env_filter(config)?;

    let (text, pretty, json) = match config.log_format {
        LogFormat::Text => (Some(text_layer(io::stderr)), None, None),
        LogFormat::Pretty => (
            None,
            Some(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_writer(io::stderr),
            ),
            None,
        ),
        LogFormat::Json => (
            None,
            None,
            Some(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(io::stderr),
            ),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(pretty)
        .with(json)
        .try_init()
        .context("Failed to set global default subscriber")?;

    info!(
        log_format = ?config.log_format,
        log_filter = %config.log_filter,
        "Logging initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing::{error, info_span};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn lines(&self) -> Vec<String> {
            String::from_utf8(self.0.lock().unwrap().clone())
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    #[test]
    fn test_text_format_writes_one_line_per_event() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::registry().with(text_layer(move || writer.clone()));

        tracing::subscriber::with_default(subscriber, || {
            error!("VM web01: resolve_template failed: template rhel9 not found");
            let span = info_span!("provision", vm = "db01");
            let _entered = span.enter();
            error!("VM db01: start_vm failed: request rejected with status 409: Cannot run VM");
        });

        let lines = captured.lines();
        assert_eq!(lines.len(), 2, "{:?}", lines);
        assert!(lines[0].contains("VM web01: resolve_template failed"));
        assert!(lines[1].contains("provision"));
        assert!(lines[1].contains("VM db01: start_vm failed"));
    }

    #[test]
    fn test_invalid_filter_is_rejected() {
        // RUST_LOG would shadow the configured filter.
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = MonitoringConfig {
            log_filter: "vmbatch=notalevel".to_string(),
            ..Default::default()
        };
        assert!(env_filter(&config).is_err());
    }

    #[test]
    fn test_second_init_fails() {
        let config = MonitoringConfig::default();
        init_logging(&config).unwrap();
        assert!(init_logging(&config).is_err());
    }
}
