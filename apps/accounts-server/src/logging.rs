use anyhow::{Context, Result};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LoggingConfig};

/// Install the global subscriber.
///
/// `RUST_LOG`, when set and valid, replaces the configured filter. Output
/// goes to stderr so `--print-config` and `check` keep stdout clean.
///
/// # Errors
/// Returns an error if a configured directive does not parse or a global
/// subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_filter(config)?,
    };

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(std::io::stderr)
            .with_timer(UtcTime::rfc_3339())
            .with_target(true)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_timer(UtcTime::rfc_3339())
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(layer.with_filter(filter));

    tracing_log::LogTracer::init().context("failed to bridge `log` records")?;
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install tracing subscriber")?;
    Ok(())
}

/// Level plus extra directives, as configured.
///
/// # Errors
/// Returns an error naming the first directive that does not parse.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let mut filter = EnvFilter::try_new(&config.level)
        .with_context(|| format!("invalid logging.level '{}'", config.level))?;
    for directive in &config.directives {
        let parsed = directive
            .parse()
            .with_context(|| format!("invalid logging directive '{directive}'"))?;
        filter = filter.add_directive(parsed);
    }
    Ok(filter)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn default_filter_builds() {
        let filter = build_filter(&LoggingConfig::default()).unwrap();
        let rendered = filter.to_string();
        assert!(rendered.contains("info"), "{rendered}");
        assert!(rendered.contains("hyper=warn"), "{rendered}");
    }

    #[test]
    fn bad_directive_is_reported() {
        let config = LoggingConfig {
            directives: vec!["accounts=loud".to_owned()],
            ..LoggingConfig::default()
        };
        let err = build_filter(&config).unwrap_err();
        assert!(err.to_string().contains("accounts=loud"), "{err}");
    }
}
