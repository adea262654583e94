//! Installs a `tracing` subscriber for hosts that do not bring their own.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::{
    config::{LogStyle, LoggingConfig},
    errors::ConfigError,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Installs the global subscriber. Fails if the filter is invalid or a subscriber is already set.
pub fn init(config: &LoggingConfig) -> Result<(), ConfigError> {
    let env_filter = EnvFilter::try_new(&config.filter)?;

    tracing_subscriber::registry()
        .with(log_format(config.style))
        .with(env_filter)
        .try_init()?;

    tracing::debug!(style = %config.style, filter = %config.filter, "installed log subscriber");

    Ok(())
}

fn log_format(style: LogStyle) -> BoxedLayer {
    let layer = tracing_subscriber::fmt::layer();

    match style {
        LogStyle::Pretty => layer.pretty().boxed(),
        LogStyle::Text => layer.boxed(),
        LogStyle::Json => layer.json().boxed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_filter() {
        let config = LoggingConfig {
            filter: "graph_client=loud".to_string(),
            style: LogStyle::Text,
        };

        assert!(matches!(init(&config), Err(ConfigError::LogFilter(_))));
    }

    #[test]
    fn init_once() {
        let config = LoggingConfig {
            filter: "debug".to_string(),
            style: LogStyle::Json,
        };

        assert!(init(&config).is_ok());
        assert!(matches!(init(&config), Err(ConfigError::Logging(_))));
    }
}
