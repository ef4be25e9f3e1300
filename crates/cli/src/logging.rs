//! Logger setup for the binary.

use std::sync::Once;

/// Logger configuration.
///
/// `filter` follows the `env_logger` filter syntax (e.g. "debug",
/// "eglframe_core=trace"). When unset, `RUST_LOG` is consulted, then
/// `default_level`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter: Option<String>,
    pub default_level: log::LevelFilter,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: None,
            default_level: log::LevelFilter::Warn,
        }
    }
}

impl LoggingConfig {
    /// `--verbose` forces debug output for the eglframe crates regardless of
    /// `RUST_LOG`.
    pub fn verbose(verbose: bool) -> Self {
        Self {
            filter: verbose
                .then(|| "eglframe_core=debug,eglframe_snapshot=debug,eglframe=debug".into()),
            ..Self::default()
        }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once. Later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = config.filter {
            builder.filter_level(config.default_level);
            builder.parse_filters(&filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(config.default_level);
        }

        builder.init();
        log::debug!("logging initialized");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_warn_without_filter() {
        let config = LoggingConfig::default();
        assert!(config.filter.is_none());
        assert_eq!(config.default_level, log::LevelFilter::Warn);
    }

    #[test]
    fn verbose_sets_debug_filter() {
        let config = LoggingConfig::verbose(true);
        let filter = config.filter.unwrap();
        assert!(filter.contains("eglframe_core=debug"), "got: {filter}");
        assert!(LoggingConfig::verbose(false).filter.is_none());
    }

    #[test]
    fn init_logging_is_idempotent() {
        init_logging(LoggingConfig::default());
        init_logging(LoggingConfig::verbose(true));
    }
}
