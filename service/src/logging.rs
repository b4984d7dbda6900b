use crate::config::Config;
use log::LevelFilter;
use simplelog::{self, ConfigBuilder, SharedLogger};
use std::fs::OpenOptions;

/// Modules to filter out from logging when not in Trace mode.
/// These are typically verbose dependencies that clutter normal log output.
const FILTERED_MODULES: &[&str] = &["hyper", "reqwest", "rustls", "h2", "tower", "axum"];

pub struct Logger {}

impl Logger {
    /// Initializes the global logger with configuration based on the provided Config.
    ///
    /// When the log level is set to Trace, all logs including dependency logs are shown.
    /// For all other log levels, verbose dependency logs are filtered out.
    /// When `log_file` is configured, a file logger with the same settings is combined
    /// with the terminal logger; an unopenable file is reported and skipped.
    pub fn init_logger(config: &Config) {
        let log_level_filter = Self::convert_level_filter(config.log_level_filter);
        let apply_filters = Self::should_filter_dependencies(config.log_level_filter);

        let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
        loggers.push(simplelog::TermLogger::new(
            log_level_filter,
            Self::build_log_config(apply_filters),
            simplelog::TerminalMode::Mixed,
            simplelog::ColorChoice::Auto,
        ));

        let mut file_error = None;
        if let Some(path) = &config.log_file {
            match OpenOptions::new().create(true).append(true).open(path) {
                Ok(file) => loggers.push(simplelog::WriteLogger::new(
                    log_level_filter,
                    Self::build_log_config(apply_filters),
                    file,
                )),
                Err(e) => file_error = Some(format!("{}: {}", path.display(), e)),
            }
        }

        simplelog::CombinedLogger::init(loggers).expect("Failed to start simplelog");

        if let Some(err) = file_error {
            log::warn!("Could not open log file {}, logging to terminal only", err);
        }
    }

    /// Converts log::LevelFilter to simplelog::LevelFilter.
    fn convert_level_filter(level: LevelFilter) -> simplelog::LevelFilter {
        match level {
            LevelFilter::Off => simplelog::LevelFilter::Off,
            LevelFilter::Error => simplelog::LevelFilter::Error,
            LevelFilter::Warn => simplelog::LevelFilter::Warn,
            LevelFilter::Info => simplelog::LevelFilter::Info,
            LevelFilter::Debug => simplelog::LevelFilter::Debug,
            LevelFilter::Trace => simplelog::LevelFilter::Trace,
        }
    }

    /// Determines whether dependency logging should be filtered.
    ///
    /// Returns `false` for Trace level (show all logs), `true` for all other levels.
    fn should_filter_dependencies(level: LevelFilter) -> bool {
        level != LevelFilter::Trace
    }

    /// Builds a simplelog Config with optional module filtering.
    ///
    /// When `apply_filters` is true, logs from noisy dependencies are suppressed.
    fn build_log_config(apply_filters: bool) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        if apply_filters {
            for module in FILTERED_MODULES {
                builder.add_filter_ignore_str(module);
            }
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filtered_modules_contains_expected_dependencies() {
        assert!(
            FILTERED_MODULES.contains(&"reqwest"),
            "reqwest should be filtered"
        );
        assert!(
            FILTERED_MODULES.contains(&"rustls"),
            "rustls should be filtered"
        );
        assert!(
            FILTERED_MODULES.contains(&"tower"),
            "tower should be filtered"
        );
        assert!(
            FILTERED_MODULES.contains(&"hyper"),
            "hyper should be filtered"
        );
        assert!(
            FILTERED_MODULES.contains(&"axum"),
            "axum should be filtered"
        );
    }

    #[test]
    fn test_should_filter_dependencies_trace_level_disables_filtering() {
        assert!(
            !Logger::should_filter_dependencies(LevelFilter::Trace),
            "Trace level should disable filtering"
        );
    }

    #[test]
    fn test_should_filter_dependencies_other_levels_enable_filtering() {
        for level in [
            LevelFilter::Off,
            LevelFilter::Error,
            LevelFilter::Warn,
            LevelFilter::Info,
            LevelFilter::Debug,
        ] {
            assert!(
                Logger::should_filter_dependencies(level),
                "{} level should enable filtering",
                level
            );
        }
    }

    #[test]
    fn test_build_log_config_with_and_without_filters() {
        let _filtered = Logger::build_log_config(true);
        let _unfiltered = Logger::build_log_config(false);
    }

    #[test]
    fn test_convert_level_filter_preserves_level() {
        assert_eq!(
            Logger::convert_level_filter(LevelFilter::Warn),
            simplelog::LevelFilter::Warn
        );
        assert_eq!(
            Logger::convert_level_filter(LevelFilter::Trace),
            simplelog::LevelFilter::Trace
        );
    }
}
