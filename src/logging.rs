//! Logging setup
//!
//! The binary installs one `tracing` subscriber from a [`LogConfig`];
//! library code only emits events.

use std::io::IsTerminal;

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Level names accepted on the command line
pub const LEVEL_NAMES: [&str; 6] = ["debug", "info", "warning", "warn", "error", "critical"];

/// Logging settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    pub level: Level,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: Level::WARN }
    }
}

impl LogConfig {
    /// Build from a level name, case-insensitive. `critical` maps to error.
    pub fn from_name(name: &str) -> Option<Self> {
        let level = match name.to_ascii_lowercase().as_str() {
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warning" | "warn" => Level::WARN,
            "error" | "critical" => Level::ERROR,
            _ => return None,
        };
        Some(Self { level })
    }

    /// Filter used when `RUST_LOG` is not set
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::new(self.level.as_str().to_ascii_lowercase())
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| config.filter());

    // A second initialization (tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names() {
        assert_eq!(LogConfig::from_name("DEBUG").unwrap().level, Level::DEBUG);
        assert_eq!(LogConfig::from_name("warning").unwrap().level, Level::WARN);
        assert_eq!(LogConfig::from_name("critical").unwrap().level, Level::ERROR);
        assert!(LogConfig::from_name("verbose").is_none());
        assert_eq!(LogConfig::default().level, Level::WARN);
    }

    #[test]
    fn test_every_listed_name_parses() {
        for name in LEVEL_NAMES {
            assert!(LogConfig::from_name(name).is_some(), "{}", name);
        }
    }

    #[test]
    fn test_filter_renders_level() {
        let config = LogConfig::from_name("info").unwrap();
        assert_eq!(config.filter().to_string(), "info");
    }
}
