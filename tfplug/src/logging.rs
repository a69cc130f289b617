//! Logging setup for provider processes
//!
//! The host captures the plugin's stderr, so logs always go there; stdout is
//! reserved for the handshake line.

use crate::error::{Result, TfplugError};
use tracing_subscriber::EnvFilter;

/// Log level for the provider process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = TfplugError;

    /// Accepts the host's TF_LOG spellings, case-insensitively
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(TfplugError::Logging(format!("unknown log level: {}", other))),
        }
    }
}

/// Install a global fmt subscriber writing to stderr
///
/// Fails if a global subscriber was already installed.
pub fn init_logging(level: LogLevel) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level.as_filter()))
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|e| TfplugError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_level_names() {
        assert_eq!("TRACE".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::default().as_filter(), "info");
    }

    #[test]
    fn second_init_fails() {
        let _ = init_logging(LogLevel::Debug);
        assert!(init_logging(LogLevel::Debug).is_err());
    }
}
