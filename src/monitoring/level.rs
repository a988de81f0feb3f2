/*!
 * Log Levels
 *
 * Numeric levels used by finalization diagnostics and their mapping
 * onto tracing levels.
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::level_filters::LevelFilter;
use tracing::Level;

/// Diagnostic level, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum LogLevel {
    NotSet = 0,
    SubDebug = 5,
    Debug = 10,
    Info = 20,
    SubWarning = 25,
    Warning = 30,
}

impl LogLevel {
    #[inline]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Closest tracing level
    pub const fn as_tracing(self) -> Level {
        match self {
            LogLevel::NotSet | LogLevel::SubDebug => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info | LogLevel::SubWarning => Level::INFO,
            LogLevel::Warning => Level::WARN,
        }
    }

    /// Threshold filter admitting this level and everything above it
    pub fn as_filter(self) -> LevelFilter {
        LevelFilter::from_level(self.as_tracing())
    }
}

impl TryFrom<u8> for LogLevel {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(LogLevel::NotSet),
            5 => Ok(LogLevel::SubDebug),
            10 => Ok(LogLevel::Debug),
            20 => Ok(LogLevel::Info),
            25 => Ok(LogLevel::SubWarning),
            30 => Ok(LogLevel::Warning),
            other => Err(other),
        }
    }
}

/// Dispatch a message at a numeric level
///
/// ```ignore
/// log(LogLevel::SubWarning, format_args!("retrying {} after {:?}", path.display(), delay));
/// ```
pub fn log(level: LogLevel, message: fmt::Arguments<'_>) {
    match level {
        LogLevel::NotSet | LogLevel::SubDebug => {
            tracing::trace!(numeric_level = level.value(), "{}", message)
        }
        LogLevel::Debug => tracing::debug!("{}", message),
        LogLevel::Info => tracing::info!("{}", message),
        LogLevel::SubWarning => tracing::info!(subwarning = true, "{}", message),
        LogLevel::Warning => tracing::warn!("{}", message),
    }
}
