//! Severity levels and the threshold gate

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::Level;

/// Message severity, totally ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Severity {
    Debug = 0,
    Info = 1,
    Warning = 2,
    Error = 3,
    Fatal = 4,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Severity::Debug,
            1 => Severity::Info,
            2 => Severity::Warning,
            3 => Severity::Error,
            _ => Severity::Fatal,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "debug" | "detail" | "trace" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warn" | "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "fatal" => Ok(Severity::Fatal),
            other => Err(Error::Config {
                message: format!("Unknown severity '{}'", other),
            }),
        }
    }
}

impl From<Level> for Severity {
    fn from(level: Level) -> Self {
        match level {
            Level::TRACE | Level::DEBUG => Severity::Debug,
            Level::INFO => Severity::Info,
            Level::WARN => Severity::Warning,
            Level::ERROR => Severity::Error,
        }
    }
}

/// Holds the minimum severity that is persisted.
///
/// Reads are lock-free; a caller racing with an update may see the previous
/// threshold for one call.
#[derive(Debug)]
pub struct SeverityGate {
    threshold: AtomicU8,
}

impl SeverityGate {
    pub fn new(threshold: Severity) -> Self {
        Self {
            threshold: AtomicU8::new(threshold as u8),
        }
    }

    pub fn should_emit(&self, severity: Severity) -> bool {
        severity as u8 >= self.threshold.load(Ordering::Relaxed)
    }

    pub fn threshold(&self) -> Severity {
        Severity::from_u8(self.threshold.load(Ordering::Relaxed))
    }

    /// Store a new threshold, returning the previous one.
    pub fn set_threshold(&self, threshold: Severity) -> Severity {
        Severity::from_u8(self.threshold.swap(threshold as u8, Ordering::Relaxed))
    }
}
