//! # ringlog
//!
//! A rotating, deduplicating log writer meant to be embedded in a host process.
//!
//! ## Features
//!
//! - **Severity gating**: a threshold the host can change at runtime
//! - **Repeat collapsing**: runs of identical messages become one
//!   `last message repeated N times` line
//! - **Ring rotation**: a fixed number of size-capped files reused round-robin
//! - **Thread safe**: every call is serialized through one critical section
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ringlog::{RingLogConfig, Severity, UserLog};
//!
//! fn main() -> ringlog::Result<()> {
//!     let log = UserLog::standalone(RingLogConfig::default())?;
//!     log.log(Severity::Warning, format_args!("disk {} is {}% full\n", "sda", 93));
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod dedup;
pub mod host;
pub mod layer;
pub mod prefix;
pub mod rotation;
pub mod severity;
pub mod writer;

#[cfg(test)]
mod tests;

pub use clock::{Clock, SystemClock};
pub use config::RingLogConfig;
pub use host::{initialize, ExtensionLogger, Host, LevelCallback};
pub use layer::UserLogLayer;
pub use severity::{Severity, SeverityGate};
pub use writer::{UserLog, WriterStats};

/// Longest rendered message body, in bytes. Longer bodies are cut silently.
pub const MAX_MESSAGE_LEN: usize = 2048;

/// Result type for ringlog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while setting up or writing the log ring
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Initialization failed: {message}")]
    Init { message: String },

    #[error("Log rotation error: {message}")]
    Rotation { message: String },

    #[error("Log file unavailable: {path}")]
    Unavailable { path: String },

    #[error("Host registration error: {message}")]
    Registration { message: String },
}

/// Cut `text` to at most `max` bytes without splitting a UTF-8 sequence.
pub(crate) fn truncate_to_boundary(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let mut cut = max;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
}
