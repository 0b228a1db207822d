//! Interfaces to the host process that loads the writer

use crate::{
    clock::{Clock, SystemClock},
    config::RingLogConfig,
    severity::Severity,
    writer::UserLog,
    Error, Result,
};
use std::fmt;
use std::sync::Arc;

/// Callback invoked by the host after its global severity changed
pub type LevelCallback = Box<dyn Fn(&dyn Host) + Send + Sync>;

/// A logger the host can route its messages to
pub trait ExtensionLogger: Send + Sync {
    fn name(&self) -> &str;

    fn log(&self, severity: Severity, args: fmt::Arguments<'_>);
}

/// What the writer needs from the host process
pub trait Host: Send + Sync {
    /// Current global severity threshold
    fn log_level(&self) -> Severity;

    /// Offer `logger` to the host; `false` means the host refused it.
    fn register_logger(&self, logger: Arc<dyn ExtensionLogger>) -> bool;

    fn register_level_callback(&self, callback: LevelCallback);
}

impl ExtensionLogger for UserLog {
    fn name(&self) -> &str {
        UserLog::name(self)
    }

    fn log(&self, severity: Severity, args: fmt::Arguments<'_>) {
        UserLog::log(self, severity, args)
    }
}

/// Open the writer and register it with `host`.
///
/// Failing to create the log directory or the first file is an
/// [`Error::Init`]; the host should refuse to load the extension.
pub fn initialize(host: &dyn Host, config: &RingLogConfig) -> Result<Arc<UserLog>> {
    initialize_with_clock(host, config, Arc::new(SystemClock))
}

pub fn initialize_with_clock(
    host: &dyn Host,
    config: &RingLogConfig,
    clock: Arc<dyn Clock>,
) -> Result<Arc<UserLog>> {
    let writer = Arc::new(UserLog::open(config, host.log_level(), clock)?);

    if !host.register_logger(Arc::clone(&writer) as Arc<dyn ExtensionLogger>) {
        return Err(Error::Registration {
            message: format!("host refused logger '{}'", writer.name()),
        });
    }

    let target = Arc::clone(&writer);
    host.register_level_callback(Box::new(move |host| {
        target.set_threshold(host.log_level());
    }));

    tracing::info!(
        ringlog.event = "extension_registered",
        name = writer.name(),
        threshold = %writer.threshold(),
        "Log writer registered with host"
    );

    Ok(writer)
}
