//! Embedding the writer in a host process
//!
//! A toy host owns the global severity and the registered loggers, the same
//! role a server plays when it loads the writer as an extension.
//!
//! Run with: cargo run --example host_embedding

use ringlog::{initialize, ExtensionLogger, Host, LevelCallback, RingLogConfig, Severity};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

struct ToyHost {
    level: Mutex<Severity>,
    loggers: Mutex<Vec<Arc<dyn ExtensionLogger>>>,
    callbacks: Mutex<Vec<LevelCallback>>,
}

impl ToyHost {
    fn set_level(&self, level: Severity) {
        *self.level.lock().unwrap() = level;
        for callback in self.callbacks.lock().unwrap().iter() {
            callback(self);
        }
    }

    fn log(&self, severity: Severity, message: &str) {
        for logger in self.loggers.lock().unwrap().iter() {
            logger.log(severity, format_args!("{}\n", message));
        }
    }
}

impl Host for ToyHost {
    fn log_level(&self) -> Severity {
        *self.level.lock().unwrap()
    }

    fn register_logger(&self, logger: Arc<dyn ExtensionLogger>) -> bool {
        self.loggers.lock().unwrap().push(logger);
        true
    }

    fn register_level_callback(&self, callback: LevelCallback) {
        self.callbacks.lock().unwrap().push(callback);
    }
}

fn main() -> ringlog::Result<()> {
    let host = ToyHost {
        level: Mutex::new(Severity::Warning),
        loggers: Mutex::new(Vec::new()),
        callbacks: Mutex::new(Vec::new()),
    };

    let config = RingLogConfig {
        log_dir: PathBuf::from("./example_logs"),
        ..RingLogConfig::default()
    };
    let writer = initialize(&host, &config)?;

    host.log(Severity::Info, "not written, below warning");
    for _ in 0..5 {
        host.log(Severity::Error, "upstream connection refused");
    }
    host.log(Severity::Warning, "upstream reconnected");

    host.set_level(Severity::Debug);
    host.log(Severity::Debug, "now visible");

    let stats = writer.stats();
    println!(
        "wrote {} lines, {} repeat summaries, active slot {}",
        stats.lines_written, stats.repeat_summaries, stats.active_slot
    );

    Ok(())
}
