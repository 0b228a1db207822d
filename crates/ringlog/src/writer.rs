//! Writer core: gate, collapse, prefix and append under one lock

use crate::{
    clock::{Clock, SystemClock},
    config::RingLogConfig,
    dedup::{DedupCollapser, Decision},
    prefix::PrefixFormatter,
    rotation::{RotationManager, SlotNaming},
    severity::{Severity, SeverityGate},
    truncate_to_boundary, Error, Result, MAX_MESSAGE_LEN,
};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Identity the writer registers under
pub const LOGGER_NAME: &str = "userlog";

/// Counters kept alongside the ring, updated inside the critical section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Message lines appended (summary lines excluded)
    pub lines_written: u64,
    /// Bytes appended across all slots, summary lines included
    pub bytes_written: u64,
    /// `last message repeated N times` lines appended
    pub repeat_summaries: u64,
    pub rotations: u64,
    /// Lines lost because no usable file was open
    pub dropped_writes: u64,
    pub active_slot: usize,
}

struct WriterState {
    dedup: DedupCollapser,
    rotation: RotationManager,
    stats: WriterStats,
    drop_reported: bool,
}

impl WriterState {
    fn append(&mut self, line: &str, is_summary: bool) {
        match self.rotation.append(line.as_bytes()) {
            Ok(()) => self.record_written(line, is_summary),
            Err(e @ Error::Rotation { .. }) => {
                // The line itself landed before the next slot failed to open
                self.record_written(line, is_summary);
                report_failure(&e);
            }
            Err(e) => {
                self.stats.dropped_writes += 1;
                if !self.drop_reported {
                    self.drop_reported = true;
                    report_failure(&e);
                }
            }
        }
    }

    fn record_written(&mut self, line: &str, is_summary: bool) {
        if is_summary {
            self.stats.repeat_summaries += 1;
        } else {
            self.stats.lines_written += 1;
        }
        self.stats.bytes_written += line.len() as u64;
    }
}

/// The rotating, deduplicating writer.
///
/// All shared state sits behind a single mutex. The severity check and the
/// rendering of the caller's arguments happen before the lock is taken.
pub struct UserLog {
    gate: SeverityGate,
    prefix: PrefixFormatter,
    clock: Arc<dyn Clock>,
    state: Mutex<WriterState>,
}

impl UserLog {
    /// Create the directory and slot 0, starting at `threshold`.
    pub fn open(config: &RingLogConfig, threshold: Severity, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let rotation = RotationManager::open(
            SlotNaming::new(&config.log_dir, &config.base_name),
            config.slot_count,
            config.max_file_size_bytes,
            Arc::clone(&clock),
        )?;

        let dedup = if config.dedup_enabled {
            DedupCollapser::new()
        } else {
            DedupCollapser::disabled()
        };

        tracing::debug!(
            ringlog.event = "writer_opened",
            log_dir = %config.log_dir.display(),
            slot_count = config.slot_count,
            max_file_size_bytes = config.max_file_size_bytes,
            threshold = %threshold,
            "Rotating log writer opened"
        );

        Ok(Self {
            gate: SeverityGate::new(threshold),
            prefix: PrefixFormatter::new(config.process_tag.clone()),
            clock,
            state: Mutex::new(WriterState {
                dedup,
                rotation,
                stats: WriterStats::default(),
                drop_reported: false,
            }),
        })
    }

    /// Open a writer that is not attached to a host.
    pub fn standalone(config: RingLogConfig) -> Result<Self> {
        Self::open(&config, config.threshold, Arc::new(SystemClock))
    }

    pub fn name(&self) -> &'static str {
        LOGGER_NAME
    }

    /// Log a printf-style message. Failures never reach the caller.
    pub fn log(&self, severity: Severity, args: fmt::Arguments<'_>) {
        if !self.gate.should_emit(severity) {
            return;
        }

        let mut body = String::new();
        if fmt::write(&mut body, args).is_err() {
            // A Display impl failed; skip this call only
            return;
        }

        self.write_body(body);
    }

    /// Log an already rendered message.
    pub fn log_str(&self, severity: Severity, message: &str) {
        if !self.gate.should_emit(severity) {
            return;
        }
        self.write_body(message.to_owned());
    }

    pub fn threshold(&self) -> Severity {
        self.gate.threshold()
    }

    /// Replace the threshold; takes effect on the next call.
    pub fn set_threshold(&self, threshold: Severity) {
        let previous = self.gate.set_threshold(threshold);
        if previous != threshold {
            tracing::debug!(
                ringlog.event = "threshold_changed",
                from = %previous,
                to = %threshold,
                "Severity threshold changed"
            );
        }
    }

    /// Write a pending repeat summary now rather than on the next different
    /// message.
    pub fn flush_repeats(&self) {
        let mut state = self.lock_state();
        if let Some(summary) = state.dedup.take_pending() {
            state.append(&summary, true);
        }
    }

    pub fn stats(&self) -> WriterStats {
        let state = self.lock_state();
        WriterStats {
            rotations: state.rotation.rotations(),
            active_slot: state.rotation.active_index(),
            ..state.stats.clone()
        }
    }

    /// Whether the active slot still has an open handle.
    pub fn is_available(&self) -> bool {
        self.lock_state().rotation.is_available()
    }

    fn write_body(&self, mut body: String) {
        truncate_to_boundary(&mut body, MAX_MESSAGE_LEN);

        let mut state = self.lock_state();
        let prefix = self.prefix.format_prefix(&self.clock.now());

        match state.dedup.observe(prefix, &body) {
            Decision::Absorbed => {}
            Decision::Emit { summary, line } => {
                if let Some(summary) = summary {
                    state.append(&summary, true);
                }
                state.append(&line, false);
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, WriterState> {
        // A panicking caller must not disable logging for everyone else
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn report_failure(error: &Error) {
    eprintln!("ringlog: {}", error);
    tracing::error!(
        ringlog.event = "write_failed",
        error = %error,
        "Log write failed"
    );
}
