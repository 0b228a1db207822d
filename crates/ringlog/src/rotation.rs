//! Fixed ring of size-capped log files

use crate::clock::Clock;
use crate::{Error, Result};
use chrono::{Datelike, NaiveDate};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Builds `<dir>/<base><index>_<year>_<month>_<day>.log` paths.
#[derive(Debug, Clone)]
pub struct SlotNaming {
    log_dir: PathBuf,
    base_name: String,
}

impl SlotNaming {
    pub fn new(log_dir: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            log_dir: log_dir.into(),
            base_name: base_name.into(),
        }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn path_for(&self, index: usize, date: NaiveDate) -> PathBuf {
        self.log_dir.join(format!(
            "{}{}_{}_{}_{}.log",
            self.base_name,
            index,
            date.year(),
            date.month(),
            date.day()
        ))
    }

    /// Recover the slot index from a file name produced by [`path_for`].
    ///
    /// [`path_for`]: SlotNaming::path_for
    pub fn slot_of(&self, file_name: &str) -> Option<usize> {
        let rest = file_name.strip_prefix(&self.base_name)?;
        let rest = rest.strip_suffix(".log")?;
        let (index, _date) = rest.split_once('_')?;
        index.parse().ok()
    }
}

/// One position in the ring.
///
/// `path` is `None` until the slot is first used by this process.
#[derive(Debug, Clone)]
pub struct LogFileSlot {
    pub index: usize,
    pub path: Option<PathBuf>,
    pub bytes_written: u64,
}

/// Owns the active file handle and rotates through the slots round-robin.
///
/// The handle is either open on the active slot or `None` after a failed
/// rotation. A `None` handle is not reopened; every append is dropped until
/// the manager is rebuilt.
pub struct RotationManager {
    naming: SlotNaming,
    max_file_size: u64,
    slots: Vec<LogFileSlot>,
    active_index: usize,
    active_handle: Option<File>,
    clock: Arc<dyn Clock>,
    rotations: u64,
}

impl RotationManager {
    /// Ensure the directory exists and create slot 0.
    pub fn open(
        naming: SlotNaming,
        slot_count: usize,
        max_file_size: u64,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if slot_count == 0 {
            return Err(Error::Config {
                message: "slot_count must be greater than 0".to_string(),
            });
        }

        fs::create_dir_all(naming.log_dir()).map_err(|e| Error::Init {
            message: format!(
                "can't make log directory {}: {}",
                naming.log_dir().display(),
                e
            ),
        })?;

        let first = naming.path_for(0, clock.now().date_naive());
        let handle = File::create(&first).map_err(|e| Error::Init {
            message: format!("can't make log file {}: {}", first.display(), e),
        })?;

        let mut slots: Vec<LogFileSlot> = (0..slot_count)
            .map(|index| LogFileSlot {
                index,
                path: None,
                bytes_written: 0,
            })
            .collect();
        slots[0].path = Some(first.clone());

        tracing::debug!(
            ringlog.event = "log_file_opened",
            file_path = %first.display(),
            slot = 0,
            "Log file opened"
        );

        Ok(Self {
            naming,
            max_file_size,
            slots,
            active_index: 0,
            active_handle: Some(handle),
            clock,
            rotations: 0,
        })
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn active_slot(&self) -> &LogFileSlot {
        &self.slots[self.active_index]
    }

    pub fn slots(&self) -> &[LogFileSlot] {
        &self.slots
    }

    pub fn is_available(&self) -> bool {
        self.active_handle.is_some()
    }

    pub fn rotations(&self) -> u64 {
        self.rotations
    }

    /// Append `bytes` to the active slot and rotate once it reaches the cap.
    ///
    /// A rotation error means the bytes were written but the next slot could
    /// not be opened.
    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        let Some(file) = self.active_handle.as_mut() else {
            return Err(Error::Unavailable {
                path: self.active_path_display(),
            });
        };

        let slot = &mut self.slots[self.active_index];
        let written = write_counted(file, bytes, &mut slot.bytes_written);
        let reached_cap = slot.bytes_written >= self.max_file_size;

        // A short write still counts toward the cap
        if reached_cap {
            self.rotate()?;
        }

        written.map_err(Error::from)
    }

    fn rotate(&mut self) -> Result<()> {
        // Close current file
        self.active_handle = None;

        self.active_index = (self.active_index + 1) % self.slots.len();
        let index = self.active_index;

        // Keep the total number of files fixed
        if let Some(stale) = self.slots[index].path.take() {
            if let Err(e) = fs::remove_file(&stale) {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(
                        ringlog.event = "stale_slot_not_removed",
                        file_path = %stale.display(),
                        error = %e,
                        "Failed to remove previous slot file"
                    );
                }
            }
        }

        let path = self.naming.path_for(index, self.clock.now().date_naive());
        let slot = &mut self.slots[index];
        slot.bytes_written = 0;
        slot.path = Some(path.clone());

        let file = File::create(&path).map_err(|e| Error::Rotation {
            message: format!("can't open user log file {}: {}", path.display(), e),
        })?;
        self.active_handle = Some(file);
        self.rotations += 1;

        tracing::debug!(
            ringlog.event = "slot_rotated",
            slot = index,
            file_path = %path.display(),
            "Log slot rotated"
        );

        Ok(())
    }

    fn active_path_display(&self) -> String {
        self.slots[self.active_index]
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }
}

/// Write all of `bytes`, adding every accepted chunk to `counter` even when a
/// later chunk fails.
fn write_counted<W: Write>(writer: &mut W, bytes: &[u8], counter: &mut u64) -> io::Result<()> {
    let mut remaining = bytes;
    while !remaining.is_empty() {
        match writer.write(remaining) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "failed to write whole log line",
                ))
            }
            Ok(n) => {
                *counter += n as u64;
                remaining = &remaining[n..];
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    writer.flush()
}

/// Information about a slot file found on disk
#[derive(Debug, Clone)]
pub struct LogFileInfo {
    pub path: PathBuf,
    pub slot: usize,
    pub size: u64,
    pub modified: SystemTime,
}

/// List slot files in `naming`'s directory, newest first.
pub fn find_log_files(naming: &SlotNaming) -> Result<Vec<LogFileInfo>> {
    let mut log_files = Vec::new();

    if !naming.log_dir().exists() {
        return Ok(log_files);
    }

    for entry in fs::read_dir(naming.log_dir())? {
        let entry = entry?;
        let path = entry.path();

        let Some(slot) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| naming.slot_of(n))
        else {
            continue;
        };

        let metadata = entry.metadata()?;
        log_files.push(LogFileInfo {
            path,
            slot,
            size: metadata.len(),
            modified: metadata.modified()?,
        });
    }

    log_files.sort_by(|a, b| b.modified.cmp(&a.modified));

    Ok(log_files)
}
