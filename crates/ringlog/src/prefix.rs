//! Line prefix: timestamp, host and process identity

use crate::{truncate_to_boundary, MAX_MESSAGE_LEN};
use chrono::{DateTime, Local};
use std::fmt::Write;

/// Builds `"Oct 19 14:03:07 host tag[pid]: "` prefixes.
///
/// Host name and pid are resolved once, so formatting only touches the clock
/// value passed in.
#[derive(Debug, Clone)]
pub struct PrefixFormatter {
    host: String,
    tag: String,
    pid: u32,
}

impl PrefixFormatter {
    /// Resolve the local host name; an unknown host becomes an empty string.
    pub fn new(tag: impl Into<String>) -> Self {
        Self::with_host(local_hostname().unwrap_or_default(), tag)
    }

    pub fn with_host(host: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            tag: tag.into(),
            pid: std::process::id(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn format_prefix(&self, now: &DateTime<Local>) -> String {
        let mut prefix = String::with_capacity(32 + self.host.len() + self.tag.len());
        // Writing into a String cannot fail
        let _ = write!(
            prefix,
            "{} {} {}[{}]: ",
            now.format("%b %d %H:%M:%S"),
            self.host,
            self.tag,
            self.pid
        );
        truncate_to_boundary(&mut prefix, MAX_MESSAGE_LEN);
        prefix
    }
}

fn local_hostname() -> Option<String> {
    hostname::get().ok()?.into_string().ok()
}
