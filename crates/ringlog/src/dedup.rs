//! Collapsing of consecutive identical messages

/// What the writer has to append for one accepted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Same body as the previous message; only the repeat count moved.
    Absorbed,
    /// Append `summary` (if any) and then `line`.
    Emit {
        summary: Option<String>,
        line: String,
    },
}

/// Tracks the last emitted body and how often it has been seen in a row.
///
/// `repeat_count` is at least 1 and includes the occurrence that was written
/// out in full. `last_prefix` follows the most recent occurrence so a summary
/// carries the time of the last repeat.
#[derive(Debug)]
pub struct DedupCollapser {
    enabled: bool,
    last_body: Option<String>,
    last_prefix: String,
    repeat_count: u64,
}

impl DedupCollapser {
    pub fn new() -> Self {
        Self {
            enabled: true,
            last_body: None,
            last_prefix: String::new(),
            repeat_count: 1,
        }
    }

    /// A collapser that lets every message through unchanged.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    pub fn repeat_count(&self) -> u64 {
        self.repeat_count
    }

    pub fn last_body(&self) -> Option<&str> {
        self.last_body.as_deref()
    }

    pub fn observe(&mut self, prefix: String, body: &str) -> Decision {
        if !self.enabled {
            return Decision::Emit {
                summary: None,
                line: prefix + body,
            };
        }

        if self.last_body.as_deref() == Some(body) {
            self.repeat_count += 1;
            self.last_prefix = prefix;
            return Decision::Absorbed;
        }

        let summary = self.summary_line();
        let line = format!("{}{}", prefix, body);

        self.last_body = Some(body.to_owned());
        self.last_prefix = prefix;
        self.repeat_count = 1;

        Decision::Emit { summary, line }
    }

    /// Take a pending summary line now instead of waiting for a different
    /// message. The next occurrence of the same body is written in full.
    pub fn take_pending(&mut self) -> Option<String> {
        let summary = self.summary_line()?;
        self.last_body = None;
        self.repeat_count = 1;
        Some(summary)
    }

    fn summary_line(&self) -> Option<String> {
        (self.repeat_count > 1).then(|| {
            format!(
                "{}last message repeated {} times\n",
                self.last_prefix, self.repeat_count
            )
        })
    }
}

impl Default for DedupCollapser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emitted(decision: Decision) -> (Option<String>, String) {
        match decision {
            Decision::Emit { summary, line } => (summary, line),
            Decision::Absorbed => panic!("expected an emission"),
        }
    }

    #[test]
    fn test_first_message_is_emitted_without_summary() {
        let mut dedup = DedupCollapser::new();

        let (summary, line) = emitted(dedup.observe("p1: ".into(), "X\n"));
        assert_eq!(summary, None);
        assert_eq!(line, "p1: X\n");
        assert_eq!(dedup.repeat_count(), 1);
    }

    #[test]
    fn test_empty_first_body_is_not_a_repeat() {
        let mut dedup = DedupCollapser::new();

        let (summary, line) = emitted(dedup.observe("p1: ".into(), ""));
        assert_eq!(summary, None);
        assert_eq!(line, "p1: ");
    }

    #[test]
    fn test_repeats_collapse_with_last_prefix() {
        let mut dedup = DedupCollapser::new();

        emitted(dedup.observe("p1: ".into(), "X\n"));
        assert_eq!(dedup.observe("p2: ".into(), "X\n"), Decision::Absorbed);
        assert_eq!(dedup.observe("p3: ".into(), "X\n"), Decision::Absorbed);
        assert_eq!(dedup.repeat_count(), 3);

        let (summary, line) = emitted(dedup.observe("p4: ".into(), "Y\n"));
        assert_eq!(
            summary.as_deref(),
            Some("p3: last message repeated 3 times\n")
        );
        assert_eq!(line, "p4: Y\n");
        assert_eq!(dedup.repeat_count(), 1);
        assert_eq!(dedup.last_body(), Some("Y\n"));
    }

    #[test]
    fn test_single_occurrence_has_no_summary() {
        let mut dedup = DedupCollapser::new();

        emitted(dedup.observe("p1: ".into(), "X\n"));
        let (summary, _) = emitted(dedup.observe("p2: ".into(), "Y\n"));
        assert_eq!(summary, None);
    }

    #[test]
    fn test_prefix_match_is_not_equality() {
        let mut dedup = DedupCollapser::new();

        emitted(dedup.observe("p: ".into(), "abc"));
        let (summary, line) = emitted(dedup.observe("p: ".into(), "abcd"));
        assert_eq!(summary, None);
        assert_eq!(line, "p: abcd");
    }

    #[test]
    fn test_take_pending_resets_tracking() {
        let mut dedup = DedupCollapser::new();

        emitted(dedup.observe("p1: ".into(), "X\n"));
        assert!(dedup.take_pending().is_none());

        dedup.observe("p2: ".into(), "X\n");
        assert_eq!(
            dedup.take_pending().as_deref(),
            Some("p2: last message repeated 2 times\n")
        );

        // The same body is now written out again
        let (summary, line) = emitted(dedup.observe("p3: ".into(), "X\n"));
        assert_eq!(summary, None);
        assert_eq!(line, "p3: X\n");
    }

    #[test]
    fn test_disabled_emits_everything() {
        let mut dedup = DedupCollapser::disabled();

        for _ in 0..3 {
            let (summary, line) = emitted(dedup.observe("p: ".into(), "X\n"));
            assert_eq!(summary, None);
            assert_eq!(line, "p: X\n");
        }
    }
}
