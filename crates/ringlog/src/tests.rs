//! End-to-end tests for the writer

#[cfg(test)]
mod integration_tests {
    use crate::{
        clock::Clock,
        config::RingLogConfig,
        host::{initialize_with_clock, mock::MockHost, ExtensionLogger},
        rotation::{find_log_files, SlotNaming},
        Severity, UserLog,
    };
    use chrono::{DateTime, Local, TimeZone};
    use std::collections::HashSet;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    struct FixedClock(Mutex<DateTime<Local>>);

    impl FixedClock {
        fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> Arc<Self> {
            Arc::new(Self(Mutex::new(
                Local.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap(),
            )))
        }

        fn set(&self, y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) {
            *self.0.lock().unwrap() = Local.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap();
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Local> {
            *self.0.lock().unwrap()
        }
    }

    fn config(dir: &Path) -> RingLogConfig {
        RingLogConfig {
            log_dir: dir.to_path_buf(),
            base_name: "it".to_string(),
            threshold: Severity::Info,
            ..RingLogConfig::default()
        }
    }

    fn all_lines(dir: &Path) -> Vec<String> {
        let naming = SlotNaming::new(dir, "it");
        let mut files = find_log_files(&naming).unwrap();
        files.sort_by_key(|f| f.slot);
        files
            .iter()
            .flat_map(|f| {
                std::fs::read_to_string(&f.path)
                    .unwrap()
                    .lines()
                    .map(str::to_owned)
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn body(line: &str) -> &str {
        line.split_once("]: ").map(|(_, b)| b).unwrap()
    }

    #[test]
    fn test_repeat_run_then_different_message() {
        let temp_dir = TempDir::new().unwrap();
        let clock = FixedClock::at(2024, 3, 7, 12, 0, 1);
        let log = UserLog::open(&config(temp_dir.path()), Severity::Info, clock.clone()).unwrap();

        log.log_str(Severity::Info, "X\n");
        clock.set(2024, 3, 7, 12, 0, 2);
        log.log_str(Severity::Info, "X\n");
        clock.set(2024, 3, 7, 12, 0, 3);
        log.log_str(Severity::Info, "X\n");
        clock.set(2024, 3, 7, 12, 0, 4);
        log.log_str(Severity::Info, "Y\n");

        let lines = all_lines(temp_dir.path());
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Mar 07 12:00:01 "));
        assert_eq!(body(&lines[0]), "X");
        assert!(lines[1].starts_with("Mar 07 12:00:03 "));
        assert_eq!(body(&lines[1]), "last message repeated 3 times");
        assert!(lines[2].starts_with("Mar 07 12:00:04 "));
        assert_eq!(body(&lines[2]), "Y");
    }

    #[test]
    fn test_below_threshold_does_not_break_repeat_run() {
        let temp_dir = TempDir::new().unwrap();
        let log = UserLog::standalone(config(temp_dir.path())).unwrap();

        log.log_str(Severity::Warning, "disk full\n");
        log.log_str(Severity::Debug, "noise\n");
        log.log_str(Severity::Warning, "disk full\n");
        log.log_str(Severity::Warning, "recovered\n");

        let lines = all_lines(temp_dir.path());
        let bodies: Vec<_> = lines.iter().map(|l| body(l)).collect();
        assert_eq!(
            bodies,
            vec!["disk full", "last message repeated 2 times", "recovered"]
        );
    }

    #[test]
    fn test_single_occurrences_have_no_summary() {
        let temp_dir = TempDir::new().unwrap();
        let log = UserLog::standalone(config(temp_dir.path())).unwrap();

        for message in ["a\n", "b\n", "a\n", "b\n"] {
            log.log_str(Severity::Error, message);
        }

        let lines = all_lines(temp_dir.path());
        assert_eq!(lines.len(), 4);
        assert!(lines.iter().all(|l| !l.contains("last message repeated")));
        assert_eq!(log.stats().repeat_summaries, 0);
    }

    #[test]
    fn test_rotation_keeps_every_line() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config(temp_dir.path());
        config.slot_count = 16;
        config.max_file_size_bytes = 200;
        let log = UserLog::standalone(config).unwrap();

        for i in 0..10 {
            log.log_str(Severity::Info, &format!("message number {}\n", i));
        }

        let stats = log.stats();
        assert!(stats.rotations >= 1);
        assert_eq!(stats.active_slot as u64, stats.rotations);

        let lines = all_lines(temp_dir.path());
        let bodies: Vec<_> = lines.iter().map(|l| body(l).to_owned()).collect();
        let expected: Vec<_> = (0..10).map(|i| format!("message number {}", i)).collect();
        assert_eq!(bodies, expected);

        for file in find_log_files(&SlotNaming::new(temp_dir.path(), "it")).unwrap() {
            // Every slot left behind was filled up to the cap
            if file.slot != stats.active_slot {
                assert!(file.size >= 200);
            }
        }
    }

    #[test]
    fn test_ring_footprint_is_bounded() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config(temp_dir.path());
        config.slot_count = 3;
        config.max_file_size_bytes = 64;
        let log = UserLog::standalone(config).unwrap();

        for i in 0..200 {
            log.log_str(Severity::Info, &format!("line {}\n", i));
        }

        let files = find_log_files(&SlotNaming::new(temp_dir.path(), "it")).unwrap();
        assert_eq!(files.len(), 3);
        assert!(log.stats().rotations > 3);
    }

    #[test]
    fn test_reused_slot_takes_new_date() {
        let temp_dir = TempDir::new().unwrap();
        let clock = FixedClock::at(2024, 3, 7, 12, 0, 0);
        let mut config = config(temp_dir.path());
        config.slot_count = 2;
        config.max_file_size_bytes = 10;
        let log = UserLog::open(&config, Severity::Info, clock.clone()).unwrap();

        log.log_str(Severity::Info, "first\n"); // rotates to slot 1
        clock.set(2024, 3, 8, 12, 0, 0);
        log.log_str(Severity::Info, "second\n"); // rotates back to slot 0

        let dir = temp_dir.path();
        assert!(!dir.join("it0_2024_3_7.log").exists());
        assert!(dir.join("it1_2024_3_7.log").exists());
        assert!(dir.join("it0_2024_3_8.log").exists());
    }

    #[test]
    fn test_concurrent_callers_lose_nothing() {
        const THREADS: usize = 8;
        const MESSAGES: usize = 200;

        let temp_dir = TempDir::new().unwrap();
        let mut config = config(temp_dir.path());
        config.slot_count = 128;
        config.max_file_size_bytes = 4096;
        let log = Arc::new(UserLog::standalone(config).unwrap());

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    for m in 0..MESSAGES {
                        log.log(Severity::Error, format_args!("thread {} message {}\n", t, m));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let lines = all_lines(temp_dir.path());
        let bodies: HashSet<_> = lines
            .iter()
            .map(|l| body(l).to_owned())
            .filter(|b| !b.starts_with("last message repeated"))
            .collect();

        assert_eq!(bodies.len(), THREADS * MESSAGES);
        for t in 0..THREADS {
            for m in 0..MESSAGES {
                assert!(bodies.contains(&format!("thread {} message {}", t, m)));
            }
        }
        assert_eq!(log.stats().lines_written, (THREADS * MESSAGES) as u64);
    }

    #[test]
    fn test_host_level_change_gates_next_call() {
        let temp_dir = TempDir::new().unwrap();
        let host = MockHost::new(Severity::Warning);
        let clock = FixedClock::at(2024, 3, 7, 12, 0, 0);
        let writer = initialize_with_clock(&host, &config(temp_dir.path()), clock).unwrap();

        let logger = Arc::clone(&host.loggers.lock().unwrap()[0]);
        logger.log(Severity::Info, format_args!("hidden\n"));

        host.change_level(Severity::Info);
        logger.log(Severity::Info, format_args!("shown\n"));

        // Re-announcing the same level changes nothing
        host.change_level(Severity::Info);
        logger.log(Severity::Info, format_args!("shown again\n"));

        let bodies: Vec<_> = all_lines(temp_dir.path())
            .iter()
            .map(|l| body(l).to_owned())
            .collect();
        assert_eq!(bodies, vec!["shown", "shown again"]);
        assert_eq!(writer.stats().lines_written, 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_lost_directory_drops_writes() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path().join("logs");
        let mut config = config(&log_dir);
        config.max_file_size_bytes = 10;
        let log = UserLog::standalone(config).unwrap();

        std::fs::remove_dir_all(&log_dir).unwrap();

        log.log_str(Severity::Error, "crosses the cap\n");
        assert!(!log.is_available());

        std::fs::create_dir_all(&log_dir).unwrap();
        log.log_str(Severity::Error, "dropped one\n");
        log.log_str(Severity::Error, "dropped two\n");

        let stats = log.stats();
        assert_eq!(stats.lines_written, 1);
        assert_eq!(stats.dropped_writes, 2);
        assert!(std::fs::read_dir(&log_dir).unwrap().next().is_none());
    }
}
