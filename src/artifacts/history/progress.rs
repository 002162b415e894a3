use std::time::{Duration, Instant};

/// Rate reporting for long scans
///
/// Reports are purely observational; nothing here alters the scan.
#[derive(Debug)]
pub struct ScanProgress {
    started: Instant,
    last_report: Instant,
    interval: Duration,
    commits: usize,
    files: usize,
}

impl ScanProgress {
    pub fn new(interval: Duration) -> Self {
        let now = Instant::now();
        ScanProgress {
            started: now,
            last_report: now,
            interval,
            commits: 0,
            files: 0,
        }
    }

    pub fn commit_scanned(&mut self) {
        self.commits += 1;
        self.report_if_due(Instant::now());
    }

    pub fn file_yielded(&mut self) {
        self.files += 1;
    }

    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn files(&self) -> usize {
        self.files
    }

    /// Commits per second since the scan started
    pub fn rate(&self, now: Instant) -> f64 {
        let elapsed = now.duration_since(self.started).as_secs_f64();
        if elapsed > 0.0 {
            self.commits as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Log the scan rate if `interval` has passed since the last report.
    ///
    /// Returns whether a report was emitted.
    pub fn report_if_due(&mut self, now: Instant) -> bool {
        if now.duration_since(self.last_report) < self.interval {
            return false;
        }
        self.last_report = now;
        tracing::warn!(
            elapsed_secs = now.duration_since(self.started).as_secs(),
            commits = self.commits,
            files = self.files,
            "history scan still running at {:.1} commits/sec",
            self.rate(now)
        );
        true
    }
}
