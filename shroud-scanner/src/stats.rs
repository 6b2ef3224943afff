//! Scan statistics and progress reporting.

use serde::{Deserialize, Serialize};

/// Counters accumulated over one or more scans.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Pages fetched from the source
    pub batches: u64,
    /// Announcements received from the source
    pub received: u64,
    /// Announcements trial-decrypted
    pub total_scanned: u64,
    /// Announcements that belonged to the recipient
    pub discoveries: u64,
    /// Skipped because their tx hash was already seen
    pub duplicates_skipped: u64,
    /// Skipped by the timestamp filter
    pub filtered: u64,
    /// Skipped as malformed
    pub malformed: u64,
    /// Wall-clock time spent in batches, in milliseconds
    pub duration_ms: u64,
}

impl ScanStats {
    /// Creates a new stats tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the counters of one batch.
    pub fn merge(&mut self, batch: &ScanStats) {
        self.batches += batch.batches;
        self.received += batch.received;
        self.total_scanned += batch.total_scanned;
        self.discoveries += batch.discoveries;
        self.duplicates_skipped += batch.duplicates_skipped;
        self.filtered += batch.filtered;
        self.malformed += batch.malformed;
        self.duration_ms += batch.duration_ms;
    }

    /// Returns the scan rate (announcements per second).
    pub fn rate(&self) -> f64 {
        if self.duration_ms == 0 {
            0.0
        } else {
            (self.total_scanned as f64 / self.duration_ms as f64) * 1000.0
        }
    }
}

/// Progress callback type.
pub type ProgressCallback = Box<dyn Fn(ScanProgress) + Send + Sync>;

/// Scan progress information, reported after every batch.
///
/// Sources are paginated and do not announce their size, so progress is
/// reported in absolute terms.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Pages processed so far
    pub batches: u64,
    /// Announcements scanned so far
    pub scanned: u64,
    /// Discoveries found so far
    pub discoveries: u64,
    /// Current scan rate (announcements per second)
    pub rate: f64,
    /// Time since the scan started, in milliseconds
    pub elapsed_ms: u64,
    /// True on the final report
    pub done: bool,
}

impl ScanProgress {
    /// Creates a new progress tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates progress with new values.
    pub fn update(&mut self, batches: u64, scanned: u64, discoveries: u64, elapsed_ms: u64) {
        self.batches = batches;
        self.scanned = scanned;
        self.discoveries = discoveries;
        self.elapsed_ms = elapsed_ms;

        if elapsed_ms > 0 {
            self.rate = (scanned as f64 / elapsed_ms as f64) * 1000.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_progress_rate() {
        let mut progress = ScanProgress::new();

        // 500 scanned in 1000ms
        progress.update(1, 500, 2, 1000);

        assert_eq!(progress.batches, 1);
        assert!((progress.rate - 500.0).abs() < 1.0);
        assert!(!progress.done);
    }

    #[test]
    fn test_scan_progress_zero_elapsed() {
        let mut progress = ScanProgress::new();
        progress.update(1, 10, 0, 0);
        assert_eq!(progress.rate, 0.0);
    }

    #[test]
    fn test_stats_merge_and_rate() {
        let mut total = ScanStats::new();
        let batch = ScanStats {
            batches: 1,
            received: 12,
            total_scanned: 10,
            discoveries: 1,
            duplicates_skipped: 1,
            filtered: 1,
            malformed: 0,
            duration_ms: 20,
        };
        total.merge(&batch);
        total.merge(&batch);

        assert_eq!(total.batches, 2);
        assert_eq!(total.total_scanned, 20);
        assert_eq!(total.duration_ms, 40);
        assert!((total.rate() - 500.0).abs() < 0.01);
        assert_eq!(ScanStats::new().rate(), 0.0);
    }
}
