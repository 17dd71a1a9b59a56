//! Throttled byte-level progress for a single download.

use std::time::{Duration, Instant};

/// Minimum interval between two progress reports.
pub const REPORT_INTERVAL: Duration = Duration::from_millis(100);

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// A progress sample emitted by the [`ProgressThrottle`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownloadSample {
    /// Bytes in the destination file so far (including resumed bytes).
    pub downloaded: u64,
    /// Expected total, 0 when unknown.
    pub total: u64,
    /// Completion ratio in `0.0..=1.0`, 0 when the total is unknown.
    pub ratio: f64,
    /// Speed since the previous sample in MB/s.
    pub speed_mbps: f64,
}

/// Limits progress reports to one per [`REPORT_INTERVAL`] and measures speed
/// between reports.
#[derive(Debug)]
pub struct ProgressThrottle {
    total: u64,
    interval: Duration,
    last_report: Instant,
    last_bytes: u64,
}

impl ProgressThrottle {
    /// Start tracking a download that already has `start_bytes` on disk.
    pub fn new(start_bytes: u64, total: u64) -> Self {
        Self::with_interval(start_bytes, total, REPORT_INTERVAL)
    }

    /// Same as [`ProgressThrottle::new`] with a custom interval.
    pub fn with_interval(start_bytes: u64, total: u64, interval: Duration) -> Self {
        Self {
            total,
            interval,
            last_report: Instant::now(),
            last_bytes: start_bytes,
        }
    }

    /// Record the current byte count; returns a sample if one is due.
    pub fn observe(&mut self, downloaded: u64) -> Option<DownloadSample> {
        let now = Instant::now();
        if now.duration_since(self.last_report) < self.interval {
            return None;
        }
        Some(self.sample_at(downloaded, now))
    }

    /// Produce a sample regardless of the interval (used on completion).
    pub fn finish(&mut self, downloaded: u64) -> DownloadSample {
        self.sample_at(downloaded, Instant::now())
    }

    fn sample_at(&mut self, downloaded: u64, now: Instant) -> DownloadSample {
        let elapsed = now.duration_since(self.last_report).as_secs_f64();
        let delta = downloaded.saturating_sub(self.last_bytes) as f64;
        let speed_mbps = if elapsed > 0.0 {
            delta / elapsed / BYTES_PER_MB
        } else {
            0.0
        };

        self.last_report = now;
        self.last_bytes = downloaded;

        DownloadSample {
            downloaded,
            total: self.total,
            ratio: ratio(downloaded, self.total),
            speed_mbps,
        }
    }
}

fn ratio(downloaded: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (downloaded as f64 / total as f64).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_throttle_suppresses_rapid_reports() {
        let mut throttle = ProgressThrottle::with_interval(0, 1000, Duration::from_secs(60));
        assert!(throttle.observe(10).is_none());
        assert!(throttle.observe(20).is_none());
    }

    #[test]
    fn test_throttle_reports_after_interval() {
        let mut throttle = ProgressThrottle::with_interval(0, 1000, Duration::from_millis(5));
        thread::sleep(Duration::from_millis(10));

        let sample = throttle.observe(500).expect("sample due");
        assert_eq!(sample.downloaded, 500);
        assert_eq!(sample.ratio, 0.5);
        assert!(sample.speed_mbps > 0.0);
    }

    #[test]
    fn test_finish_always_reports() {
        let mut throttle = ProgressThrottle::with_interval(200, 1000, Duration::from_secs(60));
        let sample = throttle.finish(1000);
        assert_eq!(sample.ratio, 1.0);
        assert_eq!(sample.total, 1000);
    }

    #[test]
    fn test_unknown_total_has_zero_ratio() {
        let mut throttle = ProgressThrottle::new(0, 0);
        assert_eq!(throttle.finish(4096).ratio, 0.0);
    }
}
