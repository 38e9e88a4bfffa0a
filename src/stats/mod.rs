use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct DownloadStats {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_requests: usize,
    pub responses: usize,
    pub files_saved: usize,
    pub failed_requests: usize,
    pub bytes_downloaded: u64,
    pub status_codes: HashMap<u16, usize>,
    pub failure_reasons: HashMap<String, usize>,
    pub average_response_time: f64, // in milliseconds
}

#[derive(Debug, Clone)]
pub struct StatsTracker {
    stats: Arc<RwLock<DownloadStats>>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self {
            stats: Arc::new(RwLock::new(DownloadStats {
                start_time: Utc::now(),
                end_time: None,
                total_requests: 0,
                responses: 0,
                files_saved: 0,
                failed_requests: 0,
                bytes_downloaded: 0,
                status_codes: HashMap::new(),
                failure_reasons: HashMap::new(),
                average_response_time: 0.0,
            })),
        }
    }

    pub fn record_request(&self, status: u16, size: u64, duration: Duration) {
        let mut stats = self.stats.write();
        stats.total_requests += 1;
        stats.responses += 1;

        if status >= 400 {
            stats.failed_requests += 1;
        }

        *stats.status_codes.entry(status).or_insert(0) += 1;
        stats.bytes_downloaded += size;

        let current_total = stats.average_response_time * (stats.responses - 1) as f64;
        let new_duration = duration.num_milliseconds() as f64;
        stats.average_response_time = (current_total + new_duration) / stats.responses as f64;
    }

    /// A request that never produced a response.
    pub fn record_failure(&self, reason: impl Into<String>) {
        let mut stats = self.stats.write();
        stats.total_requests += 1;
        stats.failed_requests += 1;
        *stats.failure_reasons.entry(reason.into()).or_insert(0) += 1;
    }

    pub fn record_saved(&self) {
        self.stats.write().files_saved += 1;
    }

    pub fn finish(&self) {
        self.stats.write().end_time = Some(Utc::now());
    }

    pub fn get_stats(&self) -> DownloadStats {
        self.stats.read().clone()
    }

    pub fn print_summary(&self) {
        print!("{}", self.summary());
    }

    pub fn summary(&self) -> String {
        let stats = self.stats.read();
        let duration = stats
            .end_time
            .unwrap_or_else(Utc::now)
            .signed_duration_since(stats.start_time);

        let mut out = String::new();
        out.push_str("\nDownload Statistics:\n");
        out.push_str("====================\n");
        out.push_str(&format!("Duration: {} seconds\n", duration.num_seconds()));
        out.push_str(&format!("Requests: {}\n", stats.total_requests));
        out.push_str(&format!("Files Saved: {}\n", stats.files_saved));
        out.push_str(&format!("Failed Requests: {}\n", stats.failed_requests));
        out.push_str(&format!(
            "Data Downloaded: {:.2} MB\n",
            stats.bytes_downloaded as f64 / 1_000_000.0
        ));
        out.push_str(&format!(
            "Average Response Time: {:.2}ms\n",
            stats.average_response_time
        ));

        if !stats.status_codes.is_empty() {
            out.push_str("\nStatus Codes:\n");
            let mut codes: Vec<_> = stats.status_codes.iter().collect();
            codes.sort();
            for (code, count) in codes {
                out.push_str(&format!("  {}: {}\n", code, count));
            }
        }

        if !stats.failure_reasons.is_empty() {
            out.push_str("\nFailures:\n");
            let mut reasons: Vec<_> = stats.failure_reasons.iter().collect();
            reasons.sort();
            for (reason, count) in reasons {
                out.push_str(&format!("  {}: {}\n", reason, count));
            }
        }
        out
    }
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_requests_and_failures() {
        let tracker = StatsTracker::new();
        tracker.record_request(200, 1_000, Duration::milliseconds(10));
        tracker.record_saved();
        tracker.record_request(404, 20, Duration::milliseconds(30));
        tracker.record_failure("connect");
        tracker.finish();

        let stats = tracker.get_stats();
        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.files_saved, 1);
        assert_eq!(stats.failed_requests, 2);
        assert_eq!(stats.bytes_downloaded, 1_020);
        assert_eq!(stats.status_codes.get(&404), Some(&1));
        assert_eq!(stats.failure_reasons.get("connect"), Some(&1));
        assert!((stats.average_response_time - 20.0).abs() < f64::EPSILON);
        assert!(stats.end_time.is_some());
    }

    #[test]
    fn summary_lists_codes_in_order() {
        let tracker = StatsTracker::new();
        for status in [500, 200, 404, 200, 301] {
            tracker.record_request(status, 0, Duration::milliseconds(1));
        }
        tracker.record_failure("timeout");
        tracker.record_failure("connect");

        let summary = tracker.summary();
        let codes: Vec<_> = summary
            .lines()
            .skip_while(|l| *l != "Status Codes:")
            .skip(1)
            .take_while(|l| !l.is_empty())
            .collect();
        assert_eq!(codes, vec!["  200: 2", "  301: 1", "  404: 1", "  500: 1"]);
        assert!(summary.ends_with("Failures:\n  connect: 1\n  timeout: 1\n"));
    }

    #[test]
    fn clones_share_counters() {
        let tracker = StatsTracker::new();
        let other = tracker.clone();
        other.record_saved();
        assert_eq!(tracker.get_stats().files_saved, 1);
    }
}
