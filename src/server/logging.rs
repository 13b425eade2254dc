//! Usage metrics and access logging.

use std::fs::File;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;

/// Maximum number of rotated access log files to keep.
const MAX_ACCESS_LOG_ROTATIONS: usize = 5;

/// How a prediction request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictOutcome {
    Forwarded,
    UpstreamFailure,
    BadRequest,
}

impl PredictOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forwarded => "forwarded",
            Self::UpstreamFailure => "upstream_failure",
            Self::BadRequest => "bad_request",
        }
    }
}

/// One access log entry.
pub struct RecordEvent<'a> {
    pub outcome: PredictOutcome,
    pub status: u16,
    /// Target that answered, or the last one tried.
    pub target: Option<&'a str>,
    pub attempts: usize,
    pub processing_time_ms: u64,
}

pub struct UsageMetrics {
    /// Prediction requests recorded through [`UsageMetrics::record`].
    pub total_requests: AtomicU64,
    pub forwarded: AtomicU64,
    pub upstream_failures: AtomicU64,
    pub bad_requests: AtomicU64,

    pub ep_predict: AtomicU64,
    pub ep_health: AtomicU64,
    pub ep_stats: AtomicU64,

    access_log: std::sync::Mutex<Option<File>>,
    access_log_path: String,
    access_log_bytes: AtomicU64,
    max_access_log_bytes: u64,
}

impl UsageMetrics {
    pub fn new(access_log_path: &str, max_access_log_bytes: u64) -> Self {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(access_log_path)
            .ok();
        if file.is_none() {
            warn!(path = access_log_path, "could not open access log");
        }
        let current_size = std::fs::metadata(access_log_path)
            .map(|m| m.len())
            .unwrap_or(0);

        Self {
            total_requests: AtomicU64::new(0),
            forwarded: AtomicU64::new(0),
            upstream_failures: AtomicU64::new(0),
            bad_requests: AtomicU64::new(0),
            ep_predict: AtomicU64::new(0),
            ep_health: AtomicU64::new(0),
            ep_stats: AtomicU64::new(0),
            access_log: std::sync::Mutex::new(file),
            access_log_path: access_log_path.to_string(),
            access_log_bytes: AtomicU64::new(current_size),
            max_access_log_bytes,
        }
    }

    pub fn record(&self, event: &RecordEvent<'_>) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        let counter = match event.outcome {
            PredictOutcome::Forwarded => &self.forwarded,
            PredictOutcome::UpstreamFailure => &self.upstream_failures,
            PredictOutcome::BadRequest => &self.bad_requests,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        let entry = serde_json::json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "endpoint": "predict",
            "outcome": event.outcome.as_str(),
            "status": event.status,
            "target": event.target,
            "attempts": event.attempts,
            "processing_time_ms": event.processing_time_ms,
        });
        self.append(entry);
    }

    fn append(&self, entry: serde_json::Value) {
        let mut guard = match self.access_log.lock() {
            Ok(guard) => guard,
            Err(e) => {
                warn!(error = %e, "access log lock poisoned, dropping entry");
                return;
            }
        };
        let Some(ref mut file) = *guard else {
            return;
        };

        let mut line = entry.to_string();
        line.push('\n');
        let line_len = line.len() as u64;
        if let Err(e) = file.write_all(line.as_bytes()) {
            warn!(error = %e, "failed to write access log entry");
        }
        let new_size = self.access_log_bytes.fetch_add(line_len, Ordering::Relaxed) + line_len;

        // Rotate if over size limit (0 = no limit)
        if self.max_access_log_bytes > 0 && new_size >= self.max_access_log_bytes {
            for i in (1..MAX_ACCESS_LOG_ROTATIONS).rev() {
                let from = format!("{}.{}", self.access_log_path, i);
                let to = format!("{}.{}", self.access_log_path, i + 1);
                if std::path::Path::new(&from).exists() {
                    if let Err(e) = std::fs::rename(&from, &to) {
                        warn!(from = %from, to = %to, error = %e, "log rotation rename failed");
                    }
                }
            }
            let rotated = format!("{}.1", self.access_log_path);
            if let Err(e) = std::fs::rename(&self.access_log_path, &rotated) {
                warn!(from = %self.access_log_path, to = %rotated, error = %e, "log rotation rename failed");
            }
            if let Ok(new_file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.access_log_path)
            {
                *file = new_file;
                self.access_log_bytes.store(0, Ordering::Relaxed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(outcome: PredictOutcome, status: u16) -> RecordEvent<'static> {
        RecordEvent {
            outcome,
            status,
            target: Some("http://localhost:8000/api/predict/"),
            attempts: 1,
            processing_time_ms: 12,
        }
    }

    #[test]
    fn test_counters_by_outcome() {
        let tmpdir = tempfile::tempdir().expect("failed to create temp dir");
        let path = tmpdir.path().join("access.jsonl");
        let metrics = UsageMetrics::new(path.to_str().unwrap(), 0);

        metrics.record(&event(PredictOutcome::Forwarded, 200));
        metrics.record(&event(PredictOutcome::Forwarded, 200));
        metrics.record(&event(PredictOutcome::UpstreamFailure, 502));
        metrics.record(&event(PredictOutcome::BadRequest, 500));

        assert_eq!(metrics.total_requests.load(Ordering::Relaxed), 4);
        assert_eq!(metrics.forwarded.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.upstream_failures.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.bad_requests.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_access_log_lines_are_json() {
        let tmpdir = tempfile::tempdir().expect("failed to create temp dir");
        let path = tmpdir.path().join("access.jsonl");
        let metrics = UsageMetrics::new(path.to_str().unwrap(), 0);

        metrics.record(&event(PredictOutcome::UpstreamFailure, 502));

        let content = std::fs::read_to_string(&path).unwrap();
        let line: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(line["outcome"], "upstream_failure");
        assert_eq!(line["status"], 502);
        assert_eq!(line["attempts"], 1);
    }

    #[test]
    fn test_concurrent_records_all_logged() {
        let tmpdir = tempfile::tempdir().expect("failed to create temp dir");
        let path = tmpdir.path().join("access.jsonl");
        let metrics = std::sync::Arc::new(UsageMetrics::new(path.to_str().unwrap(), 0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = metrics.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        metrics.record(&event(PredictOutcome::Forwarded, 200));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 200);
        assert_eq!(metrics.forwarded.load(Ordering::Relaxed), 200);
    }

    #[test]
    fn test_access_log_rotation() {
        let tmpdir = tempfile::tempdir().expect("failed to create temp dir");
        let path = tmpdir.path().join("access.jsonl");
        let path_str = path.to_str().unwrap();
        let metrics = UsageMetrics::new(path_str, 64);

        for _ in 0..3 {
            metrics.record(&event(PredictOutcome::Forwarded, 200));
        }

        assert!(std::path::Path::new(&format!("{}.1", path_str)).exists());
        assert!(path.exists());
    }
}
