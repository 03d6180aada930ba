//! Performance metrics and statistics tracking for the scoring service.

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Most recent latencies kept for percentile estimates
const LATENCY_WINDOW: usize = 4096;

/// Fraud score histogram resolution (0.1 wide buckets)
const SCORE_BUCKETS: usize = 10;

/// Metrics collector for scoring requests
pub struct ScoringMetrics {
    /// Successful predictions
    pub predictions_served: AtomicU64,
    /// Predictions labelled fraud
    pub fraud_flagged: AtomicU64,
    /// Failed scoring requests
    pub requests_failed: AtomicU64,
    /// Failures by kind (validation, scoring, persistence)
    failures_by_kind: RwLock<HashMap<String, u64>>,
    /// Sliding window of request latencies in microseconds
    latencies_us: Mutex<VecDeque<u64>>,
    score_histogram: [AtomicU64; SCORE_BUCKETS],
    started: Instant,
}

impl ScoringMetrics {
    pub fn new() -> Self {
        Self {
            predictions_served: AtomicU64::new(0),
            fraud_flagged: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            failures_by_kind: RwLock::new(HashMap::new()),
            latencies_us: Mutex::new(VecDeque::with_capacity(LATENCY_WINDOW)),
            score_histogram: std::array::from_fn(|_| AtomicU64::new(0)),
            started: Instant::now(),
        }
    }

    /// Record a successful prediction
    pub fn record_prediction(&self, latency: Duration, fraud_score: f64, is_fraud: bool) {
        self.predictions_served.fetch_add(1, Ordering::Relaxed);
        if is_fraud {
            self.fraud_flagged.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut window) = self.latencies_us.lock() {
            if window.len() == LATENCY_WINDOW {
                window.pop_front();
            }
            window.push_back(latency.as_micros() as u64);
        }

        let bucket = ((fraud_score.clamp(0.0, 1.0) * SCORE_BUCKETS as f64) as usize)
            .min(SCORE_BUCKETS - 1);
        self.score_histogram[bucket].fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed request
    pub fn record_failure(&self, kind: &str) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut by_kind) = self.failures_by_kind.write() {
            *by_kind.entry(kind.to_string()).or_insert(0) += 1;
        }
    }

    /// Latency statistics over the recent window
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let mut sorted: Vec<u64> = match self.latencies_us.lock() {
            Ok(window) => window.iter().copied().collect(),
            Err(_) => return ProcessingStats::default(),
        };
        let Some(&max_us) = sorted.iter().max() else {
            return ProcessingStats::default();
        };
        sorted.sort_unstable();

        let n = sorted.len();
        let at = |q: f64| sorted[((n as f64 * q) as usize).min(n - 1)];

        ProcessingStats {
            count: n as u64,
            mean_us: sorted.iter().sum::<u64>() / n as u64,
            p50_us: at(0.5),
            p95_us: at(0.95),
            p99_us: at(0.99),
            max_us,
        }
    }

    /// Get current throughput (predictions per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.predictions_served.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_score_distribution(&self) -> [u64; SCORE_BUCKETS] {
        std::array::from_fn(|i| self.score_histogram[i].load(Ordering::Relaxed))
    }

    pub fn get_failures_by_kind(&self) -> HashMap<String, u64> {
        self.failures_by_kind
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Point-in-time view for the metrics endpoint
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            predictions_served: self.predictions_served.load(Ordering::Relaxed),
            fraud_flagged: self.fraud_flagged.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            failures_by_kind: self.get_failures_by_kind(),
            throughput_per_sec: self.get_throughput(),
            processing: self.get_processing_stats(),
            score_distribution: self.get_score_distribution(),
        }
    }

    /// Log a boxed summary of the counters, latencies and score histogram
    pub fn print_summary(&self) {
        let snapshot = self.snapshot();
        let fraud_rate = if snapshot.predictions_served > 0 {
            snapshot.fraud_flagged as f64 * 100.0 / snapshot.predictions_served as f64
        } else {
            0.0
        };
        let rule = "═".repeat(62);

        info!("╔{}╗", rule);
        info!("║{:^62}║", "FRAUD SCORING SERVICE - METRICS SUMMARY");
        info!("╠{}╣", rule);
        info!(
            "║ served {:>8} │ flagged {:>8} ({:>5.1}%) │ {:>7.1} req/s ║",
            snapshot.predictions_served,
            snapshot.fraud_flagged,
            fraud_rate,
            snapshot.throughput_per_sec
        );
        info!("║ failed {:>8}{:<45}║", snapshot.requests_failed, "");
        let mut kinds: Vec<_> = snapshot.failures_by_kind.iter().collect();
        kinds.sort();
        for (kind, count) in kinds {
            info!("║   {:<12} {:>8}{:<37}║", kind, count, "");
        }
        info!("╠{}╣", rule);
        let latency = &snapshot.processing;
        info!(
            "║ latency μs  mean {:>6}  p50 {:>6}  p95 {:>6}  p99 {:>6} ║",
            latency.mean_us, latency.p50_us, latency.p95_us, latency.p99_us
        );
        info!("╠{}╣", rule);

        let scored: u64 = snapshot.score_distribution.iter().sum();
        for (i, &n) in snapshot.score_distribution.iter().enumerate() {
            let share = if scored > 0 {
                n as f64 / scored as f64
            } else {
                0.0
            };
            let lower = i as f64 / SCORE_BUCKETS as f64;
            info!(
                "║ score {:.1}-{:.1} {:>8} {:<40}║",
                lower,
                lower + 1.0 / SCORE_BUCKETS as f64,
                n,
                "█".repeat((share * 40.0).round() as usize)
            );
        }
        info!("╚{}╝", rule);
    }
}

impl Default for ScoringMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Serializable metrics view
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub predictions_served: u64,
    pub fraud_flagged: u64,
    pub requests_failed: u64,
    pub failures_by_kind: HashMap<String, u64>,
    pub throughput_per_sec: f64,
    pub processing: ProcessingStats,
    pub score_distribution: [u64; SCORE_BUCKETS],
}

/// Logs the metrics summary on a fixed period
pub struct MetricsReporter {
    metrics: Arc<ScoringMetrics>,
    period: Duration,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ScoringMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            period: Duration::from_secs(interval_secs.max(1)),
        }
    }

    /// Run until the task is dropped; the first summary comes after one period
    pub async fn start(self) {
        let first = tokio::time::Instant::now() + self.period;
        let mut ticker = tokio::time::interval_at(first, self.period);
        loop {
            ticker.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = ScoringMetrics::new();

        metrics.record_prediction(Duration::from_micros(100), 0.05, false);
        metrics.record_prediction(Duration::from_micros(200), 0.93, true);
        metrics.record_failure("validation");
        metrics.record_failure("validation");
        metrics.record_failure("persistence");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.predictions_served, 2);
        assert_eq!(snapshot.fraud_flagged, 1);
        assert_eq!(snapshot.requests_failed, 3);
        assert_eq!(snapshot.failures_by_kind.get("validation"), Some(&2));
        assert_eq!(snapshot.score_distribution[0], 1);
        assert_eq!(snapshot.score_distribution[9], 1);
    }

    #[test]
    fn test_score_of_one_lands_in_top_bucket() {
        let metrics = ScoringMetrics::new();
        metrics.record_prediction(Duration::from_micros(10), 1.0, true);
        assert_eq!(metrics.get_score_distribution()[9], 1);
    }

    #[test]
    fn test_processing_stats() {
        let metrics = ScoringMetrics::new();
        for us in 1..=100 {
            metrics.record_prediction(Duration::from_micros(us), 0.5, false);
        }

        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 100);
        assert_eq!(stats.mean_us, 50);
        assert_eq!(stats.p50_us, 51);
        assert_eq!(stats.max_us, 100);
        assert!(stats.p99_us >= stats.p95_us);
    }

    #[test]
    fn test_latency_window_keeps_recent() {
        let metrics = ScoringMetrics::new();
        for _ in 0..LATENCY_WINDOW {
            metrics.record_prediction(Duration::from_micros(1000), 0.1, false);
        }
        metrics.record_prediction(Duration::from_micros(1), 0.1, false);

        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, LATENCY_WINDOW as u64);
        assert_eq!(stats.max_us, 1000);
        assert_eq!(
            metrics.predictions_served.load(Ordering::Relaxed),
            LATENCY_WINDOW as u64 + 1
        );
    }

    #[test]
    fn test_empty_stats() {
        let stats = ScoringMetrics::new().get_processing_stats();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.max_us, 0);
    }
}
