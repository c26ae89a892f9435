//! Request statistics for detection and translation calls.
//! One plain aggregate per operation; rates are computed from the aggregate on demand.
//! Latency samples live in a fixed-capacity ring (oldest dropped first).

use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

/// Default number of latency samples kept per operation.
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// Receiver of per-request outcome events from the orchestrator.
pub trait StatsSink: Send + Sync {
    fn record_language_detection_request(&self, success: bool, latency_ms: f64, from_cache: bool);
    fn record_translation_request(&self, success: bool, latency_ms: f64, from_cache: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    LanguageDetection,
    Translation,
}

/// Fixed-capacity ring buffer for latency samples.
#[derive(Debug, Clone)]
struct SampleRing {
    samples: Vec<f64>,
    pos: usize,
    count: usize,
    capacity: usize,
}

impl SampleRing {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: vec![0.0; capacity],
            pos: 0,
            count: 0,
            capacity,
        }
    }

    fn push(&mut self, value: f64) {
        self.samples[self.pos] = value;
        self.pos = (self.pos + 1) % self.capacity;
        if self.count < self.capacity {
            self.count += 1;
        }
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.samples[..self.count].iter().sum::<f64>() / self.count as f64
    }

    fn percentile(&self, p: f64) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let mut sorted: Vec<f64> = self.samples[..self.count].to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let idx = ((p / 100.0) * (self.count as f64 - 1.0)).round() as usize;
        let idx = idx.min(self.count - 1);
        sorted[idx]
    }
}

/// Counters and latency history for one operation type.
#[derive(Debug, Clone)]
pub struct OperationStats {
    pub total_requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    latencies: SampleRing,
}

impl OperationStats {
    pub fn new(history_limit: usize) -> Self {
        Self {
            total_requests: 0,
            successes: 0,
            failures: 0,
            cache_hits: 0,
            cache_misses: 0,
            latencies: SampleRing::new(history_limit),
        }
    }

    /// Cache hits only bump the hit counter; outcome and latency are tracked for real calls.
    pub fn record(&mut self, success: bool, latency_ms: f64, from_cache: bool) {
        self.total_requests += 1;
        if from_cache {
            self.cache_hits += 1;
            return;
        }
        self.cache_misses += 1;
        if success {
            self.successes += 1;
            self.latencies.push(latency_ms);
        } else {
            self.failures += 1;
        }
    }

    /// Percent of non-cached calls that succeeded; 100 before any call is made.
    pub fn success_rate(&self) -> f64 {
        let outcomes = self.successes + self.failures;
        if outcomes == 0 {
            return 100.0;
        }
        self.successes as f64 / outcomes as f64 * 100.0
    }

    /// Mean latency of successful non-cached calls, in ms.
    pub fn average_latency_ms(&self) -> f64 {
        self.latencies.mean()
    }

    /// Percent of lookups answered from cache; 0 before any lookup.
    pub fn cache_hit_rate(&self) -> f64 {
        let lookups = self.cache_hits + self.cache_misses;
        if lookups == 0 {
            return 0.0;
        }
        self.cache_hits as f64 / lookups as f64 * 100.0
    }

    pub fn latency_percentile(&self, p: f64) -> f64 {
        self.latencies.percentile(p)
    }

    pub fn summary(&self) -> OperationSummary {
        OperationSummary {
            total_requests: self.total_requests,
            success_rate: self.success_rate(),
            average_latency_ms: self.average_latency_ms(),
            cache_hit_rate: self.cache_hit_rate(),
            p50_ms: self.latency_percentile(50.0),
            p95_ms: self.latency_percentile(95.0),
            p99_ms: self.latency_percentile(99.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationSummary {
    pub total_requests: u64,
    pub success_rate: f64,
    pub average_latency_ms: f64,
    pub cache_hit_rate: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub translation: OperationSummary,
    pub language_detection: OperationSummary,
}

struct MonitorState {
    translation: OperationStats,
    language_detection: OperationStats,
}

impl MonitorState {
    fn new(history_limit: usize) -> Self {
        Self {
            translation: OperationStats::new(history_limit),
            language_detection: OperationStats::new(history_limit),
        }
    }

    fn get(&self, op: Operation) -> &OperationStats {
        match op {
            Operation::Translation => &self.translation,
            Operation::LanguageDetection => &self.language_detection,
        }
    }

    fn get_mut(&mut self, op: Operation) -> &mut OperationStats {
        match op {
            Operation::Translation => &mut self.translation,
            Operation::LanguageDetection => &mut self.language_detection,
        }
    }
}

/// Process-wide statistics sink shared by the orchestrator and the status surface.
pub struct PerformanceMonitor {
    state: Mutex<MonitorState>,
    history_limit: usize,
}

impl PerformanceMonitor {
    pub fn new(history_limit: usize) -> Self {
        Self {
            state: Mutex::new(MonitorState::new(history_limit)),
            history_limit,
        }
    }

    pub fn record(&self, op: Operation, success: bool, latency_ms: f64, from_cache: bool) {
        self.state
            .lock()
            .get_mut(op)
            .record(success, latency_ms, from_cache);
        tracing::debug!(
            operation = ?op,
            success,
            latency_ms,
            from_cache,
            "request_recorded"
        );
    }

    /// Copy of the aggregate for `op`.
    pub fn operation(&self, op: Operation) -> OperationStats {
        self.state.lock().get(op).clone()
    }

    pub fn success_rate(&self, op: Operation) -> f64 {
        self.state.lock().get(op).success_rate()
    }

    pub fn average_latency_ms(&self, op: Operation) -> f64 {
        self.state.lock().get(op).average_latency_ms()
    }

    pub fn cache_hit_rate(&self, op: Operation) -> f64 {
        self.state.lock().get(op).cache_hit_rate()
    }

    /// Latency percentile (p in 0-100) in ms.
    pub fn latency_percentile(&self, op: Operation, p: f64) -> f64 {
        self.state.lock().get(op).latency_percentile(p)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let state = self.state.lock();
        StatsSnapshot {
            translation: state.translation.summary(),
            language_detection: state.language_detection.summary(),
        }
    }

    pub fn reset(&self) {
        *self.state.lock() = MonitorState::new(self.history_limit);
        info!("performance stats reset");
    }

    /// Emit the current snapshot as one log event.
    pub fn log_stats(&self) {
        let snapshot = self.snapshot();
        info!(
            translation_total = snapshot.translation.total_requests,
            translation_success_rate = snapshot.translation.success_rate,
            translation_avg_ms = snapshot.translation.average_latency_ms,
            translation_cache_hit_rate = snapshot.translation.cache_hit_rate,
            detection_total = snapshot.language_detection.total_requests,
            detection_success_rate = snapshot.language_detection.success_rate,
            detection_avg_ms = snapshot.language_detection.average_latency_ms,
            detection_cache_hit_rate = snapshot.language_detection.cache_hit_rate,
            "performance_stats"
        );
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl StatsSink for PerformanceMonitor {
    fn record_language_detection_request(&self, success: bool, latency_ms: f64, from_cache: bool) {
        self.record(Operation::LanguageDetection, success, latency_ms, from_cache);
    }

    fn record_translation_request(&self, success: bool, latency_ms: f64, from_cache: bool) {
        self.record(Operation::Translation, success, latency_ms, from_cache);
    }
}
