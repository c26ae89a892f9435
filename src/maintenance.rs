//! Background maintenance: periodic cache expiry sweeps and stats flushes.
//! Every task runs on its own interval and stops when the shared
//! CancellationToken fires; none of them touches in-flight requests.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::metrics::PerformanceMonitor;
use crate::translate::cache::Sweep;
use crate::translate::TranslationService;

/// Owns the maintenance tasks. Dropping it stops them.
pub struct MaintenanceHandle {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl MaintenanceHandle {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    /// Start sweeps for both service caches and the periodic stats flush.
    /// Must be called from within a tokio runtime.
    pub fn start(
        service: &TranslationService,
        monitor: Arc<PerformanceMonitor>,
        settings: &Settings,
    ) -> Self {
        let mut handle = Self::new();
        handle.spawn_sweeper(
            Arc::clone(service.translation_cache()) as Arc<dyn Sweep>,
            settings.translation.cache.sweep_interval(),
        );
        handle.spawn_sweeper(
            Arc::clone(service.detection_cache()) as Arc<dyn Sweep>,
            settings.detection.cache.sweep_interval(),
        );
        handle.spawn_stats_flush(monitor, settings.stats.log_interval());
        info!(tasks = handle.tasks.len(), "maintenance started");
        handle
    }

    /// Sweep `cache` every `period`. A zero period disables the sweeper.
    pub fn spawn_sweeper(&mut self, cache: Arc<dyn Sweep>, period: Duration) {
        if period.is_zero() {
            warn!(cache = cache.label(), "sweep interval is zero, sweeper disabled");
            return;
        }
        let token = self.token.child_token();
        self.tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = cache.sweep_expired();
                        if removed > 0 {
                            info!(cache = cache.label(), removed, "expired cache entries swept");
                        }
                    }
                }
            }
            debug!(cache = cache.label(), "sweeper stopped");
        }));
    }

    /// Log a stats snapshot every `period`. A zero period disables the flush.
    pub fn spawn_stats_flush(&mut self, monitor: Arc<PerformanceMonitor>, period: Duration) {
        if period.is_zero() {
            warn!("stats log interval is zero, periodic flush disabled");
            return;
        }
        let token = self.token.child_token();
        self.tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => monitor.log_stats(),
                }
            }
            debug!("stats flush stopped");
        }));
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Signal every task to stop without waiting.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Stop every task and wait for them to exit.
    pub async fn shutdown_and_wait(mut self) {
        self.token.cancel();
        for task in std::mem::take(&mut self.tasks) {
            if let Err(e) = task.await {
                warn!(error = %e, "maintenance task ended abnormally");
            }
        }
    }
}

impl Default for MaintenanceHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MaintenanceHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::translate::cache::TranslationCache;

    #[tokio::test]
    async fn sweeper_removes_expired_entries_without_lookups() {
        let clock = Arc::new(ManualClock::new());
        let cache = Arc::new(TranslationCache::new(
            10,
            Duration::from_secs(60),
            Arc::clone(&clock) as Arc<dyn Clock>,
        ));
        cache.record("Hello", "en", "ja", "こんにちは".into());
        cache.record("Bye", "en", "ja", "さようなら".into());
        clock.advance(Duration::from_secs(61));

        let mut handle = MaintenanceHandle::new();
        handle.spawn_sweeper(
            Arc::clone(&cache) as Arc<dyn Sweep>,
            Duration::from_millis(10),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(cache.len(), 0);
        handle.shutdown_and_wait().await;
    }

    #[tokio::test]
    async fn shutdown_stops_all_tasks() {
        let cache = Arc::new(TranslationCache::new(
            10,
            Duration::from_secs(60),
            Arc::new(ManualClock::new()),
        ));
        let mut handle = MaintenanceHandle::new();
        handle.spawn_sweeper(Arc::clone(&cache) as Arc<dyn Sweep>, Duration::from_secs(3600));
        handle.spawn_stats_flush(Arc::new(PerformanceMonitor::default()), Duration::from_secs(3600));
        assert_eq!(handle.task_count(), 2);

        tokio::time::timeout(Duration::from_secs(1), handle.shutdown_and_wait())
            .await
            .expect("maintenance tasks should stop promptly");
    }

    #[tokio::test]
    async fn zero_interval_disables_task() {
        let mut handle = MaintenanceHandle::new();
        handle.spawn_stats_flush(Arc::new(PerformanceMonitor::default()), Duration::ZERO);
        assert_eq!(handle.task_count(), 0);
    }
}
