//! babelcache: language detection + translation orchestration with
//! expiring LRU caches, retry on transient backend failures and
//! per-operation performance stats.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod maintenance;
pub mod metrics;
pub mod translate;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

pub use config::{ConfigError, Settings};
pub use error::{ErrorKind, ServiceError, TranslateError};
pub use maintenance::MaintenanceHandle;
pub use metrics::{PerformanceMonitor, StatsSink};
pub use translate::{
    Detection, DetectionResult, LanguageDetector, TextTranslator, TranslationResult,
    TranslationService,
};

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// `babelcache=info` filter. Calling this twice is a no-op.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("babelcache=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// A running service: orchestrator, its stats monitor and the background
/// maintenance that keeps both caches swept.
pub struct AppContext {
    pub service: Arc<TranslationService>,
    pub monitor: Arc<PerformanceMonitor>,
    pub maintenance: MaintenanceHandle,
}

impl AppContext {
    /// Wire everything together. Must be called from within a tokio runtime.
    pub fn start(
        settings: &Settings,
        detector: Arc<dyn LanguageDetector>,
        translator: Arc<dyn TextTranslator>,
    ) -> Self {
        let monitor = Arc::new(PerformanceMonitor::new(settings.stats.history_limit));
        let service = Arc::new(TranslationService::new(
            settings,
            detector,
            translator,
            Arc::clone(&monitor) as Arc<dyn StatsSink>,
        ));
        let maintenance = MaintenanceHandle::start(&service, Arc::clone(&monitor), settings);

        info!(
            default_target = service.default_target_language(),
            languages = service.supported_languages().len(),
            "babelcache started"
        );

        Self {
            service,
            monitor,
            maintenance,
        }
    }

    /// Stop background maintenance and log final stats.
    pub async fn shutdown(self) {
        self.maintenance.shutdown_and_wait().await;
        self.monitor.log_stats();
    }
}
