//! Translation orchestrator.
//!
//! Per request: validate -> detect (cache, then detector) -> same-language
//! short-circuit -> translation cache -> translator -> compose.
//! Cache reads and writes never straddle an `.await`; two overlapping requests
//! for the same key may both miss and both call out, and the second insert
//! simply overwrites the first.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, info_span, warn, Instrument};

use super::cache::{DetectionCache, DetectionCacheStats, TranslationCache};
use super::retry::RetryPolicy;
use super::{Detection, LanguageDetector, TextTranslator, TranslationResult};
use crate::cache::CacheStats;
use crate::clock::{Clock, SystemClock};
use crate::config::Settings;
use crate::error::TranslateError;
use crate::metrics::StatsSink;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ServiceStats {
    pub translation_cache: CacheStats,
    pub detection_cache: DetectionCacheStats,
}

pub struct TranslationService {
    detector: Arc<dyn LanguageDetector>,
    translator: Arc<dyn TextTranslator>,
    stats: Arc<dyn StatsSink>,
    detection_cache: Arc<DetectionCache>,
    translation_cache: Arc<TranslationCache>,
    retry: RetryPolicy,
    supported_languages: Vec<String>,
    default_target_language: String,
}

impl TranslationService {
    pub fn new(
        settings: &Settings,
        detector: Arc<dyn LanguageDetector>,
        translator: Arc<dyn TextTranslator>,
        stats: Arc<dyn StatsSink>,
    ) -> Self {
        Self::with_clock(settings, detector, translator, stats, Arc::new(SystemClock))
    }

    /// Same as `new`, with the caches reading time from `clock`.
    pub fn with_clock(
        settings: &Settings,
        detector: Arc<dyn LanguageDetector>,
        translator: Arc<dyn TextTranslator>,
        stats: Arc<dyn StatsSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let detection = &settings.detection;
        let translation = &settings.translation;

        let detection_cache = Arc::new(DetectionCache::new(
            detection.cache.max_size,
            detection.cache.ttl(),
            detection.confidence_threshold,
            Arc::clone(&clock),
        ));
        let translation_cache = Arc::new(TranslationCache::new(
            translation.cache.max_size,
            translation.cache.ttl(),
            clock,
        ));

        info!(
            detection_cache_size = detection.cache.max_size,
            detection_ttl_secs = detection.cache.ttl_secs,
            confidence_threshold = detection.confidence_threshold,
            translation_cache_size = translation.cache.max_size,
            translation_ttl_secs = translation.cache.ttl_secs,
            "translation service initialized"
        );

        Self {
            detector,
            translator,
            stats,
            detection_cache,
            translation_cache,
            retry: settings.retry.policy(),
            supported_languages: translation.supported_languages.clone(),
            default_target_language: translation.default_target_language.clone(),
        }
    }

    /// Detect the language of `text`, consulting the detection cache first.
    pub async fn detect(&self, text: &str) -> Result<Detection, TranslateError> {
        if text.trim().is_empty() {
            return Err(TranslateError::EmptyText);
        }

        let start = Instant::now();

        if let Some(cached) = self.detection_cache.lookup(text) {
            self.stats
                .record_language_detection_request(true, elapsed_ms(start), true);
            debug!(language = %cached.language, "language_detection_cache_hit");
            return Ok(Detection::new(cached, true));
        }

        let outcome = self
            .retry
            .run("detect", || self.detector.detect(text))
            .await;
        let latency_ms = elapsed_ms(start);

        match outcome {
            Ok(result) => {
                self.stats
                    .record_language_detection_request(true, latency_ms, false);
                self.detection_cache.record(text, &result);
                debug!(
                    language = %result.language,
                    confidence = result.confidence,
                    latency_ms,
                    "language_detected"
                );
                Ok(Detection::new(result, false))
            }
            Err(err) => {
                self.stats
                    .record_language_detection_request(false, latency_ms, false);
                warn!(error = %err, status = ?err.status(), "language detection failed");
                Err(TranslateError::Detection(err))
            }
        }
    }

    /// Translate `text` into `target_language`. With no `source_language`, the
    /// source is detected first.
    pub async fn translate(
        &self,
        text: &str,
        target_language: &str,
        source_language: Option<&str>,
    ) -> Result<TranslationResult, TranslateError> {
        let request_id = uuid::Uuid::new_v4();
        let span = info_span!("translate", %request_id, target = target_language);
        self.translate_inner(text, target_language, source_language)
            .instrument(span)
            .await
    }

    /// Translate into the configured default target language.
    pub async fn translate_default(&self, text: &str) -> Result<TranslationResult, TranslateError> {
        self.translate(text, &self.default_target_language, None).await
    }

    async fn translate_inner(
        &self,
        text: &str,
        target_language: &str,
        source_language: Option<&str>,
    ) -> Result<TranslationResult, TranslateError> {
        if text.trim().is_empty() {
            return Err(TranslateError::EmptyText);
        }
        if !self.is_supported(target_language) {
            return Err(TranslateError::UnsupportedLanguage(target_language.to_string()));
        }

        let explicit_source = source_language.filter(|s| !s.trim().is_empty());
        let (source, confidence, language_from_cache) = match explicit_source {
            Some(source) => (source.to_string(), None, false),
            None => {
                let detection = self.detect(text).await?;
                (detection.language, Some(detection.confidence), detection.from_cache)
            }
        };

        if source == target_language {
            debug!(language = %source, "source equals target, skipping translation");
            return Ok(TranslationResult {
                translated_text: text.to_string(),
                source_language: source,
                target_language: target_language.to_string(),
                confidence,
                from_cache: false,
                language_from_cache,
            });
        }

        let start = Instant::now();

        if let Some(cached) = self.translation_cache.lookup(text, &source, target_language) {
            self.stats
                .record_translation_request(true, elapsed_ms(start), true);
            debug!(source = %source, "translation_cache_hit");
            return Ok(TranslationResult {
                translated_text: cached,
                source_language: source,
                target_language: target_language.to_string(),
                confidence,
                from_cache: true,
                language_from_cache,
            });
        }

        let outcome = self
            .retry
            .run("translate", || {
                self.translator.translate(text, &source, target_language)
            })
            .await;
        let latency_ms = elapsed_ms(start);

        let translated_text = match outcome {
            Ok(translated) => translated,
            Err(err) => {
                self.stats
                    .record_translation_request(false, latency_ms, false);
                warn!(error = %err, status = ?err.status(), "translation failed");
                return Err(TranslateError::Translation(err));
            }
        };

        self.stats.record_translation_request(true, latency_ms, false);
        self.translation_cache
            .record(text, &source, target_language, translated_text.clone());
        debug!(source = %source, latency_ms, "translated");

        Ok(TranslationResult {
            translated_text,
            source_language: source,
            target_language: target_language.to_string(),
            confidence,
            from_cache: false,
            language_from_cache,
        })
    }

    pub fn is_supported(&self, language: &str) -> bool {
        self.supported_languages.iter().any(|l| l == language)
    }

    pub fn supported_languages(&self) -> &[String] {
        &self.supported_languages
    }

    pub fn default_target_language(&self) -> &str {
        &self.default_target_language
    }

    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            translation_cache: self.translation_cache.stats(),
            detection_cache: self.detection_cache.stats(),
        }
    }

    /// Administrative reset of both caches.
    pub fn clear_caches(&self) {
        self.translation_cache.clear();
        self.detection_cache.clear();
        info!("translation service caches cleared");
    }

    /// The service holds no connection state, so it is usable once constructed.
    pub fn is_available(&self) -> bool {
        true
    }

    pub fn detection_cache(&self) -> &Arc<DetectionCache> {
        &self.detection_cache
    }

    pub fn translation_cache(&self) -> &Arc<TranslationCache> {
        &self.translation_cache
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
