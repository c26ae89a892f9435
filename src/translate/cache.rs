//! Detection and translation caches over `ExpiringLruCache`.
//!
//! Keys are a truncated prefix of the input text, so two long inputs sharing
//! a prefix map to the same entry.
//! Detection key: first 100 chars. Translation key: first 50 chars | src | tgt.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use super::DetectionResult;
use crate::cache::{CacheStats, ExpiringLruCache};
use crate::clock::Clock;

pub const DETECTION_KEY_CHARS: usize = 100;
pub const TRANSLATION_KEY_CHARS: usize = 50;

/// Anything the maintenance task can sweep.
pub trait Sweep: Send + Sync {
    fn label(&self) -> &'static str;
    fn sweep_expired(&self) -> usize;
}

/// Longest prefix of `text` holding at most `max_chars` chars.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Detection cache stats also carry the gating threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectionCacheStats {
    #[serde(flatten)]
    pub cache: CacheStats,
    pub confidence_threshold: f64,
}

/// Caches detector output; results below `confidence_threshold` are never stored.
pub struct DetectionCache {
    inner: ExpiringLruCache<DetectionResult>,
    confidence_threshold: f64,
}

impl DetectionCache {
    pub fn new(
        max_size: usize,
        ttl: Duration,
        confidence_threshold: f64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: ExpiringLruCache::new("language_detection", max_size, ttl, clock),
            confidence_threshold,
        }
    }

    pub fn compute_key(text: &str) -> String {
        truncate_chars(text, DETECTION_KEY_CHARS).to_string()
    }

    pub fn lookup(&self, text: &str) -> Option<DetectionResult> {
        self.inner.get(&Self::compute_key(text))
    }

    /// Store `result` if it clears the threshold. Returns whether it was stored.
    pub fn record(&self, text: &str, result: &DetectionResult) -> bool {
        // NaN must not pass the gate either
        if !(result.confidence >= self.confidence_threshold) {
            debug!(
                language = %result.language,
                confidence = result.confidence,
                threshold = self.confidence_threshold,
                "detection_below_threshold_not_cached"
            );
            return false;
        }
        self.inner.set(Self::compute_key(text), result.clone());
        true
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    pub fn stats(&self) -> DetectionCacheStats {
        DetectionCacheStats {
            cache: self.inner.stats(),
            confidence_threshold: self.confidence_threshold,
        }
    }
}

impl Sweep for DetectionCache {
    fn label(&self) -> &'static str {
        self.inner.name()
    }

    fn sweep_expired(&self) -> usize {
        self.inner.sweep_expired()
    }
}

/// Caches translated text unconditionally.
pub struct TranslationCache {
    inner: ExpiringLruCache<String>,
}

impl TranslationCache {
    pub fn new(max_size: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: ExpiringLruCache::new("translation", max_size, ttl, clock),
        }
    }

    pub fn compute_key(text: &str, source_language: &str, target_language: &str) -> String {
        format!(
            "{}|{}|{}",
            truncate_chars(text, TRANSLATION_KEY_CHARS),
            source_language,
            target_language
        )
    }

    pub fn lookup(&self, text: &str, source_language: &str, target_language: &str) -> Option<String> {
        self.inner
            .get(&Self::compute_key(text, source_language, target_language))
    }

    pub fn record(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        translated_text: String,
    ) {
        self.inner.set(
            Self::compute_key(text, source_language, target_language),
            translated_text,
        );
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.stats()
    }
}

impl Sweep for TranslationCache {
    fn label(&self) -> &'static str {
        self.inner.name()
    }

    fn sweep_expired(&self) -> usize {
        self.inner.sweep_expired()
    }
}
