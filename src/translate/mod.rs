//! Language detection + translation: result types, backend traits, and the
//! caching orchestrator that ties them together.

pub mod cache;
pub mod http;
pub mod local;
pub mod retry;
pub mod service;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

pub use service::{ServiceStats, TranslationService};

/// Output of a language detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub language: String,
    /// In [0, 1].
    pub confidence: f64,
}

/// Detection as seen by callers of the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub language: String,
    pub confidence: f64,
    pub from_cache: bool,
}

impl Detection {
    fn new(result: DetectionResult, from_cache: bool) -> Self {
        Self {
            language: result.language,
            confidence: result.confidence,
            from_cache,
        }
    }
}

/// Final composed translation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResult {
    pub translated_text: String,
    pub source_language: String,
    pub target_language: String,
    /// Detection confidence; None when the source language was given explicitly.
    pub confidence: Option<f64>,
    pub from_cache: bool,
    pub language_from_cache: bool,
}

/// Detector adapter (remote API or local model).
#[async_trait]
pub trait LanguageDetector: Send + Sync {
    async fn detect(&self, text: &str) -> Result<DetectionResult, ServiceError>;
}

/// Translator adapter. Returns the translated text.
#[async_trait]
pub trait TextTranslator: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ServiceError>;
}
