//! Google Translate v2 style HTTP client.
//! Connection pooling via reqwest. All transport and status failures are
//! classified into `ServiceError` here; retries happen one layer up.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::{DetectionResult, LanguageDetector, TextTranslator};
use crate::config::{ConfigError, Settings};
use crate::error::ServiceError;

/// Detection + translation over one HTTP endpoint.
pub struct HttpTranslationClient {
    http: reqwest::Client,
    api_key: String,
    api_url: String,
    retry_rate_limited: bool,
}

impl HttpTranslationClient {
    pub fn new(settings: &Settings) -> Result<Self, ConfigError> {
        let api_key = settings.translation.api_key.clone().ok_or_else(|| {
            ConfigError::Invalid("translation api_key (or GOOGLE_API_KEY) not set".into())
        })?;

        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| ConfigError::Invalid(format!("http client: {e}")))?;

        Ok(Self {
            http,
            api_key,
            api_url: settings.translation.api_url.trim_end_matches('/').to_string(),
            retry_rate_limited: settings.retry.retry_rate_limited,
        })
    }

    async fn post<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<T, ServiceError> {
        let response = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(ServiceError::from_status(
                status.as_u16(),
                format!(
                    "unexpected status {}: {}",
                    status,
                    body_text.chars().take(200).collect::<String>()
                ),
                self.retry_rate_limited,
            ));
        }

        response.json::<T>().await.map_err(|e| self.classify(e))
    }

    fn classify(&self, err: reqwest::Error) -> ServiceError {
        if err.is_timeout() {
            ServiceError::timeout(err.to_string())
        } else if let Some(status) = err.status() {
            ServiceError::from_status(status.as_u16(), err.to_string(), self.retry_rate_limited)
        } else if err.is_decode() {
            ServiceError::decode(err.to_string())
        } else {
            ServiceError::transport(err.to_string())
        }
    }
}

#[async_trait]
impl LanguageDetector for HttpTranslationClient {
    async fn detect(&self, text: &str) -> Result<DetectionResult, ServiceError> {
        let url = format!("{}/detect", self.api_url);
        let envelope: Envelope<DetectData> =
            self.post(&url, &serde_json::json!({ "q": text })).await?;
        let result = first_detection(envelope.data)?;
        debug!(language = %result.language, confidence = result.confidence, "detect_api_ok");
        Ok(result)
    }
}

#[async_trait]
impl TextTranslator for HttpTranslationClient {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ServiceError> {
        let body = serde_json::json!({
            "q": text,
            "source": source_language,
            "target": target_language,
            "format": "text"
        });
        let envelope: Envelope<TranslateData> = self.post(&self.api_url, &body).await?;
        first_translation(envelope.data)
    }
}

// --- response types ---

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct DetectData {
    detections: Vec<Vec<DetectionResult>>,
}

#[derive(Deserialize)]
struct TranslateData {
    translations: Vec<TranslatedItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslatedItem {
    translated_text: String,
}

fn first_detection(data: DetectData) -> Result<DetectionResult, ServiceError> {
    data.detections
        .into_iter()
        .next()
        .and_then(|candidates| candidates.into_iter().next())
        .ok_or_else(|| ServiceError::decode("detect response has no detections"))
}

fn first_translation(data: TranslateData) -> Result<String, ServiceError> {
    data.translations
        .into_iter()
        .next()
        .map(|t| t.translated_text)
        .ok_or_else(|| ServiceError::decode("translate response has no translations"))
}
