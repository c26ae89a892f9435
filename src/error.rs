//! Error types shared by the retry wrapper, the HTTP adapter and the orchestrator.

use thiserror::Error;

/// Whether a failed external call may be attempted again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Fatal,
}

/// Failure of an external detection/translation call, classified once where it is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ServiceError {
    kind: ErrorKind,
    status: Option<u16>,
    message: String,
}

impl ServiceError {
    /// Classify an HTTP status: 5xx is transient, everything else fatal.
    /// 429 is transient only when `retry_rate_limited` is set.
    pub fn from_status(status: u16, message: impl Into<String>, retry_rate_limited: bool) -> Self {
        let kind = match status {
            500..=u16::MAX => ErrorKind::Transient,
            429 if retry_rate_limited => ErrorKind::Transient,
            _ => ErrorKind::Fatal,
        };
        Self {
            kind,
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Transient,
            status: None,
            message: message.into(),
        }
    }

    /// Connection-level failure (refused, reset, DNS).
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Transient,
            status: None,
            message: message.into(),
        }
    }

    /// The service answered, but not with anything we can use.
    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Fatal,
            status: None,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn is_retryable(&self) -> bool {
        self.kind == ErrorKind::Transient
    }
}

/// Errors surfaced by `TranslationService`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("text must not be empty")]
    EmptyText,

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("language detection failed: {0}")]
    Detection(#[source] ServiceError),

    #[error("translation failed: {0}")]
    Translation(#[source] ServiceError),
}

impl TranslateError {
    /// The underlying service failure, if this error came from an external call.
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            TranslateError::Detection(e) | TranslateError::Translation(e) => Some(e),
            TranslateError::EmptyText | TranslateError::UnsupportedLanguage(_) => None,
        }
    }

    /// Validation failures are raised before any external call is made.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TranslateError::EmptyText | TranslateError::UnsupportedLanguage(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        for status in [500, 502, 503, 504] {
            assert!(ServiceError::from_status(status, "boom", false).is_retryable());
        }
    }

    #[test]
    fn client_errors_are_fatal() {
        for status in [400, 401, 403, 404] {
            let err = ServiceError::from_status(status, "nope", true);
            assert_eq!(err.kind(), ErrorKind::Fatal);
            assert_eq!(err.status(), Some(status));
        }
    }

    #[test]
    fn rate_limit_classification_is_configurable() {
        assert!(ServiceError::from_status(429, "slow down", true).is_retryable());
        assert!(!ServiceError::from_status(429, "slow down", false).is_retryable());
    }

    #[test]
    fn timeouts_retry_and_decode_failures_do_not() {
        assert!(ServiceError::timeout("timed out").is_retryable());
        assert!(ServiceError::transport("refused").is_retryable());
        assert!(!ServiceError::decode("bad json").is_retryable());
    }

    #[test]
    fn translate_error_keeps_service_error() {
        let inner = ServiceError::from_status(503, "unavailable", true);
        let err = TranslateError::Translation(inner.clone());
        assert_eq!(err.service_error(), Some(&inner));
        assert!(!err.is_validation());
        assert!(TranslateError::EmptyText.is_validation());
        assert_eq!(err.to_string(), "translation failed: unavailable");
    }
}
