//! Offline language detection using whatlang.

use async_trait::async_trait;
use whatlang::Lang;

use super::{DetectionResult, LanguageDetector};
use crate::error::ServiceError;

/// Detector that never leaves the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalDetector;

#[async_trait]
impl LanguageDetector for LocalDetector {
    async fn detect(&self, text: &str) -> Result<DetectionResult, ServiceError> {
        detect_language(text)
            .ok_or_else(|| ServiceError::decode("unable to determine language of text"))
    }
}

/// Detects the dominant language of `text`.
/// Returns an ISO 639-1 code where one is known, otherwise whatlang's ISO 639-3 code.
pub fn detect_language(text: &str) -> Option<DetectionResult> {
    let info = whatlang::detect(text)?;
    Some(DetectionResult {
        language: lang_to_code(info.lang()).to_string(),
        confidence: info.confidence(),
    })
}

/// whatlang languages that have an ISO 639-1 code.
const ISO_639_1: &[(Lang, &str)] = &[
    (Lang::Afr, "af"),
    (Lang::Aka, "ak"),
    (Lang::Amh, "am"),
    (Lang::Ara, "ar"),
    (Lang::Aze, "az"),
    (Lang::Bel, "be"),
    (Lang::Ben, "bn"),
    (Lang::Bul, "bg"),
    (Lang::Cat, "ca"),
    (Lang::Ces, "cs"),
    (Lang::Cmn, "zh"),
    (Lang::Dan, "da"),
    (Lang::Deu, "de"),
    (Lang::Ell, "el"),
    (Lang::Eng, "en"),
    (Lang::Epo, "eo"),
    (Lang::Est, "et"),
    (Lang::Fin, "fi"),
    (Lang::Fra, "fr"),
    (Lang::Guj, "gu"),
    (Lang::Heb, "he"),
    (Lang::Hin, "hi"),
    (Lang::Hrv, "hr"),
    (Lang::Hun, "hu"),
    (Lang::Hye, "hy"),
    (Lang::Ind, "id"),
    (Lang::Ita, "it"),
    (Lang::Jav, "jv"),
    (Lang::Jpn, "ja"),
    (Lang::Kan, "kn"),
    (Lang::Kat, "ka"),
    (Lang::Khm, "km"),
    (Lang::Kor, "ko"),
    (Lang::Lat, "la"),
    (Lang::Lav, "lv"),
    (Lang::Lit, "lt"),
    (Lang::Mal, "ml"),
    (Lang::Mar, "mr"),
    (Lang::Mkd, "mk"),
    (Lang::Mya, "my"),
    (Lang::Nep, "ne"),
    (Lang::Nld, "nl"),
    (Lang::Nob, "nb"),
    (Lang::Ori, "or"),
    (Lang::Pan, "pa"),
    (Lang::Pes, "fa"),
    (Lang::Pol, "pl"),
    (Lang::Por, "pt"),
    (Lang::Ron, "ro"),
    (Lang::Rus, "ru"),
    (Lang::Sin, "si"),
    (Lang::Slk, "sk"),
    (Lang::Slv, "sl"),
    (Lang::Sna, "sn"),
    (Lang::Spa, "es"),
    (Lang::Srp, "sr"),
    (Lang::Swe, "sv"),
    (Lang::Tam, "ta"),
    (Lang::Tel, "te"),
    (Lang::Tgl, "tl"),
    (Lang::Tha, "th"),
    (Lang::Tuk, "tk"),
    (Lang::Tur, "tr"),
    (Lang::Ukr, "uk"),
    (Lang::Urd, "ur"),
    (Lang::Uzb, "uz"),
    (Lang::Vie, "vi"),
    (Lang::Yid, "yi"),
    (Lang::Zul, "zu"),
];

fn lang_to_code(lang: Lang) -> &'static str {
    ISO_639_1
        .iter()
        .find(|(l, _)| *l == lang)
        .map_or_else(|| lang.code(), |&(_, code)| code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_japanese_kana() {
        let result = detect_language("こんにちは、今日はいい天気ですね。").unwrap();
        assert_eq!(result.language, "ja");
        assert!((0.0..=1.0).contains(&result.confidence));
    }

    #[test]
    fn detects_english_sentence() {
        let result = detect_language(
            "The weather is lovely today and we are going for a long walk in the park with friends.",
        )
        .unwrap();
        assert_eq!(result.language, "en");
    }

    #[test]
    fn maps_to_two_letter_codes() {
        assert_eq!(lang_to_code(Lang::Cmn), "zh");
        assert_eq!(lang_to_code(Lang::Pes), "fa");
        assert_eq!(lang_to_code(Lang::Nob), "nb");
    }

    #[test]
    fn every_table_code_is_two_letters() {
        for (lang, code) in ISO_639_1 {
            assert_eq!(code.len(), 2, "{lang:?}");
        }
    }

    #[tokio::test]
    async fn undetectable_text_is_a_fatal_error() {
        let err = LocalDetector.detect("1234 5678").await.unwrap_err();
        assert!(!err.is_retryable());
    }
}
