//! Transcript translation client
//!
//! Talks to a LibreTranslate-compatible endpoint with a hard request
//! timeout. Translation is strictly best-effort: the caller converts any
//! failure into a warning and keeps the original transcript.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("translation request failed: {0}")]
    Request(String),

    #[error("unexpected translation response: {0}")]
    Response(String),
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

/// Bounded-timeout translation client.
pub struct Translator {
    endpoint: String,
    target: String,
    agent: ureq::Agent,
}

impl Translator {
    pub fn new(endpoint: String, target: String, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .build();
        Self {
            endpoint,
            target,
            agent,
        }
    }

    /// Translate `text` from `source` into the configured target language.
    pub fn translate(&self, text: &str, source: &str) -> Result<String, TranslateError> {
        let body = serde_json::json!({
            "q": text,
            "source": source,
            "target": self.target,
            "format": "text",
        });

        let response = self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", "application/json")
            .send_string(&body.to_string())
            .map_err(|e| TranslateError::Request(e.to_string()))?;

        let payload = response
            .into_string()
            .map_err(|e| TranslateError::Response(e.to_string()))?;

        let parsed: TranslateResponse = serde_json::from_str(&payload)
            .map_err(|e| TranslateError::Response(format!("{e}: {payload}")))?;

        Ok(parsed.translated_text)
    }

    /// Target language tag this client translates into.
    pub fn target_language(&self) -> &str {
        &self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_endpoint_is_request_error() {
        let translator = Translator::new(
            "http://127.0.0.1:1/translate".into(),
            "en".into(),
            Duration::from_millis(200),
        );
        let err = translator.translate("bonjour", "fr").unwrap_err();
        assert!(matches!(err, TranslateError::Request(_)));
    }

    #[test]
    fn response_shape_parses() {
        let parsed: TranslateResponse =
            serde_json::from_str(r#"{"translatedText": "hello"}"#).unwrap();
        assert_eq!(parsed.translated_text, "hello");
    }

    #[test]
    fn target_language_is_exposed() {
        let translator =
            Translator::new("http://x/translate".into(), "en".into(), Duration::from_secs(1));
        assert_eq!(translator.target_language(), "en");
    }
}
