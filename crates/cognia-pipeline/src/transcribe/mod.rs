//! Speech transcription service
//!
//! Wraps the Whisper engine behind the degrade-don't-fail contract: a
//! missing file, an unloadable model, or a failed decode each produce an
//! empty outcome with ordered human-readable warnings, never an error the
//! assessment flow has to handle. Language reconciliation and optional
//! transcript translation happen here.

pub mod engine;
pub mod language;
pub mod translate;
pub mod vad;

use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use cognia_core::config::Config;
use serde::Serialize;

use crate::audio;
use crate::models::ModelManager;
use engine::WhisperEngine;
use translate::Translator;

/// Detection confidence below which an accuracy warning is attached.
const CONFIDENCE_WARN_THRESHOLD: f32 = 0.75;

/// Result of processing one speech sample.
///
/// All fields are best-effort; `warnings` records everything that degraded
/// along the way, in the order it happened.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TranscriptionOutcome {
    pub transcript: Option<String>,
    /// Normalized detected language tag
    pub detected_language: Option<String>,
    /// Language identification confidence in [0, 1]
    pub language_confidence: Option<f32>,
    pub translation: Option<String>,
    pub language_mismatch: bool,
    pub warnings: Vec<String>,
}

/// Transcription service with lazily-loaded engine and optional translator.
pub struct SpeechTranscriber {
    models: ModelManager,
    device: cognia_core::config::Device,
    translator: Option<Translator>,
    engine: OnceLock<Result<Arc<WhisperEngine>, String>>,
}

impl SpeechTranscriber {
    /// Build the service from configuration. No model work happens here;
    /// the engine loads on first use, once per process.
    pub fn from_config(config: &Config) -> Self {
        let translator = config.translation.enabled.then(|| {
            Translator::new(
                config.translation.endpoint.clone(),
                config.translation.target_language.clone(),
                Duration::from_secs(config.translation.timeout_secs),
            )
        });

        Self {
            models: ModelManager::from_config(config),
            device: config.asr.device,
            translator,
            engine: OnceLock::new(),
        }
    }

    /// Transcribe one audio file and reconcile the language.
    pub fn process_file(&self, path: &Path, expected_language: Option<&str>) -> TranscriptionOutcome {
        let mut result = TranscriptionOutcome::default();

        if !path.exists() {
            result
                .warnings
                .push("Audio file missing for transcription".to_string());
            return result;
        }

        let engine = match self.engine() {
            Ok(engine) => engine,
            Err(e) => {
                // Load already failed for this process; no retry within the call
                result.warnings.push(format!("Speech model unavailable: {e}"));
                return result;
            }
        };

        let normalized_expected = language::normalize_tag(expected_language);

        let samples = match audio::load_audio(path) {
            Ok((samples, _rate)) => samples,
            Err(e) => {
                result.warnings.push(format!("Transcription failed: {e}"));
                return result;
            }
        };

        match engine.transcribe(&samples) {
            Ok(output) => {
                let detected = language::normalize_tag(output.language.as_deref());
                let transcript = output.text.trim().to_string();

                result.transcript = (!transcript.is_empty()).then_some(transcript);
                result.detected_language = detected.clone();
                result.language_confidence = output.confidence;

                if let Some(confidence) = output.confidence {
                    if confidence < CONFIDENCE_WARN_THRESHOLD {
                        result.warnings.push(
                            "Spoken language confidence is low; transcription accuracy may be affected."
                                .to_string(),
                        );
                    }
                }

                if result.transcript.is_none() {
                    result
                        .warnings
                        .push("No speech content detected in the recording.".to_string());
                }

                if let (Some(expected), Some(detected)) = (&normalized_expected, &detected) {
                    if expected != detected {
                        result.language_mismatch = true;
                        result.warnings.push(format!(
                            "Detected language '{detected}' differs from selected '{expected}'."
                        ));
                    }
                }

                self.translate_transcript(&mut result, normalized_expected.as_deref());
            }
            Err(e) => {
                log::warn!("transcription failed for {:?}: {}", path, e);
                result.warnings.push(format!("Transcription failed: {e}"));
            }
        }

        result
    }

    /// Translate a non-empty transcript in place, degrading to a warning.
    fn translate_transcript(&self, result: &mut TranscriptionOutcome, expected: Option<&str>) {
        let Some(translator) = &self.translator else {
            return;
        };
        let Some(transcript) = &result.transcript else {
            return;
        };

        let source = result
            .detected_language
            .as_deref()
            .or(expected)
            .unwrap_or("auto");

        match translator.translate(transcript, source) {
            Ok(translation) => result.translation = Some(translation),
            Err(e) => {
                log::warn!("translation failed: {e}");
                result
                    .warnings
                    .push("Translation unavailable; using original transcript.".to_string());
            }
        }
    }

    /// Lazily load the engine, at most once per process.
    fn engine(&self) -> Result<&Arc<WhisperEngine>, &String> {
        self.engine
            .get_or_init(|| {
                WhisperEngine::load(&self.models, self.device)
                    .map(Arc::new)
                    .map_err(|e| {
                        log::warn!("whisper engine failed to load: {e}");
                        e.to_string()
                    })
            })
            .as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cognia_core::config::Config;

    fn transcriber() -> SpeechTranscriber {
        let mut config = Config::default();
        config.model_dir = Some(std::env::temp_dir().join("cognia-transcribe-test"));
        // Keep tests offline
        config.translation.enabled = false;
        SpeechTranscriber::from_config(&config)
    }

    #[test]
    fn missing_file_yields_warning_and_empty_outcome() {
        let t = transcriber();
        let outcome = t.process_file(Path::new("/nonexistent/speech.wav"), Some("en"));
        assert!(outcome.transcript.is_none());
        assert!(outcome.detected_language.is_none());
        assert!(!outcome.language_mismatch);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("missing"));
    }

    #[test]
    fn warnings_preserve_order() {
        let mut outcome = TranscriptionOutcome::default();
        outcome.warnings.push("first".into());
        outcome.warnings.push("second".into());
        assert_eq!(outcome.warnings, vec!["first", "second"]);
    }

    #[test]
    fn outcome_serializes_without_nulls_in_warnings() {
        let outcome = TranscriptionOutcome {
            transcript: Some("hello".into()),
            warnings: vec!["w1".into()],
            ..Default::default()
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"warnings\":[\"w1\"]"));
    }
}
