//! Assessment domain model
//!
//! These types are created by the persistence layer before the pipeline runs
//! and are read-only inputs to it. The pipeline never mutates an assessment;
//! everything it derives (features, embeddings, predictions) is ephemeral.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One recorded task attempt within an assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechSample {
    /// Identifier of the cognitive task this recording belongs to
    /// (e.g. "word_recall", "picture_description")
    pub task_id: String,
    /// Path to the recorded audio file
    pub audio_path: PathBuf,
    /// Transcript produced earlier in the intake flow, if any
    #[serde(default)]
    pub transcript: Option<String>,
    /// Language detected earlier in the intake flow, if any
    #[serde(default)]
    pub detected_language: Option<String>,
}

/// One evaluation event: normalized per-domain scores plus recordings.
///
/// Scores are normalized to [0, 1] by the task scoring layer. `None` means
/// the task was not administered; the feature builder substitutes fixed
/// defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Assessment {
    /// Identifier of the assessed subject (opaque to the pipeline)
    #[serde(default)]
    pub subject_id: Option<String>,
    /// Memory domain score in [0, 1]
    #[serde(default)]
    pub memory_score: Option<f32>,
    /// Language domain score in [0, 1]
    #[serde(default)]
    pub language_score: Option<f32>,
    /// Executive function domain score in [0, 1]
    #[serde(default)]
    pub executive_score: Option<f32>,
    /// Set by the longitudinal comparison when scores dropped significantly
    /// since the prior assessment (e.g. >3 MMSE-equivalent points)
    #[serde(default)]
    pub score_declined: bool,
    /// Recorded speech samples, zero or more
    #[serde(default)]
    pub samples: Vec<SpeechSample>,
}

/// Raised when an assessment carries malformed fields. This is the only
/// fatal input condition in the pipeline; everything else degrades.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{field} score {value} is outside [0, 1]")]
    ScoreOutOfRange { field: &'static str, value: f32 },
}

impl Assessment {
    /// Validate score ranges before any model work begins.
    pub fn validate(&self) -> Result<(), DomainError> {
        for (field, value) in [
            ("memory", self.memory_score),
            ("language", self.language_score),
            ("executive", self.executive_score),
        ] {
            if let Some(v) = value {
                if !(0.0..=1.0).contains(&v) || v.is_nan() {
                    return Err(DomainError::ScoreOutOfRange { field, value: v });
                }
            }
        }
        Ok(())
    }
}

/// Static demographic and health attributes of the assessed subject.
///
/// All fields are optional; the tabular feature builder substitutes the
/// fixed defaults the model was trained with when a field is absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserHealthProfile {
    /// Age in years (model range 60-90)
    pub age: Option<u32>,
    /// Sex code (0/1, as encoded in the training data)
    pub sex: Option<u8>,
    /// Education tier (0 = none through 3 = higher)
    pub education: Option<u8>,
    /// Family history of dementia
    pub family_history: Option<bool>,
    pub diabetes: Option<bool>,
    pub hypertension: Option<bool>,
    pub depression: Option<bool>,
    /// Prior head injury
    pub head_injury: Option<bool>,
    /// Sleep quality, 0-10
    pub sleep_quality: Option<f32>,
    /// Physical activity, 0-10
    pub physical_activity: Option<f32>,
    pub smoking: Option<bool>,
    /// Alcohol consumption in drinks per week
    pub alcohol_per_week: Option<f32>,
    /// Diet quality, 0-10
    pub diet_quality: Option<f32>,
    pub height_cm: Option<f32>,
    pub weight_kg: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_scores_pass() {
        let assessment = Assessment {
            memory_score: Some(0.5),
            language_score: Some(1.0),
            executive_score: Some(0.0),
            ..Default::default()
        };
        assert!(assessment.validate().is_ok());
    }

    #[test]
    fn absent_scores_pass() {
        assert!(Assessment::default().validate().is_ok());
    }

    #[test]
    fn out_of_range_score_fails() {
        let assessment = Assessment {
            memory_score: Some(1.5),
            ..Default::default()
        };
        let err = assessment.validate().unwrap_err();
        assert!(err.to_string().contains("memory"));
    }

    #[test]
    fn nan_score_fails() {
        let assessment = Assessment {
            executive_score: Some(f32::NAN),
            ..Default::default()
        };
        assert!(assessment.validate().is_err());
    }

    #[test]
    fn sample_deserializes_without_optional_fields() {
        let yaml = "task_id: word_recall\naudio_path: /tmp/a.wav\n";
        let sample: SpeechSample = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(sample.task_id, "word_recall");
        assert!(sample.transcript.is_none());
        assert!(sample.detected_language.is_none());
    }
}
