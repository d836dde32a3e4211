//! Frozen tabular feature schema
//!
//! The persisted classifier, PCA projection, and scaler were fitted against
//! one fixed column order. `TabularFeatures::values()` is the single source
//! of truth for that order: changing it, or inserting a field anywhere but
//! the end, is a breaking schema change that requires retraining every
//! artifact. Append-only.

use serde::{Deserialize, Serialize};

/// Number of tabular features in the trained schema.
pub const TABULAR_LEN: usize = 15;

/// Width of the raw speech embedding (Wav2Vec2 hidden size).
pub const EMBEDDING_DIM: usize = 768;

/// Number of PCA components the embedding is reduced to before fusion.
pub const REDUCED_EMBEDDING_LEN: usize = 10;

/// Total fused vector length consumed by the classifier.
pub const FUSED_LEN: usize = TABULAR_LEN + REDUCED_EMBEDDING_LEN;

/// Clinically-structured tabular features for one assessment.
///
/// Derivations and defaults live in the pipeline's feature builder; this
/// record only fixes names, order, and the audit extras.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularFeatures {
    // Demographics
    pub age: f32,
    pub sex: f32,
    pub education: f32,
    // Derived cognitive scores
    /// MMSE-equivalent, 0-30 (lower is worse)
    pub mmse: f32,
    /// Functional assessment equivalent, 0-10 (lower is worse)
    pub functional: f32,
    /// 1 when the memory score suggests subjective complaints
    pub memory_complaints: f32,
    /// Activities of daily living equivalent, 0-10.
    /// Derived from the executive score by the same transform as
    /// `functional` - pending product review, the trained model expects
    /// both columns.
    pub adl: f32,
    // Health history
    pub family_history: f32,
    pub head_injury: f32,
    pub depression: f32,
    // Compound indices
    /// diabetes + hypertension + smoking, 0-3
    pub cardiovascular_index: f32,
    /// (sleep < 6) + (activity < 4), 0-2
    pub lifestyle_deficit: f32,
    // Lifestyle
    pub bmi: f32,
    pub alcohol_per_week: f32,
    pub diet_quality: f32,

    // Raw inputs kept for audit output; not part of the model vector
    pub raw_memory: f32,
    pub raw_executive: f32,
    /// Raw sleep quality, used by recommendation rules
    pub raw_sleep_quality: f32,
    /// Raw physical activity, used by recommendation rules
    pub raw_physical_activity: f32,
}

impl TabularFeatures {
    /// Feature values in the trained column order.
    pub fn values(&self) -> [f32; TABULAR_LEN] {
        [
            self.age,
            self.sex,
            self.education,
            self.mmse,
            self.functional,
            self.memory_complaints,
            self.adl,
            self.family_history,
            self.head_injury,
            self.depression,
            self.cardiovascular_index,
            self.lifestyle_deficit,
            self.bmi,
            self.alcohol_per_week,
            self.diet_quality,
        ]
    }
}

/// Whether a larger feature value pushes risk up or down.
///
/// Fixed per feature index; tree ensembles do not expose a usable sign, so
/// this table stands in for it in the explanation output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Positive,
    Negative,
}

/// Feature names in fused-vector order (tabular columns, then the reduced
/// speech components). Must stay aligned with `TabularFeatures::values()`.
pub const FEATURE_NAMES: [&str; FUSED_LEN] = [
    "Age",
    "Gender",
    "EducationLevel",
    "MMSE",
    "FunctionalAssessment",
    "MemoryComplaints",
    "ADL",
    "FamilyHistoryAlzheimers",
    "HeadInjury",
    "Depression",
    "CardiovascularScore",
    "LifestyleDeficit",
    "BMI",
    "AlcoholConsumption",
    "DietQuality",
    "SpeechBio_0",
    "SpeechBio_1",
    "SpeechBio_2",
    "SpeechBio_3",
    "SpeechBio_4",
    "SpeechBio_5",
    "SpeechBio_6",
    "SpeechBio_7",
    "SpeechBio_8",
    "SpeechBio_9",
];

/// Risk direction per fused-vector index. Protective features (cognitive
/// and functional capacity, education, diet) are negative; everything else,
/// including deviation in the speech components, is positive.
pub const FEATURE_DIRECTIONS: [Direction; FUSED_LEN] = [
    Direction::Positive, // Age
    Direction::Positive, // Gender
    Direction::Negative, // EducationLevel
    Direction::Negative, // MMSE
    Direction::Negative, // FunctionalAssessment
    Direction::Positive, // MemoryComplaints
    Direction::Negative, // ADL
    Direction::Positive, // FamilyHistoryAlzheimers
    Direction::Positive, // HeadInjury
    Direction::Positive, // Depression
    Direction::Positive, // CardiovascularScore
    Direction::Positive, // LifestyleDeficit
    Direction::Positive, // BMI
    Direction::Positive, // AlcoholConsumption
    Direction::Negative, // DietQuality
    Direction::Positive, // SpeechBio_0
    Direction::Positive, // SpeechBio_1
    Direction::Positive, // SpeechBio_2
    Direction::Positive, // SpeechBio_3
    Direction::Positive, // SpeechBio_4
    Direction::Positive, // SpeechBio_5
    Direction::Positive, // SpeechBio_6
    Direction::Positive, // SpeechBio_7
    Direction::Positive, // SpeechBio_8
    Direction::Positive, // SpeechBio_9
];

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TabularFeatures {
        TabularFeatures {
            age: 72.0,
            sex: 1.0,
            education: 2.0,
            mmse: 27.0,
            functional: 8.0,
            memory_complaints: 0.0,
            adl: 8.0,
            family_history: 1.0,
            head_injury: 0.0,
            depression: 0.0,
            cardiovascular_index: 1.0,
            lifestyle_deficit: 0.0,
            bmi: 24.5,
            alcohol_per_week: 2.0,
            diet_quality: 7.0,
            raw_memory: 0.9,
            raw_executive: 0.8,
            raw_sleep_quality: 7.0,
            raw_physical_activity: 5.0,
        }
    }

    #[test]
    fn values_length_matches_schema() {
        assert_eq!(sample().values().len(), TABULAR_LEN);
    }

    #[test]
    fn fused_length_is_tabular_plus_reduced() {
        assert_eq!(FUSED_LEN, TABULAR_LEN + REDUCED_EMBEDDING_LEN);
        assert_eq!(FEATURE_NAMES.len(), FUSED_LEN);
        assert_eq!(FEATURE_DIRECTIONS.len(), FUSED_LEN);
    }

    #[test]
    fn values_order_is_frozen() {
        // Guards against accidental reordering: the trained artifacts index
        // columns by position, not by name.
        let v = sample().values();
        assert_eq!(v[0], 72.0, "age must be column 0");
        assert_eq!(v[3], 27.0, "mmse must be column 3");
        assert_eq!(v[6], 8.0, "adl must be column 6");
        assert_eq!(v[12], 24.5, "bmi must be column 12");
        assert_eq!(v[14], 7.0, "diet quality must be column 14");
    }

    #[test]
    fn protective_features_point_down() {
        let mmse_idx = FEATURE_NAMES.iter().position(|&n| n == "MMSE").unwrap();
        assert_eq!(FEATURE_DIRECTIONS[mmse_idx], Direction::Negative);
        let age_idx = FEATURE_NAMES.iter().position(|&n| n == "Age").unwrap();
        assert_eq!(FEATURE_DIRECTIONS[age_idx], Direction::Positive);
    }

    #[test]
    fn direction_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Direction::Negative).unwrap(),
            "\"negative\""
        );
    }
}
