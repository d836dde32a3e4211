//! Risk prediction
//!
//! Two-state predictor resolved once at artifact load time:
//!
//! - `NoModel`: artifacts missing or dimensionally inconsistent; every
//!   call answers with the closed-form heuristic.
//! - `FusionReady`: classifier + projection + scaler loaded as a matched
//!   triple; calls run fused inference, and any runtime error collapses to
//!   the full heuristic result. Callers never see a numerical error.
//!
//! The classifier surface is an explicit interface: a calibrated variant
//! exposing a probability, a score-only variant whose raw output is clamped,
//! and an optional importance capability resolved from a training-time
//! sidecar. Duck-typing the loaded model per call is exactly the kind of
//! silent drift the frozen schema exists to prevent.

use std::path::Path;
use std::sync::Mutex;

use cognia_core::config::ArtifactConfig;
use cognia_core::schema::{
    Direction, TabularFeatures, FEATURE_DIRECTIONS, FEATURE_NAMES, FUSED_LEN,
};
use ndarray::Array2;
use ort::session::Session;
use ort::value::Tensor;
use serde::Serialize;
use thiserror::Error;

use crate::fusion::{ArtifactError, FusionTransforms};

/// Additive probability override when longitudinal decline is flagged.
const LONGITUDINAL_BOOST: f32 = 0.3;
/// Probability ceiling after the boost.
const BOOST_CAP: f32 = 0.99;
/// Tier thresholds: below LOW -> Low, below MEDIUM -> Medium, else High.
const LOW_THRESHOLD: f32 = 0.33;
const MEDIUM_THRESHOLD: f32 = 0.66;
/// Number of ranked factors reported from model importances.
const TOP_FACTORS: usize = 5;

/// Discretized risk bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Tier from a continuous probability using the fixed thresholds.
    pub fn from_probability(probability: f32) -> Self {
        if probability < LOW_THRESHOLD {
            Self::Low
        } else if probability < MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::High
        }
    }
}

/// One ranked contributing factor.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    /// Importance normalized by the sum of absolute importances across all
    /// features, so contributions are comparable across calls
    pub contribution: f32,
    pub direction: Direction,
}

/// The stable output contract consumed by the API and notification layers.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub risk_level: RiskLevel,
    pub probability: f32,
    pub feature_importances: Vec<FeatureImportance>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("classifier error: {0}")]
    Classifier(String),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// How the loaded classifier reports its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierKind {
    /// Exposes a calibrated positive-class probability
    Calibrated,
    /// Exposes a raw score that must be clamped to [0, 1]
    ScoreOnly,
}

/// Inference interface over the persisted ensemble, resolved at load time.
pub trait FusedClassifier: Send + Sync {
    fn kind(&self) -> ClassifierKind;

    /// Positive-class probability (calibrated) or raw score (score-only)
    /// for one fused vector.
    fn predict(&self, features: &[f32]) -> Result<f32, InferenceError>;

    /// Per-feature importances over the fused schema, when the artifact
    /// exports them (ensembles average members at export time).
    fn importances(&self) -> Option<&[f32]>;
}

/// ONNX-backed classifier with capabilities resolved from the session's
/// declared outputs and the optional importances sidecar.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    input_name: String,
    kind: ClassifierKind,
    importances: Option<Vec<f32>>,
}

impl OnnxClassifier {
    pub fn load(classifier_path: &Path, importances_path: Option<&Path>) -> Result<Self, ArtifactError> {
        let session = Session::builder()
            .and_then(|b| Ok(b.with_intra_threads(1)?))
            .and_then(|mut b| b.commit_from_file(classifier_path))
            .map_err(|e| ArtifactError::Parse {
                path: classifier_path.to_path_buf(),
                message: e.to_string(),
            })?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .unwrap_or_else(|| "float_input".to_string());

        // Calibrated ensembles export a dedicated probability output
        let kind = if session.outputs().iter().any(|o| o.name() == "probabilities") {
            ClassifierKind::Calibrated
        } else {
            ClassifierKind::ScoreOnly
        };

        let importances = match importances_path {
            Some(path) if path.exists() => match load_importances(path) {
                Ok(values) => Some(values),
                Err(e) => {
                    log::warn!("ignoring importances sidecar: {e}");
                    None
                }
            },
            _ => None,
        };

        log::info!(
            "classifier loaded: kind={:?}, importances={}",
            kind,
            importances.is_some()
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            kind,
            importances,
        })
    }
}

impl FusedClassifier for OnnxClassifier {
    fn kind(&self) -> ClassifierKind {
        self.kind
    }

    fn predict(&self, features: &[f32]) -> Result<f32, InferenceError> {
        let input = Array2::from_shape_vec((1, features.len()), features.to_vec())
            .map_err(|e| InferenceError::Classifier(format!("input shape: {e}")))?;
        let tensor = Tensor::from_array(input)
            .map_err(|e| InferenceError::Classifier(format!("tensor creation: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| InferenceError::Classifier("session lock poisoned".into()))?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .map_err(|e| InferenceError::Classifier(format!("inference: {e}")))?;

        match self.kind {
            ClassifierKind::Calibrated => {
                let (_, value) = outputs
                    .iter()
                    .find(|(name, _)| *name == "probabilities")
                    .ok_or_else(|| {
                        InferenceError::Classifier("probability output missing at run time".into())
                    })?;
                let (_, data) = value
                    .try_extract_tensor::<f32>()
                    .map_err(|e| InferenceError::Classifier(format!("extract probabilities: {e}")))?;
                // [1, 2] class probabilities; positive class is column 1
                data.get(1)
                    .or_else(|| data.first())
                    .copied()
                    .ok_or_else(|| InferenceError::Classifier("empty probability tensor".into()))
            }
            ClassifierKind::ScoreOnly => {
                let (_, value) = outputs
                    .iter()
                    .next()
                    .ok_or_else(|| InferenceError::Classifier("no classifier output".into()))?;
                // Score may be exported as float scores or integer labels
                if let Ok((_, data)) = value.try_extract_tensor::<f32>() {
                    data.first()
                        .copied()
                        .ok_or_else(|| InferenceError::Classifier("empty score tensor".into()))
                } else {
                    let (_, data) = value
                        .try_extract_tensor::<i64>()
                        .map_err(|e| InferenceError::Classifier(format!("extract score: {e}")))?;
                    data.first()
                        .map(|&v| v as f32)
                        .ok_or_else(|| InferenceError::Classifier("empty label tensor".into()))
                }
            }
        }
    }

    fn importances(&self) -> Option<&[f32]> {
        self.importances.as_deref()
    }
}

fn load_importances(path: &Path) -> Result<Vec<f32>, ArtifactError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ArtifactError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let values: Vec<f32> = serde_json::from_str(&contents).map_err(|e| ArtifactError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    if values.len() != FUSED_LEN {
        return Err(ArtifactError::DimensionMismatch(format!(
            "importances cover {} features, fused width is {}",
            values.len(),
            FUSED_LEN
        )));
    }
    Ok(values)
}

/// Load state resolved once at construction.
enum PredictorState {
    NoModel,
    FusionReady {
        classifier: Box<dyn FusedClassifier>,
        transforms: FusionTransforms,
    },
}

/// The risk predictor service.
pub struct RiskPredictor {
    state: PredictorState,
}

impl RiskPredictor {
    /// Load the artifact triple; any failure leaves the predictor in
    /// heuristic-only mode for the process lifetime.
    pub fn from_config(artifacts: &ArtifactConfig) -> Self {
        let loaded = FusionTransforms::load(&artifacts.projection, &artifacts.scaler).and_then(
            |transforms| {
                let classifier =
                    OnnxClassifier::load(&artifacts.classifier, artifacts.importances.as_deref())?;
                Ok((transforms, classifier))
            },
        );

        match loaded {
            Ok((transforms, classifier)) => Self {
                state: PredictorState::FusionReady {
                    classifier: Box::new(classifier),
                    transforms,
                },
            },
            Err(e) => {
                log::warn!("risk model artifacts unavailable, using heuristic fallback: {e}");
                Self {
                    state: PredictorState::NoModel,
                }
            }
        }
    }

    /// A predictor without artifacts (always heuristic).
    pub fn without_model() -> Self {
        Self {
            state: PredictorState::NoModel,
        }
    }

    /// Assemble from already-loaded parts. Used by tests and alternative
    /// classifier backends.
    pub fn with_parts(classifier: Box<dyn FusedClassifier>, transforms: FusionTransforms) -> Self {
        Self {
            state: PredictorState::FusionReady {
                classifier,
                transforms,
            },
        }
    }

    pub fn is_fusion_ready(&self) -> bool {
        matches!(self.state, PredictorState::FusionReady { .. })
    }

    /// Predict risk for one assessment's feature set.
    pub fn predict(
        &self,
        tabular: &TabularFeatures,
        embedding: &[f32],
        score_declined: bool,
    ) -> Prediction {
        match &self.state {
            PredictorState::NoModel => heuristic(tabular),
            PredictorState::FusionReady {
                classifier,
                transforms,
            } => match fused_prediction(
                classifier.as_ref(),
                transforms,
                tabular,
                embedding,
                score_declined,
            ) {
                Ok(prediction) => prediction,
                Err(e) => {
                    log::warn!("fused inference failed, substituting heuristic: {e}");
                    heuristic(tabular)
                }
            },
        }
    }
}

/// Closed-form fallback from the strongest tabular predictors.
fn heuristic(tabular: &TabularFeatures) -> Prediction {
    let mut risk = 0.1f32;
    if tabular.mmse < 24.0 {
        risk += 0.4;
    }
    if tabular.mmse < 20.0 {
        risk += 0.3;
    }
    if tabular.functional < 6.0 {
        risk += 0.2;
    }
    if tabular.adl < 6.0 {
        risk += 0.1;
    }
    if tabular.memory_complaints == 1.0 {
        risk += 0.2;
    }
    let probability = risk.clamp(0.02, 0.98);

    let recommendations = [
        Some(if probability > 0.3 {
            "Share results with a clinician"
        } else {
            "Continue healthy habits"
        }),
        Some(if tabular.mmse < 25.0 {
            "Focus on memory exercises"
        } else {
            "Maintain cognitive activity"
        }),
        (tabular.functional < 8.0).then_some("Monitor daily routine difficulties"),
    ]
    .into_iter()
    .flatten()
    .map(String::from)
    .collect();

    Prediction {
        risk_level: RiskLevel::from_probability(probability),
        probability,
        feature_importances: static_importances(),
        recommendations,
    }
}

/// The fixed importance list reported when no model mechanism is exposed.
fn static_importances() -> Vec<FeatureImportance> {
    vec![
        FeatureImportance {
            feature: "MMSE (Cognitive)".into(),
            contribution: 0.45,
            direction: Direction::Negative,
        },
        FeatureImportance {
            feature: "Functional Assessment".into(),
            contribution: 0.25,
            direction: Direction::Negative,
        },
        FeatureImportance {
            feature: "Memory Complaints".into(),
            contribution: 0.15,
            direction: Direction::Positive,
        },
        FeatureImportance {
            feature: "Age".into(),
            contribution: 0.15,
            direction: Direction::Positive,
        },
    ]
}

/// Full fusion path: fuse, classify, boost, explain.
fn fused_prediction(
    classifier: &dyn FusedClassifier,
    transforms: &FusionTransforms,
    tabular: &TabularFeatures,
    embedding: &[f32],
    score_declined: bool,
) -> Result<Prediction, InferenceError> {
    let fused = transforms.fuse(tabular, embedding)?;

    let raw = classifier.predict(&fused)?;
    let mut probability = match classifier.kind() {
        ClassifierKind::Calibrated => raw,
        ClassifierKind::ScoreOnly => raw.clamp(0.0, 1.0),
    };

    if !probability.is_finite() {
        return Err(InferenceError::Classifier(format!(
            "non-finite probability {probability}"
        )));
    }

    // Longitudinal override: applied after the model's own probability, a
    // significant drop is clinically meaningful even at "normal" absolute
    // scores
    if score_declined {
        probability = (probability + LONGITUDINAL_BOOST).min(BOOST_CAP);
    }

    let feature_importances = classifier
        .importances()
        .map(ranked_importances)
        .unwrap_or_else(static_importances);

    let recommendations = [
        Some(if probability > 0.5 {
            "Consult a neurologist for a detailed assessment"
        } else {
            "Maintain a healthy lifestyle"
        }),
        (tabular.raw_sleep_quality < 5.0).then_some("Monitor sleep patterns"),
        (tabular.raw_physical_activity < 3.0).then_some("Increase physical activity"),
    ]
    .into_iter()
    .flatten()
    .map(String::from)
    .collect();

    Ok(Prediction {
        risk_level: RiskLevel::from_probability(probability),
        probability,
        feature_importances,
        recommendations,
    })
}

/// Rank the top factors, normalizing by the absolute total across all
/// features so contributions are comparable across calls.
fn ranked_importances(importances: &[f32]) -> Vec<FeatureImportance> {
    let total: f32 = importances.iter().map(|v| v.abs()).sum();
    let total = if total > 0.0 { total } else { 1.0 };

    let mut indices: Vec<usize> = (0..importances.len().min(FUSED_LEN)).collect();
    indices.sort_by(|&a, &b| {
        importances[b]
            .partial_cmp(&importances[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    indices
        .into_iter()
        .take(TOP_FACTORS)
        .map(|idx| FeatureImportance {
            feature: FEATURE_NAMES[idx].to_string(),
            contribution: importances[idx] / total,
            direction: FEATURE_DIRECTIONS[idx],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::test_support::{identity_transforms, neutral_tabular};
    use cognia_core::schema::EMBEDDING_DIM;

    /// Calibrated stub: logistic over the mean of the fused vector, so a
    /// shifted embedding raises the probability.
    struct MeanLogistic {
        importances: Option<Vec<f32>>,
    }

    impl FusedClassifier for MeanLogistic {
        fn kind(&self) -> ClassifierKind {
            ClassifierKind::Calibrated
        }

        fn predict(&self, features: &[f32]) -> Result<f32, InferenceError> {
            let mean = features.iter().sum::<f32>() / features.len() as f32;
            Ok(1.0 / (1.0 + (-mean / 10.0).exp()))
        }

        fn importances(&self) -> Option<&[f32]> {
            self.importances.as_deref()
        }
    }

    struct FailingClassifier;

    impl FusedClassifier for FailingClassifier {
        fn kind(&self) -> ClassifierKind {
            ClassifierKind::Calibrated
        }

        fn predict(&self, _features: &[f32]) -> Result<f32, InferenceError> {
            Err(InferenceError::Classifier("synthetic failure".into()))
        }

        fn importances(&self) -> Option<&[f32]> {
            None
        }
    }

    struct ConstantScore(f32);

    impl FusedClassifier for ConstantScore {
        fn kind(&self) -> ClassifierKind {
            ClassifierKind::ScoreOnly
        }

        fn predict(&self, _features: &[f32]) -> Result<f32, InferenceError> {
            Ok(self.0)
        }

        fn importances(&self) -> Option<&[f32]> {
            None
        }
    }

    fn impaired_tabular() -> TabularFeatures {
        TabularFeatures {
            mmse: 0.0,
            functional: 0.0,
            adl: 0.0,
            memory_complaints: 1.0,
            raw_memory: 0.0,
            raw_executive: 0.0,
            ..neutral_tabular()
        }
    }

    #[test]
    fn heuristic_probability_stays_in_bounds() {
        for mmse in [0.0, 10.0, 19.0, 23.0, 27.0, 30.0] {
            for functional in [0.0, 5.0, 9.0] {
                let tabular = TabularFeatures {
                    mmse,
                    functional,
                    adl: functional,
                    ..neutral_tabular()
                };
                let p = heuristic(&tabular).probability;
                assert!((0.02..=0.98).contains(&p), "p={p} at mmse={mmse}");
            }
        }
    }

    #[test]
    fn heuristic_healthy_profile_scores_low() {
        let prediction = heuristic(&neutral_tabular());
        assert!((prediction.probability - 0.1).abs() < 1e-6);
        assert_eq!(prediction.risk_level, RiskLevel::Low);
    }

    #[test]
    fn heuristic_total_impairment_saturates() {
        // MMSE 0 (<24 and <20), functional 0, ADL 0, complaints:
        // 0.1 + 0.4 + 0.3 + 0.2 + 0.1 + 0.2 = 1.3 -> capped at 0.98
        let prediction = heuristic(&impaired_tabular());
        assert!((prediction.probability - 0.98).abs() < 1e-6);
        assert_eq!(prediction.risk_level, RiskLevel::High);
    }

    #[test]
    fn heuristic_is_monotone_in_mmse() {
        let mut last = 0.0f32;
        for mmse in (0..=30).rev() {
            let tabular = TabularFeatures {
                mmse: mmse as f32,
                ..neutral_tabular()
            };
            let p = heuristic(&tabular).probability;
            assert!(
                p >= last,
                "decreasing MMSE must not decrease risk: mmse={mmse}, p={p}, prev={last}"
            );
            last = p;
        }
    }

    #[test]
    fn heuristic_drops_false_condition_recommendations() {
        let healthy = heuristic(&neutral_tabular());
        assert_eq!(healthy.recommendations.len(), 2);
        assert!(healthy.recommendations.contains(&"Continue healthy habits".to_string()));

        let impaired = heuristic(&impaired_tabular());
        assert_eq!(impaired.recommendations.len(), 3);
    }

    #[test]
    fn no_model_predictor_uses_heuristic() {
        let predictor = RiskPredictor::without_model();
        assert!(!predictor.is_fusion_ready());
        let prediction = predictor.predict(&neutral_tabular(), &[0.0; EMBEDDING_DIM], false);
        assert!((prediction.probability - 0.1).abs() < 1e-6);
    }

    #[test]
    fn tier_thresholds() {
        assert_eq!(RiskLevel::from_probability(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(0.329), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(0.33), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_probability(0.659), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_probability(0.66), RiskLevel::High);
        assert_eq!(RiskLevel::from_probability(1.0), RiskLevel::High);
    }

    #[test]
    fn fusion_is_embedding_sensitive() {
        let predictor = RiskPredictor::with_parts(
            Box::new(MeanLogistic { importances: None }),
            identity_transforms(),
        );
        let tabular = neutral_tabular();

        let low_variance = vec![0.05f32; EMBEDDING_DIM];
        let shifted: Vec<f32> = vec![1.5f32; EMBEDDING_DIM];

        let p_low = predictor.predict(&tabular, &low_variance, false).probability;
        let p_shifted = predictor.predict(&tabular, &shifted, false).probability;
        assert!(
            p_shifted >= p_low,
            "shifted-mean embedding must not lower risk: {p_shifted} vs {p_low}"
        );
    }

    #[test]
    fn longitudinal_boost_is_exactly_point_three_capped() {
        let predictor = RiskPredictor::with_parts(
            Box::new(MeanLogistic { importances: None }),
            identity_transforms(),
        );
        let tabular = neutral_tabular();
        let embedding = vec![0.0f32; EMBEDDING_DIM];

        let base = predictor.predict(&tabular, &embedding, false).probability;
        let boosted = predictor.predict(&tabular, &embedding, true).probability;
        assert!((boosted - (base + 0.3).min(0.99)).abs() < 1e-6);

        // A near-certain score caps at 0.99
        let predictor = RiskPredictor::with_parts(
            Box::new(ConstantScore(0.95)),
            identity_transforms(),
        );
        let capped = predictor.predict(&tabular, &embedding, true).probability;
        assert!((capped - 0.99).abs() < 1e-6);
    }

    #[test]
    fn boost_recomputes_tier() {
        // 0.4 -> Medium without boost, 0.7 -> High with it
        let predictor = RiskPredictor::with_parts(
            Box::new(ConstantScore(0.4)),
            identity_transforms(),
        );
        let tabular = neutral_tabular();
        let embedding = vec![0.0f32; EMBEDDING_DIM];

        assert_eq!(
            predictor.predict(&tabular, &embedding, false).risk_level,
            RiskLevel::Medium
        );
        assert_eq!(
            predictor.predict(&tabular, &embedding, true).risk_level,
            RiskLevel::High
        );
    }

    #[test]
    fn score_only_output_is_clamped() {
        let predictor = RiskPredictor::with_parts(
            Box::new(ConstantScore(3.7)),
            identity_transforms(),
        );
        let p = predictor
            .predict(&neutral_tabular(), &[0.0; EMBEDDING_DIM], false)
            .probability;
        assert_eq!(p, 1.0);
    }

    #[test]
    fn classifier_failure_falls_back_to_heuristic() {
        let predictor = RiskPredictor::with_parts(
            Box::new(FailingClassifier),
            identity_transforms(),
        );
        let prediction = predictor.predict(&impaired_tabular(), &[0.0; EMBEDDING_DIM], false);
        // Heuristic saturates for the fully impaired profile
        assert!((prediction.probability - 0.98).abs() < 1e-6);
        assert_eq!(prediction.feature_importances.len(), 4);
    }

    #[test]
    fn wrong_embedding_width_falls_back_despite_ready_state() {
        let predictor = RiskPredictor::with_parts(
            Box::new(MeanLogistic { importances: None }),
            identity_transforms(),
        );
        assert!(predictor.is_fusion_ready());
        // 512-wide embedding cannot pass the projection check
        let prediction = predictor.predict(&neutral_tabular(), &[0.5; 512], false);
        assert!((prediction.probability - 0.1).abs() < 1e-6, "heuristic expected");
    }

    #[test]
    fn importances_rank_and_normalize_over_all_features() {
        let mut importances = vec![0.01f32; FUSED_LEN];
        importances[3] = 0.5; // MMSE
        importances[0] = 0.3; // Age
        importances[6] = 0.2; // ADL
        let total: f32 = importances.iter().map(|v| v.abs()).sum();

        let ranked = ranked_importances(&importances);
        assert_eq!(ranked.len(), TOP_FACTORS);
        assert_eq!(ranked[0].feature, "MMSE");
        assert_eq!(ranked[1].feature, "Age");
        assert!((ranked[0].contribution - 0.5 / total).abs() < 1e-6);
        assert_eq!(ranked[0].direction, Direction::Negative);
        assert_eq!(ranked[1].direction, Direction::Positive);
    }

    #[test]
    fn missing_importance_capability_uses_static_list() {
        let predictor = RiskPredictor::with_parts(
            Box::new(MeanLogistic { importances: None }),
            identity_transforms(),
        );
        let prediction = predictor.predict(&neutral_tabular(), &[0.0; EMBEDDING_DIM], false);
        assert_eq!(prediction.feature_importances[0].feature, "MMSE (Cognitive)");
    }

    #[test]
    fn provided_importances_are_used() {
        let mut importances = vec![0.0f32; FUSED_LEN];
        importances[12] = 1.0; // BMI
        let predictor = RiskPredictor::with_parts(
            Box::new(MeanLogistic {
                importances: Some(importances),
            }),
            identity_transforms(),
        );
        let prediction = predictor.predict(&neutral_tabular(), &[0.0; EMBEDDING_DIM], false);
        assert_eq!(prediction.feature_importances[0].feature, "BMI");
    }

    #[test]
    fn fusion_recommendations_follow_sleep_and_activity() {
        let predictor = RiskPredictor::with_parts(
            Box::new(ConstantScore(0.2)),
            identity_transforms(),
        );
        let tabular = TabularFeatures {
            raw_sleep_quality: 4.0,
            raw_physical_activity: 2.0,
            ..neutral_tabular()
        };
        let prediction = predictor.predict(&tabular, &[0.0; EMBEDDING_DIM], false);
        assert_eq!(prediction.recommendations.len(), 3);
        assert!(prediction
            .recommendations
            .contains(&"Monitor sleep patterns".to_string()));
        assert!(prediction
            .recommendations
            .contains(&"Increase physical activity".to_string()));

        let rested = predictor.predict(&neutral_tabular(), &[0.0; EMBEDDING_DIM], false);
        assert_eq!(rested.recommendations.len(), 1);
    }

    #[test]
    fn missing_artifacts_resolve_to_no_model() {
        let artifacts = ArtifactConfig {
            classifier: "/nonexistent/classifier.onnx".into(),
            projection: "/nonexistent/pca.json".into(),
            scaler: "/nonexistent/scaler.json".into(),
            importances: None,
        };
        let predictor = RiskPredictor::from_config(&artifacts);
        assert!(!predictor.is_fusion_ready());
    }
}
