//! Per-assessment orchestration
//!
//! Fans out over the assessment's speech samples (independent, so rayon
//! parallel), aggregates their outputs, builds the tabular vector once, and
//! invokes the predictor. Sample failures shrink the aggregates instead of
//! failing the assessment; the only fatal path is a malformed score, which
//! is rejected before any model work.

use std::collections::BTreeMap;
use std::sync::Arc;

use cognia_core::config::Config;
use cognia_core::domain::{Assessment, DomainError, SpeechSample, UserHealthProfile};
use cognia_core::schema::TabularFeatures;
use rayon::prelude::*;
use serde::Serialize;

use crate::acoustic::{self, AcousticFeatures};
use crate::audio;
use crate::embedding::{zero_embedding, EmbeddingExtractor};
use crate::models::ModelManager;
use crate::predictor::{Prediction, RiskPredictor};
use crate::tabular;
use crate::transcribe::{SpeechTranscriber, TranscriptionOutcome};

/// Everything derived for one assessment, returned alongside the prediction
/// for audit and debugging. Nothing here is persisted by the pipeline.
#[derive(Debug, Serialize)]
pub struct FeatureBundle {
    /// Acoustic summary features per task id (samples that failed to decode
    /// are absent)
    pub acoustic: BTreeMap<String, AcousticFeatures>,
    /// Elementwise mean of the per-sample embeddings; the zero vector when
    /// no sample produced one
    pub speech_embedding: Vec<f32>,
    pub tabular: TabularFeatures,
    /// Whitespace-split tokens from all available transcripts, in sample
    /// order
    pub transcript_tokens: Vec<String>,
    /// Detected languages in sample order (duplicates preserved)
    pub languages: Vec<String>,
    /// Transcription outcomes per task id, for samples the pipeline
    /// transcribed itself
    pub transcriptions: BTreeMap<String, TranscriptionOutcome>,
}

/// Combined result of one pipeline run.
#[derive(Debug, Serialize)]
pub struct ProcessOutcome {
    pub prediction: Prediction,
    pub features: FeatureBundle,
}

/// Per-sample intermediate, produced in parallel.
struct SampleOutput {
    task_id: String,
    acoustic: Option<AcousticFeatures>,
    embedding: Option<Vec<f32>>,
    transcript: Option<String>,
    language: Option<String>,
    transcription: Option<TranscriptionOutcome>,
}

/// The pipeline service: one instance per process, services injected.
pub struct PipelineManager {
    embedder: EmbeddingExtractor,
    transcriber: Option<Arc<SpeechTranscriber>>,
    predictor: RiskPredictor,
}

impl PipelineManager {
    /// Assemble from explicit services.
    pub fn new(
        embedder: EmbeddingExtractor,
        transcriber: Option<Arc<SpeechTranscriber>>,
        predictor: RiskPredictor,
    ) -> Self {
        Self {
            embedder,
            transcriber,
            predictor,
        }
    }

    /// Build all services from configuration.
    pub fn from_config(config: &Config) -> Self {
        let models = ModelManager::from_config(config);
        Self {
            embedder: EmbeddingExtractor::new(config.embeddings.enabled, models),
            transcriber: Some(Arc::new(SpeechTranscriber::from_config(config))),
            predictor: RiskPredictor::from_config(&config.artifacts),
        }
    }

    /// Run the full pipeline for one assessment.
    pub fn process(
        &self,
        assessment: &Assessment,
        profile: &UserHealthProfile,
    ) -> Result<ProcessOutcome, DomainError> {
        assessment.validate()?;

        let outputs: Vec<SampleOutput> = assessment
            .samples
            .par_iter()
            .map(|sample| self.process_sample(sample))
            .collect();

        let mut acoustic_map = BTreeMap::new();
        let mut embeddings: Vec<Vec<f32>> = Vec::new();
        let mut transcript_tokens: Vec<String> = Vec::new();
        let mut languages: Vec<String> = Vec::new();
        let mut transcriptions = BTreeMap::new();

        for output in outputs {
            if let Some(features) = output.acoustic {
                acoustic_map.insert(output.task_id.clone(), features);
            }
            if let Some(embedding) = output.embedding {
                embeddings.push(embedding);
            }
            if let Some(transcript) = &output.transcript {
                transcript_tokens.extend(transcript.split_whitespace().map(String::from));
            }
            if let Some(language) = output.language {
                languages.push(language);
            }
            if let Some(outcome) = output.transcription {
                transcriptions.insert(output.task_id, outcome);
            }
        }

        let speech_embedding = mean_embedding(&embeddings);
        let tabular = tabular::build(assessment, profile);

        let prediction =
            self.predictor
                .predict(&tabular, &speech_embedding, assessment.score_declined);

        Ok(ProcessOutcome {
            prediction,
            features: FeatureBundle {
                acoustic: acoustic_map,
                speech_embedding,
                tabular,
                transcript_tokens,
                languages,
                transcriptions,
            },
        })
    }

    /// Derive everything one sample can contribute. Audio failures skip the
    /// acoustic/embedding aggregates; transcript and language still
    /// contribute when independently available.
    fn process_sample(&self, sample: &SpeechSample) -> SampleOutput {
        let mut output = SampleOutput {
            task_id: sample.task_id.clone(),
            acoustic: None,
            embedding: None,
            transcript: sample.transcript.clone(),
            language: sample.detected_language.clone(),
            transcription: None,
        };

        match audio::load_audio(&sample.audio_path) {
            Ok((samples, rate)) => {
                match acoustic::extract_features(&samples, rate) {
                    Ok(features) => output.acoustic = Some(features),
                    Err(e) => {
                        log::warn!("acoustic features skipped for {}: {e}", sample.task_id);
                    }
                }
                output.embedding = Some(self.embedder.embed(&samples));
            }
            Err(e) => {
                log::warn!("audio unavailable for {}: {e}", sample.task_id);
            }
        }

        // Samples that arrive without a transcript are transcribed here; a
        // pre-existing language tag acts as the declared language to
        // reconcile against
        if output.transcript.is_none() {
            if let Some(transcriber) = &self.transcriber {
                let outcome = transcriber
                    .process_file(&sample.audio_path, sample.detected_language.as_deref());
                output.transcript = outcome.transcript.clone();
                if let Some(detected) = &outcome.detected_language {
                    output.language = Some(detected.clone());
                }
                output.transcription = Some(outcome);
            }
        }

        output
    }
}

/// Elementwise mean across embeddings; the fixed zero vector when none
/// succeeded. Order-independent by construction.
fn mean_embedding(embeddings: &[Vec<f32>]) -> Vec<f32> {
    if embeddings.is_empty() {
        return zero_embedding();
    }
    let mut mean = vec![0.0f32; embeddings[0].len()];
    for embedding in embeddings {
        for (acc, &v) in mean.iter_mut().zip(embedding.iter()) {
            *acc += v;
        }
    }
    let n = embeddings.len() as f32;
    for v in &mut mean {
        *v /= n;
    }
    mean
}
