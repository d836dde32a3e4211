//! Speech embedding extraction via Wav2Vec2
//!
//! Produces one fixed-width 768-dim vector per sample by mean-pooling the
//! encoder's hidden states over time. The extractor runs in one of two modes
//! fixed at construction: enabled (lazily loads the ONNX encoder on first
//! use) or disabled (always the zero vector). Any load failure permanently
//! downgrades to the zero vector for the process lifetime so downstream
//! dimensionality never changes.

use std::sync::{Mutex, OnceLock};

use cognia_core::schema::EMBEDDING_DIM;
use ndarray::Array2;
use ort::session::Session;
use ort::value::Tensor;

use crate::models::{ModelFile, ModelManager};

/// The zero vector fed downstream when no embedding is available.
pub fn zero_embedding() -> Vec<f32> {
    vec![0.0; EMBEDDING_DIM]
}

/// Wav2Vec2 embedding extractor with a permanent zero-vector fallback.
pub struct EmbeddingExtractor {
    enabled: bool,
    models: ModelManager,
    session: OnceLock<Option<Mutex<Session>>>,
}

impl EmbeddingExtractor {
    /// Create an extractor. `enabled` is fixed for the process lifetime.
    pub fn new(enabled: bool, models: ModelManager) -> Self {
        Self {
            enabled,
            models,
            session: OnceLock::new(),
        }
    }

    /// An extractor that always returns the zero vector.
    pub fn disabled(models: ModelManager) -> Self {
        Self::new(false, models)
    }

    /// Compute the 768-dim embedding for a 16kHz mono waveform.
    ///
    /// Never fails: encoder unavailability or inference errors degrade to
    /// the zero vector so the fused schema keeps its width.
    pub fn embed(&self, samples: &[f32]) -> Vec<f32> {
        let Some(session) = self.session() else {
            return zero_embedding();
        };

        match run_encoder(session, samples) {
            Ok(embedding) => embedding,
            Err(e) => {
                log::warn!("embedding inference failed, using zero vector: {e}");
                zero_embedding()
            }
        }
    }

    /// Lazily initialize the encoder session at most once.
    fn session(&self) -> Option<&Mutex<Session>> {
        self.session
            .get_or_init(|| {
                if !self.enabled {
                    return None;
                }
                match self.load_session() {
                    Ok(session) => Some(Mutex::new(session)),
                    Err(e) => {
                        // Permanent for the process: don't retry a broken setup
                        log::warn!("embedding encoder unavailable, falling back to zero vectors: {e}");
                        None
                    }
                }
            })
            .as_ref()
    }

    fn load_session(&self) -> Result<Session, String> {
        let path = self
            .models
            .ensure_model(ModelFile::Wav2Vec2)
            .map_err(|e| e.to_string())?;
        Session::builder()
            .and_then(|b| Ok(b.with_intra_threads(1)?))
            .and_then(|mut b| b.commit_from_file(&path))
            .map_err(|e| format!("failed to load Wav2Vec2: {e}"))
    }
}

/// Run the encoder on a waveform and mean-pool hidden states over time.
fn run_encoder(session: &Mutex<Session>, samples: &[f32]) -> Result<Vec<f32>, String> {
    if samples.is_empty() {
        return Err("empty waveform".to_string());
    }

    let input = Array2::from_shape_vec((1, samples.len()), samples.to_vec())
        .map_err(|e| format!("input shape error: {e}"))?;
    let input_tensor = Tensor::from_array(input).map_err(|e| format!("tensor creation: {e}"))?;

    let mut session = session.lock().map_err(|_| "session lock poisoned".to_string())?;
    let outputs = session
        .run(ort::inputs!["input_values" => input_tensor])
        .map_err(|e| format!("inference error: {e}"))?;

    let (_, value) = outputs
        .iter()
        .next()
        .ok_or("encoder produced no output")?;

    let (shape, data) = value
        .try_extract_tensor::<f32>()
        .map_err(|e| format!("output extraction: {e}"))?;

    // Output is [1, T, 768]; mean-pool the time axis
    if shape.len() != 3 || shape[2] as usize != EMBEDDING_DIM {
        return Err(format!("unexpected hidden state shape: {shape:?}"));
    }
    let time_steps = shape[1] as usize;
    if time_steps == 0 {
        return Err("encoder produced zero time steps".to_string());
    }

    let mut pooled = vec![0.0f32; EMBEDDING_DIM];
    for frame in data.chunks(EMBEDDING_DIM) {
        for (acc, &v) in pooled.iter_mut().zip(frame.iter()) {
            *acc += v;
        }
    }
    for v in &mut pooled {
        *v /= time_steps as f32;
    }

    Ok(pooled)
}
