//! Whisper ONNX inference engine
//!
//! Runs the exported encoder/decoder pair with deterministic argmax
//! decoding (temperature zero). Sessions sit behind a Mutex since
//! `Session::run` requires `&mut self`; the engine itself is shared across
//! assessment workers. Audio is processed in 30-second windows; the decoded
//! window texts form the ordered segment sequence.
//!
//! Language identification runs once per file on the first window by
//! reading the decoder's distribution over the vocabulary's language
//! marker tokens.

use std::collections::HashMap;
use std::sync::Mutex;

use cognia_core::config::Device;
use ndarray::Array3;
use ort::session::Session;
use ort::value::Tensor;
use realfft::RealFftPlanner;
use thiserror::Error;

use crate::acoustic::{hann_window, mel_filterbank};
use crate::models::{ModelFile, ModelManager};
use crate::transcribe::vad;

/// Whisper mel parameters (fixed by the pretrained model).
const N_FFT: usize = 400;
const HOP_LENGTH: usize = 160;
const N_MELS: usize = 80;
/// Samples per 30-second decode window at 16kHz.
const CHUNK_SAMPLES: usize = 30 * 16_000;
/// Mel frames per window.
const MEL_FRAMES: usize = CHUNK_SAMPLES / HOP_LENGTH;
/// Cap on generated tokens per window.
const MAX_DECODE_TOKENS: usize = 224;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("model not available: {0}")]
    ModelNotAvailable(String),

    #[error("vocabulary error: {0}")]
    Vocabulary(String),

    #[error("inference error: {0}")]
    Inference(String),
}

/// Raw engine output for one file, before tag normalization.
#[derive(Debug, Clone)]
pub struct EngineOutput {
    /// Ordered window texts joined with single spaces; may be empty
    pub text: String,
    /// Detected language marker (e.g. "en"), if identification ran
    pub language: Option<String>,
    /// Probability mass of the detected language among all languages
    pub confidence: Option<f32>,
}

/// Whisper encoder/decoder sessions plus tokenizer tables.
pub struct WhisperEngine {
    encoder: Mutex<Session>,
    decoder: Mutex<Session>,
    vocab: WhisperVocab,
}

impl WhisperEngine {
    /// Load sessions and tokenizer files, downloading them if needed.
    ///
    /// Expensive (model weights); call once per process and share.
    pub fn load(models: &ModelManager, device: Device) -> Result<Self, EngineError> {
        let encoder_path = models
            .ensure_model(ModelFile::WhisperEncoder)
            .map_err(|e| EngineError::ModelNotAvailable(e.to_string()))?;
        let decoder_path = models
            .ensure_model(ModelFile::WhisperDecoder)
            .map_err(|e| EngineError::ModelNotAvailable(e.to_string()))?;
        let vocab_path = models
            .ensure_model(ModelFile::WhisperVocab)
            .map_err(|e| EngineError::ModelNotAvailable(e.to_string()))?;
        let added_path = models
            .ensure_model(ModelFile::WhisperAddedTokens)
            .map_err(|e| EngineError::ModelNotAvailable(e.to_string()))?;

        let encoder = build_session(&encoder_path, device)?;
        let decoder = build_session(&decoder_path, device)?;
        let vocab = WhisperVocab::load(&vocab_path, Some(&added_path))?;

        log::info!(
            "whisper engine ready: vocab_size={}, {} languages",
            vocab.id_to_token.len(),
            vocab.languages.len()
        );

        Ok(Self {
            encoder: Mutex::new(encoder),
            decoder: Mutex::new(decoder),
            vocab,
        })
    }

    /// Transcribe a 16kHz mono waveform.
    pub fn transcribe(&self, samples: &[f32]) -> Result<EngineOutput, EngineError> {
        let speech = vad::filter_silence(samples);
        if speech.is_empty() {
            return Ok(EngineOutput {
                text: String::new(),
                language: None,
                confidence: None,
            });
        }

        let mut segments: Vec<String> = Vec::new();
        let mut language: Option<String> = None;
        let mut confidence: Option<f32> = None;
        let mut language_token = None;

        for (idx, chunk) in speech.chunks(CHUNK_SAMPLES).enumerate() {
            let mel = log_mel_spectrogram(chunk);
            let hidden = self.run_encoder(&mel)?;

            if idx == 0 {
                let (tag, token, prob) = self.detect_language(&hidden)?;
                language = Some(tag);
                confidence = Some(prob);
                language_token = Some(token);
            }

            let token = language_token.ok_or_else(|| {
                EngineError::Inference("language token missing after detection".into())
            })?;
            let text = self.decode_window(&hidden, token)?;
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                segments.push(trimmed.to_string());
            }
        }

        Ok(EngineOutput {
            text: segments.join(" "),
            language,
            confidence,
        })
    }

    /// Run the encoder on one mel window.
    fn run_encoder(&self, mel: &Array3<f32>) -> Result<EncoderStates, EngineError> {
        let shape = mel.shape().to_vec();
        let flat: Vec<f32> = mel.iter().copied().collect();
        let input =
            Tensor::from_array(([shape[0] as i64, shape[1] as i64, shape[2] as i64], flat))
                .map_err(|e| EngineError::Inference(format!("mel tensor: {e}")))?;

        let mut encoder = self
            .encoder
            .lock()
            .map_err(|_| EngineError::Inference("encoder lock poisoned".into()))?;
        let outputs = encoder
            .run(ort::inputs!["input_features" => input])
            .map_err(|e| EngineError::Inference(format!("encoder run: {e}")))?;

        let (_, value) = outputs
            .iter()
            .next()
            .ok_or_else(|| EngineError::Inference("encoder produced no output".into()))?;
        let (shape, data) = value
            .try_extract_tensor::<f32>()
            .map_err(|e| EngineError::Inference(format!("extract hidden states: {e}")))?;

        if shape.len() != 3 {
            return Err(EngineError::Inference(format!(
                "unexpected encoder output shape: {shape:?}"
            )));
        }

        Ok(EncoderStates {
            data: data.to_vec(),
            frames: shape[1] as usize,
            hidden: shape[2] as usize,
        })
    }

    /// One decoder step: logits for the last position given the token prefix.
    fn decoder_step(
        &self,
        tokens: &[i64],
        states: &EncoderStates,
    ) -> Result<Vec<f32>, EngineError> {
        let input_ids = Tensor::from_array(([1i64, tokens.len() as i64], tokens.to_vec()))
            .map_err(|e| EngineError::Inference(format!("input_ids tensor: {e}")))?;
        let hidden = Tensor::from_array((
            [1i64, states.frames as i64, states.hidden as i64],
            states.data.clone(),
        ))
        .map_err(|e| EngineError::Inference(format!("hidden state tensor: {e}")))?;

        let mut decoder = self
            .decoder
            .lock()
            .map_err(|_| EngineError::Inference("decoder lock poisoned".into()))?;
        let outputs = decoder
            .run(ort::inputs![
                "input_ids" => input_ids,
                "encoder_hidden_states" => hidden,
            ])
            .map_err(|e| EngineError::Inference(format!("decoder run: {e}")))?;

        let (_, value) = outputs
            .iter()
            .next()
            .ok_or_else(|| EngineError::Inference("decoder produced no output".into()))?;
        let (shape, data) = value
            .try_extract_tensor::<f32>()
            .map_err(|e| EngineError::Inference(format!("extract logits: {e}")))?;

        // Logits are [1, L, vocab]; keep the last position
        let vocab_size = *shape
            .last()
            .ok_or_else(|| EngineError::Inference("empty logits shape".into()))?
            as usize;
        if data.len() < vocab_size {
            return Err(EngineError::Inference("logits shorter than vocab".into()));
        }
        Ok(data[data.len() - vocab_size..].to_vec())
    }

    /// Identify the spoken language from the first decoder step.
    ///
    /// Returns (tag, language token id, probability mass among languages).
    fn detect_language(&self, states: &EncoderStates) -> Result<(String, i64, f32), EngineError> {
        let logits = self.decoder_step(&[self.vocab.sot], states)?;

        let mut scored: Vec<(&str, i64, f32)> = Vec::with_capacity(self.vocab.languages.len());
        for (tag, id) in &self.vocab.languages {
            let logit = *logits.get(*id as usize).ok_or_else(|| {
                EngineError::Vocabulary(format!("language token {id} outside logits"))
            })?;
            scored.push((tag.as_str(), *id, logit));
        }

        // Softmax over the language tokens only
        let max_logit = scored
            .iter()
            .map(|(_, _, l)| *l)
            .fold(f32::NEG_INFINITY, f32::max);
        let denom: f32 = scored.iter().map(|(_, _, l)| (l - max_logit).exp()).sum();

        let (tag, id, logit) = scored
            .iter()
            .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal))
            .ok_or_else(|| EngineError::Vocabulary("no language tokens in vocabulary".into()))?;

        let probability = (logit - max_logit).exp() / denom;
        Ok((tag.to_string(), *id, probability))
    }

    /// Greedy decode of one window with the transcription task prompt.
    fn decode_window(&self, states: &EncoderStates, language_token: i64) -> Result<String, EngineError> {
        let prompt = [
            self.vocab.sot,
            language_token,
            self.vocab.transcribe,
            self.vocab.no_timestamps,
        ];
        let mut tokens: Vec<i64> = prompt.to_vec();

        loop {
            let logits = self.decoder_step(&tokens, states)?;

            // Argmax over text tokens and end-of-text; task/timestamp
            // markers never appear mid-transcript.
            let mut best = self.vocab.eot;
            let mut best_logit = f32::NEG_INFINITY;
            for (id, &logit) in logits.iter().enumerate().take(self.vocab.eot as usize + 1) {
                if logit > best_logit {
                    best = id as i64;
                    best_logit = logit;
                }
            }

            if best == self.vocab.eot {
                break;
            }
            tokens.push(best);

            if tokens.len() - prompt.len() >= MAX_DECODE_TOKENS {
                log::debug!("decode window hit the {MAX_DECODE_TOKENS}-token cap");
                break;
            }
        }

        Ok(self.vocab.decode(&tokens[prompt.len()..]))
    }
}

/// Encoder hidden states for one window.
struct EncoderStates {
    data: Vec<f32>,
    frames: usize,
    hidden: usize,
}

/// Session construction with device selection.
fn build_session(path: &std::path::Path, device: Device) -> Result<Session, EngineError> {
    let mut builder = Session::builder()
        .and_then(|b| Ok(b.with_intra_threads(1)?))
        .map_err(|e| EngineError::ModelNotAvailable(format!("session builder: {e}")))?;

    #[cfg(feature = "cuda")]
    let mut builder = if device != Device::Cpu {
        use ort::execution_providers::CUDAExecutionProvider;
        builder
            .with_execution_providers([CUDAExecutionProvider::default().build()])
            .map_err(|e| EngineError::ModelNotAvailable(format!("cuda provider: {e}")))?
    } else {
        builder
    };
    #[cfg(not(feature = "cuda"))]
    let _ = device;

    builder
        .commit_from_file(path)
        .map_err(|e| EngineError::ModelNotAvailable(format!("load {path:?}: {e}")))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tokenizer tables
// ─────────────────────────────────────────────────────────────────────────────

/// Whisper vocabulary with resolved marker tokens.
pub struct WhisperVocab {
    id_to_token: Vec<String>,
    byte_decoder: HashMap<char, u8>,
    /// (language tag, token id), discovered from `<|xx|>` vocabulary entries
    languages: Vec<(String, i64)>,
    sot: i64,
    eot: i64,
    transcribe: i64,
    no_timestamps: i64,
}

impl WhisperVocab {
    /// Load from vocab.json plus the optional added-tokens sidecar.
    pub fn load(
        vocab_path: &std::path::Path,
        added_path: Option<&std::path::Path>,
    ) -> Result<Self, EngineError> {
        let mut table: HashMap<String, u32> = read_token_map(vocab_path)?;
        if let Some(added) = added_path {
            if added.exists() {
                table.extend(read_token_map(added)?);
            }
        }
        Self::from_table(table)
    }

    fn from_table(table: HashMap<String, u32>) -> Result<Self, EngineError> {
        let max_id = table
            .values()
            .max()
            .copied()
            .ok_or_else(|| EngineError::Vocabulary("empty vocabulary".into()))?;

        let mut id_to_token = vec![String::new(); max_id as usize + 1];
        for (token, id) in &table {
            id_to_token[*id as usize] = token.clone();
        }

        let lookup = |name: &str| -> Result<i64, EngineError> {
            table
                .get(name)
                .map(|&id| i64::from(id))
                .ok_or_else(|| EngineError::Vocabulary(format!("missing marker token {name}")))
        };

        let sot = lookup("<|startoftranscript|>")?;
        let eot = lookup("<|endoftext|>")?;
        let transcribe = lookup("<|transcribe|>")?;
        let no_timestamps = lookup("<|notimestamps|>")?;

        let mut languages: Vec<(String, i64)> = table
            .iter()
            .filter_map(|(token, &id)| {
                let inner = token.strip_prefix("<|")?.strip_suffix("|>")?;
                let plausible = (2..=3).contains(&inner.len())
                    && inner.bytes().all(|b| b.is_ascii_lowercase());
                plausible.then(|| (inner.to_string(), i64::from(id)))
            })
            .collect();
        languages.sort_by_key(|(_, id)| *id);

        if languages.is_empty() {
            return Err(EngineError::Vocabulary(
                "no language marker tokens found".into(),
            ));
        }

        Ok(Self {
            id_to_token,
            byte_decoder: byte_decoder(),
            languages,
            sot,
            eot,
            transcribe,
            no_timestamps,
        })
    }

    /// Detokenize text token ids through the byte-level BPE alphabet.
    pub fn decode(&self, tokens: &[i64]) -> String {
        let mut bytes: Vec<u8> = Vec::new();
        for &id in tokens {
            let Some(token) = self.id_to_token.get(id as usize) else {
                continue;
            };
            // Marker tokens are not byte-encoded; drop them whole
            let decoded: Option<Vec<u8>> = token
                .chars()
                .map(|ch| self.byte_decoder.get(&ch).copied())
                .collect();
            if let Some(token_bytes) = decoded {
                bytes.extend_from_slice(&token_bytes);
            }
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

fn read_token_map(path: &std::path::Path) -> Result<HashMap<String, u32>, EngineError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| EngineError::Vocabulary(format!("read {path:?}: {e}")))?;
    serde_json::from_str(&contents)
        .map_err(|e| EngineError::Vocabulary(format!("parse {path:?}: {e}")))
}

/// Inverse of the GPT-2 byte-to-unicode alphabet used by the BPE vocabulary.
fn byte_decoder() -> HashMap<char, u8> {
    let mut map = HashMap::with_capacity(256);
    let printable =
        |b: u8| (33..=126).contains(&b) || (161..=172).contains(&b) || (174..=255).contains(&b);

    let mut offset = 0u32;
    for byte in 0u32..256 {
        let b = byte as u8;
        let ch = if printable(b) {
            char::from_u32(byte).expect("printable byte is a valid char")
        } else {
            let ch = char::from_u32(256 + offset).expect("offset char is valid");
            offset += 1;
            ch
        };
        map.insert(ch, b);
    }
    map
}

// ─────────────────────────────────────────────────────────────────────────────
// Mel spectrogram
// ─────────────────────────────────────────────────────────────────────────────

/// Compute the normalized 80-band log-mel spectrogram for one window.
///
/// The window is zero-padded to 30 seconds so the encoder always sees
/// `[1, 80, 3000]`. Normalization follows the pretrained model: log10 with
/// a floor, clamped to 8 dB below the maximum, scaled to roughly [-1, 1].
fn log_mel_spectrogram(chunk: &[f32]) -> Array3<f32> {
    let mut padded = chunk.to_vec();
    padded.resize(CHUNK_SAMPLES, 0.0);

    let window = hann_window(N_FFT);
    let filterbank = mel_filterbank(N_MELS, N_FFT, 16_000.0);

    let mut planner = RealFftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(N_FFT);
    let mut scratch = fft.make_scratch_vec();
    let mut spectrum = fft.make_output_vec();
    let mut frame = vec![0.0f32; N_FFT];

    let mut mel = Array3::<f32>::zeros((1, N_MELS, MEL_FRAMES));
    let mut max_val = f32::NEG_INFINITY;

    for frame_idx in 0..MEL_FRAMES {
        let start = frame_idx * HOP_LENGTH;
        for (i, dst) in frame.iter_mut().enumerate() {
            let sample = padded.get(start + i).copied().unwrap_or(0.0);
            *dst = sample * window[i];
        }

        fft.process_with_scratch(&mut frame, &mut spectrum, &mut scratch)
            .expect("FFT length is fixed at plan time");

        let power: Vec<f32> = spectrum
            .iter()
            .map(|c| c.re * c.re + c.im * c.im)
            .collect();

        for (band, filter) in filterbank.iter().enumerate() {
            let energy: f32 = filter
                .iter()
                .zip(power.iter())
                .map(|(&coeff, &p)| coeff * p)
                .sum();
            let value = energy.max(1e-10).log10();
            max_val = max_val.max(value);
            mel[[0, band, frame_idx]] = value;
        }
    }

    // Dynamic range compression relative to the loudest bin
    let floor = max_val - 8.0;
    mel.mapv_inplace(|v| (v.max(floor) + 4.0) / 4.0);
    mel
}
