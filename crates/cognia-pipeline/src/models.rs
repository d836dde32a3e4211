//! Pretrained model management
//!
//! Handles locating, downloading, and caching the ONNX weights the pipeline
//! depends on: the Whisper encoder/decoder pair with its tokenizer files and
//! the Wav2Vec2 embedding encoder. Models are downloaded on first use into a
//! configured (or platform-default) cache directory with an atomic rename so
//! a failed download never leaves a truncated file behind.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use cognia_core::config::{ComputeType, Config, ModelSize};
use thiserror::Error;

/// Model files the pipeline can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFile {
    /// Whisper audio encoder (mel features -> hidden states)
    WhisperEncoder,
    /// Whisper autoregressive text decoder
    WhisperDecoder,
    /// Whisper BPE vocabulary (token -> id)
    WhisperVocab,
    /// Whisper special tokens added on top of the base vocabulary
    WhisperAddedTokens,
    /// Wav2Vec2 embedding encoder (waveform -> 768-dim hidden states)
    Wav2Vec2,
}

impl ModelFile {
    /// Cache filename. Whisper weights vary by size tier and precision.
    pub fn filename(&self, size: ModelSize, compute: ComputeType) -> String {
        match self {
            Self::WhisperEncoder => format!(
                "whisper-{}-encoder{}.onnx",
                size.display_name(),
                compute.file_suffix()
            ),
            Self::WhisperDecoder => format!(
                "whisper-{}-decoder{}.onnx",
                size.display_name(),
                compute.file_suffix()
            ),
            Self::WhisperVocab => format!("whisper-{}-vocab.json", size.display_name()),
            Self::WhisperAddedTokens => {
                format!("whisper-{}-added_tokens.json", size.display_name())
            }
            Self::Wav2Vec2 => "wav2vec2-base-960h.onnx".to_string(),
        }
    }

    /// Download URL on the HuggingFace CDN.
    pub fn download_url(&self, size: ModelSize, compute: ComputeType) -> String {
        let whisper_repo = format!(
            "https://huggingface.co/onnx-community/whisper-{}/resolve/main",
            size.display_name()
        );
        match self {
            Self::WhisperEncoder => format!(
                "{whisper_repo}/onnx/encoder_model{}.onnx",
                compute.file_suffix()
            ),
            Self::WhisperDecoder => format!(
                "{whisper_repo}/onnx/decoder_model{}.onnx",
                compute.file_suffix()
            ),
            Self::WhisperVocab => format!("{whisper_repo}/vocab.json"),
            Self::WhisperAddedTokens => format!("{whisper_repo}/added_tokens.json"),
            Self::Wav2Vec2 => {
                "https://huggingface.co/onnx-community/wav2vec2-base-960h/resolve/main/onnx/model.onnx"
                    .to_string()
            }
        }
    }

    /// Human-readable name for logs
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::WhisperEncoder => "Whisper encoder",
            Self::WhisperDecoder => "Whisper decoder",
            Self::WhisperVocab => "Whisper vocabulary",
            Self::WhisperAddedTokens => "Whisper added tokens",
            Self::Wav2Vec2 => "Wav2Vec2 encoder",
        }
    }

    /// Files needed to run transcription
    pub fn transcription_files() -> &'static [ModelFile] {
        &[
            Self::WhisperEncoder,
            Self::WhisperDecoder,
            Self::WhisperVocab,
            Self::WhisperAddedTokens,
        ]
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("could not determine cache directory")]
    NoCacheDir,

    #[error("download failed for {url}: {message}")]
    Download { url: String, message: String },

    #[error("download incomplete: expected {expected} bytes, got {actual}")]
    Incomplete { expected: u64, actual: u64 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Manages model downloads and caching.
#[derive(Debug, Clone)]
pub struct ModelManager {
    cache_dir: PathBuf,
    size: ModelSize,
    compute: ComputeType,
}

impl ModelManager {
    /// Create from the pipeline configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            cache_dir: config.resolved_model_dir(),
            size: config.asr.model_size,
            compute: config.asr.compute_type,
        }
    }

    /// Create with a custom cache directory (for testing)
    pub fn with_cache_dir(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            size: ModelSize::Base,
            compute: ComputeType::Float32,
        }
    }

    /// Local path for a model file
    pub fn model_path(&self, file: ModelFile) -> PathBuf {
        self.cache_dir.join(file.filename(self.size, self.compute))
    }

    /// Check if a model file is already downloaded
    pub fn is_available(&self, file: ModelFile) -> bool {
        self.model_path(file).exists()
    }

    /// Get a model path, downloading it if necessary.
    pub fn ensure_model(&self, file: ModelFile) -> Result<PathBuf, ModelError> {
        let path = self.model_path(file);
        if path.exists() {
            return Ok(path);
        }

        let url = file.download_url(self.size, self.compute);
        log::info!("downloading {} from {}", file.display_name(), url);
        self.download_file(&url, &path)?;
        Ok(path)
    }

    /// Download a file from URL to target path with atomic rename.
    fn download_file(&self, url: &str, target_path: &Path) -> Result<(), ModelError> {
        fs::create_dir_all(&self.cache_dir)?;

        let temp_path = target_path.with_extension("tmp");

        let response = ureq::get(url).call().map_err(|e| ModelError::Download {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let content_length: Option<u64> = response
            .header("Content-Length")
            .and_then(|s| s.parse().ok());

        let mut file = fs::File::create(&temp_path)?;
        let mut reader = response.into_reader();
        let mut buffer = [0u8; 8192];

        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            file.write_all(&buffer[..bytes_read])?;
        }
        file.flush()?;
        drop(file);

        let actual = fs::metadata(&temp_path)?.len();
        if let Some(expected) = content_length {
            if actual != expected {
                fs::remove_file(&temp_path).ok();
                return Err(ModelError::Incomplete { expected, actual });
            }
        }

        fs::rename(&temp_path, target_path)?;
        log::info!(
            "downloaded {:?} ({} bytes)",
            target_path.file_name().unwrap_or_default(),
            actual
        );
        Ok(())
    }
}
