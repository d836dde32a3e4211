//! Global configuration for the Cognia pipeline
//!
//! Configuration is stored as YAML. A missing or unparsable file falls back
//! to defaults with a warning; the pipeline must stay runnable on a bare
//! deployment.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage directory for downloaded model weights.
    /// `None` resolves to the platform cache dir at runtime.
    pub model_dir: Option<PathBuf>,
    /// Paths of the persisted fusion artifacts
    pub artifacts: ArtifactConfig,
    /// Speech recognition settings
    pub asr: AsrConfig,
    /// Whether to run the Wav2Vec2 embedding encoder. When disabled the
    /// pipeline feeds the zero vector downstream.
    pub embeddings: EmbeddingConfig,
    /// Transcript translation settings
    pub translation: TranslationConfig,
    /// Language tags offered for speech recording
    pub speech_languages: SpeechLanguages,
}

/// Locations of the classifier / projection / scaler triple.
///
/// The three files are fitted together; the predictor refuses fused
/// inference unless all of them load and their dimensions agree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Ensemble classifier exported to ONNX
    pub classifier: PathBuf,
    /// PCA projection of the speech embedding (JSON)
    pub projection: PathBuf,
    /// Per-feature standardization transform (JSON)
    pub scaler: PathBuf,
    /// Optional per-feature importances exported at training time (JSON)
    pub importances: Option<PathBuf>,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            classifier: PathBuf::from("artifacts/classifier.onnx"),
            projection: PathBuf::from("artifacts/pca_projection.json"),
            scaler: PathBuf::from("artifacts/scaler.json"),
            importances: Some(PathBuf::from("artifacts/importances.json")),
        }
    }
}

/// Speech recognition configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AsrConfig {
    /// Model size tier; larger tiers are slower and more accurate
    pub model_size: ModelSize,
    /// Compute device selection
    pub device: Device,
    /// Numeric precision tier; selects quantized model file variants
    pub compute_type: ComputeType,
}

/// Embedding extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub enabled: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        // Off by default: the encoder is heavy and small deployments run
        // tabular-only with the zero embedding.
        Self { enabled: false }
    }
}

/// Transcript translation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub enabled: bool,
    /// LibreTranslate-compatible endpoint
    pub endpoint: String,
    /// Target language for downstream processing
    pub target_language: String,
    /// Hard cap on the translation request; failure degrades to a warning
    pub timeout_secs: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: String::from("https://libretranslate.com/translate"),
            target_language: String::from("en"),
            timeout_secs: 10,
        }
    }
}

/// Supported speech languages (BCP-47 primary subtags)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeechLanguages(pub Vec<String>);

impl Default for SpeechLanguages {
    fn default() -> Self {
        Self(
            ["en", "hi", "bn", "ta", "te", "kn", "ml", "mr", "gu", "pa"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }
}

/// Whisper model size tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    Tiny,
    #[default]
    Base,
    Small,
    Medium,
}

impl ModelSize {
    /// Display name for logs and UI
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Tiny => "tiny",
            Self::Base => "base",
            Self::Small => "small",
            Self::Medium => "medium",
        }
    }

    /// All tiers (for UI enumeration)
    pub fn all() -> &'static [Self] {
        &[Self::Tiny, Self::Base, Self::Small, Self::Medium]
    }
}

/// Compute device selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cpu,
    Cuda,
    /// Use CUDA when the build and hardware support it, else CPU
    #[default]
    Auto,
}

/// Numeric precision tier for ASR inference.
///
/// ONNX Runtime bakes quantization at export time, so each tier maps to a
/// different model file variant rather than a runtime knob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeType {
    #[default]
    Int8,
    Float16,
    Float32,
}

impl ComputeType {
    /// Suffix of the exported model file variant ("" = full precision)
    pub fn file_suffix(&self) -> &'static str {
        match self {
            Self::Int8 => "_int8",
            Self::Float16 => "_fp16",
            Self::Float32 => "",
        }
    }
}

impl Config {
    /// Clamp values to supported ranges.
    pub fn validate(&mut self) {
        self.translation.timeout_secs = self.translation.timeout_secs.clamp(1, 120);
        if self.translation.target_language.is_empty() {
            self.translation.target_language = String::from("en");
        }
    }

    /// Resolve the model storage directory, creating nothing.
    pub fn resolved_model_dir(&self) -> PathBuf {
        self.model_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("cognia")
                .join("models")
        })
    }
}

/// Load configuration from a YAML file.
///
/// If the file doesn't exist, returns default config. If the file exists but
/// is invalid, logs a warning and returns default config.
pub fn load_config(path: &Path) -> Config {
    if !path.exists() {
        log::info!("load_config: {:?} doesn't exist, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Config>(&contents) {
            Ok(mut config) => {
                config.validate();
                config
            }
            Err(e) => {
                log::warn!("load_config: failed to parse config: {}, using defaults", e);
                Config::default()
            }
        },
        Err(e) => {
            log::warn!("load_config: failed to read config file: {}, using defaults", e);
            Config::default()
        }
    }
}

/// Save configuration to a YAML file, creating parent directories.
pub fn save_config(config: &Config, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let yaml = serde_yaml::to_string(config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    std::fs::write(path, yaml)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.asr.model_size, ModelSize::Base);
        assert_eq!(config.asr.device, Device::Auto);
        assert!(!config.embeddings.enabled);
        assert!(config.translation.enabled);
        assert_eq!(config.speech_languages.0.len(), 10);
    }

    #[test]
    fn validate_clamps_timeout() {
        let mut config = Config::default();
        config.translation.timeout_secs = 0;
        config.validate();
        assert_eq!(config.translation.timeout_secs, 1);

        config.translation.timeout_secs = 3600;
        config.validate();
        assert_eq!(config.translation.timeout_secs, 120);
    }

    #[test]
    fn yaml_roundtrip() {
        let mut config = Config::default();
        config.asr.model_size = ModelSize::Medium;
        config.embeddings.enabled = true;

        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.asr.model_size, ModelSize::Medium);
        assert!(parsed.embeddings.enabled);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config(Path::new("/nonexistent/cognia.yaml"));
        assert_eq!(config.asr.model_size, ModelSize::Base);
    }

    #[test]
    fn invalid_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "asr: [this is not a mapping").unwrap();
        let config = load_config(&path);
        assert_eq!(config.asr.device, Device::Auto);
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let mut config = Config::default();
        config.translation.enabled = false;
        save_config(&config, &path).unwrap();
        let reloaded = load_config(&path);
        assert!(!reloaded.translation.enabled);
    }

    #[test]
    fn compute_type_suffixes() {
        assert_eq!(ComputeType::Int8.file_suffix(), "_int8");
        assert_eq!(ComputeType::Float32.file_suffix(), "");
    }
}
