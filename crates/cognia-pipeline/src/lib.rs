//! Cognia inference pipeline
//!
//! Turns one patient assessment (task scores, health profile, recorded
//! speech) into a cognitive-decline risk estimate with explainable factors.
//!
//! # Architecture
//!
//! Data flows strictly downward:
//!
//! ```text
//! audio file ─ decode/resample ─┬─ acoustic summary features
//!                               ├─ Wav2Vec2 embedding (768)
//!                               └─ Whisper transcript + language
//! scores + profile ─ tabular feature builder (frozen 15-column schema)
//! embedding + tabular ─ PCA(10) + concat + scale ─ fused vector (25)
//! fused vector ─ ensemble classifier ─ prediction
//! ```
//!
//! Every model-dependent stage degrades rather than fails: a missing
//! encoder yields the zero embedding, missing artifacts route to the
//! closed-form heuristic, and unreadable audio skips the sample. The only
//! fatal path is a malformed assessment score, rejected before any model
//! work begins.
//!
//! Heavy resources (ONNX sessions, the artifact triple) are service objects
//! constructed once and injected into [`pipeline::PipelineManager`]; each
//! initializes lazily at most once behind a `OnceLock`.

pub mod acoustic;
pub mod audio;
pub mod embedding;
pub mod fusion;
pub mod models;
pub mod pipeline;
pub mod predictor;
pub mod tabular;
pub mod transcribe;

pub use pipeline::{PipelineManager, ProcessOutcome};
pub use predictor::{Prediction, RiskLevel, RiskPredictor};
