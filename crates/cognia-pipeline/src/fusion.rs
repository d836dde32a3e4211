//! Multi-modal fusion: embedding reduction, concatenation, standardization
//!
//! The PCA projection and the per-feature scaler were fitted offline against
//! one specific tabular schema. Using a projection fitted against a
//! different schema produces a numerically valid but semantically wrong
//! vector, so loading verifies every declared dimension and refuses
//! mismatched artifacts; the predictor then stays in fallback mode.

use std::path::{Path, PathBuf};

use cognia_core::schema::{
    TabularFeatures, EMBEDDING_DIM, FUSED_LEN, REDUCED_EMBEDDING_LEN,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read artifact {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse artifact {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("artifact dimension mismatch: {0}")]
    DimensionMismatch(String),
}

/// Linear PCA projection fitted offline: centers the embedding and projects
/// it onto the principal components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PcaProjection {
    /// Per-dimension mean of the training embeddings
    pub mean: Vec<f32>,
    /// Principal component rows, each as long as the embedding
    pub components: Vec<Vec<f32>>,
}

/// Per-feature standardization fitted offline over the fused training
/// matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureScaler {
    pub mean: Vec<f32>,
    pub scale: Vec<f32>,
}

/// The matched projection + scaler pair, validated at load time.
#[derive(Debug, Clone)]
pub struct FusionTransforms {
    projection: PcaProjection,
    scaler: FeatureScaler,
}

impl FusionTransforms {
    /// Load both transforms from JSON files and verify their dimensions.
    pub fn load(projection_path: &Path, scaler_path: &Path) -> Result<Self, ArtifactError> {
        let projection: PcaProjection = read_json(projection_path)?;
        let scaler: FeatureScaler = read_json(scaler_path)?;
        Self::from_parts(projection, scaler)
    }

    /// Validate and assemble transforms already in memory.
    pub fn from_parts(
        projection: PcaProjection,
        scaler: FeatureScaler,
    ) -> Result<Self, ArtifactError> {
        if projection.mean.len() != EMBEDDING_DIM {
            return Err(ArtifactError::DimensionMismatch(format!(
                "projection mean has {} dims, embedding width is {}",
                projection.mean.len(),
                EMBEDDING_DIM
            )));
        }
        if projection.components.len() != REDUCED_EMBEDDING_LEN {
            return Err(ArtifactError::DimensionMismatch(format!(
                "projection has {} components, expected {}",
                projection.components.len(),
                REDUCED_EMBEDDING_LEN
            )));
        }
        for (idx, component) in projection.components.iter().enumerate() {
            if component.len() != EMBEDDING_DIM {
                return Err(ArtifactError::DimensionMismatch(format!(
                    "component {idx} has {} dims, embedding width is {}",
                    component.len(),
                    EMBEDDING_DIM
                )));
            }
        }
        if scaler.mean.len() != FUSED_LEN || scaler.scale.len() != FUSED_LEN {
            return Err(ArtifactError::DimensionMismatch(format!(
                "scaler covers {}/{} features, fused width is {}",
                scaler.mean.len(),
                scaler.scale.len(),
                FUSED_LEN
            )));
        }

        Ok(Self { projection, scaler })
    }

    /// Build the standardized fused vector. Order-sensitive: reduce, then
    /// concatenate in schema order, then scale.
    pub fn fuse(
        &self,
        tabular: &TabularFeatures,
        embedding: &[f32],
    ) -> Result<Vec<f32>, ArtifactError> {
        if embedding.len() != EMBEDDING_DIM {
            return Err(ArtifactError::DimensionMismatch(format!(
                "embedding has {} dims, projection expects {}",
                embedding.len(),
                EMBEDDING_DIM
            )));
        }

        let mut fused = Vec::with_capacity(FUSED_LEN);
        fused.extend_from_slice(&tabular.values());

        for component in &self.projection.components {
            let mut dot = 0.0f32;
            for ((&x, &mean), &weight) in embedding
                .iter()
                .zip(self.projection.mean.iter())
                .zip(component.iter())
            {
                dot += (x - mean) * weight;
            }
            fused.push(dot);
        }

        for (idx, value) in fused.iter_mut().enumerate() {
            // Zero-variance features pass through, matching the fitted scaler
            let scale = self.scaler.scale[idx];
            let scale = if scale > 0.0 { scale } else { 1.0 };
            *value = (*value - self.scaler.mean[idx]) / scale;
        }

        Ok(fused)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ArtifactError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&contents).map_err(|e| ArtifactError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Identity-like transforms: components pick the first 10 embedding
    /// dims, scaler is a no-op.
    pub fn identity_transforms() -> FusionTransforms {
        let mut components = vec![vec![0.0f32; EMBEDDING_DIM]; REDUCED_EMBEDDING_LEN];
        for (i, component) in components.iter_mut().enumerate() {
            component[i] = 1.0;
        }
        FusionTransforms::from_parts(
            PcaProjection {
                mean: vec![0.0; EMBEDDING_DIM],
                components,
            },
            FeatureScaler {
                mean: vec![0.0; FUSED_LEN],
                scale: vec![1.0; FUSED_LEN],
            },
        )
        .unwrap()
    }

    pub fn neutral_tabular() -> TabularFeatures {
        TabularFeatures {
            age: 60.0,
            sex: 0.0,
            education: 0.0,
            mmse: 29.0,
            functional: 9.0,
            memory_complaints: 0.0,
            adl: 9.0,
            family_history: 0.0,
            head_injury: 0.0,
            depression: 0.0,
            cardiovascular_index: 0.0,
            lifestyle_deficit: 0.0,
            bmi: 25.0,
            alcohol_per_week: 0.0,
            diet_quality: 7.0,
            raw_memory: 0.95,
            raw_executive: 0.9,
            raw_sleep_quality: 8.0,
            raw_physical_activity: 5.0,
        }
    }
}
