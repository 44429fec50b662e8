//! Runs the classifier over the current photo set and turns whatever shape
//! it answers with into one `InferenceResult`.

use std::sync::Arc;

use tracing::{debug, info};

use super::types::*;
use super::{InferenceError, NOT_A_LEAF_MESSAGE};
use crate::services::{ClassificationService, UploadImage};

pub struct InferenceOrchestrator {
    service: Arc<dyn ClassificationService>,
}

impl InferenceOrchestrator {
    pub fn new(service: Arc<dyn ClassificationService>) -> Self {
        Self { service }
    }

    /// Classify the photos, in order. Never returns a partial result.
    pub async fn predict(&self, images: &[UploadImage]) -> Result<InferenceResult, InferenceError> {
        if images.is_empty() {
            return Err(InferenceError::Service("No images to classify".into()));
        }

        debug!(images = images.len(), "Submitting photos for classification");
        let response = self.service.classify(images).await?;
        let result = normalize_response(response)?;

        info!(
            label = %result.best.label,
            confidence = result.best.confidence,
            leaves = result.leaf_count(),
            images = result.images.len(),
            "Prediction complete"
        );
        Ok(result)
    }
}

/// Resolve the classifier's response shape into an `InferenceResult`.
///
/// - `Failed`, or a best verdict carrying an error → `InferenceError::Service`
/// - best verdict rejected as non-leaf, or every photo rejected → `NotALeaf`
/// - best verdict without a label → `InferenceError::Service`
pub fn normalize_response(response: ClassificationResponse) -> Result<InferenceResult, InferenceError> {
    let (best, per_image) = match response {
        ClassificationResponse::Failed(message) => return Err(InferenceError::Service(message)),
        ClassificationResponse::Flat(raw) => {
            let per_image = vec![raw.clone()];
            (raw, per_image)
        }
        ClassificationResponse::Aggregate { best, per_image } => (best, per_image),
    };

    if let Some(error) = best.error {
        return Err(InferenceError::Service(error));
    }

    let every_photo_rejected = !per_image.is_empty()
        && per_image
            .iter()
            .all(|p| p.error.is_some() || p.is_leaf == Some(false));

    if best.is_leaf == Some(false) || (best.label.is_none() && every_photo_rejected) {
        let reason = best
            .reason
            .or_else(|| per_image.iter().find_map(|p| p.reason.clone()))
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| NOT_A_LEAF_MESSAGE.to_string());
        return Err(InferenceError::NotALeaf { reason });
    }

    let label = best
        .label
        .filter(|l| !l.trim().is_empty())
        .ok_or_else(|| InferenceError::Service("Invalid prediction response".into()))?;

    Ok(InferenceResult {
        best: Prediction {
            label,
            confidence: clamp_unit(best.confidence),
        },
        leaf_valid: best.is_leaf.unwrap_or(true),
        images: per_image.iter().map(verdict).collect(),
        top_k: best.top_k,
    })
}

fn verdict(raw: &RawPrediction) -> ImageVerdict {
    ImageVerdict {
        leaf_valid: raw.error.is_none() && raw.is_leaf.unwrap_or(raw.label.is_some()),
        label: raw.label.clone(),
        confidence: clamp_unit(raw.confidence),
        reason: raw.reason.clone().or_else(|| raw.error.clone()),
        leaf_probability: raw.leaf_probability,
    }
}

fn clamp_unit(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v.clamp(0.0, 1.0),
        _ => 0.0,
    }
}
