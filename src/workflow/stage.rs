use serde::Serialize;

use crate::advisory::AdvisoryResult;
use crate::inference::InferenceResult;

/// Where the draft stands. Always derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkflowStage {
    Upload,
    Predict,
    Advice,
    Forward,
}

impl WorkflowStage {
    /// - no photos, or photos rejected as non-leaf → `Upload`
    /// - no valid diagnosis → `Predict`
    /// - no advice attempt on record → `Advice`
    /// - otherwise → `Forward`
    pub fn derive(
        image_count: usize,
        leaf_rejected: bool,
        inference: Option<&InferenceResult>,
        advisory: Option<&AdvisoryResult>,
    ) -> Self {
        if image_count == 0 || leaf_rejected {
            return Self::Upload;
        }
        match (inference, advisory) {
            (Some(result), Some(_)) if result.leaf_valid => Self::Forward,
            (Some(result), _) if result.leaf_valid => Self::Advice,
            _ => Self::Predict,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Upload => "Upload Images",
            Self::Predict => "Predict",
            Self::Advice => "Advice",
            Self::Forward => "Forward",
        }
    }
}
