pub mod label;
pub mod orchestrator;
pub mod types;

pub use label::*;
pub use orchestrator::*;
pub use types::*;

use thiserror::Error;

use crate::services::ServiceError;

/// Default message when the service rejects the photos without a reason.
pub const NOT_A_LEAF_MESSAGE: &str = "The uploaded image is not a plant leaf.";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    /// None of the photos shows a usable plant leaf.
    #[error("{reason}")]
    NotALeaf { reason: String },

    /// The classifier failed or answered with something unusable.
    #[error("Prediction failed: {0}")]
    Service(String),
}

impl From<ServiceError> for InferenceError {
    fn from(err: ServiceError) -> Self {
        Self::Service(err.message())
    }
}
