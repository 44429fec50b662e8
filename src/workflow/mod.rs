//! Report workflow: one draft moving from photos to a forwarded case.

pub mod session;
pub mod stage;

pub use session::*;
pub use stage::*;

use thiserror::Error;

use crate::forward::ForwardError;
use crate::geo::DirectoryError;
use crate::inference::InferenceError;
use crate::intake::IntakeError;

/// A required field was missing; nothing was sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Image error: {0}")]
    Intake(#[from] IntakeError),

    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    #[error("Forward error: {0}")]
    Forward(#[from] ForwardError),

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Internal lock error")]
    LockPoisoned,
}

/// What the user can do about a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestedAction {
    /// Send the same report to the officer pool instead.
    RetryInPool,
    /// Try the same step again.
    Retry,
    /// Pick different photos.
    ReplaceImages,
}

impl WorkflowError {
    /// Message for the person filing the report.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => e.message.clone(),
            Self::Intake(IntakeError::Decode { name, .. }) => {
                format!("Could not read {name}. Please choose another photo.")
            }
            Self::Intake(_) => "The photo could not be processed.".into(),
            Self::Inference(InferenceError::NotALeaf { reason }) => reason.clone(),
            Self::Inference(InferenceError::Service(_)) => {
                "Prediction failed. Please try again.".into()
            }
            Self::Forward(ForwardError::LocationMissing { .. }) => {
                "Your location is not set, so no nearby officer could be chosen. \
                 Send the report to the officer pool instead."
                    .into()
            }
            Self::Forward(ForwardError::Failed { message, .. }) => message.clone(),
            Self::Directory(_) => "Could not load officers. Please try again.".into(),
            Self::LockPoisoned => "Something went wrong. Please start a new report.".into(),
        }
    }

    /// The explicit follow-up offered with the message, if any.
    pub fn suggested_action(&self) -> Option<SuggestedAction> {
        match self {
            Self::Forward(ForwardError::LocationMissing { .. }) => Some(SuggestedAction::RetryInPool),
            Self::Forward(ForwardError::Failed { .. })
            | Self::Inference(InferenceError::Service(_))
            | Self::Directory(_) => Some(SuggestedAction::Retry),
            Self::Inference(InferenceError::NotALeaf { .. }) | Self::Intake(IntakeError::Decode { .. }) => {
                Some(SuggestedAction::ReplaceImages)
            }
            Self::Validation(_) | Self::Intake(_) | Self::LockPoisoned => None,
        }
    }
}
