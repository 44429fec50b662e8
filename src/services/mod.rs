//! Remote collaborators of the submission pipeline.
//!
//! Each backend capability sits behind its own trait so the pipeline can run
//! against the REST backend (`http::AgriverseClient`) or a stand-in
//! (`mock::MockServices`). The traits carry no UI concerns: they move bytes and
//! JSON and report failures as `ServiceError`.

pub mod http;
pub mod mock;
pub mod types;

pub use http::AgriverseClient;
pub use mock::MockServices;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::forward::ForwardRequest;
use crate::geo::Officer;
use crate::inference::ClassificationResponse;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("Cannot reach the Agriverse backend at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Backend returned error (status {status}): {message}")]
    Http { status: u16, message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}

impl ServiceError {
    /// HTTP status, if the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The server-provided message for HTTP failures, else the display text.
    pub fn message(&self) -> String {
        match self {
            Self::Http { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Leaf classification of one or more photos.
#[async_trait]
pub trait ClassificationService: Send + Sync {
    async fn classify(&self, images: &[UploadImage]) -> Result<ClassificationResponse, ServiceError>;
}

/// Treatment guidance for a (crop, disease) pair. `None` when the service
/// has nothing to say.
#[async_trait]
pub trait AdvisoryService: Send + Sync {
    async fn advice(&self, crop: &str, disease: &str) -> Result<Option<String>, ServiceError>;
}

/// Officers with known coordinates.
#[async_trait]
pub trait OfficerDirectoryService: Send + Sync {
    async fn officers(&self) -> Result<Vec<Officer>, ServiceError>;
}

/// Creates a case from a finished diagnosis.
#[async_trait]
pub trait ForwardingService: Send + Sync {
    async fn forward(&self, request: &ForwardRequest) -> Result<ForwardResponse, ServiceError>;
}

/// One-shot predict + advise + create-case endpoint.
#[async_trait]
pub trait DirectReportService: Send + Sync {
    async fn predict_and_create(
        &self,
        images: &[UploadImage],
        hints: &LocationHints,
    ) -> Result<DirectSubmission, ServiceError>;
}
