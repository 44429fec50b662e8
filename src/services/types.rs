use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::forward::ForwardMode;
use crate::inference::ClassificationResponse;

/// One photo as sent over the wire: file name plus encoded JPEG bytes.
#[derive(Debug, Clone)]
pub struct UploadImage {
    pub file_name: String,
    pub bytes: Arc<[u8]>,
}

impl UploadImage {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Optional administrative area the farmer typed in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationHints {
    pub state: Option<String>,
    pub district: Option<String>,
}

impl LocationHints {
    pub fn new(state: Option<String>, district: Option<String>) -> Self {
        Self {
            state: non_blank(state),
            district: non_blank(district),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_none() && self.district.is_none()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// What the forwarding service reports back for a created case.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardResponse {
    pub case_id: i64,
    /// Mode the server actually used; `None` when the server did not say.
    pub routed_mode: Option<ForwardMode>,
    pub assigned_officer: Option<String>,
}

/// Reference to a case created by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRef {
    pub id: i64,
    pub status: Option<String>,
    pub assigned_officer: Option<String>,
}

/// Result of the one-shot predict-and-create call.
#[derive(Debug, Clone)]
pub struct DirectSubmission {
    pub classification: ClassificationResponse,
    pub advice: Option<String>,
    /// `None` when no leaf was found and therefore no case was opened.
    pub case: Option<CaseRef>,
}
