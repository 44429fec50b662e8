use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::services::{LocationHints, UploadImage};
use crate::workflow::ValidationError;

/// How the backend routes a forwarded report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ForwardMode {
    /// Shared, unassigned queue any officer can pick up.
    Pool,
    /// Officer closest to the farmer's stored location.
    Nearest,
}

impl ForwardMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pool => "POOL",
            Self::Nearest => "NEAREST",
        }
    }

    /// Case-insensitive parse of the wire value.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "POOL" => Some(Self::Pool),
            "NEAREST" => Some(Self::Nearest),
            _ => None,
        }
    }
}

impl std::fmt::Display for ForwardMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One submission attempt. Built fresh for every attempt.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub crop: String,
    pub disease: String,
    /// Exactly the advisory text on display, placeholder included.
    pub advisory_text: String,
    pub images: Vec<UploadImage>,
    pub mode: ForwardMode,
    pub hints: LocationHints,
}

impl ForwardRequest {
    pub fn new(
        crop: &str,
        disease: &str,
        advisory_text: &str,
        images: Vec<UploadImage>,
        mode: ForwardMode,
        hints: LocationHints,
    ) -> Result<Self, ValidationError> {
        if crop.trim().is_empty() {
            return Err(ValidationError::new("crop is required"));
        }
        if disease.trim().is_empty() {
            return Err(ValidationError::new("disease is required"));
        }
        if images.is_empty() {
            return Err(ValidationError::new("at least one image is required"));
        }
        Ok(Self {
            crop: crop.to_string(),
            disease: disease.to_string(),
            advisory_text: advisory_text.to_string(),
            images,
            mode,
            hints,
        })
    }
}

/// Confirmation of a created case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForwardReceipt {
    pub case_id: i64,
    pub requested_mode: ForwardMode,
    pub routed_mode: ForwardMode,
    pub assigned_officer: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl ForwardReceipt {
    /// NEAREST was asked for but no officer was in range, so the server
    /// queued the case in the pool. Still a success.
    pub fn fell_back_to_pool(&self) -> bool {
        self.requested_mode == ForwardMode::Nearest && self.routed_mode == ForwardMode::Pool
    }

    pub fn headline(&self) -> &'static str {
        if self.fell_back_to_pool() {
            "Forwarded to Pool"
        } else {
            "Forwarded Successfully"
        }
    }

    pub fn detail(&self) -> &'static str {
        match (self.fell_back_to_pool(), self.routed_mode) {
            (true, _) => "No nearby officer found. Placed into the pool.",
            (false, ForwardMode::Nearest) => "Sent to the nearest officer.",
            (false, ForwardMode::Pool) => "Placed in the officer pool.",
        }
    }
}

/// Why a forward attempt was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligibility {
    NoImages,
    NoPrediction,
    NotALeaf,
    AdviceNotReady,
}

impl std::fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoImages => write!(f, "no images"),
            Self::NoPrediction => write!(f, "no prediction"),
            Self::NotALeaf => write!(f, "photos were not recognised as a leaf"),
            Self::AdviceNotReady => write!(f, "advice not fetched yet"),
        }
    }
}

/// What a call to `forward()` did.
#[derive(Debug, Clone, PartialEq)]
pub enum ForwardOutcome {
    Submitted(ForwardReceipt),
    /// Preconditions failed; nothing was sent.
    NotEligible(Ineligibility),
    /// Another submission is still pending; nothing was sent.
    Busy,
    /// The draft changed while the request was in flight.
    Discarded,
}

impl ForwardOutcome {
    pub fn receipt(&self) -> Option<&ForwardReceipt> {
        match self {
            Self::Submitted(receipt) => Some(receipt),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt(requested: ForwardMode, routed: ForwardMode) -> ForwardReceipt {
        ForwardReceipt {
            case_id: 42,
            requested_mode: requested,
            routed_mode: routed,
            assigned_officer: None,
            submitted_at: Utc::now(),
        }
    }

    fn image() -> UploadImage {
        UploadImage::new("leaf.jpg", vec![1u8, 2, 3])
    }

    #[test]
    fn mode_round_trips_wire_value() {
        assert_eq!(ForwardMode::parse("nearest"), Some(ForwardMode::Nearest));
        assert_eq!(ForwardMode::parse(" POOL "), Some(ForwardMode::Pool));
        assert_eq!(ForwardMode::parse("closest"), None);
        assert_eq!(ForwardMode::Nearest.to_string(), "NEAREST");
        assert_eq!(serde_json::to_string(&ForwardMode::Pool).unwrap(), "\"POOL\"");
    }

    #[test]
    fn nearest_routed_to_pool_is_a_labelled_success() {
        let fallback = receipt(ForwardMode::Nearest, ForwardMode::Pool);
        assert!(fallback.fell_back_to_pool());
        assert_eq!(fallback.headline(), "Forwarded to Pool");

        let direct = receipt(ForwardMode::Nearest, ForwardMode::Nearest);
        assert!(!direct.fell_back_to_pool());
        assert_eq!(direct.headline(), "Forwarded Successfully");
        assert_eq!(direct.detail(), "Sent to the nearest officer.");

        let pool = receipt(ForwardMode::Pool, ForwardMode::Pool);
        assert!(!pool.fell_back_to_pool());
        assert_eq!(pool.detail(), "Placed in the officer pool.");
    }

    #[test]
    fn request_requires_crop_disease_and_images() {
        let hints = LocationHints::default();
        assert!(ForwardRequest::new("", "Blast", "-", vec![image()], ForwardMode::Pool, hints.clone()).is_err());
        assert!(ForwardRequest::new("Rice", " ", "-", vec![image()], ForwardMode::Pool, hints.clone()).is_err());
        assert!(ForwardRequest::new("Rice", "Blast", "-", vec![], ForwardMode::Pool, hints.clone()).is_err());

        let ok = ForwardRequest::new("Rice", "Blast", "AI advice failed.", vec![image()], ForwardMode::Nearest, hints)
            .unwrap();
        assert_eq!(ok.advisory_text, "AI advice failed.");
        assert_eq!(ok.mode, ForwardMode::Nearest);
    }
}
