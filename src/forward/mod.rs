pub mod coordinator;
pub mod types;

pub use coordinator::*;
pub use types::*;

use thiserror::Error;

use crate::services::ServiceError;

/// Message fragments that mark a rejection as a missing-location problem.
const LOCATION_MARKERS: &[&str] = &["location", "latitude", "no officers"];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForwardError {
    /// The server could not route to an officer because a location is
    /// missing. Resubmitting in POOL mode usually succeeds.
    #[error("Location needed: {message}")]
    LocationMissing { status: u16, message: String },

    #[error("Forward failed: {message}")]
    Failed { status: Option<u16>, message: String },
}

impl ForwardError {
    /// Classify a submission failure.
    ///
    /// HTTP 400/422 whose message mentions a location, latitude or missing
    /// officers → `LocationMissing`; anything else → `Failed`.
    pub fn classify(err: ServiceError) -> Self {
        let status = err.status();
        let message = err.message();
        let lowered = message.to_lowercase();

        match status {
            Some(code @ (400 | 422)) if LOCATION_MARKERS.iter().any(|m| lowered.contains(m)) => {
                Self::LocationMissing {
                    status: code,
                    message,
                }
            }
            _ => Self::Failed { status, message },
        }
    }

    /// Mode to offer as an alternate resubmission, if any.
    pub fn fallback_mode(&self) -> Option<ForwardMode> {
        match self {
            Self::LocationMissing { .. } => Some(ForwardMode::Pool),
            Self::Failed { .. } => None,
        }
    }
}

impl From<ServiceError> for ForwardError {
    fn from(err: ServiceError) -> Self {
        Self::classify(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16, message: &str) -> ServiceError {
        ServiceError::Http {
            status,
            message: message.into(),
        }
    }

    #[test]
    fn no_officers_nearby_is_location_missing() {
        let err = ForwardError::classify(http(400, "No officers found nearby"));
        assert!(matches!(err, ForwardError::LocationMissing { status: 400, .. }));
        assert_eq!(err.fallback_mode(), Some(ForwardMode::Pool));
    }

    #[test]
    fn unprocessable_latitude_is_location_missing() {
        let err = ForwardError::classify(http(422, "User LATITUDE is not set"));
        assert!(matches!(err, ForwardError::LocationMissing { status: 422, .. }));
    }

    #[test]
    fn server_error_is_generic() {
        let err = ForwardError::classify(http(500, "internal error"));
        assert_eq!(
            err,
            ForwardError::Failed {
                status: Some(500),
                message: "internal error".into()
            }
        );
        assert_eq!(err.fallback_mode(), None);
    }

    #[test]
    fn location_text_on_other_status_is_generic() {
        let err = ForwardError::classify(http(500, "location service crashed"));
        assert!(matches!(err, ForwardError::Failed { .. }));
    }

    #[test]
    fn bad_request_without_marker_is_generic() {
        let err = ForwardError::classify(http(400, "crop is required"));
        assert!(matches!(err, ForwardError::Failed { status: Some(400), .. }));
    }

    #[test]
    fn transport_failure_is_generic() {
        let err = ForwardError::classify(ServiceError::Connection("http://localhost:8080".into()));
        assert!(matches!(err, ForwardError::Failed { status: None, .. }));
    }
}
