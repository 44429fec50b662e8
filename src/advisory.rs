//! Treatment advice for a diagnosed (crop, disease) pair.
//!
//! A fetch always yields displayable text. Missing content and failed
//! requests produce placeholders. A draft holding any `AdvisoryResult` has
//! its advice ready; there is no separate pending state.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::services::AdvisoryService;

/// Shown when the service answered without content.
pub const NO_ADVICE_TEXT: &str = "No advice available";

/// Shown when the request failed.
pub const ADVICE_FAILED_TEXT: &str = "AI advice failed.";

static NUMBERED_STEP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+\))").expect("static regex"));

static NEWLINE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n+").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryStatus {
    Delivered,
    Empty,
    Failed,
}

/// Advice text for exactly one (crop, disease) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvisoryResult {
    pub crop: String,
    pub disease: String,
    /// Text as displayed, placeholder included. Attached verbatim to the
    /// forward request.
    pub text: String,
    pub status: AdvisoryStatus,
}

impl AdvisoryResult {
    pub fn is_for(&self, crop: &str, disease: &str) -> bool {
        self.crop == crop && self.disease == disease
    }

    /// Text with numbered steps split into paragraphs.
    pub fn formatted(&self) -> String {
        format_advice(&self.text)
    }
}

pub struct AdvisoryFetcher {
    service: Arc<dyn AdvisoryService>,
}

impl AdvisoryFetcher {
    pub fn new(service: Arc<dyn AdvisoryService>) -> Self {
        Self { service }
    }

    /// One request for `(crop, disease)`. Never fails.
    pub async fn fetch(&self, crop: &str, disease: &str) -> AdvisoryResult {
        let (text, status) = match self.service.advice(crop, disease).await {
            Ok(Some(text)) if !text.trim().is_empty() => (text, AdvisoryStatus::Delivered),
            Ok(_) => (NO_ADVICE_TEXT.to_string(), AdvisoryStatus::Empty),
            Err(e) => {
                warn!(crop, disease, error = %e, "Advice request failed");
                (ADVICE_FAILED_TEXT.to_string(), AdvisoryStatus::Failed)
            }
        };
        info!(crop, disease, status = ?status, chars = text.len(), "Advice received");

        AdvisoryResult {
            crop: crop.to_string(),
            disease: disease.to_string(),
            text,
            status,
        }
    }
}

/// Put numbered steps ("1)", "2)") on their own paragraphs.
pub fn format_advice(text: &str) -> String {
    let split = NUMBERED_STEP.replace_all(text, "\n$1");
    NEWLINE_RUN.replace_all(&split, "\n\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{MockServices, ServiceError};

    #[tokio::test]
    async fn delivered_advice_keeps_text() {
        let mock = Arc::new(MockServices::new().with_advice(Some("Remove infected leaves.".into())));
        let fetcher = AdvisoryFetcher::new(mock.clone());

        let result = fetcher.fetch("Wheat", "Rust").await;
        assert_eq!(result.status, AdvisoryStatus::Delivered);
        assert_eq!(result.text, "Remove infected leaves.");
        assert!(result.is_for("Wheat", "Rust"));
        assert_eq!(mock.advice_calls(), 1);
    }

    #[tokio::test]
    async fn absent_advice_uses_placeholder() {
        let mock = Arc::new(MockServices::new().with_advice(None));
        let result = AdvisoryFetcher::new(mock).fetch("Rice", "Blast").await;
        assert_eq!(result.status, AdvisoryStatus::Empty);
        assert_eq!(result.text, NO_ADVICE_TEXT);
    }

    #[tokio::test]
    async fn failed_request_is_still_ready() {
        let mock = Arc::new(MockServices::new().with_advice_error(ServiceError::Timeout(120)));
        let result = AdvisoryFetcher::new(mock).fetch("Rice", "Blast").await;
        assert_eq!(result.status, AdvisoryStatus::Failed);
        assert_eq!(result.text, ADVICE_FAILED_TEXT);
        assert_eq!(result.formatted(), ADVICE_FAILED_TEXT);
    }

    #[tokio::test]
    async fn delivered_steps_are_formatted() {
        let mock = Arc::new(MockServices::new().with_advice(Some("1) Prune. 2) Spray.".into())));
        let result = AdvisoryFetcher::new(mock).fetch("Rice", "Blast").await;
        assert_eq!(result.formatted(), "1) Prune. \n\n2) Spray.");
        assert_eq!(result.text, "1) Prune. 2) Spray.");
    }

    #[test]
    fn numbered_steps_become_paragraphs() {
        let text = "Act fast. 1) Remove leaves. 2) Spray fungicide.";
        assert_eq!(
            format_advice(text),
            "Act fast. \n\n1) Remove leaves. \n\n2) Spray fungicide."
        );
    }

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(format_advice("  Water early.\n\n\nAvoid wet leaves. "), "Water early.\n\nAvoid wet leaves.");
    }
}
