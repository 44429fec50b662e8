use serde::{Deserialize, Serialize};

use super::label::{CropDisease, MISSING};

// ═══════════════════════════════════════════════════════════
// Classifier output, as received
// ═══════════════════════════════════════════════════════════

/// One ranked guess from the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub label: String,
    pub score: f64,
}

/// Verdict for a single photo, before normalization. Every field is optional
/// because the classifier omits what does not apply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPrediction {
    pub label: Option<String>,
    pub confidence: Option<f64>,
    pub is_leaf: Option<bool>,
    pub reason: Option<String>,
    pub leaf_probability: Option<f64>,
    pub top_k: Vec<Candidate>,
    pub error: Option<String>,
}

/// The classifier answers in one of three shapes. Resolved once by
/// `normalize_response`; nothing downstream looks at this again.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassificationResponse {
    /// A single verdict covering the submitted photo(s).
    Flat(RawPrediction),
    /// The server's pick of the best verdict plus one verdict per photo,
    /// in submission order.
    Aggregate {
        best: RawPrediction,
        per_image: Vec<RawPrediction>,
    },
    /// The service reported a processing error.
    Failed(String),
}

// ═══════════════════════════════════════════════════════════
// Normalized result
// ═══════════════════════════════════════════════════════════

/// Best label across the photo set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: String,
    /// In [0, 1].
    pub confidence: f64,
}

/// Per-photo breakdown entry, in the order the photos were added.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageVerdict {
    pub leaf_valid: bool,
    pub label: Option<String>,
    pub confidence: f64,
    pub reason: Option<String>,
    pub leaf_probability: Option<f64>,
}

impl ImageVerdict {
    pub fn crop_disease(&self) -> CropDisease {
        CropDisease::from_label(self.label.as_deref())
    }
}

/// Diagnosis for the exact image set it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceResult {
    pub best: Prediction,
    /// Aggregate leaf validity of the photo set.
    pub leaf_valid: bool,
    pub images: Vec<ImageVerdict>,
    pub top_k: Vec<Candidate>,
}

impl InferenceResult {
    pub fn crop_disease(&self) -> CropDisease {
        CropDisease::parse(&self.best.label)
    }

    /// At most `n` ranked guesses, for display.
    pub fn top_candidates(&self, n: usize) -> &[Candidate] {
        &self.top_k[..self.top_k.len().min(n)]
    }

    /// "Crop — Disease", as shown when the prediction completes.
    pub fn summary(&self) -> String {
        self.crop_disease().to_string()
    }

    /// Number of photos the classifier accepted as leaves.
    pub fn leaf_count(&self) -> usize {
        self.images.iter().filter(|v| v.leaf_valid).count()
    }
}

/// Format a [0, 1] score as a percentage with one decimal.
pub fn percent(value: Option<f64>) -> String {
    match value {
        Some(v) if !v.is_nan() => format!("{:.1}%", v * 100.0),
        _ => MISSING.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with_candidates(n: usize) -> InferenceResult {
        InferenceResult {
            best: Prediction {
                label: "Wheat___Rust".into(),
                confidence: 0.92,
            },
            leaf_valid: true,
            images: vec![
                ImageVerdict {
                    leaf_valid: true,
                    label: Some("Wheat___Rust".into()),
                    confidence: 0.92,
                    reason: None,
                    leaf_probability: Some(0.99),
                },
                ImageVerdict {
                    leaf_valid: false,
                    label: None,
                    confidence: 0.0,
                    reason: Some("Not a plant leaf".into()),
                    leaf_probability: Some(0.1),
                },
            ],
            top_k: (0..n)
                .map(|i| Candidate {
                    label: format!("Label{i}"),
                    score: 1.0 / (i as f64 + 1.0),
                })
                .collect(),
        }
    }

    #[test]
    fn top_candidates_truncates() {
        let result = result_with_candidates(7);
        assert_eq!(result.top_candidates(5).len(), 5);
        assert_eq!(result.top_candidates(5)[0].label, "Label0");
    }

    #[test]
    fn top_candidates_shorter_than_limit() {
        let result = result_with_candidates(2);
        assert_eq!(result.top_candidates(5).len(), 2);
    }

    #[test]
    fn summary_uses_parsed_label() {
        assert_eq!(result_with_candidates(0).summary(), "Wheat — Rust");
    }

    #[test]
    fn leaf_count_ignores_rejected_photos() {
        assert_eq!(result_with_candidates(0).leaf_count(), 1);
    }

    #[test]
    fn non_leaf_verdict_has_placeholder_diagnosis() {
        let result = result_with_candidates(0);
        let parsed = result.images[1].crop_disease();
        assert_eq!(parsed.crop, MISSING);
    }

    #[test]
    fn percent_formats_one_decimal() {
        assert_eq!(percent(Some(0.92)), "92.0%");
        assert_eq!(percent(Some(0.5)), "50.0%");
        assert_eq!(percent(None), "—");
        assert_eq!(percent(Some(f64::NAN)), "—");
    }
}
