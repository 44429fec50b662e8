//! Classifier labels look like `Crop___Disease_Name`.

use serde::{Deserialize, Serialize};

/// Separator between crop and disease inside a classifier label.
pub const LABEL_DELIMITER: &str = "___";

/// Placeholder for a missing crop or disease.
pub const MISSING: &str = "—";

/// Crop and disease parsed from a classifier label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropDisease {
    pub crop: String,
    pub disease: String,
}

impl CropDisease {
    /// Split a label on `___`. The first segment is the crop, the rest are
    /// joined with a single space. A label without the delimiter is all crop.
    pub fn parse(label: &str) -> Self {
        let mut segments = label.split(LABEL_DELIMITER);
        let crop = segments.next().unwrap_or_default().to_string();
        let rest: Vec<&str> = segments.collect();
        let disease = if rest.is_empty() {
            MISSING.to_string()
        } else {
            rest.join(" ")
        };
        Self { crop, disease }
    }

    /// Like `parse`, but an absent label yields placeholders for both parts.
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some(label) => Self::parse(label),
            None => Self {
                crop: MISSING.to_string(),
                disease: MISSING.to_string(),
            },
        }
    }
}

impl std::fmt::Display for CropDisease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} — {}", self.crop, self.disease)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_crop_and_disease() {
        let parsed = CropDisease::parse("Rice___Blast");
        assert_eq!(parsed.crop, "Rice");
        assert_eq!(parsed.disease, "Blast");
    }

    #[test]
    fn keeps_single_underscores_in_disease() {
        let parsed = CropDisease::parse("Rice___Bacterial_Leaf_Blight");
        assert_eq!(parsed.crop, "Rice");
        assert_eq!(parsed.disease, "Bacterial_Leaf_Blight");
    }

    #[test]
    fn label_without_delimiter_is_all_crop() {
        let parsed = CropDisease::parse("Healthy");
        assert_eq!(parsed.crop, "Healthy");
        assert_eq!(parsed.disease, "—");
    }

    #[test]
    fn extra_segments_join_with_space() {
        let parsed = CropDisease::parse("Corn___Leaf___Spot");
        assert_eq!(parsed.crop, "Corn");
        assert_eq!(parsed.disease, "Leaf Spot");
    }

    #[test]
    fn absent_label_is_all_placeholders() {
        let parsed = CropDisease::from_label(None);
        assert_eq!(parsed.crop, MISSING);
        assert_eq!(parsed.disease, MISSING);
    }

    #[test]
    fn display_joins_with_dash() {
        assert_eq!(CropDisease::parse("Wheat___Rust").to_string(), "Wheat — Rust");
    }
}
