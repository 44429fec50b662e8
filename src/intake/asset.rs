use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::preview::PreviewHandle;
use crate::config::CompressionConfig;
use crate::services::UploadImage;

/// Stable identity of a photo in the draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId(pub Uuid);

impl AssetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AssetId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A photo as handed over by the picker or camera.
#[derive(Debug, Clone)]
pub struct ImageBlob {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImageBlob {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// Crop rectangle in pixels of the asset's current image. May reach outside
/// the image; it is clamped, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Intersect with a `width` x `height` image. The result is at least
    /// 1x1 and lies fully inside the image.
    pub fn clamp_to(&self, width: u32, height: u32) -> CropRect {
        let (x, w) = clamp_span(self.x, self.width, width);
        let (y, h) = clamp_span(self.y, self.height, height);
        CropRect {
            x: x as i32,
            y: y as i32,
            width: w,
            height: h,
        }
    }
}

fn clamp_span(start: i32, len: u32, bound: u32) -> (u32, u32) {
    let bound = i64::from(bound.max(1));
    let lo = i64::from(start).clamp(0, bound - 1);
    let hi = (i64::from(start) + i64::from(len)).clamp(lo + 1, bound);
    (lo as u32, (hi - lo) as u32)
}

/// A preprocessed photo owned by the intake.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub id: AssetId,
    /// Original name with a `.jpg` extension.
    pub file_name: String,
    /// Current JPEG bytes.
    pub bytes: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
    pub preview: PreviewHandle,
    pub compression: CompressionConfig,
    /// Last crop applied, in the coordinates of the image it was cut from.
    pub crop: Option<CropRect>,
}

impl ImageAsset {
    /// The asset as sent to the backend.
    pub fn upload(&self) -> UploadImage {
        UploadImage::new(self.file_name.clone(), Arc::clone(&self.bytes))
    }
}
