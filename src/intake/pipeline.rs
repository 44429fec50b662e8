use std::sync::Arc;

use tracing::{debug, info, warn};

use super::asset::*;
use super::preprocess::{self, jpeg_file_name, EncodedImage};
use super::preview::{PreviewStore, ThumbnailPreviews};
use super::IntakeError;
use crate::config::CompressionConfig;
use crate::services::UploadImage;

/// Result of a batch add. Failures are per photo.
#[derive(Debug, Default)]
pub struct AddReport {
    pub added: Vec<AssetId>,
    pub failed: Vec<IntakeError>,
}

impl AddReport {
    pub fn any_added(&self) -> bool {
        !self.added.is_empty()
    }
}

/// Ordered set of preprocessed photos. Insertion order is the order the
/// classifier's per-image breakdown refers to.
pub struct ImageIntake {
    assets: Vec<ImageAsset>,
    config: CompressionConfig,
    previews: Arc<dyn PreviewStore>,
}

impl ImageIntake {
    pub fn new(config: CompressionConfig, previews: Arc<dyn PreviewStore>) -> Self {
        Self {
            assets: Vec::new(),
            config,
            previews,
        }
    }

    /// Preprocess each blob and append it. A blob that cannot be decoded is
    /// reported in `failed`; the rest of the batch proceeds.
    pub fn add(&mut self, blobs: Vec<ImageBlob>) -> AddReport {
        let mut report = AddReport::default();
        for blob in blobs {
            match self.build_asset(&blob) {
                Ok(asset) => {
                    debug!(
                        id = %asset.id,
                        file = %asset.file_name,
                        size = asset.bytes.len(),
                        dims = format!("{}x{}", asset.width, asset.height),
                        "Photo added"
                    );
                    report.added.push(asset.id);
                    self.assets.push(asset);
                }
                Err(e) => {
                    warn!(file = %blob.file_name, error = %e, "Photo rejected");
                    report.failed.push(e);
                }
            }
        }
        info!(
            added = report.added.len(),
            failed = report.failed.len(),
            total = self.assets.len(),
            "Photo batch processed"
        );
        report
    }

    /// Replace the asset's bytes with the clamped crop, re-encoded.
    pub fn crop(&mut self, id: AssetId, rect: CropRect) -> Result<(), IntakeError> {
        let index = self.index_of(id).ok_or(IntakeError::UnknownAsset(id))?;
        let asset = &self.assets[index];

        let (encoded, image, clamped) =
            preprocess::crop(&asset.file_name, &asset.bytes, rect, &self.config)?;
        let preview = self.previews.create(&image)?;

        let asset = &mut self.assets[index];
        self.previews.release(asset.preview);
        apply_encoding(asset, encoded);
        asset.preview = preview;
        asset.crop = Some(clamped);
        debug!(id = %id, rect = ?clamped, "Photo cropped");
        Ok(())
    }

    pub fn remove(&mut self, id: AssetId) -> Result<ImageAsset, IntakeError> {
        let index = self.index_of(id).ok_or(IntakeError::UnknownAsset(id))?;
        let asset = self.assets.remove(index);
        self.previews.release(asset.preview);
        debug!(id = %id, remaining = self.assets.len(), "Photo removed");
        Ok(asset)
    }

    pub fn clear(&mut self) {
        for asset in self.assets.drain(..) {
            self.previews.release(asset.preview);
        }
    }

    pub fn assets(&self) -> &[ImageAsset] {
        &self.assets
    }

    pub fn get(&self, id: AssetId) -> Option<&ImageAsset> {
        self.assets.iter().find(|a| a.id == id)
    }

    /// Position in insertion order.
    pub fn index_of(&self, id: AssetId) -> Option<usize> {
        self.assets.iter().position(|a| a.id == id)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// The photos as sent to the backend, in order.
    pub fn upload_images(&self) -> Vec<UploadImage> {
        self.assets.iter().map(ImageAsset::upload).collect()
    }

    // ── Internal ────────────────────────────────────────────

    fn build_asset(&self, blob: &ImageBlob) -> Result<ImageAsset, IntakeError> {
        let (encoded, image) = preprocess::prepare(&blob.file_name, &blob.bytes, &self.config)?;
        let preview = self.previews.create(&image)?;
        let mut asset = ImageAsset {
            id: AssetId::new(),
            file_name: jpeg_file_name(&blob.file_name),
            bytes: Arc::from(Vec::new()),
            width: 0,
            height: 0,
            preview,
            compression: self.config,
            crop: None,
        };
        apply_encoding(&mut asset, encoded);
        Ok(asset)
    }
}

impl Default for ImageIntake {
    fn default() -> Self {
        Self::new(CompressionConfig::default(), Arc::new(ThumbnailPreviews::new()))
    }
}

impl Drop for ImageIntake {
    fn drop(&mut self) {
        self.clear();
    }
}

fn apply_encoding(asset: &mut ImageAsset, encoded: EncodedImage) {
    asset.bytes = Arc::from(encoded.bytes);
    asset.width = encoded.width;
    asset.height = encoded.height;
}
