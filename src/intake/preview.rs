//! Preview handles for the photo strip.
//!
//! Every asset owns exactly one handle. Handles are released when the asset
//! is removed, cleared or replaced by a crop.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use image::DynamicImage;
use tracing::debug;

use super::preprocess::encode_jpeg;
use super::IntakeError;

/// Longest side of a thumbnail, in pixels.
const THUMBNAIL_SIZE: u32 = 160;
const THUMBNAIL_QUALITY: u8 = 70;

/// Opaque reference to a preview held by a `PreviewStore`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreviewHandle(pub u64);

/// Issues and releases previews.
pub trait PreviewStore: Send + Sync {
    fn create(&self, image: &DynamicImage) -> Result<PreviewHandle, IntakeError>;
    fn release(&self, handle: PreviewHandle);
}

/// Keeps a small JPEG thumbnail per asset in memory.
#[derive(Default)]
pub struct ThumbnailPreviews {
    next: AtomicU64,
    thumbnails: Mutex<HashMap<PreviewHandle, Arc<[u8]>>>,
}

impl ThumbnailPreviews {
    pub fn new() -> Self {
        Self::default()
    }

    /// Thumbnail JPEG bytes, if the handle is still live.
    pub fn get(&self, handle: PreviewHandle) -> Option<Arc<[u8]>> {
        self.thumbnails.lock().ok()?.get(&handle).cloned()
    }

    /// Number of live previews.
    pub fn live(&self) -> usize {
        self.thumbnails.lock().map(|t| t.len()).unwrap_or(0)
    }
}

impl PreviewStore for ThumbnailPreviews {
    fn create(&self, image: &DynamicImage) -> Result<PreviewHandle, IntakeError> {
        let thumbnail = image.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE);
        let encoded = encode_jpeg(&thumbnail, THUMBNAIL_QUALITY)?;

        let handle = PreviewHandle(self.next.fetch_add(1, Ordering::Relaxed));
        self.thumbnails
            .lock()
            .map_err(|_| IntakeError::Preview("preview store lock poisoned".into()))?
            .insert(handle, Arc::from(encoded.bytes));
        Ok(handle)
    }

    fn release(&self, handle: PreviewHandle) {
        if let Ok(mut thumbnails) = self.thumbnails.lock() {
            if thumbnails.remove(&handle).is_none() {
                debug!(handle = handle.0, "Released unknown preview");
            }
        }
    }
}
