//! Photo preprocessing: decode, EXIF orientation, downscale, JPEG encode.
//!
//! Pure bytes-to-bytes transforms, no I/O.
//!
//! Flow for a new photo:
//! 1. Validate byte size
//! 2. Decode
//! 3. Apply EXIF orientation (phone photos store rotation there)
//! 4. Downscale if the longest side exceeds the configured bound
//! 5. Encode JPEG at the configured quality

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageOutputFormat};

use super::asset::CropRect;
use super::IntakeError;
use crate::config::CompressionConfig;

/// Larger inputs are refused before decoding.
const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024;

/// A re-encoded photo.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decode, orient, downscale and JPEG-encode one photo.
///
/// Returns the decoded (oriented, downscaled) image too, so callers can
/// derive previews without decoding again.
pub fn prepare(
    name: &str,
    bytes: &[u8],
    config: &CompressionConfig,
) -> Result<(EncodedImage, DynamicImage), IntakeError> {
    let image = decode(name, bytes)?;
    let image = downscale(image, config.max_dimension);
    let encoded = encode_jpeg(&image, config.quality)?;
    Ok((encoded, image))
}

/// Cut `rect` (clamped) out of `bytes` and re-encode the result with the
/// same compression rules as a new photo. Returns the clamped rectangle.
pub fn crop(
    name: &str,
    bytes: &[u8],
    rect: CropRect,
    config: &CompressionConfig,
) -> Result<(EncodedImage, DynamicImage, CropRect), IntakeError> {
    let image = decode(name, bytes)?;
    let (width, height) = image.dimensions();
    let clamped = rect.clamp_to(width, height);

    let cropped = image.crop_imm(
        clamped.x as u32,
        clamped.y as u32,
        clamped.width,
        clamped.height,
    );
    let cropped = downscale(cropped, config.max_dimension);
    let encoded = encode_jpeg(&cropped, config.quality)?;
    Ok((encoded, cropped, clamped))
}

/// Reject empty and oversized inputs before handing them to a decoder.
pub fn validate_image_bytes(name: &str, bytes: &[u8]) -> Result<(), IntakeError> {
    if bytes.is_empty() {
        return Err(decode_error(name, "file is empty"));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(decode_error(
            name,
            format!("exceeds {}MB limit", MAX_IMAGE_BYTES / (1024 * 1024)),
        ));
    }
    Ok(())
}

/// Validate, decode and orient.
pub fn decode(name: &str, bytes: &[u8]) -> Result<DynamicImage, IntakeError> {
    validate_image_bytes(name, bytes)?;
    let image = image::load_from_memory(bytes).map_err(|e| decode_error(name, e.to_string()))?;

    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(decode_error(name, "image has no pixels"));
    }
    Ok(apply_orientation(image, read_exif_orientation(bytes)))
}

/// EXIF orientation tag (0x0112), or 1 when absent.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let Ok(exif) = exif::Reader::new().read_from_container(&mut cursor) else {
        return 1;
    };
    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .unwrap_or(1)
}

/// Rotate/flip according to an EXIF orientation value (1-8).
pub fn apply_orientation(image: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}

/// Dimensions that fit in `max_dimension` x `max_dimension` with the aspect
/// ratio kept. Never upscales. A bound of 0 is treated as 1.
pub fn compute_fit_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let max_dimension = max_dimension.max(1);
    if width == 0 || height == 0 {
        return (1, 1);
    }
    let longest = width.max(height);
    if longest <= max_dimension {
        return (width, height);
    }

    let scale = max_dimension as f64 / longest as f64;
    let fit = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, max_dimension);
    (fit(width), fit(height))
}

fn downscale(image: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    let (target_w, target_h) = compute_fit_dimensions(width, height, max_dimension);
    if (target_w, target_h) == (width, height) {
        return image;
    }
    image.resize_exact(target_w, target_h, FilterType::Triangle)
}

/// Encode as baseline JPEG. Alpha is dropped.
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<EncodedImage, IntakeError> {
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    let (width, height) = rgb.dimensions();
    let mut cursor = Cursor::new(Vec::new());
    rgb.write_to(&mut cursor, ImageOutputFormat::Jpeg(quality.clamp(1, 100)))
        .map_err(|e| IntakeError::Encode(format!("JPEG encoding failed: {e}")))?;
    Ok(EncodedImage {
        bytes: cursor.into_inner(),
        width,
        height,
    })
}

/// `leaf.png` → `leaf.jpg`; names without an extension get one appended.
pub fn jpeg_file_name(name: &str) -> String {
    let trimmed = name.trim();
    let stem = match trimmed.rfind('.') {
        Some(dot) if dot > 0 => &trimmed[..dot],
        _ => trimmed,
    };
    if stem.is_empty() {
        "leaf.jpg".to_string()
    } else {
        format!("{stem}.jpg")
    }
}

fn decode_error(name: &str, reason: impl Into<String>) -> IntakeError {
    IntakeError::Decode {
        name: name.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use image::{Rgb, RgbImage};

    use super::*;

    /// PNG bytes of a solid-colour image.
    pub(crate) fn png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, Rgb([40, 160, 60]));
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(image)
            .write_to(&mut cursor, ImageOutputFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    fn dimensions_of(bytes: &[u8]) -> (u32, u32) {
        image::load_from_memory(bytes).unwrap().dimensions()
    }

    #[test]
    fn large_photo_is_downscaled_keeping_aspect() {
        let (encoded, _) = prepare("big.png", &png(2400, 1600), &CompressionConfig::default()).unwrap();
        assert_eq!((encoded.width, encoded.height), (1200, 800));
        assert_eq!(dimensions_of(&encoded.bytes), (1200, 800));
    }

    #[test]
    fn small_photo_is_not_upscaled() {
        let (encoded, _) = prepare("small.png", &png(300, 200), &CompressionConfig::default()).unwrap();
        assert_eq!((encoded.width, encoded.height), (300, 200));
    }

    #[test]
    fn output_is_jpeg() {
        let (encoded, _) = prepare("leaf.png", &png(64, 64), &CompressionConfig::default()).unwrap();
        assert_eq!(&encoded.bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn garbage_is_decode_error() {
        let err = prepare("notes.txt", b"definitely not an image", &CompressionConfig::default())
            .unwrap_err();
        assert!(matches!(err, IntakeError::Decode { ref name, .. } if name == "notes.txt"));
    }

    #[test]
    fn empty_blob_is_decode_error() {
        let err = validate_image_bytes("empty.jpg", &[]).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn crop_is_clamped_and_reencoded() {
        let rect = CropRect::new(60, 40, 100, 100);
        let (encoded, _, clamped) =
            crop("leaf.png", &png(100, 80), rect, &CompressionConfig::default()).unwrap();
        assert_eq!(clamped, CropRect::new(60, 40, 40, 40));
        assert_eq!((encoded.width, encoded.height), (40, 40));
        assert_eq!(dimensions_of(&encoded.bytes), (40, 40));
    }

    #[test]
    fn fit_dimensions() {
        assert_eq!(compute_fit_dimensions(4000, 3000, 1200), (1200, 900));
        assert_eq!(compute_fit_dimensions(1000, 3000, 1200), (400, 1200));
        assert_eq!(compute_fit_dimensions(1200, 1200, 1200), (1200, 1200));
        assert_eq!(compute_fit_dimensions(0, 10, 1200), (1, 1));
    }

    #[test]
    fn zero_bound_shrinks_to_a_single_pixel() {
        assert_eq!(compute_fit_dimensions(10, 10, 0), (1, 1));
        let config = CompressionConfig {
            max_dimension: 0,
            ..Default::default()
        };
        let (encoded, _) = prepare("a.png", &png(20, 10), &config).unwrap();
        assert_eq!((encoded.width, encoded.height), (1, 1));
    }

    #[test]
    fn orientation_transforms_swap_axes() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(40, 20));
        assert_eq!(apply_orientation(image.clone(), 1).dimensions(), (40, 20));
        assert_eq!(apply_orientation(image.clone(), 3).dimensions(), (40, 20));
        assert_eq!(apply_orientation(image.clone(), 6).dimensions(), (20, 40));
        assert_eq!(apply_orientation(image, 8).dimensions(), (20, 40));
    }

    #[test]
    fn no_exif_means_normal_orientation() {
        assert_eq!(read_exif_orientation(&png(4, 4)), 1);
        assert_eq!(read_exif_orientation(b"junk"), 1);
    }

    #[test]
    fn file_names_get_jpg_extension() {
        assert_eq!(jpeg_file_name("IMG_0042.HEIC.png"), "IMG_0042.HEIC.jpg");
        assert_eq!(jpeg_file_name("leaf.jpeg"), "leaf.jpg");
        assert_eq!(jpeg_file_name("camera"), "camera.jpg");
        assert_eq!(jpeg_file_name(".png"), ".png.jpg");
        assert_eq!(jpeg_file_name("  "), "leaf.jpg");
    }
}
