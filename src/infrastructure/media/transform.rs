//! Image transformation profiles.
//!
//! Decoding, resizing and encoding are CPU bound; async callers go through
//! [`process_image`], which runs on the blocking pool.

use std::io::Cursor;

use bytes::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use tracing::debug;

use super::MediaError;
use crate::config::{CropMode, TransformProfile};

/// A re-encoded JPEG and its final dimensions.
#[derive(Debug)]
pub struct ProcessedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Resize `img` according to `profile`.
///
/// `Limit` shrinks to fit inside the box and never upscales; `Fill` scales
/// and centre-crops to exactly the box.
pub fn apply_profile(img: DynamicImage, profile: &TransformProfile) -> DynamicImage {
    let (width, height) = img.dimensions();
    match profile.crop {
        CropMode::Limit => {
            if width <= profile.width && height <= profile.height {
                img
            } else {
                img.resize(profile.width, profile.height, FilterType::Lanczos3)
            }
        }
        CropMode::Fill => img.resize_to_fill(profile.width, profile.height, FilterType::Lanczos3),
    }
}

fn transform_blocking(data: &[u8], profile: &TransformProfile) -> Result<ProcessedImage, MediaError> {
    let img = image::load_from_memory(data)?;
    let (orig_w, orig_h) = img.dimensions();

    let out = apply_profile(img, profile);
    let (width, height) = out.dimensions();

    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(out.to_rgb8());
    let mut buf = Cursor::new(Vec::new());
    rgb.write_to(&mut buf, ImageOutputFormat::Jpeg(profile.quality))?;

    debug!(
        original_width = orig_w,
        original_height = orig_h,
        width,
        height,
        "Image transformed"
    );

    Ok(ProcessedImage {
        data: buf.into_inner(),
        width,
        height,
    })
}

/// Decode, transform and JPEG-encode an image on the blocking pool.
pub async fn process_image(data: Bytes, profile: TransformProfile) -> Result<ProcessedImage, MediaError> {
    tokio::task::spawn_blocking(move || transform_blocking(&data, &profile))
        .await
        .map_err(|e| MediaError::Task(e.to_string()))?
}
