//! Image preprocessing that turns a raw screen capture into an OCR-friendly
//! bitmap.
//!
//! The pipeline order is deliberate and fixed: upscale → sharpen → grayscale →
//! binarize. Upscaling must happen before every other step because the OCR
//! engine cannot resolve glyph edges on small UI text; sharpening counteracts
//! the blur the resampling introduces; binarization last maximizes edge
//! contrast for the recognizer. Reordering these stages measurably degrades
//! recognition quality.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};

use crate::models::PreprocessSettings;

/// 3x3 sharpening kernel applied after upscaling. Center-weighted with the
/// weights summing to 1 so overall luminance is preserved.
const SHARPEN_KERNEL: [f32; 9] = [
    -0.125, -0.125, -0.125, //
    -0.125, 2.0, -0.125, //
    -0.125, -0.125, -0.125,
];

/// Run the full preprocessing pipeline on one captured frame.
///
/// This is a pure function of its inputs: the same frame and settings always
/// produce a byte-identical result. It is total over well-formed bitmaps; a
/// zero-size capture cannot occur because [`CaptureRegion`](crate::models::CaptureRegion)
/// rejects degenerate rectangles at construction.
pub fn preprocess(frame: &DynamicImage, settings: &PreprocessSettings) -> GrayImage {
    let upscaled = upscale(frame, settings.upscale_factor);

    let sharpened = if settings.sharpen {
        upscaled.filter3x3(&SHARPEN_KERNEL)
    } else {
        upscaled
    };

    let mut gray = sharpened.to_luma8();
    binarize(&mut gray, settings.threshold);
    gray
}

fn upscale(frame: &DynamicImage, factor: u32) -> DynamicImage {
    if factor <= 1 {
        return frame.clone();
    }

    let width = frame.width().saturating_mul(factor);
    let height = frame.height().saturating_mul(factor);

    // Lanczos3 is the high-quality resampling choice; nearest-neighbor
    // upscaling produces blocky glyphs the recognizer misreads.
    frame.resize_exact(width, height, FilterType::Lanczos3)
}

/// Threshold every pixel in place: below `threshold` becomes black, at or
/// above becomes white.
fn binarize(gray: &mut GrayImage, threshold: u8) {
    for pixel in gray.pixels_mut() {
        pixel.0[0] = if pixel.0[0] < threshold { 0 } else { 255 };
    }
}
