//! Screen capture boundary.
//!
//! The loop only depends on the [`CaptureSource`] trait; [`ScreenCapture`] is
//! the production adapter built on the `xcap` crate, which handles the
//! platform capture APIs (GDI, X11, Wayland portals).

use image::DynamicImage;
use thiserror::Error;
use xcap::Monitor;

use crate::models::CaptureRegion;

/// Errors produced by a capture backend.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The region does not lie fully inside any connected monitor. A region
    /// of zero area cannot occur; [`CaptureRegion`] rejects it at creation.
    #[error("capture region {region} is not on any monitor")]
    OffScreen { region: CaptureRegion },

    #[error("no monitors detected")]
    NoMonitors,

    #[error("capture backend error: {0}")]
    Backend(String),
}

/// Produces one bitmap snapshot of a screen rectangle per call.
#[cfg_attr(test, mockall::automock)]
pub trait CaptureSource: Send + Sync {
    /// Grab the current contents of `region`.
    ///
    /// The returned frame is ephemeral: it is consumed by preprocessing
    /// within the same loop iteration and never retained.
    fn grab(&self, region: &CaptureRegion) -> Result<DynamicImage, CaptureError>;
}

/// Capture adapter backed by `xcap`.
///
/// Each grab locates the monitor that fully contains the region, captures
/// that monitor and crops to the region. Capturing the whole monitor per
/// iteration is what the platform APIs give us; the crop keeps the rest of
/// the pipeline region-sized.
pub struct ScreenCapture;

impl ScreenCapture {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ScreenCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSource for ScreenCapture {
    fn grab(&self, region: &CaptureRegion) -> Result<DynamicImage, CaptureError> {
        let monitors = Monitor::all().map_err(|e| CaptureError::Backend(e.to_string()))?;
        if monitors.is_empty() {
            return Err(CaptureError::NoMonitors);
        }

        for monitor in monitors {
            let x = monitor
                .x()
                .map_err(|e| CaptureError::Backend(e.to_string()))?;
            let y = monitor
                .y()
                .map_err(|e| CaptureError::Backend(e.to_string()))?;
            let width = monitor
                .width()
                .map_err(|e| CaptureError::Backend(e.to_string()))? as i32;
            let height = monitor
                .height()
                .map_err(|e| CaptureError::Backend(e.to_string()))? as i32;

            let contains = region.left() >= x
                && region.top() >= y
                && region.right() <= x + width
                && region.bottom() <= y + height;
            if !contains {
                continue;
            }

            let shot = monitor
                .capture_image()
                .map_err(|e| CaptureError::Backend(e.to_string()))?;

            let crop_x = (region.left() - x) as u32;
            let crop_y = (region.top() - y) as u32;
            let cropped = image::imageops::crop_imm(
                &shot,
                crop_x,
                crop_y,
                region.width(),
                region.height(),
            )
            .to_image();

            return Ok(DynamicImage::ImageRgba8(cropped));
        }

        Err(CaptureError::OffScreen { region: *region })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_capture_returns_frame() {
        let mut mock = MockCaptureSource::new();
        mock.expect_grab()
            .returning(|region| {
                Ok(DynamicImage::new_rgba8(region.width(), region.height()))
            })
            .times(1);

        let region = CaptureRegion::new(0, 0, 32, 16).unwrap();
        let frame = mock.grab(&region).unwrap();
        assert_eq!((frame.width(), frame.height()), (32, 16));
    }

    #[test]
    fn off_screen_error_names_the_region() {
        let region = CaptureRegion::new(100_000, 0, 100_010, 10).unwrap();
        let err = CaptureError::OffScreen { region };
        assert!(err.to_string().contains("100000"));
    }
}
