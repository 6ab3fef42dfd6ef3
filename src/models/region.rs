use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error produced when a capture rectangle fails validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "invalid capture region: right ({right}) must exceed left ({left}) \
     and bottom ({bottom}) must exceed top ({top})"
)]
pub struct RegionError {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// Immutable screen rectangle sampled by the capture loop.
///
/// Coordinates are screen pixels. The invariant `right > left && bottom > top`
/// is enforced at construction; a region that fails it cannot exist, so the
/// capture and preprocessing stages never see a zero-area rectangle.
///
/// A region is never mutated in place. Changing the sampled area replaces the
/// whole value via [`LoopController::change_region`](crate::controller::LoopController::change_region).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRegion", into = "RawRegion")]
pub struct CaptureRegion {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
}

/// Serde surrogate so deserialized regions still go through validation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawRegion {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
}

impl TryFrom<RawRegion> for CaptureRegion {
    type Error = RegionError;

    fn try_from(raw: RawRegion) -> Result<Self, Self::Error> {
        CaptureRegion::new(raw.left, raw.top, raw.right, raw.bottom)
    }
}

impl From<CaptureRegion> for RawRegion {
    fn from(region: CaptureRegion) -> Self {
        Self {
            left: region.left,
            top: region.top,
            right: region.right,
            bottom: region.bottom,
        }
    }
}

impl CaptureRegion {
    /// Create a validated capture region.
    ///
    /// # Errors
    /// Returns [`RegionError`] when `right <= left` or `bottom <= top`.
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Result<Self, RegionError> {
        if right <= left || bottom <= top {
            return Err(RegionError {
                left,
                top,
                right,
                bottom,
            });
        }

        Ok(Self {
            left,
            top,
            right,
            bottom,
        })
    }

    pub fn left(&self) -> i32 {
        self.left
    }

    pub fn top(&self) -> i32 {
        self.top
    }

    pub fn right(&self) -> i32 {
        self.right
    }

    pub fn bottom(&self) -> i32 {
        self.bottom
    }

    /// Width in pixels. Always > 0 by the construction invariant. The
    /// subtraction is widened so extreme coordinates cannot overflow `i32`;
    /// the result always fits in `u32`.
    pub fn width(&self) -> u32 {
        (self.right as i64 - self.left as i64) as u32
    }

    /// Height in pixels. Always > 0 by the construction invariant.
    pub fn height(&self) -> u32 {
        (self.bottom as i64 - self.top as i64) as u32
    }
}

impl std::fmt::Display for CaptureRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {})-({}, {})",
            self.left, self.top, self.right, self.bottom
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn valid_region_is_accepted() {
        let region = CaptureRegion::new(10, 20, 110, 70).unwrap();
        assert_eq!(region.width(), 100);
        assert_eq!(region.height(), 50);
    }

    #[test]
    fn degenerate_regions_are_rejected() {
        assert!(CaptureRegion::new(10, 10, 10, 50).is_err());
        assert!(CaptureRegion::new(10, 10, 50, 10).is_err());
        assert!(CaptureRegion::new(50, 10, 10, 60).is_err());
    }

    #[test]
    fn negative_origin_is_allowed() {
        // Multi-monitor setups place secondary displays at negative coordinates.
        let region = CaptureRegion::new(-1920, 0, -1820, 100).unwrap();
        assert_eq!(region.width(), 100);
    }

    #[test]
    fn extreme_coordinates_do_not_overflow() {
        let region = CaptureRegion::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX).unwrap();
        assert_eq!(region.width(), u32::MAX);
        assert_eq!(region.height(), u32::MAX);

        let offset = CaptureRegion::new(i32::MIN, i32::MIN, i32::MIN + 10, i32::MIN + 20).unwrap();
        assert_eq!(offset.width(), 10);
        assert_eq!(offset.height(), 20);
    }

    #[test]
    fn yaml_round_trip_preserves_region() {
        let region = CaptureRegion::new(5, 6, 7, 8).unwrap();
        let yaml = serde_yaml_ng::to_string(&region).unwrap();
        let back: CaptureRegion = serde_yaml_ng::from_str(&yaml).unwrap();
        assert_eq!(region, back);
    }

    #[test]
    fn deserializing_invalid_region_fails() {
        let yaml = "left: 100\ntop: 0\nright: 10\nbottom: 50\n";
        let result: Result<CaptureRegion, _> = serde_yaml_ng::from_str(yaml);
        assert!(result.is_err());
    }

    proptest! {
        #[test]
        fn construction_matches_invariant(
            left in -4000i32..4000,
            top in -4000i32..4000,
            right in -4000i32..4000,
            bottom in -4000i32..4000,
        ) {
            let result = CaptureRegion::new(left, top, right, bottom);
            prop_assert_eq!(result.is_ok(), right > left && bottom > top);
        }
    }
}
