use serde::Serialize;

/// Vertical offset of the emotion label above the face box, in pixels.
pub const LABEL_OFFSET_Y: i64 = 10;

/// Axis-aligned face bounding box in frame pixel coordinates.
///
/// Always non-negative; producers clamp it so that `x + width <= frame.width`
/// and `y + height <= frame.height`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a region from floating-point corners, clamped to the frame.
    ///
    /// Returns `None` when the clamped box has no area.
    pub fn from_corners_clamped(
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        frame_width: u32,
        frame_height: u32,
    ) -> Option<Self> {
        let fw = frame_width as f64;
        let fh = frame_height as f64;
        let left = x1.max(0.0).min(fw).floor();
        let top = y1.max(0.0).min(fh).floor();
        let right = x2.max(0.0).min(fw).ceil();
        let bottom = y2.max(0.0).min(fh).ceil();

        if !(right > left && bottom > top) {
            return None;
        }
        Some(Self::new(
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        ))
    }

    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn fits_within(&self, frame_width: u32, frame_height: u32) -> bool {
        self.right() <= frame_width && self.bottom() <= frame_height
    }

    /// Where the dominant-emotion label is anchored: `(x, y - 10)`.
    ///
    /// May be negative for faces touching the top edge; renderers clamp.
    pub fn label_anchor(&self) -> (i64, i64) {
        (self.x as i64, self.y as i64 - LABEL_OFFSET_Y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_right_and_bottom() {
        let r = FaceRegion::new(10, 20, 30, 40);
        assert_eq!(r.right(), 40);
        assert_eq!(r.bottom(), 60);
        assert_eq!(r.area(), 1200);
    }

    #[test]
    fn test_from_corners_inside_frame() {
        let r = FaceRegion::from_corners_clamped(10.2, 20.7, 50.1, 60.0, 100, 100).unwrap();
        assert_eq!(r, FaceRegion::new(10, 20, 41, 40));
        assert!(r.fits_within(100, 100));
    }

    #[test]
    fn test_from_corners_clamps_negative_origin() {
        let r = FaceRegion::from_corners_clamped(-15.0, -5.0, 30.0, 40.0, 100, 100).unwrap();
        assert_eq!(r.x, 0);
        assert_eq!(r.y, 0);
        assert_eq!(r.width, 30);
        assert_eq!(r.height, 40);
    }

    #[test]
    fn test_from_corners_clamps_far_edge() {
        let r = FaceRegion::from_corners_clamped(80.0, 90.0, 130.0, 140.0, 100, 100).unwrap();
        assert!(r.fits_within(100, 100));
        assert_eq!(r.right(), 100);
        assert_eq!(r.bottom(), 100);
    }

    #[rstest]
    #[case::inverted(50.0, 50.0, 10.0, 10.0)]
    #[case::zero_width(20.0, 10.0, 20.0, 40.0)]
    #[case::fully_outside(150.0, 150.0, 200.0, 200.0)]
    fn test_from_corners_degenerate_is_none(
        #[case] x1: f64,
        #[case] y1: f64,
        #[case] x2: f64,
        #[case] y2: f64,
    ) {
        assert!(FaceRegion::from_corners_clamped(x1, y1, x2, y2, 100, 100).is_none());
    }

    #[test]
    fn test_fits_within_rejects_overflow() {
        assert!(!FaceRegion::new(90, 0, 20, 10).fits_within(100, 100));
    }

    #[test]
    fn test_label_anchor_above_box() {
        assert_eq!(FaceRegion::new(12, 40, 10, 10).label_anchor(), (12, 30));
        assert_eq!(FaceRegion::new(0, 3, 10, 10).label_anchor(), (0, -7));
    }
}
