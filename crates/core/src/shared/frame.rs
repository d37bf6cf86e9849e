use ndarray::{s, ArrayView3};

use crate::shared::face_region::FaceRegion;

/// A single video/image frame: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only; the analysis layer
/// treats pixel data as opaque and never mutates a frame it was handed.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// Wraps a decoded RGB image, taking ownership of its pixel buffer.
    pub fn from_rgb_image(image: image::RgbImage, index: usize) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, 3, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Position of this frame in its source's decode order.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies the pixels inside `region` into a new frame.
    ///
    /// The region is clipped to the frame bounds; `None` when nothing of
    /// the region lies inside the frame.
    pub fn crop(&self, region: &FaceRegion) -> Option<Frame> {
        let x1 = region.x.min(self.width) as usize;
        let y1 = region.y.min(self.height) as usize;
        let x2 = region.right().min(self.width) as usize;
        let y2 = region.bottom().min(self.height) as usize;
        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        let view = self.as_ndarray();
        let data: Vec<u8> = view.slice(s![y1..y2, x1..x2, ..]).iter().copied().collect();
        Some(Frame::new(
            data,
            (x2 - x1) as u32,
            (y2 - y1) as u32,
            self.channels,
            self.index,
        ))
    }

    /// Luma of the pixel at `(row, col)` using BT.601 weights.
    ///
    /// Single-channel frames return the raw value.
    pub fn luma(&self, row: usize, col: usize) -> f32 {
        let c = self.channels as usize;
        let offset = (row * self.width as usize + col) * c;
        if c < 3 {
            return self.data[offset] as f32;
        }
        0.299 * self.data[offset] as f32
            + 0.587 * self.data[offset + 1] as f32
            + 0.114 * self.data[offset + 2] as f32
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(width: u32, height: u32) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for row in 0..height {
            for col in 0..width {
                data.extend_from_slice(&[row as u8, col as u8, 0]);
            }
        }
        Frame::new(data, width, height, 3, 7)
    }

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    fn test_clone_is_independent() {
        let data = vec![100u8; 12];
        let frame = Frame::new(data, 2, 2, 3, 0);
        let mut cloned = frame.clone();
        cloned.data_mut()[0] = 0;
        assert_eq!(frame.data()[0], 100);
        assert_eq!(cloned.data()[0], 0);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        let data = vec![0u8; 10]; // wrong size for 2x2x3
        Frame::new(data, 2, 2, 3, 0);
    }

    #[test]
    fn test_as_ndarray_shape() {
        let data = vec![0u8; 24]; // 2x4x3
        let frame = Frame::new(data, 4, 2, 3, 0);
        let arr = frame.as_ndarray();
        assert_eq!(arr.shape(), &[2, 4, 3]); // (height, width, channels)
    }

    #[test]
    fn test_from_rgb_image_keeps_pixels() {
        let mut img = image::RgbImage::new(3, 2);
        img.put_pixel(2, 1, image::Rgb([10, 20, 30]));
        let frame = Frame::from_rgb_image(img, 4);
        assert_eq!(frame.width(), 3);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.index(), 4);
        assert_eq!(frame.as_ndarray()[[1, 2, 1]], 20);
    }

    // ── Crop ─────────────────────────────────────────────────────────

    #[test]
    fn test_crop_copies_region_pixels() {
        let frame = gradient_frame(10, 8);
        let crop = frame.crop(&FaceRegion::new(2, 3, 4, 2)).unwrap();
        assert_eq!(crop.width(), 4);
        assert_eq!(crop.height(), 2);
        assert_eq!(crop.index(), 7);
        // top-left of the crop is (row=3, col=2) of the source
        assert_eq!(crop.as_ndarray()[[0, 0, 0]], 3);
        assert_eq!(crop.as_ndarray()[[0, 0, 1]], 2);
        // bottom-right is (row=4, col=5)
        assert_eq!(crop.as_ndarray()[[1, 3, 0]], 4);
        assert_eq!(crop.as_ndarray()[[1, 3, 1]], 5);
    }

    #[test]
    fn test_crop_clips_to_frame_bounds() {
        let frame = gradient_frame(10, 8);
        let crop = frame.crop(&FaceRegion::new(8, 6, 10, 10)).unwrap();
        assert_eq!(crop.width(), 2);
        assert_eq!(crop.height(), 2);
    }

    #[test]
    fn test_crop_outside_frame_is_none() {
        let frame = gradient_frame(10, 8);
        assert!(frame.crop(&FaceRegion::new(20, 20, 5, 5)).is_none());
    }

    #[test]
    fn test_crop_does_not_mutate_source() {
        let frame = gradient_frame(4, 4);
        let before = frame.data().to_vec();
        let _ = frame.crop(&FaceRegion::new(1, 1, 2, 2));
        assert_eq!(frame.data(), &before[..]);
    }

    #[test]
    fn test_luma_of_white_pixel() {
        let frame = Frame::new(vec![255u8; 3], 1, 1, 3, 0);
        assert!((frame.luma(0, 0) - 255.0).abs() < 0.01);
    }
}
