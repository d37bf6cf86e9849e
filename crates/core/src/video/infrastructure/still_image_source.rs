use std::path::Path;

use crate::shared::frame::Frame;
use crate::video::domain::frame_source::FrameSource;

/// Serves one decoded image over and over as a live source.
///
/// Each read returns a fresh copy with the next frame index, so consumers
/// see the same stream shape as from a camera.
pub struct StillImageSource {
    frame: Option<Frame>,
    next_index: usize,
}

impl StillImageSource {
    pub fn open(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let image = image::open(path)?.to_rgb8();
        log::info!(
            "Opened still image {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        Ok(Self::from_frame(Frame::from_rgb_image(image, 0)))
    }

    pub fn from_frame(frame: Frame) -> Self {
        Self {
            frame: Some(frame),
            next_index: 0,
        }
    }
}

impl FrameSource for StillImageSource {
    fn read_frame(&mut self) -> Option<Frame> {
        let template = self.frame.as_ref()?;
        let frame = Frame::new(
            template.data().to_vec(),
            template.width(),
            template.height(),
            template.channels(),
            self.next_index,
        );
        self.next_index += 1;
        Some(frame)
    }

    fn is_available(&self) -> bool {
        self.frame.is_some()
    }

    fn release(&mut self) {
        self.frame = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_test_image(dir: &Path, width: u32, height: u32) -> PathBuf {
        let path = dir.join("still.png");
        let mut img = image::RgbImage::new(width, height);
        for pixel in img.pixels_mut() {
            *pixel = image::Rgb([50, 100, 200]);
        }
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_repeats_decoded_image_with_new_indices() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), 40, 30);
        let mut source = StillImageSource::open(&path).unwrap();

        for expected in 0..3 {
            let frame = source.read_frame().unwrap();
            assert_eq!(frame.index(), expected);
            assert_eq!((frame.width(), frame.height()), (40, 30));
            assert_eq!(&frame.data()[..3], &[50, 100, 200]);
        }
        assert!(source.is_available());
    }

    #[test]
    fn test_open_nonexistent_is_error() {
        assert!(StillImageSource::open(Path::new("/nonexistent/still.png")).is_err());
    }

    #[test]
    fn test_release_makes_source_unavailable() {
        let mut source = StillImageSource::from_frame(Frame::new(vec![1; 12], 2, 2, 3, 0));
        source.release();
        assert!(!source.is_available());
        assert!(source.read_frame().is_none());
    }
}
