use std::fs;
use std::path::{Path, PathBuf};

use crate::overlay::domain::overlay_sink::OverlaySink;
use crate::overlay::domain::shared_analysis::PublishedAnalysis;
use crate::shared::frame::Frame;

const LATEST_NAME: &str = "latest.png";
const LATEST_TMP_NAME: &str = "latest.tmp.png";

/// Writes annotated frames to a directory using the `image` crate.
///
/// Every `save_every`-th frame is kept as `frame_{n:06}.png`; when
/// `write_latest` is set, `latest.png` is replaced on every frame so an
/// image viewer can follow along.
pub struct ImageFileSink {
    dir: PathBuf,
    save_every: usize,
    write_latest: bool,
    presented: usize,
}

impl ImageFileSink {
    /// `save_every == 0` disables numbered frames.
    pub fn new(dir: &Path, save_every: usize, write_latest: bool) -> Result<Self, Box<dyn std::error::Error>> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            save_every,
            write_latest,
            presented: 0,
        })
    }

    fn frame_path(&self, n: usize) -> PathBuf {
        self.dir.join(format!("frame_{n:06}.png"))
    }
}

impl OverlaySink for ImageFileSink {
    fn present(
        &mut self,
        frame: &Frame,
        _analysis: Option<&PublishedAnalysis>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let n = self.presented;
        self.presented += 1;

        let keep = self.save_every > 0 && n % self.save_every == 0;
        if !keep && !self.write_latest {
            return Ok(());
        }

        let img = to_rgb_image(frame)?;
        if keep {
            img.save(self.frame_path(n))?;
        }
        if self.write_latest {
            // viewers only ever see a complete file
            let tmp = self.dir.join(LATEST_TMP_NAME);
            img.save(&tmp)?;
            fs::rename(&tmp, self.dir.join(LATEST_NAME))?;
        }
        Ok(())
    }
}

fn to_rgb_image(frame: &Frame) -> Result<image::RgbImage, Box<dyn std::error::Error>> {
    let data = match frame.channels() {
        3 => frame.data().to_vec(),
        1 => frame.data().iter().flat_map(|&v| [v, v, v]).collect(),
        c => return Err(format!("Unsupported channel count {c}").into()),
    };
    image::RgbImage::from_raw(frame.width(), frame.height(), data)
        .ok_or_else(|| "Failed to create image from frame data".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_frame(width: u32, height: u32, r: u8, g: u8, b: u8) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..(width * height) {
            data.extend_from_slice(&[r, g, b]);
        }
        Frame::new(data, width, height, 3, 0)
    }

    fn png_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_saves_every_nth_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ImageFileSink::new(dir.path(), 2, false).unwrap();
        for _ in 0..5 {
            sink.present(&make_frame(8, 6, 1, 2, 3), None).unwrap();
        }
        assert_eq!(
            png_names(dir.path()),
            vec!["frame_000000.png", "frame_000002.png", "frame_000004.png"]
        );
    }

    #[test]
    fn test_latest_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ImageFileSink::new(dir.path(), 0, true).unwrap();
        sink.present(&make_frame(8, 6, 10, 10, 10), None).unwrap();
        sink.present(&make_frame(8, 6, 50, 100, 200), None).unwrap();

        assert_eq!(png_names(dir.path()), vec![LATEST_NAME]);
        let img = image::open(dir.path().join(LATEST_NAME)).unwrap().to_rgb8();
        assert_eq!(img.get_pixel(0, 0).0, [50, 100, 200]);
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let mut sink = ImageFileSink::new(&nested, 1, false).unwrap();
        sink.present(&make_frame(4, 4, 0, 0, 0), None).unwrap();
        assert!(nested.join("frame_000000.png").exists());
    }

    #[test]
    fn test_grayscale_frame_is_expanded() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ImageFileSink::new(dir.path(), 1, false).unwrap();
        sink.present(&Frame::new(vec![77; 16], 4, 4, 1, 0), None).unwrap();
        let img = image::open(dir.path().join("frame_000000.png")).unwrap().to_rgb8();
        assert_eq!(img.get_pixel(3, 3).0, [77, 77, 77]);
    }
}
