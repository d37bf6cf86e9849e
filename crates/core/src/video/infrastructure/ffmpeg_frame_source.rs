use crate::shared::frame::Frame;
use crate::video::domain::frame_source::FrameSource;

/// Pulls RGB24 frames from a video file, stream URL or capture device via
/// ffmpeg-next (libavformat + libavdevice + libavcodec).
///
/// Capture devices need their demuxer named explicitly, e.g. `v4l2` with
/// `/dev/video0`, `avfoundation` with `0`, `dshow` with `video=<name>`.
pub struct FfmpegFrameSource {
    decoding: Option<Decoding>,
    exhausted: bool,
    frame_index: usize,
}

// Safety: FfmpegFrameSource is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegFrameSource {}

struct Decoding {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    video_stream_index: usize,
    flushing: bool,
}

impl FfmpegFrameSource {
    /// Opens `source`, using `input_format` as the demuxer when given.
    pub fn open(source: &str, input_format: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = match input_format {
            Some(name) => {
                let format = ffmpeg_next::device::input::video()
                    .find(|f| f.name() == name)
                    .ok_or_else(|| format!("Unknown capture input format '{name}'"))?;
                ffmpeg_next::format::open_with(source, &format, ffmpeg_next::Dictionary::new())?
                    .input()
            }
            None => ffmpeg_next::format::input(source)?,
        };

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;
        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        log::info!("Opened video source {source} ({width}x{height})");

        Ok(Self {
            decoding: Some(Decoding {
                ictx,
                decoder,
                scaler,
                width,
                height,
                video_stream_index,
                flushing: false,
            }),
            exhausted: false,
            frame_index: 0,
        })
    }
}

impl FrameSource for FfmpegFrameSource {
    fn read_frame(&mut self) -> Option<Frame> {
        if self.exhausted {
            return None;
        }
        let decoding = self.decoding.as_mut()?;
        match decoding.next_frame(self.frame_index) {
            Ok(Some(frame)) => {
                self.frame_index += 1;
                Some(frame)
            }
            Ok(None) => {
                log::info!("Video source reached end of stream after {} frames", self.frame_index);
                self.exhausted = true;
                None
            }
            Err(e) => {
                log::debug!("Frame read failed: {e}");
                None
            }
        }
    }

    fn is_available(&self) -> bool {
        self.decoding.is_some() && !self.exhausted
    }

    fn release(&mut self) {
        if self.decoding.take().is_some() {
            log::debug!("Released video source");
        }
    }
}

impl Decoding {
    /// Decodes the next frame; `Ok(None)` once the stream is drained.
    fn next_frame(&mut self, index: usize) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if let Some(frame) = self.try_receive(index)? {
            return Ok(Some(frame));
        }
        if self.flushing {
            return Ok(None);
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                return self.try_receive(index);
            };

            if stream.index() != self.video_stream_index {
                continue;
            }

            self.decoder.send_packet(&packet)?;

            if let Some(frame) = self.try_receive(index)? {
                return Ok(Some(frame));
            }
        }
    }

    fn try_receive(&mut self, index: usize) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler.run(&decoded, &mut rgb_frame)?;

        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        Ok(Some(Frame::new(pixels, self.width, self.height, 3, index)))
    }
}

/// Copies pixel data from an ffmpeg frame into a tightly packed RGB buffer,
/// dropping per-row stride padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
