pub mod ffmpeg_frame_source;
pub mod still_image_source;
