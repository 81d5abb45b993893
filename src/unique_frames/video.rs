use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use ffmpeg_next as ffmpeg;
use ffmpeg::format::Pixel;
use ffmpeg::media::Type;
use ffmpeg::software::scaling::{context::Context as ScalingContext, flag::Flags};
use ffmpeg::util::frame::video::Video as VideoFrame;
use ffmpeg::{Packet, Rational};
use image::RgbImage;
use log::{debug, info, warn};

use super::{RawFrame, VideoInfo};
use crate::error::{ExtractError, Result};

static FFMPEG_INITIALIZED: OnceLock<std::result::Result<(), ffmpeg::Error>> = OnceLock::new();

/// A finite, forward-only sequence of decoded frames in time order.
///
/// Dropping the source releases whatever it holds, so stopping early is fine.
pub trait FrameSource: Iterator<Item = Result<RawFrame>> {
    fn info(&self) -> &VideoInfo;

    /// Only frames whose index is a multiple of `stride` will be used.
    /// Sources may skip building the others; they must still count them.
    fn skip_unsampled(&mut self, _stride: u64) {}
}

/// Initialize FFmpeg. Runs once per process, later calls return the first outcome.
pub fn init_ffmpeg() -> Result<()> {
    FFMPEG_INITIALIZED
        .get_or_init(|| {
            ffmpeg::init()?;
            ffmpeg::util::log::set_level(ffmpeg::util::log::Level::Warning);
            Ok(())
        })
        .clone()
        .map_err(|e| ExtractError::Decode(format!("Failed to initialize FFmpeg: {e}")))
}

/// Decodes every frame of the best video stream of a local file to RGB24
pub struct VideoDecoder {
    path: PathBuf,
    info: VideoInfo,
    input: ffmpeg::format::context::Input,
    decoder: ffmpeg::decoder::Video,
    /// Built from the first decoded frame, rebuilt if the frame geometry changes
    scaler: Option<ScalingContext>,
    stride: u64,
    video_stream_index: usize,
    time_base: Rational,
    start_time: i64,
    decoded_frame: VideoFrame,
    frame_index: u64,
    last_timestamp: f64,
    eof_sent: bool,
    done: bool,
}

impl VideoDecoder {
    /// Fails when the file can't be opened as a video at all. A video that
    /// opens but holds no frames is not an error, it just yields nothing.
    pub fn open<P: AsRef<Path>>(video_path: P) -> Result<Self> {
        init_ffmpeg()?;
        let path = video_path.as_ref().to_path_buf();
        let unreadable = |reason: String| ExtractError::UnreadableVideo {
            path: path.clone(),
            reason,
        };

        let input = ffmpeg::format::input(&path).map_err(|e| unreadable(e.to_string()))?;

        let video_stream = input
            .streams()
            .best(Type::Video)
            .ok_or_else(|| ExtractError::NoVideoStream { path: path.clone() })?;

        let video_stream_index = video_stream.index();
        let time_base = video_stream.time_base();
        let start_time = if video_stream.start_time() == ffmpeg::ffi::AV_NOPTS_VALUE {
            0
        } else {
            video_stream.start_time()
        };
        let frame_rate = positive_rate(video_stream.avg_frame_rate())
            .or_else(|| positive_rate(video_stream.rate()));
        let frame_count = u64::try_from(video_stream.frames()).ok().filter(|&n| n > 0);

        let decoder = ffmpeg::codec::context::Context::from_parameters(video_stream.parameters())
            .map_err(|e| unreadable(format!("Failed to create codec context: {e}")))?
            .decoder()
            .video()
            .map_err(|e| unreadable(format!("Failed to create video decoder: {e}")))?;

        let info = VideoInfo {
            frame_rate,
            frame_count,
            width: decoder.width(),
            height: decoder.height(),
        };

        info!(
            "Opened video {:?}: {}x{}, fps {:?}, frames {:?}",
            path, info.width, info.height, info.frame_rate, info.frame_count
        );

        Ok(Self {
            path,
            info,
            input,
            decoder,
            scaler: None,
            stride: 1,
            video_stream_index,
            time_base,
            start_time,
            decoded_frame: VideoFrame::empty(),
            frame_index: 0,
            last_timestamp: 0.0,
            eof_sent: false,
            done: false,
        })
    }

    /// Release the decoder. Dropping does the same.
    pub fn close(self) {}

    fn timestamp_of_decoded(&mut self) -> f64 {
        let seconds = match self.decoded_frame.timestamp().or(self.decoded_frame.pts()) {
            Some(pts) => (pts - self.start_time) as f64 * f64::from(self.time_base),
            None => {
                warn!(
                    "Frame {} of {:?} has no timestamp, estimating it",
                    self.frame_index, self.path
                );
                match (self.frame_index, self.info.frame_rate) {
                    (0, _) => 0.0,
                    (_, Some(fps)) => self.last_timestamp + 1.0 / fps,
                    (_, None) => self.last_timestamp,
                }
            }
        };

        // Reordered or negative pts must not make time run backwards.
        let seconds = seconds.max(self.last_timestamp);
        self.last_timestamp = seconds;
        seconds
    }

    fn convert_decoded(&mut self) -> Result<RawFrame> {
        let timestamp_seconds = self.timestamp_of_decoded();

        let stale = match &self.scaler {
            Some(scaler) => {
                let input = scaler.input();
                input.format != self.decoded_frame.format()
                    || input.width != self.decoded_frame.width()
                    || input.height != self.decoded_frame.height()
            }
            None => true,
        };
        if stale {
            self.scaler = Some(rgb_scaler(&self.decoded_frame)?);
        }
        let scaler = self
            .scaler
            .as_mut()
            .ok_or_else(|| ExtractError::Decode("No scaler for decoded frame".to_string()))?;

        let mut rgb_frame = VideoFrame::empty();
        scaler
            .run(&self.decoded_frame, &mut rgb_frame)
            .map_err(|e| ExtractError::Decode(format!("Failed to scale frame: {e}")))?;

        let image = frame_to_rgb_image(&rgb_frame).ok_or_else(|| {
            ExtractError::Decode(format!(
                "Failed to create image buffer for frame {}",
                self.frame_index
            ))
        })?;

        let frame = RawFrame {
            image,
            frame_index: self.frame_index,
            timestamp_seconds,
        };
        self.frame_index += 1;
        Ok(frame)
    }
}

impl Iterator for VideoDecoder {
    type Item = Result<RawFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
                if self.frame_index % self.stride != 0 {
                    // Keeps the timestamp clock moving without paying for the RGB copy.
                    self.timestamp_of_decoded();
                    self.frame_index += 1;
                    continue;
                }
                let frame = self.convert_decoded();
                if frame.is_err() {
                    self.done = true;
                }
                return Some(frame);
            }

            if self.eof_sent {
                self.done = true;
                return None;
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) if packet.stream() == self.video_stream_index => {
                    if let Err(e) = self.decoder.send_packet(&packet) {
                        warn!("Skipping undecodable packet in {:?}: {}", self.path, e);
                    }
                }
                Ok(()) => {}
                Err(ffmpeg::Error::Eof) => {
                    self.decoder.send_eof().ok();
                    self.eof_sent = true;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(ExtractError::Decode(format!(
                        "Failed to read packet from {:?}: {e}",
                        self.path
                    ))));
                }
            }
        }
    }
}

impl FrameSource for VideoDecoder {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn skip_unsampled(&mut self, stride: u64) {
        self.stride = stride.max(1);
    }
}

impl Drop for VideoDecoder {
    fn drop(&mut self) {
        debug!(
            "Closed video {:?} after {} decoded frames",
            self.path, self.frame_index
        );
    }
}

fn rgb_scaler(frame: &VideoFrame) -> Result<ScalingContext> {
    ScalingContext::get(
        frame.format(),
        frame.width(),
        frame.height(),
        Pixel::RGB24,
        frame.width(),
        frame.height(),
        Flags::BILINEAR,
    )
    .map_err(|e| ExtractError::Decode(format!("Failed to create scaler: {e}")))
}

fn positive_rate(rate: Rational) -> Option<f64> {
    if rate.denominator() == 0 {
        return None;
    }
    let fps = f64::from(rate);
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

/// Copy an RGB24 frame into an image, dropping per-row padding
fn frame_to_rgb_image(frame: &VideoFrame) -> Option<RgbImage> {
    let width = frame.width();
    let height = frame.height();
    let row_len = width as usize * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    let buffer = if stride == row_len {
        data.get(..row_len * height as usize)?.to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_len * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            buffer.extend_from_slice(data.get(start..start + row_len)?);
        }
        buffer
    };

    RgbImage::from_raw(width, height, buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_rate() {
        assert_eq!(positive_rate(Rational::new(30, 1)), Some(30.0));
        assert_eq!(positive_rate(Rational::new(0, 1)), None);
        assert_eq!(positive_rate(Rational::new(1, 0)), None);
        let ntsc = positive_rate(Rational::new(30000, 1001)).unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_open_missing_file_is_unreadable() {
        let err = VideoDecoder::open("/definitely/not/here.mp4")
            .err()
            .expect("opening a missing file must fail");
        assert!(matches!(err, ExtractError::UnreadableVideo { .. }));
    }

    #[test]
    fn test_open_garbage_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.mp4");
        std::fs::write(&path, b"this is not a video container").unwrap();

        let err = VideoDecoder::open(&path).err().expect("garbage must not open");
        assert!(matches!(
            err,
            ExtractError::UnreadableVideo { .. } | ExtractError::NoVideoStream { .. }
        ));
    }
}
