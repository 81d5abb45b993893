pub mod acquire;
pub mod extraction;
pub mod filter;
pub mod hash;
pub mod sampler;
pub mod store;
pub mod video;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use self::hash::Fingerprint;

/// What the decoder knows about an opened video
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoInfo {
    /// Nominal frames per second, `None` when the container doesn't say
    pub frame_rate: Option<f64>,
    pub frame_count: Option<u64>,
    pub width: u32,
    pub height: u32,
}

/// One decoded frame with its position in the source video
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub image: RgbImage,
    /// 0-based ordinal among decoded frames
    pub frame_index: u64,
    /// Playback position reported by the decoder
    pub timestamp_seconds: f64,
}

/// A sampled frame that passed the uniqueness check
#[derive(Debug, Clone)]
pub struct AdmittedFrame {
    pub sequence_index: usize,
    pub fingerprint: Fingerprint,
    pub timestamp_seconds: f64,
    pub image: RgbImage,
}

/// Saved frame as seen by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub filename: String,
    pub timestamp_seconds: f64,
}

impl FrameRecord {
    pub fn url(&self, url_prefix: &str) -> String {
        format!("{}/{}", url_prefix.trim_end_matches('/'), self.filename)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameLink {
    pub url: String,
    pub timestamp: f64,
}

/// Response body listing saved frames in admission order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramesResponse {
    pub frames: Vec<FrameLink>,
}

impl FramesResponse {
    pub fn from_records(records: &[FrameRecord], url_prefix: &str) -> Self {
        Self {
            frames: records
                .iter()
                .map(|record| FrameLink {
                    url: record.url(url_prefix),
                    timestamp: record.timestamp_seconds,
                })
                .collect(),
        }
    }
}
