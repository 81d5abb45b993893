#![deny(clippy::all)]

pub mod cancel;
pub mod config;
pub mod error;
pub mod logging;
pub mod unique_frames;

pub use cancel::CancellationToken;
pub use config::ExtractionConfig;
pub use error::{ExtractError, Result, Stage};
pub use unique_frames::acquire::{
    AcquiredVideo, AutoAcquirer, LocalFileAcquirer, RunId, VideoAcquirer, YtDlpAcquirer,
};
pub use unique_frames::extraction::{extract_unique_frames, run_extraction};
pub use unique_frames::filter::{Decision, UniquenessFilter};
pub use unique_frames::hash::{Fingerprint, Fingerprinter, PerceptualHasher};
pub use unique_frames::sampler::Sampler;
pub use unique_frames::store::FrameStore;
pub use unique_frames::video::{FrameSource, VideoDecoder};
pub use unique_frames::{AdmittedFrame, FrameLink, FrameRecord, FramesResponse, RawFrame, VideoInfo};
