//! Error types for unique frame extraction.
//!
//! Every fallible step of a run returns [`ExtractError`]. The variant tells
//! the caller which stage gave up, see [`ExtractError::stage`].

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

pub type Result<T, E = ExtractError> = std::result::Result<T, E>;

/// Pipeline stage a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Configure,
    Acquire,
    Decode,
    Persist,
    Cancel,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExtractError {
    /// The remote video could not be fetched or materialised locally.
    #[error("Failed to acquire video {locator}: {reason}")]
    AcquisitionFailed { locator: String, reason: String },

    /// The local file could not be opened as a video at all.
    #[error("Failed to open video at {path}: {reason}")]
    UnreadableVideo { path: PathBuf, reason: String },

    #[error("No video stream found in {path}")]
    NoVideoStream { path: PathBuf },

    /// A frame could not be decoded after the video was opened.
    #[error("Failed to decode video frame: {0}")]
    Decode(String),

    /// Writing an admitted frame failed. Files saved before it are kept.
    #[error("Failed to save frame to {path}: {source}")]
    PersistFailure {
        path: PathBuf,
        #[source]
        source: ImageError,
    },

    #[error("Failed to prepare output directory {path}: {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: IoError,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Extraction cancelled")]
    Cancelled,

    #[error("Extraction exceeded its deadline")]
    TimedOut,
}

impl ExtractError {
    pub fn stage(&self) -> Stage {
        match self {
            ExtractError::AcquisitionFailed { .. } => Stage::Acquire,
            ExtractError::UnreadableVideo { .. }
            | ExtractError::NoVideoStream { .. }
            | ExtractError::Decode(_) => Stage::Decode,
            ExtractError::PersistFailure { .. } | ExtractError::OutputDirectory { .. } => {
                Stage::Persist
            }
            ExtractError::InvalidConfig(_) => Stage::Configure,
            ExtractError::Cancelled | ExtractError::TimedOut => Stage::Cancel,
        }
    }
}

impl From<FfmpegError> for ExtractError {
    fn from(error: FfmpegError) -> Self {
        ExtractError::Decode(error.to_string())
    }
}
