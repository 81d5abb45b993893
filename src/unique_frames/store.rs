use std::fs;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use log::debug;

use super::{AdmittedFrame, FrameRecord};
use crate::error::{ExtractError, Result};

/// Writes admitted frames into one flat directory as JPEG files
#[derive(Debug, Clone)]
pub struct FrameStore {
    dir: PathBuf,
    prefix: String,
}

impl FrameStore {
    /// Creates `dir` (and parents) if missing
    pub fn create<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| ExtractError::OutputDirectory {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            prefix: String::new(),
        })
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn filename_for(&self, sequence_index: usize) -> String {
        format!("{}frame_{:05}.jpg", self.prefix, sequence_index)
    }

    pub fn save(&self, frame: &AdmittedFrame) -> Result<FrameRecord> {
        let filename = self.filename_for(frame.sequence_index);
        let path = self.dir.join(&filename);

        frame
            .image
            .save_with_format(&path, ImageFormat::Jpeg)
            .map_err(|source| ExtractError::PersistFailure {
                path: path.clone(),
                source,
            })?;

        debug!("Saved frame #{} to {:?}", frame.sequence_index, path);

        Ok(FrameRecord {
            filename,
            timestamp_seconds: frame.timestamp_seconds,
        })
    }
}
