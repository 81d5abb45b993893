use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use tempfile::TempDir;
use uuid::Uuid;

use crate::cancel::CancellationToken;
use crate::error::{ExtractError, Result};

const DOWNLOAD_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Identifies one extraction run, used to keep temp paths of concurrent runs apart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// A locally readable video for the duration of one run.
///
/// Transient copies live in a per-run temp directory that is removed by
/// [`AcquiredVideo::cleanup`], or on drop if cleanup was never reached.
/// Files that were already local are never touched.
#[derive(Debug)]
pub struct AcquiredVideo {
    path: PathBuf,
    transient: Option<TempDir>,
}

impl AcquiredVideo {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            transient: None,
        }
    }

    pub fn transient(path: impl Into<PathBuf>, dir: TempDir) -> Self {
        Self {
            path: path.into(),
            transient: Some(dir),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_transient(&self) -> bool {
        self.transient.is_some()
    }

    /// Delete the transient copy. Failures are logged, not returned.
    pub fn cleanup(mut self) {
        self.remove_transient();
    }

    fn remove_transient(&mut self) {
        let Some(dir) = self.transient.take() else {
            return;
        };
        let dir_path = dir.path().to_path_buf();
        match dir.close() {
            Ok(()) => debug!("Removed transient video {:?}", self.path),
            Err(e) => warn!("Failed to remove transient video dir {:?}: {}", dir_path, e),
        }
    }
}

impl Drop for AcquiredVideo {
    fn drop(&mut self) {
        self.remove_transient();
    }
}

/// Turns a video locator into a local file.
///
/// Long-running acquirers should give up with the token's error once it
/// reports cancellation or an expired deadline.
pub trait VideoAcquirer {
    fn acquire(
        &self,
        locator: &str,
        run: RunId,
        cancel: &CancellationToken,
    ) -> Result<AcquiredVideo>;
}

/// Uses a file that already exists on disk, leaving it in place afterwards
#[derive(Debug, Clone, Default)]
pub struct LocalFileAcquirer;

impl VideoAcquirer for LocalFileAcquirer {
    fn acquire(
        &self,
        locator: &str,
        _run: RunId,
        _cancel: &CancellationToken,
    ) -> Result<AcquiredVideo> {
        let path = Path::new(locator);
        if !path.is_file() {
            return Err(ExtractError::AcquisitionFailed {
                locator: locator.to_string(),
                reason: "no such file".to_string(),
            });
        }
        Ok(AcquiredVideo::local(path))
    }
}

/// Downloads remote videos with the `yt-dlp` executable into a per-run temp dir
#[derive(Debug, Clone)]
pub struct YtDlpAcquirer {
    program: PathBuf,
    format: String,
    temp_root: Option<PathBuf>,
}

impl YtDlpAcquirer {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("yt-dlp"),
            format: "best[ext=mp4]".to_string(),
            temp_root: None,
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Directory the per-run temp dirs are created in, system temp by default
    pub fn with_temp_root(mut self, temp_root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(temp_root.into());
        self
    }
}

impl Default for YtDlpAcquirer {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoAcquirer for YtDlpAcquirer {
    fn acquire(
        &self,
        locator: &str,
        run: RunId,
        cancel: &CancellationToken,
    ) -> Result<AcquiredVideo> {
        let failed = |reason: String| ExtractError::AcquisitionFailed {
            locator: locator.to_string(),
            reason,
        };

        let mut builder = tempfile::Builder::new();
        let prefix = format!("uniqframes-{run}-");
        builder.prefix(&prefix);
        let dir = match &self.temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| failed(format!("Failed to create temp directory: {e}")))?;

        let template = dir.path().join("video.%(ext)s");
        let stdout_path = dir.path().join("yt-dlp.stdout");
        let stderr_path = dir.path().join("yt-dlp.stderr");
        let stdout = File::create(&stdout_path)
            .map_err(|e| failed(format!("Failed to create {stdout_path:?}: {e}")))?;
        let stderr = File::create(&stderr_path)
            .map_err(|e| failed(format!("Failed to create {stderr_path:?}: {e}")))?;

        info!("Downloading {} into {:?}", locator, dir.path());

        let mut child = Command::new(&self.program)
            .arg("--quiet")
            .arg("--no-warnings")
            .arg("--no-playlist")
            .arg("--no-simulate")
            .arg("-f")
            .arg(&self.format)
            .arg("-o")
            .arg(&template)
            .arg("--print")
            .arg("after_move:filepath")
            .arg("--")
            .arg(locator)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|e| failed(format!("Failed to run {:?}: {e}", self.program)))?;

        // Polled so a cancel or an expired deadline can stop the download.
        let status = loop {
            if let Err(e) = cancel.check() {
                warn!("Stopping download of {}: {}", locator, e);
                child.kill().ok();
                child.wait().ok();
                return Err(e);
            }
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => thread::sleep(DOWNLOAD_POLL_INTERVAL),
                Err(e) => {
                    child.kill().ok();
                    child.wait().ok();
                    return Err(failed(format!("Failed to wait for {:?}: {e}", self.program)));
                }
            }
        };

        if !status.success() {
            let stderr = fs::read_to_string(&stderr_path).unwrap_or_default();
            return Err(failed(format!(
                "{:?} exited with {}: {}",
                self.program,
                status,
                stderr.trim()
            )));
        }

        let stdout = fs::read_to_string(&stdout_path)
            .map_err(|e| failed(format!("Failed to read downloader output: {e}")))?;
        let path = stdout
            .lines()
            .map(str::trim)
            .rfind(|line| !line.is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| failed("downloader did not report an output file".to_string()))?;

        if !path.is_file() {
            return Err(failed(format!("downloaded file {path:?} does not exist")));
        }

        info!("Downloaded {} to {:?}", locator, path);
        Ok(AcquiredVideo::transient(path, dir))
    }
}

/// Local paths are used in place, everything else goes to `yt-dlp`
#[derive(Debug, Clone, Default)]
pub struct AutoAcquirer {
    local: LocalFileAcquirer,
    remote: YtDlpAcquirer,
}

impl AutoAcquirer {
    pub fn new(remote: YtDlpAcquirer) -> Self {
        Self {
            local: LocalFileAcquirer,
            remote,
        }
    }
}

impl VideoAcquirer for AutoAcquirer {
    fn acquire(
        &self,
        locator: &str,
        run: RunId,
        cancel: &CancellationToken,
    ) -> Result<AcquiredVideo> {
        if Path::new(locator).is_file() {
            self.local.acquire(locator, run, cancel)
        } else {
            self.remote.acquire(locator, run, cancel)
        }
    }
}
