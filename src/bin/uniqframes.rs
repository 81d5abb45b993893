use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use uniqframes_rs::config::{
    DEFAULT_HASH_THRESHOLD, DEFAULT_INTERVAL_SEC, DEFAULT_OUTPUT_FOLDER, DEFAULT_URL_PREFIX,
};
use uniqframes_rs::logging::init_logger;
use uniqframes_rs::{
    AutoAcquirer, CancellationToken, ExtractionConfig, FramesResponse, YtDlpAcquirer,
    run_extraction,
};

/// Extract visually distinct frames from a video and print them as JSON
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Local video file or a URL yt-dlp understands
    locator: String,

    /// Seconds between sampled frames
    #[arg(short, long, default_value_t = DEFAULT_INTERVAL_SEC)]
    interval: f64,

    /// Maximum Hamming distance for two frames to count as the same
    #[arg(short, long, default_value_t = DEFAULT_HASH_THRESHOLD)]
    threshold: u32,

    /// Directory the frames are written to
    #[arg(short, long, default_value = DEFAULT_OUTPUT_FOLDER)]
    output: PathBuf,

    /// Prepended to every saved filename
    #[arg(long)]
    prefix: Option<String>,

    /// Prefix for the urls in the printed JSON
    #[arg(long, default_value = DEFAULT_URL_PREFIX)]
    url_prefix: String,

    /// Abandon the run after this long, e.g. "90s" or "5m"
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// yt-dlp executable used for remote videos
    #[arg(long, default_value = "yt-dlp")]
    yt_dlp: PathBuf,

    #[arg(long)]
    log_file: Option<PathBuf>,

    /// More logging, repeat for even more
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> ExtractionConfig {
        let mut config = ExtractionConfig::new()
            .with_interval_sec(self.interval)
            .with_hash_threshold(self.threshold)
            .with_output_folder(&self.output)
            .with_url_prefix(&self.url_prefix);
        if let Some(prefix) = &self.prefix {
            config = config.with_file_prefix(prefix);
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        config
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose, cli.log_file.as_deref())?;

    let config = cli.config();
    let acquirer = AutoAcquirer::new(YtDlpAcquirer::new().with_program(&cli.yt_dlp));

    let records = run_extraction(&acquirer, &cli.locator, &config, &CancellationToken::new())
        .with_context(|| format!("Failed to extract frames from {}", cli.locator))?;

    let response = FramesResponse::from_records(&records, &config.url_prefix);
    let json = serde_json::to_string_pretty(&response).context("Failed to serialize frames")?;
    println!("{json}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["uniqframes", "video.mp4"]).unwrap();
        let config = cli.config();
        assert_eq!(config.interval_sec, DEFAULT_INTERVAL_SEC);
        assert_eq!(config.hash_threshold, DEFAULT_HASH_THRESHOLD);
        assert_eq!(config.output_folder, PathBuf::from("frames"));
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::try_parse_from([
            "uniqframes",
            "https://example.com/v",
            "--interval",
            "0.5",
            "-t",
            "8",
            "--prefix",
            "abc_",
            "--timeout",
            "2m",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);

        let config = cli.config();
        assert_eq!(config.interval_sec, 0.5);
        assert_eq!(config.hash_threshold, 8);
        assert_eq!(config.file_prefix.as_deref(), Some("abc_"));
        assert_eq!(config.timeout, Some(Duration::from_secs(120)));
    }
}
