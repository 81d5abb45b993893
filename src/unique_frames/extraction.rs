use std::time::Instant;

use log::info;

use super::FrameRecord;
use super::acquire::{AcquiredVideo, RunId, VideoAcquirer};
use super::filter::{Decision, UniquenessFilter};
use super::hash::{Fingerprinter, PerceptualHasher};
use super::sampler::Sampler;
use super::store::FrameStore;
use super::video::{FrameSource, VideoDecoder};
use crate::cancel::CancellationToken;
use crate::config::ExtractionConfig;
use crate::error::Result;

/// Sample, deduplicate and save frames from any frame source.
///
/// Returns the saved frames in admission order. Any error aborts the run;
/// files saved before the failure stay on disk.
pub fn extract_unique_frames<S, F>(
    mut source: S,
    fingerprinter: F,
    store: &FrameStore,
    config: &ExtractionConfig,
    cancel: &CancellationToken,
) -> Result<Vec<FrameRecord>>
where
    S: FrameSource,
    F: Fingerprinter,
{
    let sampler = Sampler::new(source.info().frame_rate, config.interval_sec);
    info!(
        "Sampling every {} frame(s) (fps {:?}, interval {}s), threshold {}",
        sampler.stride(),
        source.info().frame_rate,
        config.interval_sec,
        config.hash_threshold
    );

    source.skip_unsampled(sampler.stride());
    let frames = source.map(|frame| cancel.check().and(frame));

    let mut filter = UniquenessFilter::new(fingerprinter, config.hash_threshold);
    let mut records = Vec::new();
    let mut sampled = 0usize;

    for frame in sampler.sample(frames) {
        let frame = frame?;
        sampled += 1;

        if let Decision::Admitted(admitted) = filter.consider(frame) {
            records.push(store.save(&admitted)?);
        }
    }

    info!(
        "Kept {} of {} sampled frames in {:?}",
        records.len(),
        sampled,
        store.dir()
    );

    Ok(records)
}

/// Acquire a video, extract its unique frames and remove the transient copy.
///
/// The transient copy is removed on every path out of here, including
/// errors, cancellation and timeouts. The token and `config.timeout` bound
/// the download as well as the decode.
pub fn run_extraction<A>(
    acquirer: &A,
    locator: &str,
    config: &ExtractionConfig,
    cancel: &CancellationToken,
) -> Result<Vec<FrameRecord>>
where
    A: VideoAcquirer + ?Sized,
{
    config.validate()?;
    let cancel = match config.timeout {
        Some(timeout) => cancel.with_timeout(timeout),
        None => cancel.clone(),
    };

    let run = RunId::new();
    let started = Instant::now();
    info!("Run {}: extracting unique frames from {}", run, locator);

    cancel.check()?;
    let video = acquirer.acquire(locator, run, &cancel)?;
    let result = extract_from_video(&video, config, &cancel);
    video.cleanup();

    if let Ok(records) = &result {
        info!(
            "Run {}: finished with {} frames in {:.2?}",
            run,
            records.len(),
            started.elapsed()
        );
    }
    result
}

fn extract_from_video(
    video: &AcquiredVideo,
    config: &ExtractionConfig,
    cancel: &CancellationToken,
) -> Result<Vec<FrameRecord>> {
    let mut store = FrameStore::create(&config.output_folder)?;
    if let Some(prefix) = &config.file_prefix {
        store = store.with_prefix(prefix.clone());
    }

    // Consumed, and so closed, before the caller removes the file.
    let decoder = VideoDecoder::open(video.path())?;
    extract_unique_frames(decoder, PerceptualHasher::new(), &store, config, cancel)
}
