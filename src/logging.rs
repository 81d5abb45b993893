use std::path::Path;
use std::time::SystemTime;

use anyhow::{Context, Result};
use log::LevelFilter;

/// Map `-v` occurrences to a level: info, debug, then trace
pub fn level_for_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Log to stderr and, if given, also to a file.
/// Stdout is left alone since it carries the JSON result.
pub fn init_logger(verbosity: u8, logfile: Option<&Path>) -> Result<()> {
    let mut dispatch = fern::Dispatch::new()
        .level(level_for_verbosity(verbosity))
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} {:<5} {}: {}",
                humantime::format_rfc3339_seconds(SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .chain(std::io::stderr());

    if let Some(logfile) = logfile {
        dispatch = dispatch.chain(
            fern::log_file(logfile)
                .with_context(|| format!("failed to open the log file at: {logfile:?}"))?,
        );
    }

    dispatch.apply().context("failed to set the logger")?;

    Ok(())
}
