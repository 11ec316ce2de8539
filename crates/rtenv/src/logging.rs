use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};
use std::fs::OpenOptions;
use std::io;
use std::path::Path;

use rtenv_platform::RtenvPaths;

/// Drop the older half of `log_path` once it grows past `limit` bytes.
/// The cut lands on a line boundary. Returns whether the file was trimmed.
fn trim_log(log_path: &Path, limit: u64) -> io::Result<bool> {
    let size = match std::fs::metadata(log_path) {
        Ok(metadata) => metadata.len(),
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(error) => return Err(error),
    };
    if size <= limit {
        return Ok(false);
    }

    let contents = std::fs::read(log_path)?;
    let middle = contents.len() / 2;
    let start = contents[middle..]
        .iter()
        .position(|&byte| byte == b'\n')
        .map_or(middle, |offset| middle + offset + 1);
    std::fs::write(log_path, &contents[start..])?;
    Ok(true)
}

fn max_level(debug_enabled: bool) -> LevelFilter {
    if debug_enabled {
        LevelFilter::Debug
    } else {
        LevelFilter::Off
    }
}

/// Set up logging for this invocation.
///
/// With debug logging off no logger is installed and the log file is not
/// touched, so shims stay cheap. Otherwise messages go to stderr and to
/// `debug.log` in the data directory.
pub fn init_logging(paths: &RtenvPaths, debug_enabled: bool, max_log_size: u64) {
    log::set_max_level(max_level(debug_enabled));
    if !debug_enabled {
        return;
    }

    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .add_filter_allow_str("rtenv")
        .build();
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        LevelFilter::Debug,
        config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];

    let log_path = paths.log_file();
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let trimmed = trim_log(&log_path, max_log_size);
    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => loggers.push(WriteLogger::new(LevelFilter::Debug, config, file)),
        Err(error) => eprintln!("rtenv: cannot open {}: {error}", log_path.display()),
    }

    let _ = CombinedLogger::init(loggers);
    log::set_max_level(max_level(true));
    match trimmed {
        Ok(true) => log::debug!("Trimmed {}", log_path.display()),
        Ok(false) => {}
        Err(error) => log::warn!("Failed to trim {}: {error}", log_path.display()),
    }
    log::info!("Debug logging to {}", log_path.display());
}
