//! Tracing setup: verbosity-filtered stderr plus an append-only log file

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use crate::infrastructure::{InfraError, InfraResult};

/// Map `-v` occurrences to the stderr level.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Handle to the log file shared by all writer instances of the file layer.
/// Unbuffered: each event is on disk once formatted.
#[derive(Clone)]
pub struct LogFile(Arc<Mutex<File>>);

impl LogFile {
    /// Open `path` for appending, creating it (and its directory) on first run.
    pub fn open(path: &Path) -> InfraResult<Self> {
        let logging_err = |source| InfraError::Logging {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(logging_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(logging_err)?;
        Ok(Self(Arc::new(Mutex::new(file))))
    }
}

impl Write for LogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut file = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        file.flush()
    }
}

/// Keeps the log file alive; flushes it when dropped.
#[must_use = "dropping the guard flushes the log file"]
pub struct LogGuard {
    file: Option<LogFile>,
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        if let Some(file) = self.file.as_mut() {
            let _ = file.flush();
        }
    }
}

/// Install the global subscriber.
///
/// The file layer is skipped when `log_file` is `None`. Returns the guard
/// to hold for the process lifetime.
pub fn setup_logging(verbosity: u8, log_file: Option<&Path>) -> InfraResult<LogGuard> {
    let filter = level_for(verbosity);

    let noisy_modules = ["rayon_core"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(filter)
        .with_filter(module_filter);

    let file = log_file.map(LogFile::open).transpose()?;
    let file_layer = file.clone().map(|file| {
        fmt::layer()
            .with_writer(move || file.clone())
            .with_ansi(false)
            .with_target(false)
            .with_thread_names(true)
            .with_filter(LevelFilter::INFO)
    });

    let installed = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
    if let Err(e) = installed {
        eprintln!("Logging already initialized: {e}");
    }

    match filter {
        LevelFilter::INFO => tracing::info!("Debug mode: info"),
        LevelFilter::DEBUG => tracing::debug!("Debug mode: debug"),
        LevelFilter::TRACE => tracing::debug!("Debug mode: trace"),
        _ => {}
    }

    Ok(LogGuard { file })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_level_for() {
        assert_eq!(level_for(0), LevelFilter::WARN);
        assert_eq!(level_for(1), LevelFilter::INFO);
        assert_eq!(level_for(2), LevelFilter::DEBUG);
        assert_eq!(level_for(9), LevelFilter::TRACE);
    }

    #[test]
    fn given_file_layer_when_logging_then_info_on_disk_before_guard_drops() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("kmlmerge.log");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "earlier run\n").unwrap();

        let file = LogFile::open(&path).unwrap();
        let guard = LogGuard {
            file: Some(file.clone()),
        };
        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_writer(move || file.clone())
                .with_ansi(false)
                .with_filter(LevelFilter::INFO),
        );
        // read while subscriber and guard are alive
        let content = tracing::subscriber::with_default(subscriber, || {
            tracing::info!("File A.kml successfully merged with 3 placemarks");
            tracing::debug!("not recorded");
            std::fs::read_to_string(&path).unwrap()
        });
        drop(guard);
        assert!(content.starts_with("earlier run\n"));
        assert!(content.contains("File A.kml successfully merged with 3 placemarks"));
        assert!(!content.contains("not recorded"));
        assert!(!content.contains('\u{1b}'), "no ANSI escapes in the log file");
    }
}
