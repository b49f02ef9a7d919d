//! I/O boundary traits for testability
//!
//! These traits abstract the external collaborators of the merge pipeline,
//! allowing services to be tested with mock implementations.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};
use colored::Colorize;

use crate::domain::Placemark;
use crate::infrastructure::kml::ParseError;

/// Reads placemarks out of one source document.
pub trait PlacemarkExtractor: Send + Sync {
    /// Extract all placemarks of `path`. Zero placemarks is not an error.
    fn extract(&self, path: &Path) -> Result<Vec<Placemark>, ParseError>;

    /// Count placemarks without keeping them.
    fn count(&self, path: &Path) -> Result<usize, ParseError> {
        self.extract(path).map(|placemarks| placemarks.len())
    }
}

/// Emits the summary report of a finished merge.
pub trait SummaryReporter: Send + Sync {
    /// Write one row per requested source with the merged total.
    /// Returns the report location.
    fn report(&self, sources: &[PathBuf], total_placemarks: usize) -> io::Result<PathBuf>;
}

/// Wall clock, replaceable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Line-based operator prompt.
pub trait Prompt: Send + Sync {
    /// Show `message` and read one line. `None` when input is exhausted.
    fn read_line(&self, message: &str) -> io::Result<Option<String>>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Local system time.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Prompt on stdout, answer from stdin.
#[derive(Debug, Default)]
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn read_line(&self, message: &str) -> io::Result<Option<String>> {
        print!("{} ", message.cyan());
        io::stdout().flush()?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
    }
}
