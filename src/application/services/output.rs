//! Output writer: timestamped merged file plus summary report

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{MergedDocument, TIMESTAMP_FORMAT};
use crate::infrastructure::atomic;
use crate::infrastructure::kml::write_document;
use crate::infrastructure::traits::{Clock, SummaryReporter};

/// How often a name taken by an earlier run is retried a second later.
const MAX_NAME_ATTEMPTS: usize = 3;

/// Files produced by [`OutputWriter::publish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub output: PathBuf,
    pub report: Option<PathBuf>,
}

/// Serializes merged documents as `<YYYYMMDDHHMMSS><suffix>`.
pub struct OutputWriter {
    output_dir: PathBuf,
    suffix: String,
    clock: Arc<dyn Clock>,
    reporter: Option<Arc<dyn SummaryReporter>>,
}

impl OutputWriter {
    pub fn new(output_dir: PathBuf, suffix: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            output_dir,
            suffix: suffix.into(),
            clock,
            reporter: None,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn SummaryReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Output location for a write at `now`.
    pub fn output_path(&self, now: &DateTime<Local>) -> PathBuf {
        self.output_dir
            .join(format!("{}{}", now.format(TIMESTAMP_FORMAT), self.suffix))
    }

    /// Write `document` under a fresh timestamped name.
    ///
    /// The file appears atomically; an existing file is never overwritten.
    /// Failures are returned as [`ApplicationError::Write`] without retry.
    pub fn write(&self, document: &MergedDocument) -> ApplicationResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir).map_err(|source| ApplicationError::Write {
            path: self.output_dir.clone(),
            source,
        })?;

        let mut target = self.output_path(&self.clock.now());
        let mut attempts = 1;
        while target.exists() && attempts < MAX_NAME_ATTEMPTS {
            debug!("{} exists, waiting for the next second", target.display());
            self.clock.sleep(until_next_second(&self.clock.now()));
            target = self.output_path(&self.clock.now());
            attempts += 1;
        }

        atomic::write_new(&target, |out| {
            write_document(document.root(), out).map_err(io::Error::other)
        })
        .map_err(|source| ApplicationError::Write {
            path: target.clone(),
            source,
        })?;

        info!(
            "Merged KML file saved as {} ({} placemarks)",
            target.display(),
            document.placemark_count()
        );
        Ok(target)
    }

    /// Write `document`, then hand all requested `sources` and the merged
    /// total to the reporter.
    ///
    /// A failing report is logged; the merged file is kept.
    pub fn publish(
        &self,
        document: &MergedDocument,
        sources: &[PathBuf],
        total_placemarks: usize,
    ) -> ApplicationResult<Published> {
        let output = self.write(document)?;

        let report = self.reporter.as_ref().and_then(|reporter| {
            match reporter.report(sources, total_placemarks) {
                Ok(path) => {
                    info!("Analysis saved as {}", path.display());
                    Some(path)
                }
                Err(e) => {
                    warn!("Cannot write analysis report: {}", e);
                    None
                }
            }
        });

        Ok(Published { output, report })
    }
}

fn until_next_second(now: &DateTime<Local>) -> Duration {
    let nanos = now.timestamp_subsec_nanos().min(999_999_999);
    Duration::from_nanos(u64::from(1_000_000_000 - nanos))
}
