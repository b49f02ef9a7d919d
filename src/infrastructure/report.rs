//! CSV summary report

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::domain::{bytes_to_mib, display_name, TIMESTAMP_FORMAT};
use crate::infrastructure::atomic;
use crate::infrastructure::traits::{Clock, SummaryReporter};

/// One row per requested source.
#[derive(Debug, Serialize)]
struct ReportRow {
    #[serde(rename = "File Name")]
    file_name: String,
    #[serde(rename = "Placemarks Count")]
    placemarks_count: usize,
    #[serde(rename = "File Size (MB)")]
    file_size_mb: Option<String>,
}

/// Writes `<prefix><YYYYMMDDHHMMSS>.csv` into the output directory.
pub struct CsvReporter {
    output_dir: PathBuf,
    prefix: String,
    clock: Arc<dyn Clock>,
}

impl CsvReporter {
    pub fn new(output_dir: PathBuf, prefix: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            output_dir,
            prefix: prefix.into(),
            clock,
        }
    }

    fn report_path(&self) -> PathBuf {
        let stamp = self.clock.now().format(TIMESTAMP_FORMAT);
        self.output_dir.join(format!("{}{}.csv", self.prefix, stamp))
    }
}

fn file_size_mb(path: &Path) -> Option<String> {
    std::fs::metadata(path)
        .ok()
        .map(|m| format!("{:.2}", bytes_to_mib(m.len())))
}

impl SummaryReporter for CsvReporter {
    fn report(&self, sources: &[PathBuf], total_placemarks: usize) -> io::Result<PathBuf> {
        let path = self.report_path();
        debug!("report: {} rows -> {}", sources.len(), path.display());

        atomic::write_new(&path, |out| {
            let mut csv = csv::Writer::from_writer(out);
            for source in sources {
                csv.serialize(ReportRow {
                    file_name: display_name(source),
                    placemarks_count: total_placemarks,
                    file_size_mb: file_size_mb(source),
                })?;
            }
            csv.flush()
        })?;
        Ok(path)
    }
}
