//! Domain entities: core data structures

use std::path::{Path, PathBuf};

/// Minimum number of sources a merge request must name.
pub const MIN_MERGE_SOURCES: usize = 2;

/// Files above this size are extracted with the streaming reader (10 MiB).
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 10 * 1024 * 1024;

/// Timestamp part of generated file names: sortable, second granularity.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Default suffix of merged output files.
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_Merged.kml";

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// How a source document is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// Whole document parsed into memory, placemarks collected by query.
    WholeDocument,
    /// Single pass; only placemark subtrees are materialised.
    Streaming,
}

impl ParseStrategy {
    /// Streaming only when `size` is strictly above `threshold`.
    pub fn for_size(size: u64, threshold: u64) -> Self {
        if size > threshold {
            ParseStrategy::Streaming
        } else {
            ParseStrategy::WholeDocument
        }
    }
}

/// Candidate source file as listed for selection.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Placemarks found by a streaming count (0 if the count failed)
    pub placemark_count: usize,
}

impl SourceDocument {
    pub fn size_mib(&self) -> f64 {
        bytes_to_mib(self.size_bytes)
    }

    pub fn strategy(&self, threshold: u64) -> ParseStrategy {
        ParseStrategy::for_size(self.size_bytes, threshold)
    }

    /// File name for display, falling back to the full path.
    pub fn display_name(&self) -> String {
        display_name(&self.path)
    }
}

pub fn bytes_to_mib(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MIB
}

pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Result of extracting one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    Merged { placemarks: usize },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOutcome {
    pub source: PathBuf,
    pub status: SourceStatus,
}

impl SourceOutcome {
    pub fn merged(source: PathBuf, placemarks: usize) -> Self {
        Self {
            source,
            status: SourceStatus::Merged { placemarks },
        }
    }

    pub fn failed(source: PathBuf, reason: impl Into<String>) -> Self {
        Self {
            source,
            status: SourceStatus::Failed {
                reason: reason.into(),
            },
        }
    }

    pub fn placemarks(&self) -> usize {
        match self.status {
            SourceStatus::Merged { placemarks } => placemarks,
            SourceStatus::Failed { .. } => 0,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, SourceStatus::Failed { .. })
    }
}

/// Per-source outcomes of one merge, in completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub sources: Vec<SourceOutcome>,
}

impl MergeOutcome {
    pub fn record(&mut self, outcome: SourceOutcome) {
        self.sources.push(outcome);
    }

    /// Sum of placemarks over all successful sources.
    pub fn total_placemarks(&self) -> usize {
        self.sources.iter().map(SourceOutcome::placemarks).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.sources.iter().filter(|o| o.is_failure())
    }

    pub fn successes(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.sources.iter().filter(|o| !o.is_failure())
    }

    /// No source contributed a single placemark.
    pub fn nothing_merged(&self) -> bool {
        self.total_placemarks() == 0
    }

    pub fn outcome_for(&self, source: &Path) -> Option<&SourceOutcome> {
        self.sources.iter().find(|o| o.source == source)
    }
}
