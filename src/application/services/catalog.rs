//! Source catalog: candidate KML files of a directory

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, error};
use walkdir::WalkDir;

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::SourceDocument;
use crate::infrastructure::traits::PlacemarkExtractor;

/// Lists source files with their size and placemark count.
pub struct CatalogService {
    extractor: Arc<dyn PlacemarkExtractor>,
    extensions: Vec<String>,
}

impl CatalogService {
    /// Create a catalog matching `extensions` (without dot, case-insensitive).
    pub fn new(extractor: Arc<dyn PlacemarkExtractor>, extensions: Vec<String>) -> Self {
        Self {
            extractor,
            extensions,
        }
    }

    pub fn is_source(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    /// Source files directly inside `dir`, sorted by name.
    pub fn source_paths(&self, dir: &Path) -> ApplicationResult<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| ApplicationError::OperationFailed {
                context: format!("list sources: {}", dir.display()),
                source: Box::new(e),
            })?;
            if entry.file_type().is_file() && self.is_source(entry.path()) {
                paths.push(entry.into_path());
            }
        }
        debug!("source_paths: found {} files in {}", paths.len(), dir.display());
        Ok(paths)
    }

    /// Describe every source file of `dir`. Counting runs in parallel.
    ///
    /// A file whose placemarks cannot be counted is listed with count 0.
    pub fn list(&self, dir: &Path) -> ApplicationResult<Vec<SourceDocument>> {
        let paths = self.source_paths(dir)?;

        paths
            .par_iter()
            .map(|path| self.describe(path))
            .collect::<ApplicationResult<Vec<_>>>()
    }

    fn describe(&self, path: &Path) -> ApplicationResult<SourceDocument> {
        let size_bytes = std::fs::metadata(path)
            .with_path_context("read metadata", path)?
            .len();
        let placemark_count = match self.extractor.count(path) {
            Ok(count) => count,
            Err(e) => {
                error!("Error counting placemarks in file {}: {}", path.display(), e.kind);
                0
            }
        };
        Ok(SourceDocument {
            path: path.to_path_buf(),
            size_bytes,
            placemark_count,
        })
    }
}
