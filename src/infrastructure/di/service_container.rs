//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::services::{CatalogService, MergeService, OutputWriter};
use crate::config::Settings;
use crate::infrastructure::kml::KmlExtractor;
use crate::infrastructure::report::CsvReporter;
use crate::infrastructure::traits::{
    Clock, PlacemarkExtractor, Prompt, StdinPrompt, SummaryReporter, SystemClock,
};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Directory sources are listed from and relative paths resolve against
    pub work_dir: PathBuf,

    pub extractor: Arc<dyn PlacemarkExtractor>,
    pub clock: Arc<dyn Clock>,
    pub prompt: Arc<dyn Prompt>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings, work_dir: PathBuf) -> Self {
        let extractor = Arc::new(KmlExtractor::new(settings.large_file_threshold));
        Self::with_deps(
            settings,
            work_dir,
            extractor,
            Arc::new(SystemClock),
            Arc::new(StdinPrompt),
        )
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        work_dir: PathBuf,
        extractor: Arc<dyn PlacemarkExtractor>,
        clock: Arc<dyn Clock>,
        prompt: Arc<dyn Prompt>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            work_dir,
            extractor,
            clock,
            prompt,
        }
    }

    /// Resolved output directory.
    pub fn output_dir(&self) -> PathBuf {
        self.settings.resolve(&self.work_dir, &self.settings.output_dir)
    }

    /// Resolve a user-supplied source path against the working directory.
    pub fn source_path(&self, path: &Path) -> PathBuf {
        self.settings.resolve(&self.work_dir, path)
    }

    pub fn catalog_service(&self) -> CatalogService {
        CatalogService::new(self.extractor.clone(), self.settings.extensions.clone())
    }

    /// Merge service; `with_report = false` suppresses the summary report
    /// regardless of configuration.
    pub fn merge_service(&self, with_report: bool) -> MergeService {
        let output_dir = self.output_dir();
        let mut writer = OutputWriter::new(
            output_dir.clone(),
            self.settings.output_suffix.clone(),
            self.clock.clone(),
        );
        if with_report && self.settings.report.enabled {
            let reporter: Arc<dyn SummaryReporter> = Arc::new(CsvReporter::new(
                output_dir,
                self.settings.report.prefix.clone(),
                self.clock.clone(),
            ));
            writer = writer.with_reporter(reporter);
        }
        MergeService::new(self.extractor.clone(), writer, self.settings.workers)
    }
}
