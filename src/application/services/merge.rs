//! Merge coordinator
//!
//! Fans extraction out over a bounded rayon pool, one task per source, and
//! fans the results back into a single [`DocumentAssembler`]. A source that
//! fails is recorded and skipped; it never cancels its siblings.

use std::path::PathBuf;
use std::sync::{mpsc, Arc};

use rayon::ThreadPoolBuilder;
use tracing::{debug, error, info, instrument};

use crate::application::services::output::OutputWriter;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{DocumentAssembler, MergeOutcome, MergedDocument, SourceOutcome};
use crate::infrastructure::traits::PlacemarkExtractor;

/// Document and per-source outcomes of one merge.
#[derive(Debug, Clone)]
pub struct MergeResult {
    pub document: MergedDocument,
    pub outcome: MergeOutcome,
}

/// What a complete merge run produced.
#[derive(Debug, Clone)]
pub enum MergeRun {
    /// Output written; `report` is `None` when disabled or when it failed.
    Written {
        output: PathBuf,
        report: Option<PathBuf>,
        outcome: MergeOutcome,
    },
    /// Not a single placemark was extracted: nothing was written.
    NothingMerged { outcome: MergeOutcome },
}

impl MergeRun {
    pub fn outcome(&self) -> &MergeOutcome {
        match self {
            MergeRun::Written { outcome, .. } | MergeRun::NothingMerged { outcome } => outcome,
        }
    }
}

/// Service merging placemark sources into one document.
pub struct MergeService {
    extractor: Arc<dyn PlacemarkExtractor>,
    writer: OutputWriter,
    /// Pool size, 0 = one thread per available CPU
    workers: usize,
}

impl MergeService {
    /// Create a new merge service.
    pub fn new(extractor: Arc<dyn PlacemarkExtractor>, writer: OutputWriter, workers: usize) -> Self {
        Self {
            extractor,
            writer,
            workers,
        }
    }

    /// Extract all `sources` concurrently and assemble the merged document.
    ///
    /// Works for any number of sources; with none the document is the empty
    /// skeleton. Outcomes are recorded in completion order, which is also the
    /// order placemark batches appear in the document.
    #[instrument(level = "debug", skip(self, sources), fields(sources = sources.len()))]
    pub fn merge(&self, sources: &[PathBuf]) -> ApplicationResult<MergeResult> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("kmlmerge-worker-{i}"))
            .build()
            .map_err(|e| ApplicationError::OperationFailed {
                context: "create worker pool".to_string(),
                source: Box::new(e),
            })?;
        debug!("merge: {} sources on {} workers", sources.len(), pool.current_num_threads());

        let assembler = DocumentAssembler::new();
        let (tx, rx) = mpsc::channel();

        pool.scope(|scope| {
            for source in sources {
                let tx = tx.clone();
                let assembler = &assembler;
                let extractor = &self.extractor;
                scope.spawn(move |_| {
                    let outcome = match extractor.extract(source) {
                        Ok(placemarks) => {
                            let count = assembler.append(placemarks);
                            info!(
                                "File {} successfully merged with {} placemarks",
                                source.display(),
                                count
                            );
                            SourceOutcome::merged(source.clone(), count)
                        }
                        Err(e) => {
                            error!("Failed to merge file {}: {}", source.display(), e.kind);
                            SourceOutcome::failed(source.clone(), e.kind.to_string())
                        }
                    };
                    // receiver lives until after the scope
                    let _ = tx.send(outcome);
                });
            }
        });
        drop(tx);

        let mut outcome = MergeOutcome::default();
        for source_outcome in rx {
            outcome.record(source_outcome);
        }

        let document = assembler.finish();
        info!(
            "Merged {} placemarks from {} of {} files",
            outcome.total_placemarks(),
            outcome.successes().count(),
            sources.len()
        );
        Ok(MergeResult { document, outcome })
    }

    /// Merge, write the output file and the summary report.
    ///
    /// When nothing was merged no file at all is written.
    pub fn merge_and_write(&self, sources: &[PathBuf]) -> ApplicationResult<MergeRun> {
        let MergeResult { document, outcome } = self.merge(sources)?;

        if outcome.nothing_merged() {
            error!("No valid KML files were merged");
            return Ok(MergeRun::NothingMerged { outcome });
        }

        let published = self
            .writer
            .publish(&document, sources, outcome.total_placemarks())?;
        Ok(MergeRun::Written {
            output: published.output,
            report: published.report,
            outcome,
        })
    }
}
