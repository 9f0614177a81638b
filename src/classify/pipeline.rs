//! Parallel archive classification pipeline
//!
//! A fixed pool of workers shares one queue of segment locators. Each worker
//! loads its own classifier once, then repeatedly claims a locator and
//! handles that segment end to end: download, decompress, iterate records,
//! classify, write accepted records. Nothing about a segment is shared
//! between workers, so one decompressed segment per worker is the memory
//! bound.
//!
//! Failures stay local: a segment that cannot be downloaded or decoded is
//! logged and counted as skipped, a record that cannot be classified is a
//! rejection, and a worker whose model fails to load exits without touching
//! the queue, leaving its locators to the remaining workers.

use crate::archive::{DecodeError, SegmentSource, WarcReader};
use crate::classify::model::{prepare_text, ClassifierLoader, LanguageClassifier, Prediction};
use crate::output::RecordSink;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Which predictions are kept
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptCriteria {
    pub target_label: String,
    pub threshold: f32,
}

/// Outcome of classifying one record
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Accept(Prediction),
    Reject(Rejection),
}

/// Why a record was not kept
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// No text left after preparation; the classifier was not consulted
    Blank,

    /// The classifier disagreed or was not confident enough
    Predicted(Prediction),

    /// The classifier failed on this record
    Error(String),
}

/// Decides whether a record's text belongs to the target language
pub fn decide(
    classifier: &dyn LanguageClassifier,
    criteria: &AcceptCriteria,
    text: &str,
) -> Decision {
    let prepared = prepare_text(text);
    if prepared.trim().is_empty() {
        return Decision::Reject(Rejection::Blank);
    }

    match classifier.predict(&prepared) {
        Ok(prediction)
            if prediction.label == criteria.target_label
                && prediction.confidence >= criteria.threshold =>
        {
            Decision::Accept(prediction)
        }
        Ok(prediction) => Decision::Reject(Rejection::Predicted(prediction)),
        Err(e) => Decision::Reject(Rejection::Error(e.to_string())),
    }
}

/// Final counts of a classification run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub segments_total: usize,

    /// Segments decoded to the end
    pub segments_processed: usize,

    /// Segments that failed to download or decode
    pub segments_skipped: usize,

    /// Segments never claimed (every worker stopped, or the run was cancelled)
    pub segments_unprocessed: usize,

    pub records_accepted: usize,
    pub records_rejected: usize,

    /// Accepted records the sink failed to store
    pub write_failures: usize,

    pub workers_started: usize,

    /// Workers that exited because their model did not load
    pub workers_failed: usize,
}

impl PipelineSummary {
    fn absorb(&mut self, report: &WorkerReport) {
        self.segments_processed += report.segments_processed;
        self.segments_skipped += report.segments_skipped;
        self.records_accepted += report.records_accepted;
        self.records_rejected += report.records_rejected;
        self.write_failures += report.write_failures;
        if !report.model_loaded {
            self.workers_failed += 1;
        }
    }
}

#[derive(Debug, Default)]
struct WorkerReport {
    model_loaded: bool,
    segments_processed: usize,
    segments_skipped: usize,
    records_accepted: usize,
    records_rejected: usize,
    write_failures: usize,
}

/// Record counts of one segment
#[derive(Debug, Default)]
struct SegmentOutcome {
    accepted: usize,
    rejected: usize,
    write_failures: usize,
    error: Option<DecodeError>,
}

/// Classifies every record of one compressed segment and writes the
/// accepted ones. Records written before a decode error are kept.
fn process_segment(
    classifier: &dyn LanguageClassifier,
    criteria: &AcceptCriteria,
    sink: &dyn RecordSink,
    bytes: Vec<u8>,
) -> SegmentOutcome {
    let mut outcome = SegmentOutcome::default();

    for item in WarcReader::from_gzip(bytes) {
        let record = match item {
            Ok(record) => record,
            Err(e) => {
                outcome.error = Some(e);
                break;
            }
        };

        match decide(classifier, criteria, &record.text) {
            Decision::Accept(_) => match sink.write_record(&record.id, &record.text) {
                Ok(()) => outcome.accepted += 1,
                Err(e) => {
                    tracing::error!("Failed to write record {}: {}", record.id, e);
                    outcome.write_failures += 1;
                }
            },
            Decision::Reject(Rejection::Error(e)) => {
                tracing::debug!("Classifier error on {}: {}", record.id, e);
                outcome.rejected += 1;
            }
            Decision::Reject(_) => outcome.rejected += 1,
        }
    }

    outcome
}

struct Shared {
    loader: Arc<dyn ClassifierLoader>,
    source: Arc<dyn SegmentSource>,
    sink: Arc<dyn RecordSink>,
    criteria: AcceptCriteria,
    queue: Mutex<VecDeque<String>>,
    cancel: CancellationToken,
}

impl Shared {
    fn claim(&self) -> Option<String> {
        self.queue
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front()
    }

    fn remaining(&self) -> usize {
        self.queue.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

async fn run_worker(worker: usize, shared: Arc<Shared>) -> WorkerReport {
    let mut report = WorkerReport::default();

    let loader = Arc::clone(&shared.loader);
    let loaded = tokio::task::spawn_blocking(move || loader.load()).await;
    let mut classifier = match loaded {
        Ok(Ok(classifier)) => classifier,
        Ok(Err(e)) => {
            tracing::error!("Worker {}: {}", worker, e);
            return report;
        }
        Err(e) => {
            tracing::error!("Worker {}: model load panicked: {}", worker, e);
            return report;
        }
    };
    report.model_loaded = true;
    tracing::debug!("Worker {} ready", worker);

    loop {
        if shared.cancel.is_cancelled() {
            tracing::debug!("Worker {} stopping on cancellation", worker);
            break;
        }

        let Some(locator) = shared.claim() else {
            break;
        };

        let bytes = match shared.source.fetch_segment(&locator).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Skipping segment {}: {}", locator, e);
                report.segments_skipped += 1;
                continue;
            }
        };

        let criteria = shared.criteria.clone();
        let sink = Arc::clone(&shared.sink);
        let handled = tokio::task::spawn_blocking(move || {
            let outcome = process_segment(classifier.as_ref(), &criteria, sink.as_ref(), bytes);
            (classifier, outcome)
        })
        .await;

        let outcome = match handled {
            Ok((returned, outcome)) => {
                classifier = returned;
                outcome
            }
            Err(e) => {
                // The classifier went down with the task
                tracing::error!("Worker {}: segment {} panicked: {}", worker, locator, e);
                report.segments_skipped += 1;
                break;
            }
        };

        report.records_accepted += outcome.accepted;
        report.records_rejected += outcome.rejected;
        report.write_failures += outcome.write_failures;

        match outcome.error {
            Some(e) => {
                tracing::warn!(
                    "Skipping rest of segment {} after {} records: {}",
                    locator,
                    outcome.accepted + outcome.rejected,
                    e
                );
                report.segments_skipped += 1;
            }
            None => {
                tracing::info!(
                    "Segment {}: {} accepted, {} rejected",
                    locator,
                    outcome.accepted,
                    outcome.rejected
                );
                report.segments_processed += 1;
            }
        }
    }

    report
}

/// Worker pool driving segment sources, classifiers and the record sink
pub struct ClassificationPipeline {
    loader: Arc<dyn ClassifierLoader>,
    source: Arc<dyn SegmentSource>,
    sink: Arc<dyn RecordSink>,
    criteria: AcceptCriteria,
    workers: usize,
    cancel: CancellationToken,
}

impl ClassificationPipeline {
    /// Creates a single-worker pipeline; see [`with_workers`](Self::with_workers)
    pub fn new(
        loader: Arc<dyn ClassifierLoader>,
        source: Arc<dyn SegmentSource>,
        sink: Arc<dyn RecordSink>,
        criteria: AcceptCriteria,
    ) -> Self {
        Self {
            loader,
            source,
            sink,
            criteria,
            workers: 1,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Uses an externally owned token; workers check it between segments
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Processes every locator and returns the run's counts
    ///
    /// Never fails as a whole: per-segment, per-record and per-worker
    /// problems are all reflected in the summary.
    pub async fn run(&self, locators: Vec<String>) -> PipelineSummary {
        let mut summary = PipelineSummary {
            segments_total: locators.len(),
            ..Default::default()
        };

        if locators.is_empty() {
            tracing::info!("No segments to process");
            return summary;
        }

        let workers = self.workers.min(locators.len());
        let shared = Arc::new(Shared {
            loader: Arc::clone(&self.loader),
            source: Arc::clone(&self.source),
            sink: Arc::clone(&self.sink),
            criteria: self.criteria.clone(),
            queue: Mutex::new(locators.into()),
            cancel: self.cancel.clone(),
        });

        tracing::info!(
            "Classifying {} segments with {} workers (target {}, threshold {})",
            summary.segments_total,
            workers,
            self.criteria.target_label,
            self.criteria.threshold
        );

        let mut pool = JoinSet::new();
        for worker in 0..workers {
            pool.spawn(run_worker(worker, Arc::clone(&shared)));
        }
        summary.workers_started = workers;

        while let Some(joined) = pool.join_next().await {
            match joined {
                Ok(report) => summary.absorb(&report),
                Err(e) => {
                    tracing::error!("Worker task failed: {}", e);
                    summary.workers_failed += 1;
                }
            }
        }

        summary.segments_unprocessed = shared.remaining();
        if summary.segments_unprocessed > 0 {
            tracing::warn!(
                "{} segments were not processed",
                summary.segments_unprocessed
            );
        }

        tracing::info!(
            "Classification finished: {} processed, {} skipped, {} accepted, {} rejected",
            summary.segments_processed,
            summary.segments_skipped,
            summary.records_accepted,
            summary.records_rejected
        );

        summary
    }
}
