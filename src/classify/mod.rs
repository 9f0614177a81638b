//! Language classification of archived text
//!
//! This module contains:
//! - The classifier contract, fastText models (`fasttext` feature) and the
//!   bundled character n-gram model
//! - The per-record accept/reject decision
//! - The worker-pool pipeline that runs over archive segments

#[cfg(feature = "fasttext")]
mod lid;
mod model;
mod pipeline;

#[cfg(feature = "fasttext")]
pub use lid::FastTextModel;
pub use model::{
    prepare_text, ClassifierLoader, ClassifyError, LanguageClassifier, ModelFormat, ModelLoader,
    NgramModel, Prediction, PREDICTION_WINDOW,
};
pub use pipeline::{
    decide, AcceptCriteria, ClassificationPipeline, Decision, PipelineSummary, Rejection,
};

use crate::archive::{read_locators, HttpSegmentSource, LocalSegmentSource, SegmentSource};
use crate::config::Config;
use crate::output::RecordDir;
use crate::{ConfigError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs the classification pipeline described by the configuration
///
/// Locators come from `paths_file` (plain or `.gz`). Segments are read from
/// `local_dir` when given, otherwise downloaded from the archive host.
/// Accepted records land in the configured records directory.
pub async fn run_classification(
    config: &Config,
    local_dir: Option<PathBuf>,
    cancel: CancellationToken,
) -> Result<PipelineSummary> {
    let classifier = config
        .classifier
        .as_ref()
        .ok_or(ConfigError::MissingSection("classifier"))?;

    let locators = read_locators(Path::new(&classifier.paths_file))?;
    tracing::info!("{} segments need to be processed", locators.len());

    let source: Arc<dyn SegmentSource> = match local_dir {
        Some(dir) => {
            tracing::info!("Reading segments from {}", dir.display());
            Arc::new(LocalSegmentSource::new(dir))
        }
        None => Arc::new(HttpSegmentSource::from_config(
            classifier,
            &config.fetch,
            &config.user_agent,
        )?),
    };

    let sink = Arc::new(RecordDir::create(&config.output.records_dir)?);
    let loader = Arc::new(ModelLoader::new(&classifier.model_path));

    let pipeline = ClassificationPipeline::new(
        loader,
        source,
        sink,
        AcceptCriteria {
            target_label: classifier.target_label.clone(),
            threshold: classifier.threshold,
        },
    )
    .with_workers(classifier.effective_worker_count())
    .with_cancellation(cancel);

    Ok(pipeline.run(locators).await)
}
