//! Language classifier contract and the bundled n-gram model
//!
//! A classifier is loaded once per worker through a [`ClassifierLoader`] and
//! then used for every record that worker handles. Prediction is a pure
//! function of the loaded model and the input text.

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Number of characters of prepared text the classifier looks at
pub const PREDICTION_WINDOW: usize = 500;

/// Errors raised by classifiers
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Failed to load model from {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("Prediction failed: {0}")]
    Predict(String),
}

/// Most likely label for a text and the model's confidence in it
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub confidence: f32,
}

/// A loaded language model
pub trait LanguageClassifier: Send {
    /// Predicts the label of already prepared text (see [`prepare_text`])
    fn predict(&self, text: &str) -> Result<Prediction, ClassifyError>;
}

/// Produces classifier instances, one per worker
pub trait ClassifierLoader: Send + Sync {
    fn load(&self) -> Result<Box<dyn LanguageClassifier>, ClassifyError>;
}

/// Normalizes text the same way for every prediction
///
/// Surrounding whitespace is trimmed, newlines become spaces and the result
/// is cut to the first [`PREDICTION_WINDOW`] characters.
pub fn prepare_text(text: &str) -> String {
    text.trim()
        .replace('\n', " ")
        .chars()
        .take(PREDICTION_WINDOW)
        .collect()
}

fn default_ngram() -> usize {
    3
}

fn default_floor() -> f64 {
    -15.0
}

/// On-disk model layout
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ModelFile {
    #[serde(default = "default_ngram")]
    ngram: usize,

    /// Log-probability used for n-grams a label has never seen
    #[serde(default = "default_floor")]
    unknown_log_prob: f64,

    /// label -> (n-gram -> log-probability)
    labels: BTreeMap<String, HashMap<String, f64>>,
}

/// Character n-gram naive Bayes language model
///
/// The model file is JSON:
///
/// ```json
/// { "ngram": 3, "unknown-log-prob": -15.0,
///   "labels": { "__label__mn": { " са": -4.1, "сай": -3.2 },
///               "__label__en": { " th": -3.0, "the": -2.8 } } }
/// ```
///
/// Each label's score is the sum of the log-probabilities of the text's
/// character n-grams (lowercased, padded with one space on each side).
/// Confidence is the softmax of the scores, so labels compete with equal
/// priors.
#[derive(Debug, Clone)]
pub struct NgramModel {
    ngram: usize,
    unknown_log_prob: f64,
    labels: BTreeMap<String, HashMap<String, f64>>,
}

impl NgramModel {
    /// Loads a model from a JSON file
    pub fn load(path: &Path) -> Result<Self, ClassifyError> {
        let load_error = |reason: String| ClassifyError::Load {
            path: path.display().to_string(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        Self::from_json(&content).map_err(|e| match e {
            ClassifyError::Load { reason, .. } => load_error(reason),
            other => other,
        })
    }

    /// Parses a model from its JSON text
    pub fn from_json(json: &str) -> Result<Self, ClassifyError> {
        let invalid = |reason: String| ClassifyError::Load {
            path: "<inline>".to_string(),
            reason,
        };

        let file: ModelFile = serde_json::from_str(json).map_err(|e| invalid(e.to_string()))?;

        if file.ngram == 0 {
            return Err(invalid("ngram must be at least 1".to_string()));
        }
        if file.labels.is_empty() {
            return Err(invalid("model defines no labels".to_string()));
        }

        Ok(Self {
            ngram: file.ngram,
            unknown_log_prob: file.unknown_log_prob,
            labels: file.labels,
        })
    }

    fn grams(&self, text: &str) -> Vec<String> {
        let padded: Vec<char> = std::iter::once(' ')
            .chain(text.to_lowercase().chars())
            .chain(std::iter::once(' '))
            .collect();

        if padded.len() <= self.ngram {
            return vec![padded.into_iter().collect()];
        }

        padded
            .windows(self.ngram)
            .map(|window| window.iter().collect())
            .collect()
    }
}

impl LanguageClassifier for NgramModel {
    fn predict(&self, text: &str) -> Result<Prediction, ClassifyError> {
        if text.trim().is_empty() {
            return Err(ClassifyError::Predict("empty input".to_string()));
        }

        let grams = self.grams(text);

        // BTreeMap order keeps ties deterministic
        let scores: Vec<(&str, f64)> = self
            .labels
            .iter()
            .map(|(label, table)| {
                let score = grams
                    .iter()
                    .map(|g| table.get(g).copied().unwrap_or(self.unknown_log_prob))
                    .sum::<f64>();
                (label.as_str(), score)
            })
            .collect();

        let (best_label, best_score) = scores
            .iter()
            .copied()
            .fold(None::<(&str, f64)>, |best, candidate| match best {
                Some(b) if b.1 >= candidate.1 => Some(b),
                _ => Some(candidate),
            })
            .ok_or_else(|| ClassifyError::Predict("model has no labels".to_string()))?;

        let normalizer: f64 = scores
            .iter()
            .map(|(_, score)| (score - best_score).exp())
            .sum();

        Ok(Prediction {
            label: best_label.to_string(),
            confidence: (1.0 / normalizer) as f32,
        })
    }
}

/// On-disk model formats understood by [`ModelLoader`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    /// fastText binary model (`.ftz`, `.bin`)
    FastText,

    /// [`NgramModel`] JSON
    Ngram,
}

impl ModelFormat {
    /// Picks the format from the file extension
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("ftz") | Some("bin") => Self::FastText,
            _ => Self::Ngram,
        }
    }
}

/// Loads the model at a fixed path for every worker
#[derive(Debug, Clone)]
pub struct ModelLoader {
    path: PathBuf,
}

impl ModelLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn format(&self) -> ModelFormat {
        ModelFormat::from_path(&self.path)
    }
}

impl ClassifierLoader for ModelLoader {
    fn load(&self) -> Result<Box<dyn LanguageClassifier>, ClassifyError> {
        let model: Box<dyn LanguageClassifier> = match self.format() {
            ModelFormat::FastText => load_fasttext(&self.path)?,
            ModelFormat::Ngram => Box::new(NgramModel::load(&self.path)?),
        };
        tracing::debug!(
            "Loaded {:?} model from {}",
            self.format(),
            self.path.display()
        );
        Ok(model)
    }
}

#[cfg(feature = "fasttext")]
fn load_fasttext(path: &Path) -> Result<Box<dyn LanguageClassifier>, ClassifyError> {
    Ok(Box::new(crate::classify::lid::FastTextModel::load(path)?))
}

#[cfg(not(feature = "fasttext"))]
fn load_fasttext(path: &Path) -> Result<Box<dyn LanguageClassifier>, ClassifyError> {
    Err(ClassifyError::Load {
        path: path.display().to_string(),
        reason: "fastText models need a build with the `fasttext` feature".to_string(),
    })
}
