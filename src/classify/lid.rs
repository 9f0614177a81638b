//! fastText language identification models (`lid.176.ftz` and friends)

use crate::classify::model::{ClassifyError, LanguageClassifier, Prediction};
use ::fasttext::FastText;
use std::path::Path;

/// A loaded fastText supervised model
pub struct FastTextModel {
    inner: FastText,
}

impl FastTextModel {
    pub fn load(path: &Path) -> Result<Self, ClassifyError> {
        let load_error = |reason: String| ClassifyError::Load {
            path: path.display().to_string(),
            reason,
        };

        let file = path
            .to_str()
            .ok_or_else(|| load_error("path is not valid UTF-8".to_string()))?;
        if !path.is_file() {
            return Err(load_error("no such file".to_string()));
        }

        let mut inner = FastText::new();
        inner.load_model(file).map_err(load_error)?;
        Ok(Self { inner })
    }
}

impl LanguageClassifier for FastTextModel {
    fn predict(&self, text: &str) -> Result<Prediction, ClassifyError> {
        let best = self
            .inner
            .predict(text, 1, 0.0)
            .map_err(ClassifyError::Predict)?
            .into_iter()
            .next()
            .ok_or_else(|| ClassifyError::Predict("model returned no label".to_string()))?;

        Ok(Prediction {
            label: best.label,
            confidence: best.prob,
        })
    }
}
