//! # Classifier
//!
//! Ties the pipeline together: validate, preprocess, fetch the shared model,
//! run inference, apply the decision rule. Every failure ends up as a
//! `ClassificationResult::Error`; nothing propagates to the caller.

pub mod decision;
pub mod result;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::error::{ClassifyError, ValidationError};
use crate::inference::{InferenceEngine, ModelLoader, Preprocessor};

pub use decision::{argmax, decide, softmax, Decision, CLASS_LABELS};
pub use result::ClassificationResult;

/// Orchestrates preprocessing, model access and inference for one image.
pub struct Classifier {
    preprocessor: Preprocessor,
    loader: Arc<ModelLoader>,
    engine: InferenceEngine,
}

impl Classifier {
    /// Creates a classifier backed by the shared model loader.
    pub fn new(loader: Arc<ModelLoader>) -> Self {
        Self {
            preprocessor: Preprocessor::new(),
            loader,
            engine: InferenceEngine::new(),
        }
    }

    /// The loader this classifier pulls the model from.
    pub fn loader(&self) -> &Arc<ModelLoader> {
        &self.loader
    }

    /// Classifies one encoded image.
    ///
    /// Empty input is rejected before any other component runs. Failures in
    /// any later stage are logged and reported as
    /// `"Classification failed: <reason>"`.
    #[instrument(level = "info", skip_all, fields(input_bytes = image_bytes.len()))]
    pub fn classify(&self, image_bytes: &[u8]) -> ClassificationResult {
        let start = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_pipeline(image_bytes)));

        match outcome {
            Ok(Ok(decision)) => {
                info!(
                    label = decision.label,
                    confidence = decision.confidence,
                    elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Classification succeeded"
                );
                decision.into()
            }
            Ok(Err(ClassifyError::Validation(e))) => {
                warn!("Rejected request: {}", e);
                ClassificationResult::error(e.to_string())
            }
            Ok(Err(e)) => {
                error!(stage = e.stage(), error = %e, "Classification failed");
                ClassificationResult::error(format!("Classification failed: {}", e))
            }
            Err(_) => {
                error!("Classification pipeline panicked");
                ClassificationResult::error("Classification failed: internal error")
            }
        }
    }

    /// Runs the pipeline and keeps the typed error, for callers that want
    /// more than the flattened result.
    pub fn run_pipeline(&self, image_bytes: &[u8]) -> Result<Decision, ClassifyError> {
        if image_bytes.is_empty() {
            return Err(ValidationError::EmptyInput.into());
        }

        let tensor = self.preprocessor.to_tensor(image_bytes)?;
        let model = self.loader.get_model()?;
        let logits = self.engine.run(&model, &tensor)?;
        Ok(decide(&logits))
    }
}
