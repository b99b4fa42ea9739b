//! Error types shared across the classification pipeline.
//!
//! Each pipeline stage has its own error enum so callers can tell which stage
//! failed. `ClassifyError` is the umbrella the classifier works with before it
//! turns a failure into a `ClassificationResult::Error`.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed error used at the backend seams, same shape the rest of the crate
/// propagates with `?`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Message returned when a request carries no image bytes.
pub const EMPTY_INPUT_MESSAGE: &str = "No image file provided or file is empty.";

/// Input rejected before any pipeline stage ran.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{}", EMPTY_INPUT_MESSAGE)]
    EmptyInput,
}

/// The image bytes could not be turned into pixels.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("image buffer is empty")]
    Empty,
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Tensor(#[from] TensorError),
}

/// A tensor or logits buffer violated its fixed-shape contract.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TensorError {
    #[error("expected {expected} values, got {actual}")]
    Length { expected: usize, actual: usize },
    #[error("value at index {index} is not finite: {value}")]
    NonFinite { index: usize, value: f32 },
}

/// Fetching or deserializing the model failed.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("failed to fetch model resource: {0}")]
    Resource(#[from] ResourceError),
    #[error("Failed to load ONNX model: {0}")]
    Deserialize(#[source] BoxError),
}

/// Running the loaded model failed.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error(
        "model must declare exactly one input and one output, \
         found {inputs} input(s) and {outputs} output(s)"
    )]
    Interface { inputs: usize, outputs: usize },
    #[error("model execution failed: {0}")]
    Runtime(#[source] BoxError),
    #[error("unexpected model output: {0}")]
    Output(#[from] TensorError),
}

/// Resource provider and resource registry failures.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("resource '{0}' is not registered")]
    Unknown(String),
    #[error("resource not found at {}", .0.display())]
    NotFound(PathBuf),
    #[error("resource at {} is empty", .0.display())]
    Empty(PathBuf),
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("resource store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("resource store returned {status} for {resource}")]
    Store { status: u16, resource: String },
    #[error(
        "resource mapping integrity check failed:\n{}",
        format_mapping_errors(.missing, .unmapped)
    )]
    Mapping {
        missing: Vec<String>,
        unmapped: Vec<String>,
    },
}

fn format_mapping_errors(missing: &[String], unmapped: &[String]) -> String {
    let mut lines = Vec::with_capacity(missing.len() + unmapped.len());
    lines.extend(missing.iter().map(|m| format!("missing resource: {}", m)));
    lines.extend(unmapped.iter().map(|u| format!("unmapped file: {}", u)));
    lines.join("\n")
}

/// Any failure the classifier can hit while running the pipeline.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    ModelLoad(#[from] ModelLoadError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl ClassifyError {
    /// Short stage name used in log fields.
    pub fn stage(&self) -> &'static str {
        match self {
            ClassifyError::Validation(_) => "validation",
            ClassifyError::Decode(_) => "preprocess",
            ClassifyError::ModelLoad(_) => "model_load",
            ClassifyError::Inference(_) => "inference",
        }
    }
}
