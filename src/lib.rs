//! Stool image classification service.
//!
//! Decodes an uploaded photo, normalizes it into a 1x3x224x224 tensor, runs
//! it through a lazily loaded ONNX model and maps the seven logits to a
//! Bristol scale label with a softmax confidence.

pub mod classifier;
pub mod config;
pub mod error;
pub mod inference;
pub mod resources;
pub mod server;

pub use classifier::{ClassificationResult, Classifier};
pub use config::Settings;
