use ndarray::ArrayView4;
use std::fmt::Debug;
use std::sync::Arc;

use super::ort_backend::OrtBackend;
use crate::config::InferenceConfig;
use crate::error::BoxError;

/// A named tensor slot declared by a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorSpec {
    pub name: String,
}

impl TensorSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A model deserialized by a backend and ready to execute.
///
/// Implementations must be safe to call from many threads at once; any
/// per-call exclusivity the runtime needs is handled inside `run`.
pub trait CompiledModel: Send + Sync {
    /// Inputs the model declares, in declaration order.
    fn inputs(&self) -> &[TensorSpec];

    /// Outputs the model declares, in declaration order.
    fn outputs(&self) -> &[TensorSpec];

    /// Executes the model with `input` bound to `input_name` and returns the
    /// flattened `f32` values of `output_name`.
    fn run(
        &self,
        input_name: &str,
        output_name: &str,
        input: ArrayView4<'_, f32>,
    ) -> Result<Vec<f32>, BoxError>;
}

/// A trait for model runtimes that turn serialized model bytes into an
/// executable model.
pub trait Backend: Send + Sync + Debug {
    /// Deserializes `model_bytes` into an executable model.
    fn load(&self, model_bytes: &[u8]) -> Result<Box<dyn CompiledModel>, BoxError>;
}

/// Creates the ONNX Runtime backend configured from settings.
pub fn create_backend(config: &InferenceConfig) -> Arc<dyn Backend> {
    Arc::new(OrtBackend::new(config.session_pool_size, config.intra_threads))
}
