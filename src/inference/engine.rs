use std::time::Instant;
use tracing::{debug, instrument};

use super::model::ModelHandle;
use super::tensor::{Logits, Tensor};
use crate::error::InferenceError;

/// Runs the loaded model on a prepared tensor.
///
/// The engine never assumes tensor names. It asks the model for its declared
/// interface, requires exactly one input and one output, and binds to those
/// names, so a re-exported model with different I/O names keeps working.
#[derive(Debug, Clone, Copy, Default)]
pub struct InferenceEngine;

impl InferenceEngine {
    pub fn new() -> Self {
        Self
    }

    /// Executes `model` on `tensor` and returns the per-class logits.
    ///
    /// # Errors
    ///
    /// * `InferenceError::Interface` if the model does not declare exactly one
    ///   input and one output
    /// * `InferenceError::Runtime` if execution fails
    /// * `InferenceError::Output` if the output is not 7 finite values
    #[instrument(level = "debug", skip_all)]
    pub fn run(&self, model: &ModelHandle, tensor: &Tensor) -> Result<Logits, InferenceError> {
        let (input_name, output_name) = match (model.inputs(), model.outputs()) {
            ([input], [output]) => (input.name.as_str(), output.name.as_str()),
            (inputs, outputs) => {
                return Err(InferenceError::Interface {
                    inputs: inputs.len(),
                    outputs: outputs.len(),
                })
            }
        };

        let start = Instant::now();
        let raw = model
            .compiled()
            .run(input_name, output_name, tensor.view())
            .map_err(InferenceError::Runtime)?;
        debug!(
            input_name,
            output_name,
            values = raw.len(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Inference finished"
        );

        Ok(Logits::try_from(raw)?)
    }
}
