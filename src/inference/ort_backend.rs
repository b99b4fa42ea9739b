use ndarray::ArrayView4;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, info};

use super::backend::{Backend, CompiledModel, TensorSpec};
use crate::error::BoxError;

/// ONNX Runtime backend.
///
/// A session needs exclusive access while it runs, so each loaded model owns
/// `pool_size` sessions built from the same bytes and hands them out
/// round-robin. Concurrent requests only queue once every session is busy.
#[derive(Debug, Clone)]
pub struct OrtBackend {
    pool_size: usize,
    intra_threads: usize,
}

impl OrtBackend {
    pub fn new(pool_size: usize, intra_threads: usize) -> Self {
        Self {
            pool_size: pool_size.max(1),
            intra_threads: intra_threads.max(1),
        }
    }

    fn build_session(&self, model_bytes: &[u8]) -> Result<Session, BoxError> {
        let session = Session::builder()
            .map_err(|e| format!("Failed to create session builder: {e}"))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| format!("Failed to set optimization level: {e}"))?
            .with_intra_threads(self.intra_threads)
            .map_err(|e| format!("Failed to set intra-thread count: {e}"))?
            .commit_from_memory(model_bytes)
            .map_err(|e| format!("Failed to build session from model bytes: {e}"))?;
        Ok(session)
    }
}

impl Backend for OrtBackend {
    fn load(&self, model_bytes: &[u8]) -> Result<Box<dyn CompiledModel>, BoxError> {
        let start = Instant::now();
        let mut sessions = Vec::with_capacity(self.pool_size);
        for _ in 0..self.pool_size {
            sessions.push(Mutex::new(self.build_session(model_bytes)?));
        }

        // Every session comes from the same bytes, so the first one speaks for all.
        let (inputs, outputs) = {
            let first = lock_session(&sessions[0]);
            let inputs: Vec<TensorSpec> =
                first.inputs.iter().map(|i| TensorSpec::new(i.name.clone())).collect();
            let outputs: Vec<TensorSpec> =
                first.outputs.iter().map(|o| TensorSpec::new(o.name.clone())).collect();
            (inputs, outputs)
        };

        info!(
            sessions = sessions.len(),
            intra_threads = self.intra_threads,
            inputs = ?inputs.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            outputs = ?outputs.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "ONNX Runtime sessions created"
        );

        Ok(Box::new(OrtModel {
            sessions,
            next_idx: AtomicUsize::new(0),
            inputs,
            outputs,
        }))
    }
}

/// A pool of ONNX Runtime sessions for one model.
struct OrtModel {
    sessions: Vec<Mutex<Session>>,
    next_idx: AtomicUsize,
    inputs: Vec<TensorSpec>,
    outputs: Vec<TensorSpec>,
}

impl CompiledModel for OrtModel {
    fn inputs(&self) -> &[TensorSpec] {
        &self.inputs
    }

    fn outputs(&self) -> &[TensorSpec] {
        &self.outputs
    }

    fn run(
        &self,
        input_name: &str,
        output_name: &str,
        input: ArrayView4<'_, f32>,
    ) -> Result<Vec<f32>, BoxError> {
        let input_shape = input.shape().to_vec();
        let input_tensor = TensorRef::from_array_view(input).map_err(|e| {
            format!("Failed to convert input tensor with shape {:?}: {e}", input_shape)
        })?;

        let idx = self.next_idx.fetch_add(1, Ordering::Relaxed) % self.sessions.len();
        let mut session = lock_session(&self.sessions[idx]);
        debug!(session = idx, input_name, output_name, "Running ONNX session");

        let outputs = session
            .run(ort::inputs![input_name => input_tensor])
            .map_err(|e| {
                format!(
                    "ONNX Runtime inference failed with input '{}' -> output '{}': {e}",
                    input_name, output_name
                )
            })?;

        let output = outputs
            .get(output_name)
            .ok_or_else(|| format!("Output '{}' not found", output_name))?;
        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| format!("Failed to extract output tensor '{}' as f32: {e}", output_name))?;

        Ok(data.to_vec())
    }
}

/// Locks a pooled session.
///
/// A panic during a previous run poisons the mutex but leaves the session
/// itself usable, so the poison is cleared instead of taking the slot out of
/// rotation.
fn lock_session<T>(session: &Mutex<T>) -> MutexGuard<'_, T> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_invalid_model_bytes_fail_to_load() {
        let backend = OrtBackend::new(1, 1);
        assert!(backend.load(b"not onnx").is_err());
    }

    #[test]
    fn test_pool_settings_never_zero() {
        let backend = OrtBackend::new(0, 0);
        assert_eq!(backend.pool_size, 1);
        assert_eq!(backend.intra_threads, 1);
    }

    #[test]
    fn test_poisoned_slot_stays_usable() {
        let slot = Arc::new(Mutex::new(41u32));
        let poisoner = Arc::clone(&slot);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("run panicked");
        })
        .join();
        assert!(slot.is_poisoned());

        *lock_session(&slot) += 1;
        assert_eq!(*lock_session(&slot), 42);
    }
}
