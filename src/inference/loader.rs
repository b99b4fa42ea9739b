//! Lazy, exactly-once-at-a-time loading of the shared model.

use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument};

use super::backend::Backend;
use super::model::ModelHandle;
use crate::error::ModelLoadError;
use crate::resources::ResourceProvider;

/// Owns the lazily loaded model and coordinates concurrent first access.
///
/// The first caller of [`ModelLoader::get_model`] loads the model. Callers
/// that arrive while a load is running park until it finishes, then either
/// take the installed handle or, if the load failed, one of them becomes the
/// next loader. Failures are never cached, so a flaky resource fetch does not
/// wedge the service. Once installed, the handle is read without locking.
pub struct ModelLoader {
    provider: Arc<dyn ResourceProvider>,
    backend: Arc<dyn Backend>,
    model: OnceCell<ModelHandle>,
    attempts: AtomicUsize,
}

impl ModelLoader {
    /// Creates a loader that fetches model bytes from `provider` and
    /// deserializes them with `backend`. Nothing is loaded until the first
    /// call to `get_model`.
    pub fn new(provider: Arc<dyn ResourceProvider>, backend: Arc<dyn Backend>) -> Self {
        Self {
            provider,
            backend,
            model: OnceCell::new(),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Returns the shared model, loading it if nobody has yet.
    ///
    /// Blocks while another thread is loading. If that load fails, this call
    /// may run the next attempt itself.
    ///
    /// # Errors
    ///
    /// Returns `ModelLoadError` when fetching the bytes or deserializing the
    /// model fails on the attempt this caller ran.
    pub fn get_model(&self) -> Result<ModelHandle, ModelLoadError> {
        if let Some(model) = self.model.get() {
            return Ok(model.clone());
        }
        self.model.get_or_try_init(|| self.load()).cloned()
    }

    /// Whether a model has been installed.
    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    /// The installed model, without triggering a load.
    pub fn current(&self) -> Option<ModelHandle> {
        self.model.get().cloned()
    }

    /// Number of load attempts started so far, failed ones included.
    pub fn load_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    #[instrument(level = "info", skip(self), fields(provider = %self.provider.describe()))]
    fn load(&self) -> Result<ModelHandle, ModelLoadError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        info!(attempt, "Loading classification model");
        let start = Instant::now();

        let bytes = self.provider.model_bytes().map_err(|e| {
            error!(attempt, error = %e, "Failed to fetch model bytes");
            ModelLoadError::from(e)
        })?;

        let compiled = self.backend.load(&bytes).map_err(|e| {
            error!(attempt, error = %e, "Failed to deserialize model");
            ModelLoadError::Deserialize(e)
        })?;

        let handle = ModelHandle::new(compiled, bytes.len());
        info!(
            attempt,
            size_bytes = handle.size_bytes(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Model loaded"
        );
        Ok(handle)
    }
}

impl std::fmt::Debug for ModelLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelLoader")
            .field("provider", &self.provider.describe())
            .field("backend", &self.backend)
            .field("loaded", &self.is_loaded())
            .field("attempts", &self.load_attempts())
            .finish()
    }
}
