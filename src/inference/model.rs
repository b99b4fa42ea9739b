use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

use super::backend::{CompiledModel, TensorSpec};

/// Represents the loaded classification model.
///
/// Cloning is cheap and every clone points at the same loaded model; use
/// [`ModelHandle::ptr_eq`] to check identity. The model is never mutated
/// after construction.
#[derive(Clone)]
pub struct ModelHandle {
    inner: Arc<LoadedModel>,
}

struct LoadedModel {
    /// Executable model produced by the backend
    compiled: Box<dyn CompiledModel>,
    /// Size of the serialized model the handle was built from
    size_bytes: usize,
    /// When the model was loaded
    loaded_at: DateTime<Utc>,
}

impl ModelHandle {
    pub fn new(compiled: Box<dyn CompiledModel>, size_bytes: usize) -> Self {
        Self {
            inner: Arc::new(LoadedModel {
                compiled,
                size_bytes,
                loaded_at: Utc::now(),
            }),
        }
    }

    /// Get a reference to the executable model
    pub fn compiled(&self) -> &dyn CompiledModel {
        self.inner.compiled.as_ref()
    }

    pub fn inputs(&self) -> &[TensorSpec] {
        self.inner.compiled.inputs()
    }

    pub fn outputs(&self) -> &[TensorSpec] {
        self.inner.compiled.outputs()
    }

    pub fn size_bytes(&self) -> usize {
        self.inner.size_bytes
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.inner.loaded_at
    }

    /// Returns true if both handles refer to the same loaded model.
    pub fn ptr_eq(&self, other: &ModelHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("inputs", &self.inputs())
            .field("outputs", &self.outputs())
            .field("size_bytes", &self.inner.size_bytes)
            .field("loaded_at", &self.inner.loaded_at)
            .finish()
    }
}
