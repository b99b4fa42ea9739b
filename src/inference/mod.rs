//! # Inference Module
//!
//! Everything between encoded image bytes and raw model scores.
//!
//! ## Key Components
//!
//! - `ModelLoader`: loads the shared model on first use and coordinates
//!   concurrent callers
//! - `Preprocessor`: decodes an image into a normalized `(1, 3, 224, 224)` tensor
//! - `InferenceEngine`: runs the model through its declared single input and
//!   single output
//! - `Backend` / `CompiledModel`: the seam to the model runtime, implemented
//!   for ONNX Runtime by `OrtBackend`

pub mod backend;
pub mod engine;
pub mod loader;
pub mod model;
pub mod ort_backend;
pub mod preprocess;
pub mod tensor;

pub use backend::{create_backend, Backend, CompiledModel, TensorSpec};
pub use engine::InferenceEngine;
pub use loader::ModelLoader;
pub use model::ModelHandle;
pub use ort_backend::OrtBackend;
pub use preprocess::Preprocessor;
pub use tensor::{Logits, Tensor, IMAGE_SIZE, NUM_CLASSES, TENSOR_LEN};
