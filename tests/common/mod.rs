#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use ndarray::{ArrayView4, Axis};

use stoolai::error::BoxError;
use stoolai::inference::{Backend, CompiledModel, ModelLoader, TensorSpec};
use stoolai::resources::MemoryResourceProvider;
use stoolai::Classifier;

/// In-process stand-in for the ONNX backend.
///
/// Counts loads, can fail the first `fail_first` loads, and can sleep inside
/// `load` to widen race windows.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    loads: AtomicUsize,
    fail_first: usize,
    delay: Duration,
    panic_on_run: bool,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic_on_run = true;
        self
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl Backend for ScriptedBackend {
    fn load(&self, model_bytes: &[u8]) -> Result<Box<dyn CompiledModel>, BoxError> {
        let n = self.loads.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if n <= self.fail_first {
            return Err(format!("scripted failure {} of {}", n, self.fail_first).into());
        }
        if model_bytes.is_empty() {
            return Err("no model bytes".into());
        }
        Ok(Box::new(ScriptedModel {
            inputs: vec![TensorSpec::new("image")],
            outputs: vec![TensorSpec::new("logits")],
            panic_on_run: self.panic_on_run,
        }))
    }
}

/// Produces logits from the per-channel means of the input, so equal pixel
/// content always maps to equal logits.
struct ScriptedModel {
    inputs: Vec<TensorSpec>,
    outputs: Vec<TensorSpec>,
    panic_on_run: bool,
}

impl CompiledModel for ScriptedModel {
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
        if self.panic_on_run {
            panic!("scripted panic");
        }
        if input_name != "image" || output_name != "logits" {
            return Err(format!("unexpected binding {input_name} -> {output_name}").into());
        }
        if input.shape() != [1, 3, 224, 224] {
            return Err(format!("unexpected shape {:?}", input.shape()).into());
        }

        let means: Vec<f32> = input
            .index_axis(Axis(0), 0)
            .outer_iter()
            .map(|plane| plane.mean().unwrap_or(0.0))
            .collect();
        let (r, g, b) = (means[0], means[1], means[2]);
        Ok(vec![r, g, b, -r, -g, -b, (r + g + b) / 3.0].into_iter().map(|v| v * 3.0).collect())
    }
}

pub fn memory_loader(backend: Arc<ScriptedBackend>) -> Arc<ModelLoader> {
    let provider = Arc::new(MemoryResourceProvider::new(b"scripted-model".to_vec()));
    Arc::new(ModelLoader::new(provider, backend))
}

pub fn classifier(backend: Arc<ScriptedBackend>) -> Classifier {
    Classifier::new(memory_loader(backend))
}

fn encode(image: RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), format)
        .unwrap();
    bytes
}

pub fn solid_png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    encode(RgbImage::from_pixel(width, height, Rgb(rgb)), ImageFormat::Png)
}

pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
        ])
    });
    encode(image, ImageFormat::Png)
}

pub fn gradient_jpeg(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    encode(image, ImageFormat::Jpeg)
}
