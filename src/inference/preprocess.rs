//! Image decoding and normalization into the model's input tensor.

use image::imageops::{self, FilterType};
use image::RgbImage;
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, instrument};

use super::tensor::{Tensor, CHANNELS, IMAGE_SIZE, PLANE_LEN, TENSOR_LEN};
use crate::error::{DecodeError, TensorError};

/// Per-channel ImageNet mean (R, G, B).
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// Per-channel ImageNet standard deviation (R, G, B).
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Turns encoded image bytes into a normalized `(1, 3, 224, 224)` tensor.
///
/// The image is converted to RGB (alpha dropped) and stretched to 224x224
/// with bilinear filtering. There is no letterboxing or cropping, so the
/// aspect ratio is not kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Decodes, resizes and normalizes an image.
    ///
    /// # Arguments
    ///
    /// * `bytes` - Encoded image in any format the `image` crate can detect
    ///
    /// # Errors
    ///
    /// Returns `DecodeError` for empty input, unknown formats or corrupt data.
    #[instrument(level = "debug", skip_all, fields(input_bytes = bytes.len()))]
    pub fn to_tensor(&self, bytes: &[u8]) -> Result<Tensor, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }

        let start = Instant::now();
        let decoded = image::load_from_memory(bytes)?;
        debug!(
            width = decoded.width(),
            height = decoded.height(),
            "Decoded image"
        );

        let rgb = decoded.to_rgb8();
        let resized = resize_exact(&rgb);
        let tensor = normalize(&resized)?;

        debug!(elapsed_ms = start.elapsed().as_secs_f64() * 1000.0, "Preprocessing finished");
        Ok(tensor)
    }
}

/// Stretches an RGB image to the model's input size.
fn resize_exact(rgb: &RgbImage) -> RgbImage {
    let side = IMAGE_SIZE as u32;
    imageops::resize(rgb, side, side, FilterType::Triangle)
}

/// Normalizes a 224x224 RGB image into planar channel-major order.
///
/// Each plane is filled independently, so the three channels are written in
/// parallel.
pub fn normalize(rgb: &RgbImage) -> Result<Tensor, DecodeError> {
    let raw = rgb.as_raw();
    if raw.len() != TENSOR_LEN {
        return Err(TensorError::Length {
            expected: TENSOR_LEN,
            actual: raw.len(),
        }
        .into());
    }

    let mut values = vec![0.0f32; TENSOR_LEN];
    values
        .par_chunks_mut(PLANE_LEN)
        .enumerate()
        .for_each(|(channel, plane)| {
            let mean = MEAN[channel];
            let std = STD[channel];
            for (dst, px) in plane.iter_mut().zip(raw.chunks_exact(CHANNELS)) {
                *dst = (px[channel] as f32 / 255.0 - mean) / std;
            }
        });

    Ok(Tensor::from_planar(values)?)
}
