use ndarray::{Array4, ArrayView4};
use std::fmt::{self, Debug};

use crate::error::TensorError;

/// Side length of the square model input.
pub const IMAGE_SIZE: usize = 224;
/// Number of colour channels fed to the model.
pub const CHANNELS: usize = 3;
/// Values in one channel plane.
pub const PLANE_LEN: usize = IMAGE_SIZE * IMAGE_SIZE;
/// Total number of values in an input tensor.
pub const TENSOR_LEN: usize = CHANNELS * PLANE_LEN;
/// Number of classes the model scores.
pub const NUM_CLASSES: usize = 7;

/// Model input of shape `(1, 3, 224, 224)` in planar channel-major order.
///
/// All red values come first, then green, then blue; each plane is stored in
/// row-major pixel order. The length is checked on construction and cannot
/// change afterwards.
#[derive(Clone, PartialEq)]
pub struct Tensor {
    data: Array4<f32>,
}

impl Tensor {
    /// Wraps an already-planar buffer.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::Length` if `values` does not hold exactly
    /// `3 * 224 * 224` elements.
    pub fn from_planar(values: Vec<f32>) -> Result<Self, TensorError> {
        let actual = values.len();
        let data = Array4::from_shape_vec((1, CHANNELS, IMAGE_SIZE, IMAGE_SIZE), values)
            .map_err(|_| TensorError::Length {
                expected: TENSOR_LEN,
                actual,
            })?;
        Ok(Self { data })
    }

    /// Creates a tensor filled with zeros
    pub fn zeros() -> Self {
        Self {
            data: Array4::zeros((1, CHANNELS, IMAGE_SIZE, IMAGE_SIZE)),
        }
    }

    /// Flat view over the planar values.
    pub fn as_slice(&self) -> &[f32] {
        // Built from a Vec in standard layout, so this is always contiguous.
        self.data.as_slice().unwrap_or(&[])
    }

    /// Borrowed 4D view, shape `(1, 3, 224, 224)`.
    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }

    /// Shape of the tensor
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// One channel plane (0 = red, 1 = green, 2 = blue).
    pub fn plane(&self, channel: usize) -> &[f32] {
        let start = channel * PLANE_LEN;
        &self.as_slice()[start..start + PLANE_LEN]
    }
}

impl Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tensor {{ shape: {:?}, data: truncated }}", self.data.shape())
    }
}

/// Raw per-class model scores, one per class in label order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Logits([f32; NUM_CLASSES]);

impl Logits {
    /// Builds logits from a fixed array.
    ///
    /// # Errors
    ///
    /// Fails if any value is NaN or infinite; the softmax is only defined for
    /// finite scores.
    pub fn new(values: [f32; NUM_CLASSES]) -> Result<Self, TensorError> {
        if let Some((index, &value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(TensorError::NonFinite { index, value });
        }
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

impl TryFrom<Vec<f32>> for Logits {
    type Error = TensorError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        let actual = values.len();
        let array: [f32; NUM_CLASSES] = values.try_into().map_err(|_| TensorError::Length {
            expected: NUM_CLASSES,
            actual,
        })?;
        Self::new(array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_planar_rejects_wrong_length() {
        let err = Tensor::from_planar(vec![0.0; TENSOR_LEN - 1]).unwrap_err();
        assert_eq!(
            err,
            TensorError::Length {
                expected: TENSOR_LEN,
                actual: TENSOR_LEN - 1
            }
        );

        let err = Tensor::from_planar(vec![0.0; TENSOR_LEN + 3]).unwrap_err();
        assert_eq!(
            err,
            TensorError::Length {
                expected: TENSOR_LEN,
                actual: TENSOR_LEN + 3
            }
        );
    }

    #[test]
    fn test_planar_layout_matches_view_indices() {
        let values: Vec<f32> = (0..TENSOR_LEN).map(|i| i as f32).collect();
        let tensor = Tensor::from_planar(values).unwrap();

        assert_eq!(tensor.shape(), &[1, 3, IMAGE_SIZE, IMAGE_SIZE]);
        let view = tensor.view();
        // Green channel, row 2, column 5.
        let flat = PLANE_LEN + 2 * IMAGE_SIZE + 5;
        assert_eq!(view[[0, 1, 2, 5]], flat as f32);
        assert_eq!(tensor.plane(2)[0], (2 * PLANE_LEN) as f32);
    }

    #[test]
    fn test_logits_length_and_finiteness() {
        assert!(Logits::try_from(vec![0.0; NUM_CLASSES]).is_ok());
        assert_eq!(
            Logits::try_from(vec![0.0; 6]).unwrap_err(),
            TensorError::Length { expected: 7, actual: 6 }
        );
        let mut values = [0.0; NUM_CLASSES];
        values[3] = f32::NAN;
        assert!(matches!(
            Logits::new(values),
            Err(TensorError::NonFinite { index: 3, .. })
        ));
    }
}
