use super::ImageTensor;
use crate::error::{Error, Result};
use ndarray::{Array4, ArrayD};

/// Per-channel normalisation applied when building network input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            mean: [128.0, 128.0, 128.0],
            std: [256.0, 256.0, 256.0],
        }
    }
}

/// Convert an interleaved RGB(A) tensor into a normalised planar tensor
///
/// Steps:
/// 1. Drop the alpha channel
/// 2. Normalise each channel as `(value - mean) / std`
/// 3. Regroup from HWC to BCHW
///
/// Returns: Array4<f32> with shape [1, 3, height, width]
pub fn to_planar_normalized(
    tensor: &ImageTensor<u8>,
    normalization: &Normalization,
) -> Result<Array4<f32>> {
    let _span = tracing::debug_span!("preprocess").entered();

    let (height, width, channels) = tensor.shape();
    if channels != 3 && channels != 4 {
        return Err(Error::channels(4, channels));
    }

    let stride = height * width;
    let mut planar = vec![0.0f32; 3 * stride];
    for (j, pixel) in tensor.data().chunks_exact(channels).enumerate() {
        for c in 0..3 {
            planar[c * stride + j] =
                (pixel[c] as f32 - normalization.mean[c]) / normalization.std[c];
        }
    }

    Array4::from_shape_vec((1, 3, height, width), planar)
        .map_err(|e| Error::InvalidDimensions(e.to_string()))
}

/// Scale a `[0, 1]` float mask to `0..=255`, truncating.
pub fn to_uint8(mask: ImageTensor<f32>) -> ImageTensor<u8> {
    let (height, width, channels) = mask.shape();
    let data = mask
        .into_data()
        .into_iter()
        .map(|v| (v * 255.0) as u8)
        .collect();
    ImageTensor {
        height,
        width,
        channels,
        data,
    }
}

/// Reshape a network mask output (`[1, 1, H, W]`, `[1, H, W]` or `[H, W]`)
/// into a single-channel `(H, W, 1)` tensor.
pub fn mask_from_output(output: ArrayD<f32>) -> Result<ImageTensor<f32>> {
    let shape = output.shape().to_vec();
    let (height, width) = match shape.as_slice() {
        [1, 1, h, w] | [1, h, w] | [h, w] => (*h, *w),
        other => {
            return Err(Error::malformed(format!(
                "unexpected mask output shape {other:?}"
            )))
        }
    };
    let data = if output.is_standard_layout() {
        output.into_raw_vec_and_offset().0
    } else {
        output.iter().copied().collect()
    };
    ImageTensor::from_vec(height, width, 1, data)
}
