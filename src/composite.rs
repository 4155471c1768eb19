use crate::error::{Error, Result};
use crate::tensor::{resize, ImageTensor};

/// How an alpha mask is combined with an RGBA image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeMode {
    /// alpha = mask
    RemoveBackground,
    /// alpha = 255 - mask
    RemoveForeground,
    /// RGB and alpha all set to the mask value
    SegmentOnly,
    /// alpha = first channel of an externally supplied mask
    ApplyExternalMask,
}

/// Write `mask` into `image` according to `mode`.
///
/// The image is consumed and returned with its channels rewritten. A mask of
/// a different size is resampled to the image first, so the result always
/// keeps the image's dimensions.
pub fn composite(
    mut image: ImageTensor<u8>,
    mask: &ImageTensor<u8>,
    mode: CompositeMode,
) -> Result<ImageTensor<u8>> {
    let _span = tracing::debug_span!("composite", ?mode).entered();

    if image.channels() != 4 {
        return Err(Error::channels(4, image.channels()));
    }
    if mode != CompositeMode::ApplyExternalMask && mask.channels() != 1 {
        return Err(Error::channels(1, mask.channels()));
    }
    if mask.channels() == 0 {
        return Err(Error::channels(1, 0));
    }

    let resized;
    let mask = if mask.same_size(&image) {
        mask
    } else {
        tracing::debug!(
            "Resampling {}x{} mask to {}x{}",
            mask.width(),
            mask.height(),
            image.width(),
            image.height()
        );
        resized = resize(mask, image.width(), image.height(), false)?;
        &resized
    };

    let mask_channels = mask.channels();
    let alpha = mask.data().iter().step_by(mask_channels);
    for (pixel, &a) in image.data_mut().chunks_exact_mut(4).zip(alpha) {
        match mode {
            CompositeMode::RemoveBackground | CompositeMode::ApplyExternalMask => pixel[3] = a,
            CompositeMode::RemoveForeground => pixel[3] = 255 - a,
            CompositeMode::SegmentOnly => pixel.copy_from_slice(&[a, a, a, a]),
        }
    }

    Ok(image)
}

/// Copy the alpha channel of an RGBA tensor into a single-channel tensor.
pub fn extract_alpha(image: &ImageTensor<u8>) -> Result<ImageTensor<u8>> {
    if image.channels() != 4 {
        return Err(Error::channels(4, image.channels()));
    }
    let alpha = image.data().chunks_exact(4).map(|p| p[3]).collect();
    ImageTensor::from_vec(image.height(), image.width(), 1, alpha)
}
