use super::{ContainerFormat, ImageCodec};
use crate::error::{Error, Result};
use crate::tensor::ImageTensor;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder};

/// [`ImageCodec`] backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCodec;

impl ImageCodec for NativeCodec {
    fn decode_container(&self, bytes: &[u8]) -> Result<ImageTensor<u8>> {
        let decoded = image::load_from_memory(bytes)?;
        let (width, height) = (decoded.width() as usize, decoded.height() as usize);

        if decoded.color().has_alpha() {
            ImageTensor::from_vec(height, width, 4, decoded.to_rgba8().into_raw())
        } else {
            ImageTensor::from_vec(height, width, 3, decoded.to_rgb8().into_raw())
        }
    }

    fn encode_container(
        &self,
        tensor: &ImageTensor<u8>,
        format: ContainerFormat,
        quality: f32,
    ) -> Result<Vec<u8>> {
        let (height, width, _) = tensor.shape();
        let width = u32::try_from(width)
            .map_err(|_| Error::InvalidDimensions(format!("width {width} exceeds u32")))?;
        let height = u32::try_from(height)
            .map_err(|_| Error::InvalidDimensions(format!("height {height} exceeds u32")))?;

        let mut buffer = Vec::new();
        match format {
            ContainerFormat::Png => {
                PngEncoder::new(&mut buffer).write_image(
                    tensor.data(),
                    width,
                    height,
                    ExtendedColorType::Rgba8,
                )?;
            }
            ContainerFormat::Jpeg => {
                // JPEG carries no alpha channel
                let rgb: Vec<u8> = tensor
                    .data()
                    .chunks_exact(4)
                    .flat_map(|p| [p[0], p[1], p[2]])
                    .collect();
                let quality = ((quality * 100.0).round() as u8).max(1);
                JpegEncoder::new_with_quality(&mut buffer, quality).write_image(
                    &rgb,
                    width,
                    height,
                    ExtendedColorType::Rgb8,
                )?;
            }
            ContainerFormat::WebP => {
                // The pure-Rust WebP encoder is lossless only, quality does not apply.
                WebPEncoder::new_lossless(&mut buffer).write_image(
                    tensor.data(),
                    width,
                    height,
                    ExtendedColorType::Rgba8,
                )?;
            }
        }

        tracing::debug!(
            "Encoded {}x{} tensor as {:?} ({} bytes)",
            width,
            height,
            format,
            buffer.len()
        );
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_rgb_png_as_three_channels() {
        let mut png = Vec::new();
        PngEncoder::new(&mut png)
            .write_image(&[1, 2, 3, 4, 5, 6], 2, 1, ExtendedColorType::Rgb8)
            .unwrap();
        let tensor = NativeCodec.decode_container(&png).unwrap();
        assert_eq!(tensor.shape(), (1, 2, 3));
        assert_eq!(tensor.data(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn webp_is_lossless() {
        let tensor = ImageTensor::from_vec(2, 2, 4, (0..16).map(|v| v as u8 * 10).collect())
            .unwrap();
        let bytes = NativeCodec
            .encode_container(&tensor, ContainerFormat::WebP, 0.1)
            .unwrap();
        assert_eq!(NativeCodec.decode_container(&bytes).unwrap(), tensor);
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(matches!(
            NativeCodec.decode_container(b"not an image"),
            Err(Error::Image(_))
        ));
    }
}
