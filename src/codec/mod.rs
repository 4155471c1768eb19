mod native;

pub use native::NativeCodec;

use crate::error::{Error, Result};
use crate::mime::{
    MimeDescriptor, APPLICATION_OCTET_STREAM, IMAGE_JPEG, IMAGE_JPG, IMAGE_PNG, IMAGE_WEBP,
    IMAGE_X_ALPHA8, IMAGE_X_RGBA8,
};
use crate::tensor::ImageTensor;
use std::sync::Arc;

/// Container formats handled by an [`ImageCodec`] backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    Png,
    Jpeg,
    WebP,
}

impl ContainerFormat {
    /// Format for an encode target, `None` for anything that is not a
    /// container the backends can write.
    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        match mime_type {
            IMAGE_PNG => Some(Self::Png),
            IMAGE_JPEG | IMAGE_JPG => Some(Self::Jpeg),
            IMAGE_WEBP => Some(Self::WebP),
            _ => None,
        }
    }
}

/// Platform image codec capability.
///
/// Decoding must yield an 8-bit RGB or RGBA tensor; encoding receives RGBA.
pub trait ImageCodec: Send + Sync {
    fn decode_container(&self, bytes: &[u8]) -> Result<ImageTensor<u8>>;

    /// `quality` is already clamped to `[0, 1]`.
    fn encode_container(
        &self,
        tensor: &ImageTensor<u8>,
        format: ContainerFormat,
        quality: f32,
    ) -> Result<Vec<u8>>;
}

/// Encoded bytes plus the descriptor needed to decode them again.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub mime: MimeDescriptor,
    pub bytes: Vec<u8>,
}

/// MIME-dispatching codec: raw pixel formats are handled here, container
/// formats are delegated to the platform backend.
#[derive(Clone)]
pub struct Codec {
    backend: Arc<dyn ImageCodec>,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(Arc::new(NativeCodec))
    }
}

impl Codec {
    pub fn new(backend: Arc<dyn ImageCodec>) -> Self {
        Self { backend }
    }

    pub fn decode(&self, bytes: &[u8], mime: &MimeDescriptor) -> Result<ImageTensor<u8>> {
        let _span = tracing::debug_span!("decode", mime = %mime).entered();

        match mime.mime_type() {
            IMAGE_X_ALPHA8 => decode_raw(bytes, mime, 1),
            IMAGE_X_RGBA8 => decode_raw(bytes, mime, 4),
            IMAGE_PNG | IMAGE_JPEG | IMAGE_JPG | IMAGE_WEBP | APPLICATION_OCTET_STREAM => {
                let tensor = self.backend.decode_container(bytes)?;
                match tensor.channels() {
                    3 => Ok(tensor.into_rgba()),
                    4 => Ok(tensor),
                    other => Err(Error::channels(4, other)),
                }
            }
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn encode(
        &self,
        tensor: &ImageTensor<u8>,
        quality: f32,
        mime: &MimeDescriptor,
    ) -> Result<EncodedImage> {
        let _span = tracing::debug_span!("encode", mime = %mime).entered();

        let (height, width, channels) = tensor.shape();
        match mime.mime_type() {
            IMAGE_X_ALPHA8 => {
                if channels != 1 {
                    return Err(Error::channels(1, channels));
                }
                Ok(EncodedImage {
                    mime: MimeDescriptor::alpha8(width, height),
                    bytes: tensor.data().to_vec(),
                })
            }
            IMAGE_X_RGBA8 => {
                if channels != 4 {
                    return Err(Error::channels(4, channels));
                }
                Ok(EncodedImage {
                    mime: MimeDescriptor::rgba8(width, height),
                    bytes: tensor.data().to_vec(),
                })
            }
            other => {
                let format = ContainerFormat::from_mime_type(other)
                    .ok_or_else(|| Error::UnsupportedFormat(other.to_string()))?;
                if channels != 4 {
                    return Err(Error::channels(4, channels));
                }
                let quality = if quality.is_nan() { 0.0 } else { quality.clamp(0.0, 1.0) };
                let bytes = self.backend.encode_container(tensor, format, quality)?;
                Ok(EncodedImage {
                    mime: MimeDescriptor::new(other)?,
                    bytes,
                })
            }
        }
    }

    /// Decode an [`EncodedImage`] using its own descriptor.
    pub fn decode_encoded(&self, image: &EncodedImage) -> Result<ImageTensor<u8>> {
        self.decode(&image.bytes, &image.mime)
    }
}

fn decode_raw(bytes: &[u8], mime: &MimeDescriptor, channels: usize) -> Result<ImageTensor<u8>> {
    let (width, height) = mime.dimensions()?;
    let expected = width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(channels))
        .ok_or_else(|| Error::malformed(format!("{mime} describes an impossibly large image")))?;
    if bytes.len() != expected {
        return Err(Error::malformed(format!(
            "{mime} expects {expected} bytes but got {}",
            bytes.len()
        )));
    }
    ImageTensor::from_vec(height, width, channels, bytes.to_vec())
}
