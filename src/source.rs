use crate::codec::{Codec, EncodedImage};
use crate::error::Result;
use crate::mime::{MimeDescriptor, APPLICATION_OCTET_STREAM};
use crate::resource::Transport;
use crate::tensor::ImageTensor;
use std::path::PathBuf;
use url::Url;

/// Anything the pipeline accepts as an input image.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Local file, format sniffed from its contents
    Path(PathBuf),
    /// Remote or `file://` URL fetched through the transport
    Url(Url),
    /// Encoded container bytes, format sniffed
    Bytes(Vec<u8>),
    /// Bytes with an explicit media type (required for raw pixel formats)
    Encoded(EncodedImage),
    /// Already decoded RGBA pixels
    Tensor(ImageTensor<u8>),
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<Url> for ImageSource {
    fn from(url: Url) -> Self {
        ImageSource::Url(url)
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        ImageSource::Bytes(bytes)
    }
}

impl From<EncodedImage> for ImageSource {
    fn from(image: EncodedImage) -> Self {
        ImageSource::Encoded(image)
    }
}

impl From<ImageTensor<u8>> for ImageSource {
    fn from(tensor: ImageTensor<u8>) -> Self {
        ImageSource::Tensor(tensor)
    }
}

/// Normalise any [`ImageSource`] into a decoded tensor.
pub async fn resolve(
    source: ImageSource,
    transport: &dyn Transport,
    codec: &Codec,
) -> Result<ImageTensor<u8>> {
    match source {
        ImageSource::Path(path) => {
            tracing::debug!("Reading image from {}", path.display());
            let bytes = tokio::fs::read(&path).await?;
            codec.decode(&bytes, &octet_stream()?)
        }
        ImageSource::Url(url) => {
            let bytes = transport.fetch(&url).await?;
            codec.decode(&bytes, &octet_stream()?)
        }
        ImageSource::Bytes(bytes) => codec.decode(&bytes, &octet_stream()?),
        ImageSource::Encoded(image) => codec.decode_encoded(&image),
        ImageSource::Tensor(tensor) => Ok(tensor),
    }
}

fn octet_stream() -> Result<MimeDescriptor> {
    MimeDescriptor::new(APPLICATION_OCTET_STREAM)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mime::IMAGE_PNG;
    use crate::resource::DefaultTransport;

    fn sample() -> ImageTensor<u8> {
        ImageTensor::from_vec(2, 1, 4, vec![1, 2, 3, 4, 5, 6, 7, 8]).unwrap()
    }

    #[tokio::test]
    async fn every_variant_resolves_to_the_same_pixels() {
        let codec = Codec::default();
        let transport = DefaultTransport::default();
        let png = codec
            .encode(&sample(), 1.0, &MimeDescriptor::new(IMAGE_PNG).unwrap())
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.png");
        std::fs::write(&path, &png.bytes).unwrap();
        let url = Url::from_file_path(&path).unwrap();

        let sources = vec![
            ImageSource::from(path),
            ImageSource::from(url),
            ImageSource::from(png.bytes.clone()),
            ImageSource::from(png),
            ImageSource::from(sample()),
        ];
        for source in sources {
            let tensor = resolve(source, &transport, &codec).await.unwrap();
            assert_eq!(tensor, sample());
        }
    }

    #[tokio::test]
    async fn raw_bytes_need_an_explicit_mime() {
        let codec = Codec::default();
        let transport = DefaultTransport::default();
        let raw = EncodedImage {
            mime: MimeDescriptor::rgba8(1, 2),
            bytes: sample().into_data(),
        };
        let tensor = resolve(raw.into(), &transport, &codec).await.unwrap();
        assert_eq!(tensor, sample());

        assert!(resolve(ImageSource::Bytes(sample().into_data()), &transport, &codec)
            .await
            .is_err());
    }
}
