//! Background removal for still images.
//!
//! Images are decoded into [`ImageTensor`]s, run through a segmentation
//! network fetched from a chunked resource catalog, and composited with the
//! predicted mask before being encoded again. [`Runtime`] ties the stages
//! together and memoises one inference session per configuration.

pub mod codec;
pub mod composite;
pub mod config;
pub mod error;
pub mod mime;
pub mod resource;
pub mod runtime;
pub mod segmentation;
pub mod source;
pub mod tensor;

pub use codec::{Codec, EncodedImage};
pub use composite::CompositeMode;
pub use config::{Config, ConfigOptions, Device, ModelSize};
pub use error::{Error, Result};
pub use mime::MimeDescriptor;
pub use runtime::Runtime;
pub use source::ImageSource;
pub use tensor::ImageTensor;
