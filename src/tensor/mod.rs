mod layout;
mod resize;

pub use layout::{mask_from_output, to_planar_normalized, to_uint8, Normalization};
pub use resize::resize;

use crate::error::{Error, Result};

/// Element type tag of an [`ImageTensor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    U8,
    F32,
}

/// Pixel element stored in an [`ImageTensor`].
pub trait Element: Copy + Default + PartialEq + Send + Sync + 'static {
    const ELEMENT_TYPE: ElementType;

    fn to_f32(self) -> f32;

    /// Convert an interpolated value back to the element type.
    fn from_f32(value: f32) -> Self;
}

impl Element for u8 {
    const ELEMENT_TYPE: ElementType = ElementType::U8;

    fn to_f32(self) -> f32 {
        self as f32
    }

    fn from_f32(value: f32) -> Self {
        value.round().clamp(0.0, 255.0) as u8
    }
}

impl Element for f32 {
    const ELEMENT_TYPE: ElementType = ElementType::F32;

    fn to_f32(self) -> f32 {
        self
    }

    fn from_f32(value: f32) -> Self {
        value
    }
}

/// Owned interleaved (height x width x channels) pixel buffer.
///
/// `data.len() == height * width * channels` always holds.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor<T: Element = u8> {
    height: usize,
    width: usize,
    channels: usize,
    data: Vec<T>,
}

impl<T: Element> ImageTensor<T> {
    /// Zero-filled tensor.
    pub fn zeros(height: usize, width: usize, channels: usize) -> Self {
        Self {
            height,
            width,
            channels,
            data: vec![T::default(); height * width * channels],
        }
    }

    /// Wrap an existing buffer, checking its length against the shape.
    pub fn from_vec(height: usize, width: usize, channels: usize, data: Vec<T>) -> Result<Self> {
        let expected = height
            .checked_mul(width)
            .and_then(|n| n.checked_mul(channels))
            .ok_or_else(|| {
                Error::InvalidDimensions(format!("{height}x{width}x{channels} overflows"))
            })?;
        if data.len() != expected {
            return Err(Error::InvalidDimensions(format!(
                "buffer of {} elements does not match shape {height}x{width}x{channels}",
                data.len()
            )));
        }
        Ok(Self {
            height,
            width,
            channels,
            data,
        })
    }

    /// `(height, width, channels)`
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height, self.width, self.channels)
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn element_type(&self) -> ElementType {
        T::ELEMENT_TYPE
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// Number of pixels (`height * width`).
    pub fn pixel_count(&self) -> usize {
        self.height * self.width
    }

    #[inline]
    pub fn get(&self, y: usize, x: usize, c: usize) -> T {
        self.data[(y * self.width + x) * self.channels + c]
    }

    #[inline]
    pub fn set(&mut self, y: usize, x: usize, c: usize, value: T) {
        let idx = (y * self.width + x) * self.channels + c;
        self.data[idx] = value;
    }

    /// Same spatial size as `other`.
    pub fn same_size<U: Element>(&self, other: &ImageTensor<U>) -> bool {
        self.height == other.height && self.width == other.width
    }
}

impl ImageTensor<u8> {
    /// Expand a 3-channel RGB tensor to RGBA with opaque alpha.
    /// Other channel counts are returned unchanged.
    pub fn into_rgba(self) -> Self {
        if self.channels != 3 {
            return self;
        }
        let mut data = Vec::with_capacity(self.pixel_count() * 4);
        for rgb in self.data.chunks_exact(3) {
            data.extend_from_slice(rgb);
            data.push(255);
        }
        Self {
            height: self.height,
            width: self.width,
            channels: 4,
            data,
        }
    }
}
