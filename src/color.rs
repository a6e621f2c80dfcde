//! Conversion between RawP pixel layouts and the canonical `Rgba<u16>` color.

use image::{Luma, LumaA, Rgb, Rgba};

use crate::{
    data_type::DataType,
    data_view::{DataView, push_f64},
    error::{Error, Result},
};

/// Anything that can be expressed as a non-premultiplied 16-bit RGBA color.
pub trait Color {
    fn to_rgba16(&self) -> Rgba<u16>;

    /// Raw RawP pixels take a faster, lossless conversion path.
    fn as_raw_pixel(&self) -> Option<&Pixel> {
        None
    }
}

/// Channel types of the host image library's pixels.
pub trait Sample: Copy {
    fn to_u16(self) -> u16;
}

impl Sample for u8 {
    fn to_u16(self) -> u16 {
        u16::from(self) * 0x101
    }
}

impl Sample for u16 {
    fn to_u16(self) -> u16 {
        self
    }
}

impl Sample for f32 {
    fn to_u16(self) -> u16 {
        (self.clamp(0.0, 1.0) * 65535.0).round() as u16
    }
}

impl<T: Sample> Color for Luma<T> {
    fn to_rgba16(&self) -> Rgba<u16> {
        let y = self.0[0].to_u16();
        Rgba([y, y, y, u16::MAX])
    }
}

impl<T: Sample> Color for LumaA<T> {
    fn to_rgba16(&self) -> Rgba<u16> {
        let [y, a] = self.0.map(T::to_u16);
        Rgba([y, y, y, a])
    }
}

impl<T: Sample> Color for Rgb<T> {
    fn to_rgba16(&self) -> Rgba<u16> {
        let [r, g, b] = self.0.map(T::to_u16);
        Rgba([r, g, b, u16::MAX])
    }
}

impl<T: Sample> Color for Rgba<T> {
    fn to_rgba16(&self) -> Rgba<u16> {
        Rgba(self.0.map(T::to_u16))
    }
}

/// One pixel's worth of channel values in a given layout.
///
/// An empty pixel (no bytes) is what [`crate::Image::at`] returns outside the
/// image; it converts to transparent black.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pixel {
    channels: usize,
    data_type: DataType,
    data: DataView<Vec<u8>>,
}

impl Pixel {
    /// A zeroed pixel.
    pub fn new(channels: usize, data_type: DataType) -> Self {
        Self {
            channels,
            data_type,
            data: DataView::new(vec![0; channels * data_type.byte_size()]),
        }
    }

    pub fn empty(channels: usize, data_type: DataType) -> Self {
        Self {
            channels,
            data_type,
            data: DataView::new(Vec::new()),
        }
    }

    pub fn from_bytes(channels: usize, data_type: DataType, bytes: Vec<u8>) -> Result<Self> {
        let expected = channels * data_type.byte_size();
        if bytes.len() != expected {
            return Err(Error::SizeMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            channels,
            data_type,
            data: DataView::new(bytes),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn color_model(&self) -> ColorModel {
        ColorModel::new(self.channels, self.data_type)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.data.as_bytes()
    }

    pub fn view(&self) -> &DataView<Vec<u8>> {
        &self.data
    }

    pub fn view_mut(&mut self) -> &mut DataView<Vec<u8>> {
        &mut self.data
    }

    /// Channel `index` widened to `f64`.
    pub fn channel(&self, index: usize) -> Result<f64> {
        self.data.value_as_f64(index, self.data_type)
    }

    pub fn set_channel(&mut self, index: usize, value: f64) -> Result<()> {
        self.data.set_value_from_f64(index, self.data_type, value)
    }

    fn values(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.channels).map_while(|i| self.channel(i).ok())
    }

    /// Channel `index` on the 16-bit scale. 8-bit values are widened, wider
    /// integers and floats are read as already being on that scale.
    fn channel_u16(&self, index: usize) -> u16 {
        let value = match self.data_type {
            DataType::Uint8 => self.data.u8(index).map(u8::to_u16),
            DataType::Uint16 => self.data.u16(index),
            other => self.data.value_as_f64(index, other).map(|v| v as u16),
        };
        value.unwrap_or(0)
    }
}

impl Color for Pixel {
    fn to_rgba16(&self) -> Rgba<u16> {
        if self.is_empty() {
            return Rgba([0; 4]);
        }
        let c = |i| self.channel_u16(i);
        let max = u16::MAX;
        match self.channels {
            1 => Rgba([c(0), c(0), c(0), max]),
            2 => Rgba([c(0), c(1), max, max]),
            3 => Rgba([c(0), c(1), c(2), max]),
            _ => Rgba([c(0), c(1), c(2), c(3)]),
        }
    }

    fn as_raw_pixel(&self) -> Option<&Pixel> {
        Some(self)
    }
}

/// ITU-R 601 luma on the 16-bit scale; the weights sum to 65536, so gray
/// inputs map to themselves.
fn luminance(r: u16, g: u16, b: u16) -> u16 {
    let y = 19595 * u32::from(r) + 38470 * u32::from(g) + 7471 * u32::from(b) + (1 << 15);
    (y >> 16) as u16
}

/// A (channels, data type) pixel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorModel {
    pub channels: usize,
    pub data_type: DataType,
}

impl ColorModel {
    pub const GRAY8: Self = Self::new(1, DataType::Uint8);
    pub const GRAY16: Self = Self::new(1, DataType::Uint16);
    pub const RGBA8: Self = Self::new(4, DataType::Uint8);
    pub const RGBA16: Self = Self::new(4, DataType::Uint16);

    pub const fn new(channels: usize, data_type: DataType) -> Self {
        Self {
            channels,
            data_type,
        }
    }

    /// Bytes per pixel.
    pub const fn pixel_size(&self) -> usize {
        self.channels * self.data_type.byte_size()
    }

    /// Converts any color into a pixel of this layout.
    pub fn convert<C: Color + ?Sized>(&self, color: &C) -> Pixel {
        match color.as_raw_pixel() {
            Some(pixel) => self.convert_pixel(pixel),
            None => self.pack(color.to_rgba16()),
        }
    }

    /// Overlapping channels are carried over one to one, missing ones are
    /// zero; a shared data type is a plain byte copy.
    fn convert_pixel(&self, src: &Pixel) -> Pixel {
        let mut bytes = Vec::with_capacity(self.pixel_size());
        if src.data_type == self.data_type {
            let n = src.as_bytes().len().min(self.pixel_size());
            bytes.extend_from_slice(&src.as_bytes()[..n]);
        } else {
            for value in src.values().take(self.channels) {
                push_f64(&mut bytes, self.data_type, value);
            }
        }
        self.pixel_from(bytes)
    }

    fn pack(&self, Rgba([r, g, b, a]): Rgba<u16>) -> Pixel {
        let values = match self.channels {
            1 => vec![luminance(r, g, b)],
            _ => vec![r, g, b, a],
        };
        let mut bytes = Vec::with_capacity(self.pixel_size());
        for &value in values.iter().take(self.channels) {
            match self.data_type {
                DataType::Uint8 => bytes.push((value >> 8) as u8),
                DataType::Uint16 => bytes.extend_from_slice(&value.to_ne_bytes()),
                other => push_f64(&mut bytes, other, f64::from(value)),
            }
        }
        self.pixel_from(bytes)
    }

    /// Pads or cuts `bytes` to one pixel of this layout.
    fn pixel_from(&self, mut bytes: Vec<u8>) -> Pixel {
        bytes.resize(self.pixel_size(), 0);
        Pixel {
            channels: self.channels,
            data_type: self.data_type,
            data: DataView::new(bytes),
        }
    }
}
