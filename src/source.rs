//! Foreign images as encoder input.
//!
//! An encoder only needs [`ColorSource::bounds`] and [`ColorSource::color_at`];
//! [`ColorSource::to_container`] lets the common layouts skip the per-pixel
//! round trip through `Rgba<u16>`.

use image::{DynamicImage, ImageBuffer, Luma, LumaA, Primitive, Rgb, Rgba};

use crate::{
    color::{Color, ColorModel, Sample},
    container::{Image, NativeForm, Rectangle},
    data_type::DataType,
    error::Result,
};

pub trait ColorSource {
    fn bounds(&self) -> Rectangle;

    fn color_at(&self, x: u32, y: u32) -> Rgba<u16>;

    /// This image as a RawP container. Defaults to a 4×16-bit copy.
    fn to_container(&self) -> Result<Image>
    where
        Self: Sized,
    {
        collect_rgba16(self)
    }
}

/// Samples every pixel into a fresh (4, Uint16) container.
fn collect_rgba16(source: &impl ColorSource) -> Result<Image> {
    let rect = source.bounds();
    let mut pix = Vec::with_capacity(rect.width() as usize * rect.height() as usize * 8);
    for y in rect.min.y..rect.max.y {
        for x in rect.min.x..rect.max.x {
            for channel in source.color_at(x, y).0 {
                pix.extend_from_slice(&channel.to_ne_bytes());
            }
        }
    }
    Image::from_raw(rect, 4, DataType::Uint16, pix)
}

impl ColorSource for Image {
    fn bounds(&self) -> Rectangle {
        Image::bounds(self)
    }

    fn color_at(&self, x: u32, y: u32) -> Rgba<u16> {
        Image::color_at(self, x, y)
    }

    fn to_container(&self) -> Result<Image> {
        Ok(self.clone())
    }
}

impl ColorSource for NativeForm {
    fn bounds(&self) -> Rectangle {
        match self {
            Self::Dynamic(image) => image.bounds(),
            Self::Raw(image) => image.bounds(),
        }
    }

    fn color_at(&self, x: u32, y: u32) -> Rgba<u16> {
        match self {
            Self::Dynamic(image) => ColorSource::color_at(image, x, y),
            Self::Raw(image) => image.color_at(x, y),
        }
    }

    fn to_container(&self) -> Result<Image> {
        match self {
            Self::Dynamic(image) => image.to_container(),
            Self::Raw(image) => Ok(image.clone()),
        }
    }
}

/// Host library sample types that map onto a RawP data type.
pub trait NativeSample: Sample + Primitive {
    const DATA_TYPE: Option<DataType>;

    fn extend_ne_bytes(self, out: &mut Vec<u8>);
}

impl NativeSample for u8 {
    const DATA_TYPE: Option<DataType> = Some(DataType::Uint8);

    fn extend_ne_bytes(self, out: &mut Vec<u8>) {
        out.push(self);
    }
}

impl NativeSample for u16 {
    const DATA_TYPE: Option<DataType> = Some(DataType::Uint16);

    fn extend_ne_bytes(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_ne_bytes());
    }
}

impl NativeSample for f32 {
    const DATA_TYPE: Option<DataType> = None;

    fn extend_ne_bytes(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_ne_bytes());
    }
}

/// Host library pixel types, with the RawP layout their samples can be
/// copied into verbatim, if any.
pub trait HostPixel: image::Pixel + Color {
    const LAYOUT: Option<ColorModel>;
}

const fn layout_of<T: NativeSample>(channels: usize) -> Option<ColorModel> {
    match T::DATA_TYPE {
        Some(data_type) => Some(ColorModel::new(channels, data_type)),
        None => None,
    }
}

impl<T: NativeSample> HostPixel for Luma<T>
where
    Luma<T>: image::Pixel,
{
    const LAYOUT: Option<ColorModel> = layout_of::<T>(1);
}

impl<T: NativeSample> HostPixel for Rgba<T>
where
    Rgba<T>: image::Pixel,
{
    const LAYOUT: Option<ColorModel> = layout_of::<T>(4);
}

impl<T: NativeSample> HostPixel for LumaA<T>
where
    LumaA<T>: image::Pixel,
{
    const LAYOUT: Option<ColorModel> = None;
}

impl<T: NativeSample> HostPixel for Rgb<T>
where
    Rgb<T>: image::Pixel,
{
    const LAYOUT: Option<ColorModel> = None;
}

impl<P> ColorSource for ImageBuffer<P, Vec<P::Subpixel>>
where
    P: HostPixel,
    P::Subpixel: NativeSample,
{
    fn bounds(&self) -> Rectangle {
        Rectangle::from_size(self.width(), self.height())
    }

    fn color_at(&self, x: u32, y: u32) -> Rgba<u16> {
        if x >= self.width() || y >= self.height() {
            return Rgba([0; 4]);
        }
        self.get_pixel(x, y).to_rgba16()
    }

    fn to_container(&self) -> Result<Image> {
        let Some(model) = P::LAYOUT else {
            return collect_rgba16(self);
        };
        let mut pix = Vec::with_capacity(self.as_raw().len() * model.data_type.byte_size());
        for &sample in self.as_raw() {
            sample.extend_ne_bytes(&mut pix);
        }
        Image::from_raw(self.bounds(), model.channels, model.data_type, pix)
    }
}

macro_rules! dynamic_dispatch {
    ($image:expr, $buffer:ident => $body:expr, _ => $fallback:expr) => {
        match $image {
            DynamicImage::ImageLuma8($buffer) => $body,
            DynamicImage::ImageLumaA8($buffer) => $body,
            DynamicImage::ImageRgb8($buffer) => $body,
            DynamicImage::ImageRgba8($buffer) => $body,
            DynamicImage::ImageLuma16($buffer) => $body,
            DynamicImage::ImageLumaA16($buffer) => $body,
            DynamicImage::ImageRgb16($buffer) => $body,
            DynamicImage::ImageRgba16($buffer) => $body,
            DynamicImage::ImageRgb32F($buffer) => $body,
            DynamicImage::ImageRgba32F($buffer) => $body,
            _ => $fallback,
        }
    };
}

impl ColorSource for DynamicImage {
    fn bounds(&self) -> Rectangle {
        Rectangle::from_size(self.width(), self.height())
    }

    fn color_at(&self, x: u32, y: u32) -> Rgba<u16> {
        dynamic_dispatch!(self, buffer => buffer.color_at(x, y), _ => {
            let rgba16 = self.to_rgba16();
            rgba16.color_at(x, y)
        })
    }

    fn to_container(&self) -> Result<Image> {
        dynamic_dispatch!(self, buffer => buffer.to_container(), _ => self.to_rgba16().to_container())
    }
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, RgbImage, RgbaImage};

    use super::*;

    #[test]
    fn canonical_buffers_are_copied_verbatim() {
        let gray = GrayImage::from_raw(2, 1, vec![3, 4]).unwrap();
        let image = gray.to_container().unwrap();
        assert_eq!(image.color_model(), ColorModel::GRAY8);
        assert_eq!(image.to_packed_bytes(), [3, 4]);

        let rgba16 = ImageBuffer::<Rgba<u16>, _>::from_raw(1, 1, vec![1u16, 2, 3, 4]).unwrap();
        let image = DynamicImage::ImageRgba16(rgba16).to_container().unwrap();
        assert_eq!(image.color_model(), ColorModel::RGBA16);
        assert_eq!(image.at(0, 0).view().u16(3).unwrap(), 4);
    }

    #[test]
    fn other_buffers_widen_to_rgba16() {
        let rgb = RgbImage::from_raw(1, 2, vec![1, 2, 3, 4, 5, 6]).unwrap();
        let image = rgb.to_container().unwrap();
        assert_eq!(image.color_model(), ColorModel::RGBA16);
        assert_eq!(image.color_at(0, 1), Rgba([0x404, 0x505, 0x606, 0xFFFF]));
    }

    #[test]
    fn dynamic_color_at_matches_buffer() {
        let rgba = RgbaImage::from_raw(1, 1, vec![9, 8, 7, 6]).unwrap();
        let expected = rgba.color_at(0, 0);
        let dynamic = DynamicImage::ImageRgba8(rgba);
        assert_eq!(ColorSource::color_at(&dynamic, 0, 0), expected);
        assert_eq!(ColorSource::color_at(&dynamic, 1, 0), Rgba([0; 4]));
        assert_eq!(ColorSource::bounds(&dynamic), Rectangle::from_size(1, 1));
    }
}
