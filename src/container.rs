//! The in-memory RawP image: a rectangle over a shared, typed pixel buffer.

use std::{
    cell::{Ref, RefCell},
    ops::Range,
    rc::Rc,
};

use derive_more::Display;
use image::{DynamicImage, ImageBuffer, Luma, Rgba};

use crate::{
    color::{Color, ColorModel, Pixel},
    data_type::DataType,
    data_view::DataView,
    error::{Error, Result},
};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[display("({x}, {y})")]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

/// Half-open rectangle `[min, max)`.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[display("{min}-{max}")]
pub struct Rectangle {
    pub min: Point,
    pub max: Point,
}

impl Rectangle {
    /// Corners may be given in any order.
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self {
            min: Point {
                x: x0.min(x1),
                y: y0.min(y1),
            },
            max: Point {
                x: x0.max(x1),
                y: y0.max(y1),
            },
        }
    }

    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn width(&self) -> u32 {
        self.max.x.saturating_sub(self.min.x)
    }

    pub fn height(&self) -> u32 {
        self.max.y.saturating_sub(self.min.y)
    }

    pub fn is_empty(&self) -> bool {
        self.min.x >= self.max.x || self.min.y >= self.max.y
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        (self.min.x..self.max.x).contains(&x) && (self.min.y..self.max.y).contains(&y)
    }

    /// The overlap of both rectangles, or the zero rectangle if there is none.
    pub fn intersect(&self, other: &Self) -> Self {
        let r = Self {
            min: Point {
                x: self.min.x.max(other.min.x),
                y: self.min.y.max(other.min.y),
            },
            max: Point {
                x: self.max.x.min(other.max.x),
                y: self.max.y.min(other.max.y),
            },
        };
        if r.is_empty() { Self::default() } else { r }
    }
}

/// A RawP image.
///
/// Pixel `(x, y)` lives at `base + (y - min.y) * stride + (x - min.x) * pixel_size`
/// in a byte buffer that may be shared with other images: cloning an `Image`
/// or taking a [`sub_view`](Image::sub_view) never copies pixels, and writes
/// through one are visible through all of them.
#[derive(Debug, Clone)]
pub struct Image {
    rect: Rectangle,
    model: ColorModel,
    stride: usize,
    base: usize,
    pix: Rc<RefCell<Vec<u8>>>,
}

impl Image {
    /// A zeroed image.
    pub fn new(rect: Rectangle, channels: usize, data_type: DataType) -> Result<Self> {
        let model = checked_model(channels, data_type)?;
        let stride = rect.width() as usize * model.pixel_size();
        let len = stride * rect.height() as usize;
        Ok(Self::from_parts(rect, model, stride, 0, vec![0; len]))
    }

    /// Wraps tightly packed rows of native-endian channel values.
    pub fn from_raw(rect: Rectangle, channels: usize, data_type: DataType, pix: Vec<u8>) -> Result<Self> {
        Self::from_raw_at(rect, checked_model(channels, data_type)?, pix, 0)
    }

    /// Like `from_raw`, but the pixels start `base` bytes into `pix`.
    pub(crate) fn from_raw_at(rect: Rectangle, model: ColorModel, pix: Vec<u8>, base: usize) -> Result<Self> {
        let stride = rect.width() as usize * model.pixel_size();
        let expected = stride * rect.height() as usize;
        let actual = pix.len().saturating_sub(base);
        if actual != expected {
            return Err(Error::SizeMismatch { expected, actual });
        }
        Ok(Self::from_parts(rect, model, stride, base, pix))
    }

    fn from_parts(rect: Rectangle, model: ColorModel, stride: usize, base: usize, pix: Vec<u8>) -> Self {
        Self {
            rect,
            model,
            stride,
            base,
            pix: Rc::new(RefCell::new(pix)),
        }
    }

    /// An image with no pixels, keeping `model` for reference.
    pub fn empty(model: ColorModel) -> Self {
        Self::from_parts(Rectangle::default(), model, 0, 0, Vec::new())
    }

    pub fn bounds(&self) -> Rectangle {
        self.rect
    }

    pub fn is_empty(&self) -> bool {
        self.rect.is_empty()
    }

    pub fn channels(&self) -> usize {
        self.model.channels
    }

    pub fn data_type(&self) -> DataType {
        self.model.data_type
    }

    pub fn color_model(&self) -> ColorModel {
        self.model
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn pixel_size(&self) -> usize {
        self.model.pixel_size()
    }

    /// Whether both images are views of the same buffer.
    pub fn shares_buffer_with(&self, other: &Image) -> bool {
        Rc::ptr_eq(&self.pix, &other.pix)
    }

    /// Byte offset of pixel `(x, y)`, or `None` outside the bounds.
    pub fn pix_offset(&self, x: u32, y: u32) -> Option<usize> {
        self.rect.contains(x, y).then(|| {
            self.base
                + (y - self.rect.min.y) as usize * self.stride
                + (x - self.rect.min.x) as usize * self.pixel_size()
        })
    }

    /// A copy of pixel `(x, y)`; an empty pixel outside the bounds.
    pub fn at(&self, x: u32, y: u32) -> Pixel {
        let Some(offset) = self.pix_offset(x, y) else {
            return Pixel::empty(self.channels(), self.data_type());
        };
        let pix = self.pix.borrow();
        let bytes = pix[offset..offset + self.pixel_size()].to_vec();
        Pixel::from_bytes(self.channels(), self.data_type(), bytes)
            .unwrap_or_else(|_| Pixel::empty(self.channels(), self.data_type()))
    }

    pub fn color_at(&self, x: u32, y: u32) -> Rgba<u16> {
        self.at(x, y).to_rgba16()
    }

    /// Converts `color` into this image's layout and stores it at `(x, y)`.
    /// Does nothing outside the bounds.
    pub fn set<C: Color + ?Sized>(&self, x: u32, y: u32, color: &C) {
        let Some(offset) = self.pix_offset(x, y) else {
            return;
        };
        let pixel = self.model.convert(color);
        self.pix.borrow_mut()[offset..offset + self.pixel_size()].copy_from_slice(pixel.as_bytes());
    }

    /// The raw bytes of pixel `(x, y)`, borrowed from the shared buffer.
    pub fn pixel_at(&self, x: u32, y: u32) -> Option<Ref<'_, [u8]>> {
        let offset = self.pix_offset(x, y)?;
        let size = self.pixel_size();
        Some(Ref::map(self.pix.borrow(), |pix| &pix[offset..offset + size]))
    }

    /// Overwrites pixel `(x, y)` with `bytes` as they are. Does nothing
    /// outside the bounds.
    pub fn set_pixel(&self, x: u32, y: u32, bytes: &[u8]) -> Result<()> {
        let size = self.pixel_size();
        if bytes.len() != size {
            return Err(Error::SizeMismatch {
                expected: size,
                actual: bytes.len(),
            });
        }
        if let Some(offset) = self.pix_offset(x, y) {
            self.pix.borrow_mut()[offset..offset + size].copy_from_slice(bytes);
        }
        Ok(())
    }

    /// Buffer range from this image's first pixel to the end of its last row.
    fn span(&self) -> Range<usize> {
        if self.is_empty() {
            return self.base..self.base;
        }
        let row_len = self.rect.width() as usize * self.pixel_size();
        self.base..self.base + (self.rect.height() as usize - 1) * self.stride + row_len
    }

    /// Index of channel `channel` of pixel `(x, y)` in the views handed out by
    /// `with_view` and `with_view_mut`.
    pub fn element_index(&self, x: u32, y: u32, channel: usize) -> Option<usize> {
        if channel >= self.channels() {
            return None;
        }
        let offset = self.pix_offset(x, y)?;
        Some((offset - self.base) / self.data_type().byte_size() + channel)
    }

    /// Calls `f` with a typed view over this image's bytes, in place. Rows
    /// are `stride` bytes apart; in a sub-view the gaps hold the parent's
    /// pixels. The buffer stays borrowed while `f` runs, so `f` must not
    /// write to any image sharing it.
    pub fn with_view<R>(&self, f: impl FnOnce(&DataView<&[u8]>) -> R) -> R {
        let pix = self.pix.borrow();
        f(&DataView::new(&pix[self.span()]))
    }

    /// Mutable counterpart of `with_view`. `f` must not touch any image
    /// sharing the buffer.
    pub fn with_view_mut<R>(&self, f: impl FnOnce(&mut DataView<&mut [u8]>) -> R) -> R {
        let span = self.span();
        let mut pix = self.pix.borrow_mut();
        f(&mut DataView::new(&mut pix[span]))
    }

    /// The part of this image inside `rect`, sharing its pixels.
    pub fn sub_view(&self, rect: Rectangle) -> Image {
        let rect = rect.intersect(&self.rect);
        let Some(base) = self.pix_offset(rect.min.x, rect.min.y) else {
            return Image::empty(self.model);
        };
        Image {
            rect,
            model: self.model,
            stride: self.stride,
            base,
            pix: Rc::clone(&self.pix),
        }
    }

    /// Calls `f` with each row's bytes, top to bottom.
    pub fn for_each_row(&self, mut f: impl FnMut(&[u8])) {
        let row_len = self.rect.width() as usize * self.pixel_size();
        let pix = self.pix.borrow();
        for row in 0..self.rect.height() as usize {
            let start = self.base + row * self.stride;
            f(&pix[start..start + row_len]);
        }
    }

    /// Tightly packed copy of the pixels, without any stride padding or
    /// offset into the shared buffer.
    pub fn to_packed_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.rect.width() as usize * self.rect.height() as usize * self.pixel_size());
        self.for_each_row(|row| bytes.extend_from_slice(row));
        bytes
    }

    /// The host image library's representation for gray/RGBA at 8 or 16 bits;
    /// any other layout is returned as is. 16-bit samples are copied out, the
    /// shared buffer is never touched.
    pub fn to_native_form(&self) -> NativeForm {
        let (width, height) = (self.rect.width(), self.rect.height());
        let native = match (self.channels(), self.data_type()) {
            (1, DataType::Uint8) => ImageBuffer::from_raw(width, height, self.to_packed_bytes()).map(DynamicImage::ImageLuma8),
            (1, DataType::Uint16) => ImageBuffer::<Luma<u16>, _>::from_raw(width, height, self.to_packed_u16())
                .map(DynamicImage::ImageLuma16),
            (4, DataType::Uint8) => ImageBuffer::from_raw(width, height, self.to_packed_bytes()).map(DynamicImage::ImageRgba8),
            (4, DataType::Uint16) => ImageBuffer::<Rgba<u16>, _>::from_raw(width, height, self.to_packed_u16())
                .map(DynamicImage::ImageRgba16),
            _ => None,
        };
        match native {
            Some(native) => NativeForm::Dynamic(native),
            None => NativeForm::Raw(self.clone()),
        }
    }

    fn to_packed_u16(&self) -> Vec<u16> {
        self.to_packed_bytes()
            .chunks_exact(2)
            .map(|b| u16::from_ne_bytes([b[0], b[1]]))
            .collect()
    }

    /// Converts into a `DynamicImage`, losslessly where the host library has a
    /// matching layout and through `Rgba<u16>` otherwise.
    pub fn to_dynamic(&self) -> DynamicImage {
        let (width, height) = (self.rect.width(), self.rect.height());
        let direct = match (self.channels(), self.data_type()) {
            (3, DataType::Uint8) => ImageBuffer::from_raw(width, height, self.to_packed_bytes()).map(DynamicImage::ImageRgb8),
            (3, DataType::Uint16) => ImageBuffer::from_raw(width, height, self.to_packed_u16()).map(DynamicImage::ImageRgb16),
            _ => match self.to_native_form() {
                NativeForm::Dynamic(native) => Some(native),
                NativeForm::Raw(_) => None,
            },
        };
        direct.unwrap_or_else(|| {
            let min = self.rect.min;
            DynamicImage::ImageRgba16(ImageBuffer::from_fn(width, height, |x, y| {
                self.color_at(min.x + x, min.y + y)
            }))
        })
    }
}

fn checked_model(channels: usize, data_type: DataType) -> Result<ColorModel> {
    if !(1..=4).contains(&channels) {
        return Err(Error::InvalidChannels { channels });
    }
    Ok(ColorModel::new(channels, data_type))
}

/// What decoding produces: the host library's own image for the common
/// layouts, the RawP container for everything else.
#[derive(Debug, Clone)]
pub enum NativeForm {
    Dynamic(DynamicImage),
    Raw(Image),
}

impl NativeForm {
    pub fn into_dynamic(self) -> DynamicImage {
        match self {
            Self::Dynamic(image) => image,
            Self::Raw(image) => image.to_dynamic(),
        }
    }
}
