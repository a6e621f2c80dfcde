use std::{
    borrow::Cow,
    fs::OpenOptions,
    io::{self, BufReader, Read},
    path::Path,
};

use image::{
    ColorType, ImageDecoder, ImageResult,
    error::{ImageError, ParameterError, ParameterErrorKind},
    hooks::{self, GenericReader},
};
use tracing::debug;

use crate::{
    color::ColorModel,
    container::{Image, NativeForm, Rectangle},
    data_type::DataType,
    data_view::native_to_little_endian,
    error::Result,
    header::{DETECTION_SIGNATURE, HEADER_SIZE, Header, parse_header},
};

/// Dimensions and layout of an image, available without reading its pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub color_model: ColorModel,
    pub width: u32,
    pub height: u32,
}

/// Decodes a whole RawP file into the host library's representation where one
/// exists, or into a RawP container otherwise.
pub fn decode(input: &mut impl Read) -> Result<NativeForm> {
    Ok(decode_image(input)?.to_native_form())
}

/// Decodes a whole RawP file into a RawP container, whatever its layout.
pub fn decode_image(input: &mut impl Read) -> Result<Image> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    decode_from_vec(bytes)
}

/// Like `decode_image`, on bytes already in memory. Uncompressed pixels are
/// used in place, without a copy.
pub fn decode_from_vec(mut bytes: Vec<u8>) -> Result<Image> {
    let (header, decompressed) = {
        let parsed = parse_header(&bytes)?;
        let decompressed = match parsed.data {
            Cow::Owned(data) => Some(data),
            Cow::Borrowed(_) => None,
        };
        (parsed.header, decompressed)
    };
    debug!(
        width = header.width,
        height = header.height,
        channels = header.channels,
        data_type = %header.data_type,
        use_snappy = header.use_snappy,
        "decoding rawp image"
    );

    let rect = Rectangle::from_size(header.width.into(), header.height.into());
    let element_size = header.data_type.byte_size();
    match decompressed {
        Some(mut pix) => {
            // Little-endian to native is the same swap as the other way round.
            native_to_little_endian(&mut pix, element_size)?;
            Image::from_raw_at(rect, header.color_model(), pix, 0)
        }
        None => {
            bytes.truncate(HEADER_SIZE + header.expected_payload_len());
            native_to_little_endian(&mut bytes[HEADER_SIZE..], element_size)?;
            Image::from_raw_at(rect, header.color_model(), bytes, HEADER_SIZE)
        }
    }
}

/// Reads only the 24-byte header.
pub fn decode_config(input: &mut impl Read) -> Result<Config> {
    let mut bytes = Vec::with_capacity(HEADER_SIZE);
    input.take(HEADER_SIZE as u64).read_to_end(&mut bytes)?;
    let header = Header::from_bytes(&bytes)?;
    Ok(Config {
        color_model: header.color_model(),
        width: header.width.into(),
        height: header.height.into(),
    })
}

/// Whether `bytes` starts like a RawP file: the signature followed by the
/// little-endian magic.
pub fn sniff(bytes: &[u8]) -> bool {
    bytes.starts_with(&DETECTION_SIGNATURE)
}

fn read_file(path: impl AsRef<Path>) -> io::Result<impl Read> {
    let file = OpenOptions::new()
        .read(true)
        .write(false)
        .create(false)
        .open(&path)?;
    Ok(BufReader::new(file))
}

/// Convenience function that calls `decode`.
pub fn load(path: impl AsRef<Path>) -> Result<NativeForm> {
    let mut reader = read_file(path)?;
    decode(&mut reader)
}

/// The host library's color type for what `Image::to_dynamic` produces.
fn dynamic_color_type(model: ColorModel) -> ColorType {
    match (model.channels, model.data_type) {
        (1, DataType::Uint8) => ColorType::L8,
        (1, DataType::Uint16) => ColorType::L16,
        (3, DataType::Uint8) => ColorType::Rgb8,
        (3, DataType::Uint16) => ColorType::Rgb16,
        (4, DataType::Uint8) => ColorType::Rgba8,
        _ => ColorType::Rgba16,
    }
}

/// Decoder for the host library, e.g. through `DynamicImage::from_decoder`.
///
/// The file is decoded and verified in full by `new`.
#[derive(Debug)]
pub struct RawpDecoder {
    image: Image,
}

impl RawpDecoder {
    pub fn new(mut reader: impl Read) -> Result<Self> {
        Ok(Self {
            image: decode_image(&mut reader)?,
        })
    }

    pub fn into_image(self) -> Image {
        self.image
    }
}

impl ImageDecoder for RawpDecoder {
    fn dimensions(&self) -> (u32, u32) {
        let rect = self.image.bounds();
        (rect.width(), rect.height())
    }

    fn color_type(&self) -> ColorType {
        dynamic_color_type(self.image.color_model())
    }

    fn read_image(self, buf: &mut [u8]) -> ImageResult<()> {
        let dynamic = self.image.to_dynamic();
        let bytes = dynamic.as_bytes();
        if buf.len() != bytes.len() {
            return Err(ImageError::Parameter(ParameterError::from_kind(
                ParameterErrorKind::DimensionMismatch,
            )));
        }
        buf.copy_from_slice(bytes);
        Ok(())
    }

    fn read_image_boxed(self: Box<Self>, buf: &mut [u8]) -> ImageResult<()> {
        (*self).read_image(buf)
    }
}

/// File extension the host library hooks are registered under.
pub const EXTENSION: &str = "rawp";

fn decoding_hook(reader: GenericReader<'_>) -> ImageResult<Box<dyn ImageDecoder + '_>> {
    Ok(Box::new(RawpDecoder::new(reader)?))
}

/// Teaches the host library to open RawP files, by `.rawp` extension and by
/// content (`image::open`, `ImageReader::with_guessed_format`).
///
/// Only the first call registers anything; it returns whether this call did.
pub fn register() -> bool {
    let registered = hooks::register_decoding_hook(EXTENSION.into(), Box::new(decoding_hook));
    if registered {
        hooks::register_format_detection_hook(EXTENSION.into(), &DETECTION_SIGNATURE, None);
        debug!("registered rawp hooks");
    }
    registered
}
