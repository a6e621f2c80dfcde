use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use tracing::debug;

use crate::{
    color::ColorModel,
    container::Image,
    data_view::native_to_little_endian,
    error::{Error, Result},
    header::{Header, crc32},
    snappy,
    source::ColorSource,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeOptions {
    /// Compress the payload with Snappy.
    pub use_snappy: bool,
    /// Re-encode the image into this layout first. `None` keeps the
    /// source's own layout.
    pub color_model: Option<ColorModel>,
}

impl EncodeOptions {
    pub fn snappy() -> Self {
        Self {
            use_snappy: true,
            ..Self::default()
        }
    }
}

/// Writes `image` to `output` as a RawP file and returns the header written.
///
/// Nothing is written if the image cannot be represented; I/O errors are
/// passed through as they come.
pub fn encode(output: &mut impl Write, image: &impl ColorSource, options: EncodeOptions) -> Result<Header> {
    let image = normalize(image, options.color_model)?;
    let rect = image.bounds();
    let mut header = Header::new(
        rect.width(),
        rect.height(),
        image.channels(),
        image.data_type(),
        options.use_snappy,
    )?;

    // Rows are copied one by one, which drops any stride padding and the
    // offset of a sub-view into its parent's buffer.
    let mut payload = image.to_packed_bytes();
    native_to_little_endian(&mut payload, image.data_type().byte_size())?;
    let raw_len = payload.len();
    if options.use_snappy {
        payload = snappy::encode(Vec::new(), &payload);
    }

    header.data_size = u32::try_from(payload.len()).map_err(|_| Error::InvalidDimension {
        width: rect.width(),
        height: rect.height(),
    })?;
    header.data_checksum = crc32(&payload);
    debug!(
        width = header.width,
        height = header.height,
        channels = header.channels,
        data_type = %header.data_type,
        raw_len,
        stored_len = payload.len(),
        "encoding rawp image"
    );

    output.write_all(&header.to_bytes())?;
    output.write_all(&payload)?;
    Ok(header)
}

/// Convenience function that calls `encode`.
pub fn encode_to_vec(image: &impl ColorSource, options: EncodeOptions) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    encode(&mut data, image, options)?;
    Ok(data)
}

/// Convenience function that calls `encode`.
pub fn save(path: impl AsRef<Path>, image: &impl ColorSource, options: EncodeOptions) -> Result<()> {
    // Encode before touching the file so a rejected image leaves nothing behind.
    let data = encode_to_vec(image, options)?;
    let file = File::options()
        .read(false)
        .write(true)
        .append(false)
        .create(true)
        .truncate(true)
        .open(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&data)?;
    writer.flush()?;
    Ok(())
}

fn normalize(source: &impl ColorSource, model: Option<ColorModel>) -> Result<Image> {
    let image = source.to_container()?;
    let Some(model) = model.filter(|&m| m != image.color_model()) else {
        return Ok(image);
    };
    let rect = image.bounds();
    let converted = Image::new(rect, model.channels, model.data_type)?;
    for y in rect.min.y..rect.max.y {
        for x in rect.min.x..rect.max.x {
            converted.set(x, y, &image.color_at(x, y));
        }
    }
    Ok(converted)
}

#[cfg(test)]
mod tests {
    use std::io;

    use image::{GrayImage, Luma};

    use super::*;
    use crate::{
        container::Rectangle,
        data_type::DataType,
        header::{HEADER_SIZE, parse_header},
    };

    #[test]
    fn two_by_two_gray() {
        let image = GrayImage::from_raw(2, 2, vec![10, 20, 30, 40]).unwrap();
        let data = encode_to_vec(&image, EncodeOptions::default()).unwrap();
        assert_eq!(data.len(), 28);
        let header = Header::from_bytes(&data).unwrap();
        assert_eq!((header.width, header.height, header.channels), (2, 2, 1));
        assert_eq!((header.depth(), header.data_type.tag(), header.use_snappy), (8, 1, false));
        assert_eq!(header.data_size, 4);
        assert_eq!(header.data_checksum, crc32(&[10, 20, 30, 40]));
        assert_eq!(&data[HEADER_SIZE..], &[10, 20, 30, 40]);
    }

    #[test]
    fn sub_view_payload_has_no_inset() {
        let parent = Image::new(Rectangle::from_size(3, 3), 1, DataType::Uint8).unwrap();
        parent.set(1, 1, &Luma([7u8]));
        parent.set(2, 2, &Luma([9u8]));
        let view = parent.sub_view(Rectangle::new(1, 1, 3, 3));
        let data = encode_to_vec(&view, EncodeOptions::default()).unwrap();
        assert_eq!(&data[HEADER_SIZE..], &[7, 0, 0, 9]);
    }

    #[test]
    fn color_model_option_converts_first() {
        let image = GrayImage::from_raw(1, 1, vec![0x80]).unwrap();
        let options = EncodeOptions {
            color_model: Some(ColorModel::new(3, DataType::Float32)),
            ..EncodeOptions::default()
        };
        let data = encode_to_vec(&image, options).unwrap();
        let parsed = parse_header(&data).unwrap();
        assert_eq!(parsed.header.color_model(), ColorModel::new(3, DataType::Float32));
        assert_eq!(&parsed.data[..4], &(0x8080 as f32).to_le_bytes());
    }

    #[test]
    fn unsupported_layouts_are_rejected() {
        let pair = Image::new(Rectangle::from_size(1, 1), 2, DataType::Uint8).unwrap();
        assert!(matches!(
            encode_to_vec(&pair, EncodeOptions::default()),
            Err(Error::InvalidChannels { channels: 2 })
        ));
        let empty = Image::empty(ColorModel::GRAY8);
        assert!(matches!(
            encode_to_vec(&empty, EncodeOptions::default()),
            Err(Error::InvalidDimension { width: 0, height: 0 })
        ));
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn stream_errors_pass_through() {
        let image = GrayImage::new(1, 1);
        match encode(&mut FailingWriter, &image, EncodeOptions::snappy()) {
            Err(Error::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("unexpected {other:?}"),
        }
    }
}
