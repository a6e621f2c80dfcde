use std::{
    borrow::Cow,
    fmt::{self, Display},
    sync::OnceLock,
};

use tracing::trace;

use crate::{
    color::ColorModel,
    data_type::{DataType, TAG_FLOAT, TAG_UINT},
    error::{Error, Result},
    snappy,
};

pub const HEADER_SIZE: usize = 24;
pub const SIGNATURE: [u8; 4] = *b"RAWP";
/// Fixed value following the signature.
pub const MAGIC: u32 = 0x1BF2_380A;
/// The first 8 bytes of every RawP file.
pub const DETECTION_SIGNATURE: [u8; 8] = {
    let m = MAGIC.to_le_bytes();
    [SIGNATURE[0], SIGNATURE[1], SIGNATURE[2], SIGNATURE[3], m[0], m[1], m[2], m[3]]
};

/// The fixed 24-byte RawP header. All multi-byte fields are little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub width: u16,
    pub height: u16,
    /// 1 = gray, 3 = RGB, 4 = RGBA.
    pub channels: u8,
    pub data_type: DataType,
    pub use_snappy: bool,
    /// Length of the stored (possibly compressed) payload.
    pub data_size: u32,
    /// CRC32-IEEE of the stored payload.
    pub data_checksum: u32,
}

impl Header {
    /// Builds a header for an image about to be encoded. `data_size` and
    /// `data_checksum` are left zero until the payload is known.
    pub fn new(
        width: u32,
        height: u32,
        channels: usize,
        data_type: DataType,
        use_snappy: bool,
    ) -> Result<Self> {
        let (Ok(w @ 1..), Ok(h @ 1..)) = (u16::try_from(width), u16::try_from(height)) else {
            return Err(Error::InvalidDimension { width, height });
        };
        if !matches!(channels, 1 | 3 | 4) {
            return Err(Error::InvalidChannels { channels });
        }
        Ok(Self {
            width: w,
            height: h,
            channels: channels as u8,
            data_type,
            use_snappy,
            data_size: 0,
            data_checksum: 0,
        })
    }

    pub fn depth(&self) -> u8 {
        self.data_type.depth()
    }

    pub fn color_model(&self) -> ColorModel {
        ColorModel::new(self.channels as usize, self.data_type)
    }

    /// `width * height * channels * depth / 8`, the size of the pixel data
    /// once decompressed.
    pub fn expected_payload_len(&self) -> usize {
        usize::from(self.width)
            * usize::from(self.height)
            * usize::from(self.channels)
            * self.data_type.byte_size()
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&SIGNATURE);
        bytes[4..8].copy_from_slice(&MAGIC.to_le_bytes());
        bytes[8..10].copy_from_slice(&self.width.to_le_bytes());
        bytes[10..12].copy_from_slice(&self.height.to_le_bytes());
        bytes[12] = self.channels;
        bytes[13] = self.depth();
        bytes[14] = self.data_type.tag();
        bytes[15] = self.use_snappy as u8;
        bytes[16..20].copy_from_slice(&self.data_size.to_le_bytes());
        bytes[20..24].copy_from_slice(&self.data_checksum.to_le_bytes());
        bytes
    }

    /// Parses and validates the header fields. The payload is not looked at.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let Some(bytes) = bytes.first_chunk::<HEADER_SIZE>() else {
            return Err(Error::TruncatedHeader { len: bytes.len() });
        };
        let u16_at = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);
        let u32_at = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);

        let signature = [bytes[0], bytes[1], bytes[2], bytes[3]];
        if signature != SIGNATURE {
            return Err(Error::BadSignature { found: signature });
        }
        let magic = u32_at(4);
        if magic != MAGIC {
            return Err(Error::BadMagic { found: magic });
        }

        let invalid = |field: &'static str, value: u32| Error::InvalidField { field, value };
        let width = u16_at(8);
        if width == 0 {
            return Err(invalid("width", 0));
        }
        let height = u16_at(10);
        if height == 0 {
            return Err(invalid("height", 0));
        }
        let channels = bytes[12];
        if !matches!(channels, 1 | 3 | 4) {
            return Err(Error::InvalidChannels {
                channels: channels.into(),
            });
        }
        let depth = bytes[13];
        if !matches!(depth, 8 | 16 | 32 | 64) {
            return Err(invalid("depth", depth.into()));
        }
        let tag = bytes[14];
        if tag != TAG_UINT && tag != TAG_FLOAT {
            return Err(invalid("data_type", tag.into()));
        }
        // Only 8/16-bit floats remain, which do not exist.
        let data_type = DataType::from_parts(depth, tag).map_err(|_| invalid("data_type", tag.into()))?;
        let use_snappy = match bytes[15] {
            0 => false,
            1 => true,
            other => return Err(invalid("use_snappy", other.into())),
        };
        let data_size = u32_at(16);
        if data_size == 0 {
            return Err(invalid("data_size", 0));
        }

        Ok(Self {
            width,
            height,
            channels,
            data_type,
            use_snappy,
            data_size,
            data_checksum: u32_at(20),
        })
    }
}

impl Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "rawp::Header {{")?;
        writeln!(f, "    width:         {}", self.width)?;
        writeln!(f, "    height:        {}", self.height)?;
        writeln!(f, "    channels:      {}", self.channels)?;
        writeln!(f, "    depth:         {}", self.depth())?;
        writeln!(f, "    data_type:     {}", self.data_type)?;
        writeln!(f, "    use_snappy:    {}", self.use_snappy)?;
        writeln!(f, "    data_size:     {}", self.data_size)?;
        writeln!(f, "    data_checksum: 0x{:08x}", self.data_checksum)?;
        write!(f, "}}")
    }
}

/// A validated header together with the uncompressed pixel data.
#[derive(Debug, Clone)]
pub struct Parsed<'a> {
    pub header: Header,
    pub data: Cow<'a, [u8]>,
}

/// Parses a complete RawP file.
///
/// The checksum is verified on the stored bytes before anything else reads
/// them; compressed payloads are then decompressed and the result must be
/// exactly `width * height * channels * depth / 8` bytes long.
pub fn parse_header(bytes: &[u8]) -> Result<Parsed<'_>> {
    let header = Header::from_bytes(bytes)?;
    let payload = &bytes[HEADER_SIZE..];
    // A payload cut short is damage to the file, not a bad field.
    let Some(stored) = payload.get(..header.data_size as usize) else {
        return Err(Error::SizeMismatch {
            expected: header.data_size as usize,
            actual: payload.len(),
        });
    };
    if payload.len() > stored.len() {
        trace!(trailing = payload.len() - stored.len(), "ignoring bytes after payload");
    }

    let checksum = crc32(stored);
    if checksum != header.data_checksum {
        return Err(Error::ChecksumMismatch {
            expected: header.data_checksum,
            actual: checksum,
        });
    }

    let data = if header.use_snappy {
        Cow::Owned(snappy::decode(Vec::new(), stored)?)
    } else {
        Cow::Borrowed(stored)
    };
    let expected = header.expected_payload_len();
    if data.len() != expected {
        return Err(Error::SizeMismatch {
            expected,
            actual: data.len(),
        });
    }
    Ok(Parsed { header, data })
}

/// CRC32-IEEE (reflected, polynomial 0xEDB88320).
pub fn crc32(data: &[u8]) -> u32 {
    static TABLE: OnceLock<[u32; 256]> = OnceLock::new();
    let table = TABLE.get_or_init(|| {
        let mut table = [0u32; 256];
        for (n, entry) in table.iter_mut().enumerate() {
            let mut c = n as u32;
            for _ in 0..8 {
                c = if c & 1 != 0 { 0xEDB8_8320 ^ (c >> 1) } else { c >> 1 };
            }
            *entry = c;
        }
        table
    });
    !data.iter().fold(!0u32, |c, &b| table[((c ^ u32::from(b)) & 0xFF) as usize] ^ (c >> 8))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_2x2() -> Vec<u8> {
        let payload = [10u8, 20, 30, 40];
        let mut header = Header::new(2, 2, 1, DataType::Uint8, false).unwrap();
        header.data_size = 4;
        header.data_checksum = crc32(&payload);
        let mut bytes = header.to_bytes().to_vec();
        bytes.extend_from_slice(&payload);
        bytes
    }

    #[test]
    fn crc32_matches_ieee_check_values() {
        assert_eq!(crc32(&[10, 20, 30, 40]), 0xB422_A3F1);
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(crc32(&[]), 0);
    }

    #[test]
    fn layout() {
        let bytes = gray_2x2();
        assert_eq!(bytes.len(), 28);
        assert_eq!(&bytes[0..4], b"RAWP");
        assert_eq!(&bytes[4..8], &[0x0A, 0x38, 0xF2, 0x1B]);
        assert_eq!(bytes[..8], DETECTION_SIGNATURE);
        assert_eq!(&bytes[8..16], &[2, 0, 2, 0, 1, 8, 1, 0]);
        assert_eq!(&bytes[16..20], &4u32.to_le_bytes());
    }

    #[test]
    fn parses_valid_file() {
        let bytes = gray_2x2();
        let parsed = parse_header(&bytes).unwrap();
        assert_eq!(parsed.header.width, 2);
        assert_eq!(parsed.header.height, 2);
        assert_eq!(parsed.header.color_model(), ColorModel::new(1, DataType::Uint8));
        assert!(matches!(parsed.data, Cow::Borrowed(&[10, 20, 30, 40])));
    }

    #[test]
    fn make_header_validates() {
        assert!(matches!(
            Header::new(0, 1, 1, DataType::Uint8, false),
            Err(Error::InvalidDimension { width: 0, height: 1 })
        ));
        assert!(matches!(
            Header::new(65536, 1, 1, DataType::Uint8, false),
            Err(Error::InvalidDimension { .. })
        ));
        assert!(Header::new(65535, 65535, 4, DataType::Float64, true).is_ok());
        assert!(matches!(
            Header::new(1, 1, 2, DataType::Uint8, false),
            Err(Error::InvalidChannels { channels: 2 })
        ));
    }

    #[test]
    fn rejects_bad_headers() {
        let good = gray_2x2();
        assert!(matches!(parse_header(&good[..23]), Err(Error::TruncatedHeader { len: 23 })));

        let patched = |at: usize, value: u8| {
            let mut bytes = good.clone();
            bytes[at] = value;
            parse_header(&bytes).map(|p| p.header)
        };
        assert!(matches!(patched(3, b'Q'), Err(Error::BadSignature { found }) if &found == b"RAWQ"));
        assert!(matches!(patched(4, 0), Err(Error::BadMagic { .. })));
        assert!(matches!(patched(12, 2), Err(Error::InvalidChannels { channels: 2 })));
        assert!(matches!(patched(13, 24), Err(Error::InvalidField { field: "depth", value: 24 })));
        assert!(matches!(patched(14, 3), Err(Error::InvalidField { field: "data_type", .. })));
        assert!(matches!(patched(14, 2), Err(Error::InvalidField { field: "data_type", .. })));
        assert!(matches!(patched(15, 2), Err(Error::InvalidField { field: "use_snappy", .. })));
        assert!(matches!(patched(16, 9), Err(Error::SizeMismatch { expected: 9, actual: 4 })));
        assert!(matches!(patched(16, 0), Err(Error::InvalidField { field: "data_size", value: 0 })));
        assert!(matches!(patched(8, 0), Err(Error::InvalidField { field: "width", .. })));
    }

    #[test]
    fn rejects_corrupt_payload() {
        let good = gray_2x2();
        for at in HEADER_SIZE..good.len() {
            let mut bytes = good.clone();
            bytes[at] ^= 0x01;
            assert!(matches!(parse_header(&bytes), Err(Error::ChecksumMismatch { .. })));
        }
    }

    #[test]
    fn rejects_short_payload() {
        let payload = [1u8, 2, 3];
        let mut header = Header::new(2, 2, 1, DataType::Uint8, false).unwrap();
        header.data_size = 3;
        header.data_checksum = crc32(&payload);
        let mut bytes = header.to_bytes().to_vec();
        bytes.extend_from_slice(&payload);
        assert!(matches!(
            parse_header(&bytes),
            Err(Error::SizeMismatch { expected: 4, actual: 3 })
        ));
    }

    #[test]
    fn decompresses_snappy_payload() {
        let raw = [5u8; 64];
        let stored = snappy::encode(Vec::new(), &raw);
        let mut header = Header::new(4, 4, 4, DataType::Uint8, true).unwrap();
        header.data_size = stored.len() as u32;
        header.data_checksum = crc32(&stored);
        let mut bytes = header.to_bytes().to_vec();
        bytes.extend_from_slice(&stored);
        let parsed = parse_header(&bytes).unwrap();
        assert_eq!(&*parsed.data, &raw);
        assert!(matches!(parsed.data, Cow::Owned(_)));
    }
}
