use std::io;

use derive_more::{Display, Error, From};
use image::error::{DecodingError, ImageError, ImageFormatHint};

use crate::snappy::SnappyError;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while building, parsing or accessing a RawP image.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    #[display("truncated header: got {len} bytes, need 24")]
    TruncatedHeader { len: usize },
    #[display("bad signature {found:?}")]
    BadSignature { found: [u8; 4] },
    #[display("bad magic 0x{found:08x}")]
    BadMagic { found: u32 },
    #[display("invalid header field {field} = {value}")]
    InvalidField { field: &'static str, value: u32 },

    #[display("invalid dimension {width}x{height}")]
    InvalidDimension { width: u32, height: u32 },
    #[display("invalid number of channels: {channels}")]
    InvalidChannels { channels: usize },
    #[display("unsupported data type: depth = {depth}, tag = {tag}")]
    UnsupportedDataType { depth: u8, tag: u8 },
    #[display("index {index} out of range for {len} elements")]
    IndexOutOfRange { index: usize, len: usize },

    #[display("payload size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[display("bad checksum: expected 0x{expected:08x}, got 0x{actual:08x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[display("snappy: {_0}")]
    #[from]
    Compression(#[error(source)] SnappyError),
    #[display("{_0}")]
    #[from]
    Io(#[error(source)] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad signature, magic or header field.
    Format,
    /// Checksum or size mismatch, the payload is corrupt or truncated.
    Integrity,
    Compression,
    /// Out-of-range input supplied by the caller.
    Validation,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TruncatedHeader { .. }
            | Self::BadSignature { .. }
            | Self::BadMagic { .. }
            | Self::InvalidField { .. } => ErrorKind::Format,
            Self::InvalidDimension { .. }
            | Self::InvalidChannels { .. }
            | Self::UnsupportedDataType { .. }
            | Self::IndexOutOfRange { .. } => ErrorKind::Validation,
            Self::SizeMismatch { .. } | Self::ChecksumMismatch { .. } => ErrorKind::Integrity,
            Self::Compression(_) => ErrorKind::Compression,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<Error> for ImageError {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => ImageError::IoError(e),
            other => ImageError::Decoding(DecodingError::new(ImageFormatHint::Name("RawP".to_owned()), other)),
        }
    }
}
