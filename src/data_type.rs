use derive_more::Display;

use crate::error::{Error, Result};

/// Header tag for unsigned integer channels.
pub(crate) const TAG_UINT: u8 = 1;
/// Header tag for signed integer channels. Reserved, never written or accepted.
#[allow(dead_code)]
pub(crate) const TAG_INT: u8 = 2;
/// Header tag for floating point channels.
pub(crate) const TAG_FLOAT: u8 = 3;

/// Numeric encoding of a single channel value.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataType {
    #[default]
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
}

impl DataType {
    pub const ALL: [Self; 6] = [
        Self::Uint8,
        Self::Uint16,
        Self::Uint32,
        Self::Uint64,
        Self::Float32,
        Self::Float64,
    ];

    pub const fn byte_size(self) -> usize {
        match self {
            Self::Uint8 => 1,
            Self::Uint16 => 2,
            Self::Uint32 | Self::Float32 => 4,
            Self::Uint64 | Self::Float64 => 8,
        }
    }

    /// Bits per channel, as stored in the header's `Depth` field.
    pub const fn depth(self) -> u8 {
        (self.byte_size() * 8) as u8
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// The header's `DataType` tag.
    pub const fn tag(self) -> u8 {
        if self.is_float() { TAG_FLOAT } else { TAG_UINT }
    }

    /// Inverse of `(depth(), tag())`.
    pub fn from_parts(depth: u8, tag: u8) -> Result<Self> {
        match (depth, tag) {
            (8, TAG_UINT) => Ok(Self::Uint8),
            (16, TAG_UINT) => Ok(Self::Uint16),
            (32, TAG_UINT) => Ok(Self::Uint32),
            (64, TAG_UINT) => Ok(Self::Uint64),
            (32, TAG_FLOAT) => Ok(Self::Float32),
            (64, TAG_FLOAT) => Ok(Self::Float64),
            _ => Err(Error::UnsupportedDataType { depth, tag }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_roundtrip() {
        for data_type in DataType::ALL {
            let parsed = DataType::from_parts(data_type.depth(), data_type.tag()).unwrap();
            assert_eq!(parsed, data_type);
        }
    }

    #[test]
    fn narrow_floats_are_rejected() {
        assert!(matches!(
            DataType::from_parts(16, TAG_FLOAT),
            Err(Error::UnsupportedDataType { depth: 16, tag: 3 })
        ));
        assert!(DataType::from_parts(32, TAG_INT).is_err());
    }
}
