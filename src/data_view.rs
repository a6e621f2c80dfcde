//! Typed access to raw pixel bytes.
//!
//! A [`DataView`] reinterprets a byte region as elements of any [`DataType`]
//! without copying it. Elements are stored in native byte order and every
//! access is checked against `len / byte_size`.

use crate::{
    data_type::DataType,
    error::{Error, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DataView<B> {
    bytes: B,
}

macro_rules! typed_getters {
    ($($name:ident: $t:ty),* $(,)?) => {
        $(
            pub fn $name(&self, index: usize) -> Result<$t> {
                let bytes = self.element(index, size_of::<$t>())?;
                let mut array = [0u8; size_of::<$t>()];
                array.copy_from_slice(bytes);
                Ok(<$t>::from_ne_bytes(array))
            }
        )*
    };
}

macro_rules! typed_setters {
    ($($name:ident: $t:ty),* $(,)?) => {
        $(
            pub fn $name(&mut self, index: usize, value: $t) -> Result<()> {
                self.element_mut(index, size_of::<$t>())?
                    .copy_from_slice(&value.to_ne_bytes());
                Ok(())
            }
        )*
    };
}

impl<B: AsRef<[u8]>> DataView<B> {
    pub fn new(bytes: B) -> Self {
        Self { bytes }
    }

    pub fn into_inner(self) -> B {
        self.bytes
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.as_ref()
    }

    /// Number of whole `data_type` elements in the view.
    pub fn len(&self, data_type: DataType) -> usize {
        self.bytes.as_ref().len() / data_type.byte_size()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.as_ref().is_empty()
    }

    fn element(&self, index: usize, size: usize) -> Result<&[u8]> {
        let bytes = self.bytes.as_ref();
        let len = bytes.len() / size;
        if index >= len {
            return Err(Error::IndexOutOfRange { index, len });
        }
        Ok(&bytes[index * size..][..size])
    }

    typed_getters! {
        u8: u8,
        u16: u16,
        u32: u32,
        u64: u64,
        f32: f32,
        f64: f64,
    }

    /// Reads element `index` as `data_type` and widens it to `f64`.
    pub fn value_as_f64(&self, index: usize, data_type: DataType) -> Result<f64> {
        Ok(match data_type {
            DataType::Uint8 => self.u8(index)? as f64,
            DataType::Uint16 => self.u16(index)? as f64,
            DataType::Uint32 => self.u32(index)? as f64,
            DataType::Uint64 => self.u64(index)? as f64,
            DataType::Float32 => self.f32(index)? as f64,
            DataType::Float64 => self.f64(index)?,
        })
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> DataView<B> {
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.bytes.as_mut()
    }

    fn element_mut(&mut self, index: usize, size: usize) -> Result<&mut [u8]> {
        let bytes = self.bytes.as_mut();
        let len = bytes.len() / size;
        if index >= len {
            return Err(Error::IndexOutOfRange { index, len });
        }
        Ok(&mut bytes[index * size..][..size])
    }

    typed_setters! {
        set_u8: u8,
        set_u16: u16,
        set_u32: u32,
        set_u64: u64,
        set_f32: f32,
        set_f64: f64,
    }

    /// Narrows `value` to `data_type` and stores it at `index`.
    ///
    /// Integer targets truncate toward zero and saturate at their bounds
    /// (NaN becomes 0).
    pub fn set_value_from_f64(&mut self, index: usize, data_type: DataType, value: f64) -> Result<()> {
        match data_type {
            DataType::Uint8 => self.set_u8(index, value as u8),
            DataType::Uint16 => self.set_u16(index, value as u16),
            DataType::Uint32 => self.set_u32(index, value as u32),
            DataType::Uint64 => self.set_u64(index, value as u64),
            DataType::Float32 => self.set_f32(index, value as f32),
            DataType::Float64 => self.set_f64(index, value),
        }
    }
}

/// Appends `value` narrowed to `data_type` in native byte order, with the
/// same casts as `DataView::set_value_from_f64`.
pub(crate) fn push_f64(out: &mut Vec<u8>, data_type: DataType, value: f64) {
    match data_type {
        DataType::Uint8 => out.push(value as u8),
        DataType::Uint16 => out.extend_from_slice(&(value as u16).to_ne_bytes()),
        DataType::Uint32 => out.extend_from_slice(&(value as u32).to_ne_bytes()),
        DataType::Uint64 => out.extend_from_slice(&(value as u64).to_ne_bytes()),
        DataType::Float32 => out.extend_from_slice(&(value as f32).to_ne_bytes()),
        DataType::Float64 => out.extend_from_slice(&value.to_ne_bytes()),
    }
}

/// Reverses the byte order of every `element_size`-byte element in `data`.
///
/// Trailing bytes that do not form a whole element are left alone.
pub fn swap_endian(data: &mut [u8], element_size: usize) -> Result<()> {
    match element_size {
        1 => {}
        2 | 4 | 8 => data
            .chunks_exact_mut(element_size)
            .for_each(|element| element.reverse()),
        _ => {
            return Err(Error::InvalidField {
                field: "element_size",
                value: element_size as u32,
            });
        }
    }
    Ok(())
}

/// Converts between native element order and the little-endian payload order.
pub(crate) fn native_to_little_endian(data: &mut [u8], element_size: usize) -> Result<()> {
    if cfg!(target_endian = "big") {
        swap_endian(data, element_size)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn views_alias_the_same_bytes() {
        let mut view = DataView::new(vec![0u8; 8]);
        view.set_u32(1, 0xDEAD_BEEF).unwrap();
        assert_eq!(view.u32(1).unwrap(), 0xDEAD_BEEF);
        assert_eq!(&view.as_bytes()[4..], &0xDEAD_BEEFu32.to_ne_bytes());
        assert_eq!(view.u64(0).unwrap(), u64::from_ne_bytes(*view.as_bytes().first_chunk().unwrap()));
        assert_eq!(view.len(DataType::Uint16), 4);
    }

    #[test]
    fn out_of_range_is_an_error() {
        let view = DataView::new([0u8; 7]);
        assert!(matches!(view.u64(0), Err(Error::IndexOutOfRange { index: 0, len: 0 })));
        assert!(matches!(view.u16(3), Err(Error::IndexOutOfRange { index: 3, len: 3 })));
        assert!(view.u16(2).is_ok());
    }

    #[test]
    fn float_accessors_truncate_and_saturate() {
        let mut view = DataView::new([0u8; 16]);
        view.set_value_from_f64(0, DataType::Uint8, 200.9).unwrap();
        assert_eq!(view.u8(0).unwrap(), 200);
        view.set_value_from_f64(0, DataType::Uint8, 300.0).unwrap();
        assert_eq!(view.u8(0).unwrap(), 255);
        view.set_value_from_f64(0, DataType::Uint16, -4.0).unwrap();
        assert_eq!(view.u16(0).unwrap(), 0);
        view.set_value_from_f64(1, DataType::Float64, 0.25).unwrap();
        assert_eq!(view.value_as_f64(1, DataType::Float64).unwrap(), 0.25);
        view.set_value_from_f64(1, DataType::Float32, 1.5).unwrap();
        assert_eq!(view.value_as_f64(1, DataType::Float32).unwrap(), 1.5);
    }

    #[test]
    fn push_matches_setter() {
        for data_type in DataType::ALL {
            for value in [-1.5, 0.0, 7.9, 300.0, 1e12] {
                let mut pushed = Vec::new();
                push_f64(&mut pushed, data_type, value);
                let mut view = DataView::new(vec![0u8; data_type.byte_size()]);
                view.set_value_from_f64(0, data_type, value).unwrap();
                assert_eq!(pushed, view.into_inner(), "{data_type} {value}");
            }
        }
    }

    #[test]
    fn swap_reverses_each_element() {
        let mut data = [1u8, 2, 3, 4, 5, 6, 7, 8, 9];
        swap_endian(&mut data, 4).unwrap();
        assert_eq!(data, [4, 3, 2, 1, 8, 7, 6, 5, 9]);
        swap_endian(&mut data, 2).unwrap();
        assert_eq!(data, [3, 4, 1, 2, 7, 8, 5, 6, 9]);
        assert!(swap_endian(&mut data, 3).is_err());
    }
}
