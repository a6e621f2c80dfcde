use super::{SnappyError, TAG_COPY1, TAG_COPY2, TAG_COPY4, TAG_LITERAL};

/// Upper bound on output bytes per input byte: a 3-byte Copy-2 yields 64.
const MAX_EXPANSION: usize = 22;

/// Returns the uncompressed length declared by `src`.
pub fn decoded_len(src: &[u8]) -> Result<usize, SnappyError> {
    decode_header(src).map(|(len, _)| len)
}

/// Parses the varint length prefix, returning the length and the number of
/// bytes it occupied.
fn decode_header(src: &[u8]) -> Result<(usize, usize), SnappyError> {
    let mut value = 0u64;
    for (i, &byte) in src.iter().enumerate().take(10) {
        if i == 9 && byte > 1 {
            return Err(SnappyError::CorruptInput);
        }
        value |= u64::from(byte & 0x7F) << (7 * i);
        if byte < 0x80 {
            if value > u64::from(u32::MAX) {
                return Err(SnappyError::CorruptInput);
            }
            let len = usize::try_from(value).map_err(|_| SnappyError::CorruptInput)?;
            return Ok((len, i + 1));
        }
    }
    Err(SnappyError::CorruptInput)
}

/// Decodes the block in `src`, reusing `dst`'s allocation for the output.
pub fn decode(mut dst: Vec<u8>, src: &[u8]) -> Result<Vec<u8>, SnappyError> {
    let (len, mut s) = decode_header(src)?;
    if len > (src.len() - s).saturating_mul(MAX_EXPANSION) {
        return Err(SnappyError::CorruptInput);
    }
    dst.clear();
    dst.resize(len, 0);

    let mut d = 0usize;
    while s < src.len() {
        let tag = src[s];
        let (offset, length) = match tag & 0x03 {
            TAG_LITERAL => {
                let x = usize::from(tag >> 2);
                let length = if x < 60 {
                    s += 1;
                    x + 1
                } else {
                    // 60..=63 announce 1..=4 little-endian length bytes.
                    let extra = x - 59;
                    let bytes = src
                        .get(s + 1..s + 1 + extra)
                        .ok_or(SnappyError::CorruptInput)?;
                    s += 1 + extra;
                    let stored = bytes
                        .iter()
                        .rev()
                        .fold(0usize, |acc, &b| (acc << 8) | usize::from(b));
                    stored.checked_add(1).ok_or(SnappyError::CorruptInput)?
                };
                if length > dst.len() - d || length > src.len() - s {
                    return Err(SnappyError::CorruptInput);
                }
                dst[d..d + length].copy_from_slice(&src[s..s + length]);
                d += length;
                s += length;
                continue;
            }
            TAG_COPY1 => {
                let bytes = src.get(s..s + 2).ok_or(SnappyError::CorruptInput)?;
                s += 2;
                let length = 4 + usize::from((tag >> 2) & 0x07);
                let offset = (usize::from(tag & 0xE0) << 3) | usize::from(bytes[1]);
                (offset, length)
            }
            TAG_COPY2 => {
                let bytes = src.get(s..s + 3).ok_or(SnappyError::CorruptInput)?;
                s += 3;
                let length = 1 + usize::from(tag >> 2);
                let offset = usize::from(u16::from_le_bytes([bytes[1], bytes[2]]));
                (offset, length)
            }
            TAG_COPY4 => return Err(SnappyError::UnsupportedTag),
            _ => unreachable!(),
        };

        let end = d + length;
        if offset == 0 || offset > d || end > dst.len() {
            return Err(SnappyError::CorruptInput);
        }
        // Byte by byte: the ranges overlap whenever offset < length.
        for i in d..end {
            dst[i] = dst[i - offset];
        }
        d = end;
    }

    if d != len {
        return Err(SnappyError::CorruptInput);
    }
    Ok(dst)
}
