use super::{MAX_BLOCK_SIZE, TAG_COPY1, TAG_COPY2, TAG_LITERAL};

const HASH_BITS: u32 = 14;

/// Worst-case size of `encode`'s output for `src_len` input bytes.
pub fn max_encoded_len(src_len: usize) -> usize {
    32 + src_len + src_len / 6
}

/// Compresses `src` into `dst` (whose previous contents are discarded).
pub fn encode(mut dst: Vec<u8>, src: &[u8]) -> Vec<u8> {
    dst.clear();
    dst.reserve(max_encoded_len(src.len()));
    let mut len = src.len() as u64;
    while len >= 0x80 {
        dst.push(len as u8 | 0x80);
        len >>= 7;
    }
    dst.push(len as u8);

    let mut table = vec![0u32; 1 << HASH_BITS];
    for block in src.chunks(MAX_BLOCK_SIZE) {
        table.fill(0);
        encode_block(&mut dst, block, &mut table);
    }
    dst
}

fn hash(bytes: [u8; 4]) -> usize {
    (u32::from_le_bytes(bytes).wrapping_mul(0x1E35_A7BD) >> (32 - HASH_BITS)) as usize
}

fn load4(src: &[u8], at: usize) -> [u8; 4] {
    [src[at], src[at + 1], src[at + 2], src[at + 3]]
}

/// Greedy single-pass matcher. `table` maps a 4-byte hash to the last
/// position seen plus one, so zero means empty.
fn encode_block(dst: &mut Vec<u8>, src: &[u8], table: &mut [u32]) {
    let mut s = 0usize;
    let mut lit = 0usize;
    while s + 3 < src.len() {
        let current = load4(src, s);
        let slot = &mut table[hash(current)];
        let candidate = *slot as usize;
        *slot = (s + 1) as u32;
        if candidate == 0 || load4(src, candidate - 1) != current {
            // Skip faster through incompressible runs.
            s += 1 + ((s - lit) >> 5);
            continue;
        }
        let mut t = candidate - 1;
        if lit != s {
            emit_literal(dst, &src[lit..s]);
        }
        let start = s;
        s += 4;
        t += 4;
        while s < src.len() && src[s] == src[t] {
            s += 1;
            t += 1;
        }
        emit_copy(dst, s - t, s - start);
        lit = s;
    }
    if lit != src.len() {
        emit_literal(dst, &src[lit..]);
    }
}

fn emit_literal(dst: &mut Vec<u8>, literal: &[u8]) {
    let n = literal.len() - 1;
    if n < 60 {
        dst.push(((n as u8) << 2) | TAG_LITERAL);
    } else {
        let bytes = (n as u32).to_le_bytes();
        let extra = match n {
            0..0x100 => 1,
            0x100..0x1_0000 => 2,
            0x1_0000..0x100_0000 => 3,
            _ => 4,
        };
        dst.push(((59 + extra as u8) << 2) | TAG_LITERAL);
        dst.extend_from_slice(&bytes[..extra]);
    }
    dst.extend_from_slice(literal);
}

fn emit_copy(dst: &mut Vec<u8>, offset: usize, mut length: usize) {
    while length > 0 {
        if (4..12).contains(&length) && offset < 1 << 11 {
            dst.push((((offset >> 8) as u8) << 5) | (((length - 4) as u8) << 2) | TAG_COPY1);
            dst.push(offset as u8);
            return;
        }
        let chunk = length.min(64);
        dst.push((((chunk - 1) as u8) << 2) | TAG_COPY2);
        dst.extend_from_slice(&(offset as u16).to_le_bytes());
        length -= chunk;
    }
}
