//! Snappy block format, used for the optional payload compression.
//!
//! A block is a varint of the uncompressed length followed by tagged chunks.
//! The low two bits of every tag byte select the chunk kind.

use derive_more::{Display, Error};

mod decode;
mod encode;

pub use decode::*;
pub use encode::*;

pub(crate) const TAG_LITERAL: u8 = 0x00;
pub(crate) const TAG_COPY1: u8 = 0x01;
pub(crate) const TAG_COPY2: u8 = 0x02;
pub(crate) const TAG_COPY4: u8 = 0x03;

/// Blocks are encoded in independent runs of at most this many bytes, which
/// keeps every back-reference within a Copy-2 offset.
pub(crate) const MAX_BLOCK_SIZE: usize = 1 << 16;

#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum SnappyError {
    #[display("corrupt input")]
    CorruptInput,
    #[display("unsupported COPY_4 tag")]
    UnsupportedTag,
}
