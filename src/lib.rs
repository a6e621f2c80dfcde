//! RawP: a small binary container for raw raster images.
//!
//! A file is a 24-byte little-endian header followed by the pixel payload,
//! optionally Snappy-compressed and always guarded by a CRC32 checksum. Pixels
//! are 1, 3 or 4 channels of unsigned 8/16/32/64-bit integers or 32/64-bit
//! floats, stored row by row without padding.
//!
//! ```no_run
//! use rawp::{EncodeOptions, load, save};
//!
//! let image = load("in.rawp")?;
//! save("out.rawp", &image, EncodeOptions::snappy())?;
//! # Ok::<(), rawp::Error>(())
//! ```

mod color;
mod container;
mod data_type;
mod data_view;
mod decode;
mod encode;
mod error;
mod header;
pub mod snappy;
mod source;

pub use color::*;
pub use container::*;
pub use data_type::*;
pub use data_view::*;
pub use decode::*;
pub use encode::*;
pub use error::*;
pub use header::*;
pub use source::*;
