#![allow(dead_code)]

use nanorand::{Rng, WyRand};
use rawp::{DataType, Image, Rectangle};
use tracing_subscriber::EnvFilter;

pub const CHANNELS: [usize; 3] = [1, 3, 4];

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// An image of the given layout filled with noise.
pub fn noise(width: u32, height: u32, channels: usize, data_type: DataType, seed: u64) -> Image {
    let mut rng = WyRand::new_seed(seed);
    let len = width as usize * height as usize * channels * data_type.byte_size();
    let pix = (0..len).map(|_| rng.generate::<u8>()).collect();
    Image::from_raw(Rectangle::from_size(width, height), channels, data_type, pix).unwrap()
}

/// A gradient with long runs, compresses well.
pub fn gradient(width: u32, height: u32, channels: usize, data_type: DataType) -> Image {
    let image = Image::new(Rectangle::from_size(width, height), channels, data_type).unwrap();
    for y in 0..height {
        for x in 0..width {
            let mut pixel = image.at(x, y);
            for c in 0..channels {
                pixel.set_channel(c, f64::from((y * 3 + c as u32) % 250)).unwrap();
            }
            image.set(x, y, &pixel);
        }
    }
    image
}
