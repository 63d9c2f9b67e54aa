//! Fixtures shared by the daemon's unit tests.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

pub use rollcall_core::encoder::test_support::ColorEncoder;

/// A `side`×`side` image of one color.
pub fn solid(side: u32, color: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(side, side, Rgb(color))
}

/// Square tiles of the given colors, left to right.
pub fn tiles(side: u32, colors: &[[u8; 3]]) -> RgbImage {
    RgbImage::from_fn(side * colors.len() as u32, side, |x, _| Rgb(colors[(x / side) as usize]))
}

fn encode_base64(image: &RgbImage, format: ImageFormat) -> String {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), format)
        .expect("image encode");
    STANDARD.encode(bytes)
}

/// Base64 JPEG, as a browser client would post it.
pub fn jpeg_base64(image: &RgbImage) -> String {
    encode_base64(image, ImageFormat::Jpeg)
}

/// Base64 PNG, what a canvas `toDataURL()` yields by default.
pub fn png_base64(image: &RgbImage) -> String {
    encode_base64(image, ImageFormat::Png)
}
