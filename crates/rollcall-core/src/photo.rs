//! Base64 photo payloads as sent by the browser client.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhotoError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid image: {0}")]
    Image(#[from] image::ImageError),
}

/// Strip a `data:<mime>;base64,` prefix, if present.
pub fn strip_data_uri(payload: &str) -> &str {
    let trimmed = payload.trim();
    match trimmed.strip_prefix("data:") {
        Some(rest) => match rest.find(";base64,") {
            Some(pos) => &rest[pos + ";base64,".len()..],
            None => trimmed,
        },
        None => trimmed,
    }
}

pub fn decode_base64(payload: &str) -> Result<Vec<u8>, PhotoError> {
    Ok(STANDARD.decode(payload.trim())?)
}

/// Decode a (possibly data-URI prefixed) base64 photo into RGB pixels.
pub fn decode_photo(payload: &str) -> Result<RgbImage, PhotoError> {
    let bytes = decode_base64(strip_data_uri(payload))?;
    Ok(image::load_from_memory(&bytes)?.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;

    fn png_base64(width: u32, height: u32) -> String {
        let mut bytes = Vec::new();
        RgbImage::from_pixel(width, height, Rgb([10, 20, 30]))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        STANDARD.encode(bytes)
    }

    #[test]
    fn test_strip_data_uri() {
        assert_eq!(strip_data_uri("data:image/jpeg;base64,QUJD"), "QUJD");
        assert_eq!(strip_data_uri("data:image/png;base64,QUJD"), "QUJD");
        assert_eq!(strip_data_uri("QUJD"), "QUJD");
        assert_eq!(strip_data_uri("  QUJD\n"), "QUJD");
    }

    #[test]
    fn test_decode_photo_with_prefix() {
        let payload = format!("data:image/png;base64,{}", png_base64(3, 2));
        let image = decode_photo(&payload).unwrap();
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(decode_photo("!!not base64!!"), Err(PhotoError::Base64(_))));
        assert!(matches!(
            decode_photo(&STANDARD.encode(b"plain text")),
            Err(PhotoError::Image(_))
        ));
    }
}
