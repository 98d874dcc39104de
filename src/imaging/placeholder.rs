use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::OnceLock;

/// Size of the placeholder image (square)
const PLACEHOLDER_SIZE: u32 = 120;

/// Neutral gray shown while a photo is downloading
const PLACEHOLDER_COLOR: Rgb<u8> = Rgb([200, 200, 200]);

static PLACEHOLDER_PNG: OnceLock<Vec<u8>> = OnceLock::new();

/// The encoded placeholder image
///
/// Encoding is deterministic, so every photo record created with these
/// bytes compares equal to them until it is materialized.
pub fn placeholder_bytes() -> &'static [u8] {
    PLACEHOLDER_PNG.get_or_init(|| {
        let img = RgbImage::from_pixel(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, PLACEHOLDER_COLOR);
        let mut buf = Cursor::new(Vec::new());
        // Encoding a fixed in-memory image to PNG cannot fail
        img.write_to(&mut buf, ImageFormat::Png)
            .expect("Failed to encode placeholder PNG");
        buf.into_inner()
    })
}

/// Check whether cached bytes are still the placeholder
pub fn is_placeholder(bytes: &[u8]) -> bool {
    bytes == placeholder_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_is_png() {
        let bytes = placeholder_bytes();
        assert_eq!(image::guess_format(bytes).unwrap(), ImageFormat::Png);
        assert_eq!(
            crate::imaging::validate_image(bytes).unwrap(),
            (PLACEHOLDER_SIZE, PLACEHOLDER_SIZE)
        );
    }

    #[test]
    fn test_placeholder_detection() {
        assert!(is_placeholder(placeholder_bytes()));
        assert!(!is_placeholder(&crate::imaging::test_support::sample_jpeg(1)));

        let mut altered = placeholder_bytes().to_vec();
        altered.push(0);
        assert!(!is_placeholder(&altered));
    }
}
