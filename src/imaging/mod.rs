/// Image handling for cached photos
///
/// This module handles:
/// - Producing the placeholder bytes stored in unmaterialized photos
/// - Checking that downloaded payloads really are images before caching them

pub mod placeholder;

use crate::error::Result;

/// Verify that `bytes` decode as an image
///
/// A photo record only ever holds the placeholder or a complete image,
/// so anything that fails to decode is rejected before it reaches the store.
/// Returns the decoded dimensions.
pub fn validate_image(bytes: &[u8]) -> Result<(u32, u32)> {
    let img = image::load_from_memory(bytes)?;
    Ok((img.width(), img.height()))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_jpeg() {
        let bytes = test_support::sample_jpeg(10);
        assert_eq!(validate_image(&bytes).unwrap(), (8, 8));
    }

    #[test]
    fn test_validate_rejects_garbage() {
        assert!(validate_image(b"<html>rate limited</html>").is_err());
    }

    #[test]
    fn test_validate_rejects_truncated_image() {
        let bytes = test_support::sample_jpeg(10);
        assert!(validate_image(&bytes[..bytes.len() / 3]).is_err());
    }
}
