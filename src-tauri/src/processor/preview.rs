//! Preview decoding and upload validation.
//!
//! The processor ships previews as `data:<mime>;base64,<payload>` URLs. They
//! are decoded and checked with `image` before the session accepts them, so a
//! truncated response never reaches the view.

use base64::{engine::general_purpose::STANDARD, Engine};
use image::ImageFormat;
use tracing::debug;

use super::types::Preview;
use crate::error::RetouchError;

/// Decode a data URL (or a bare base64 payload) into a checked preview.
pub fn decode_data_url(data: &str, fallback_mime: &str) -> Result<Preview, RetouchError> {
    let (mime_type, payload) = split_data_url(data, fallback_mime);

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| RetouchError::InvalidImage(format!("Invalid base64 preview: {}", e)))?;

    let img = image::load_from_memory(&bytes)
        .map_err(|e| RetouchError::InvalidImage(format!("Preview is not a readable image: {}", e)))?;
    debug!("Decoded {} preview: {}x{}", mime_type, img.width(), img.height());

    Ok(Preview {
        mime_type,
        bytes,
        width: img.width(),
        height: img.height(),
    })
}

/// Re-encode a preview for an `<img src>` attribute.
pub fn to_data_url(preview: &Preview) -> String {
    format!(
        "data:{};base64,{}",
        preview.mime_type,
        STANDARD.encode(&preview.bytes)
    )
}

/// Guess the MIME type of an image about to be uploaded.
///
/// # Errors
/// Bytes that are not a recognised image format are rejected locally, the
/// same check the processor applies to the multipart content type.
pub fn sniff_mime(bytes: &[u8]) -> Result<&'static str, RetouchError> {
    let format = image::guess_format(bytes)
        .map_err(|_| RetouchError::Upload("File must be an image".to_string()))?;
    Ok(mime_for(format))
}

fn mime_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Tiff => "image/tiff",
        ImageFormat::Ico => "image/x-icon",
        _ => "application/octet-stream",
    }
}

fn split_data_url<'a>(data: &'a str, fallback_mime: &str) -> (String, &'a str) {
    match data.strip_prefix("data:").and_then(|rest| rest.split_once(',')) {
        Some((header, payload)) => {
            let mime = header
                .strip_suffix(";base64")
                .unwrap_or(header)
                .to_string();
            let mime = if mime.is_empty() {
                fallback_mime.to_string()
            } else {
                mime
            };
            (mime, payload)
        }
        None => (fallback_mime.to_string(), data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::new_rgb8(width, height);
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_decode_data_url_png() {
        let url = format!("data:image/png;base64,{}", STANDARD.encode(png_bytes(12, 7)));
        let preview = decode_data_url(&url, "image/jpeg").unwrap();
        assert_eq!(preview.mime_type, "image/png");
        assert_eq!((preview.width, preview.height), (12, 7));
    }

    #[test]
    fn test_decode_bare_payload_uses_fallback_mime() {
        let payload = STANDARD.encode(png_bytes(3, 3));
        let preview = decode_data_url(&payload, "image/png").unwrap();
        assert_eq!(preview.mime_type, "image/png");
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        let err = decode_data_url("data:image/png;base64,@@@", "image/png").unwrap_err();
        assert!(matches!(err, RetouchError::InvalidImage(_)));
    }

    #[test]
    fn test_decode_rejects_non_image_payload() {
        let url = format!("data:image/png;base64,{}", STANDARD.encode(b"hello"));
        let err = decode_data_url(&url, "image/png").unwrap_err();
        assert!(err.to_string().contains("not a readable image"));
    }

    #[test]
    fn test_to_data_url_round_trips_bytes() {
        let bytes = png_bytes(4, 4);
        let url = format!("data:image/png;base64,{}", STANDARD.encode(&bytes));
        let preview = decode_data_url(&url, "image/png").unwrap();
        assert_eq!(to_data_url(&preview), url);
    }

    #[test]
    fn test_sniff_mime() {
        assert_eq!(sniff_mime(&png_bytes(2, 2)).unwrap(), "image/png");
        let err = sniff_mime(b"plain text").unwrap_err();
        assert!(matches!(err, RetouchError::Upload(_)));
    }
}
