use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use grid_core::{GridError, Result};
use tiny_skia::Pixmap;

use crate::raster::encode_png;

/// `data:<mime>;base64,<payload>`
pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

pub fn png_data_url(pixmap: &Pixmap) -> Result<String> {
    Ok(encode_data_url("image/png", &encode_png(pixmap)?))
}

/// Splits a base64 data URL into its media type and decoded bytes.
pub fn decode_data_url(url: &str) -> Result<(String, Vec<u8>)> {
    let rest = url
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| GridError::ImageLoad("not a data URL".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| GridError::ImageLoad("data URL has no payload".to_string()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| GridError::ImageLoad("data URL is not base64 encoded".to_string()))?;
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| GridError::ImageLoad(format!("base64: {e}")))?;
    Ok((mime.to_string(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_media_type_and_payload() {
        let (mime, bytes) = decode_data_url("data:image/webp;base64,AAEC").unwrap();
        assert_eq!(mime, "image/webp");
        assert_eq!(bytes, vec![0, 1, 2]);
        assert_eq!(encode_data_url("image/webp", &bytes), "data:image/webp;base64,AAEC");
    }

    #[test]
    fn rejects_malformed_urls() {
        for bad in [
            "image/png;base64,AAEC",
            "data:image/png;base64",
            "data:image/png,plain",
            "data:image/png;base64,@@@",
        ] {
            assert!(matches!(decode_data_url(bad), Err(GridError::ImageLoad(_))), "{bad}");
        }
    }

    #[test]
    fn png_data_url_has_png_signature() {
        let p = Pixmap::new(2, 2).unwrap();
        let url = png_data_url(&p).unwrap();
        let (mime, bytes) = decode_data_url(&url).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(&bytes[1..4], b"PNG");
    }
}
