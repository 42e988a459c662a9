//! `data:` URL encoding and decoding

use crate::fetch::Payload;
use crate::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as Base64Engine;

/// Media type of rasterized output
pub const PNG_MEDIA_TYPE: &str = "image/png";

/// Media type used when handing a rendered SVG to the rendering engine
pub const SVG_MEDIA_TYPE: &str = "image/svg+xml";

/// Build `data:{content_type};base64,{payload}`.
///
/// Text payloads are base64-encoded from their UTF-8 bytes.
pub fn encode(content_type: &str, payload: &Payload) -> Result<String> {
    encode_bytes(content_type, payload.as_bytes())
}

pub fn encode_bytes(content_type: &str, bytes: &[u8]) -> Result<String> {
    let content_type = content_type.trim();
    if content_type.is_empty() {
        return Err(Error::EncodeError("missing media type".into()));
    }
    // A comma would end the media type early
    if content_type.contains(',') {
        return Err(Error::EncodeError(format!("invalid media type {:?}", content_type)));
    }

    Ok(format!("data:{};base64,{}", content_type, STANDARD.encode(bytes)))
}

/// Decode a base64 `data:` URL of the given media type back into bytes.
pub fn decode(data_url: &str, content_type: &str) -> Result<Vec<u8>> {
    let prefix = format!("data:{};base64,", content_type);
    let encoded = data_url.strip_prefix(&prefix).ok_or_else(|| {
        let head: String = data_url.chars().take(32).collect();
        Error::EncodeError(format!("expected a {} data URL, got {:?}", content_type, head))
    })?;

    STANDARD
        .decode(encoded.trim())
        .map_err(|e| Error::EncodeError(format!("invalid base64 payload: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_binary_payload() {
        let bytes = vec![0x89, b'P', b'N', b'G'];
        let url = encode(PNG_MEDIA_TYPE, &Payload::Binary(bytes.clone())).unwrap();
        assert_eq!(url, format!("data:image/png;base64,{}", STANDARD.encode(&bytes)));
    }

    #[test]
    fn encodes_text_as_utf8() {
        let url = encode("text/css", &Payload::Text("é{}".into())).unwrap();
        assert_eq!(url, "data:text/css;base64,w6l7fQ==");
    }

    #[test]
    fn keeps_content_type_parameters() {
        let url = encode("text/css; charset=utf-8", &Payload::Text("a".into())).unwrap();
        assert!(url.starts_with("data:text/css; charset=utf-8;base64,"));
    }

    #[test]
    fn rejects_unusable_media_types() {
        assert!(matches!(encode("", &Payload::Text("a".into())), Err(Error::EncodeError(_))));
        assert!(matches!(encode("text/a,b", &Payload::Text("a".into())), Err(Error::EncodeError(_))));
    }

    #[test]
    fn decode_requires_matching_prefix() {
        assert_eq!(decode("data:image/png;base64,AQID", PNG_MEDIA_TYPE).unwrap(), vec![1, 2, 3]);
        assert!(matches!(decode("data:,", PNG_MEDIA_TYPE), Err(Error::EncodeError(_))));
        assert!(matches!(decode("data:image/png;base64,@@", PNG_MEDIA_TYPE), Err(Error::EncodeError(_))));
        assert_eq!(decode("data:image/png;base64,", PNG_MEDIA_TYPE).unwrap(), Vec::<u8>::new());
    }
}
