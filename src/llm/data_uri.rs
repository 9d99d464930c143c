//! `data:` URI helpers for inline image payloads

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

/// Split a data URI into its header (`data:image/png;base64`) and payload
pub fn split_data_uri(uri: &str) -> Option<(&str, &str)> {
    let (header, payload) = uri.split_once(',')?;
    if !header.starts_with("data:") {
        return None;
    }
    Some((header, payload))
}

/// The base64 payload of a data URI, if there is a non-empty one
pub fn data_uri_payload(uri: &str) -> Option<&str> {
    split_data_uri(uri)
        .map(|(_, payload)| payload.trim())
        .filter(|payload| !payload.is_empty())
}

/// Encode raw bytes as a base64 data URI
pub fn encode_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", BASE64_STANDARD.encode(bytes))
}

/// Wrap an already base64-encoded payload as a data URI
pub fn wrap_base64(mime_type: &str, payload: &str) -> String {
    format!("data:{mime_type};base64,{payload}")
}

/// Decode a base64 data URI into its MIME type and bytes
pub fn decode_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let (header, payload) = split_data_uri(uri)?;
    let mime_type = header
        .trim_start_matches("data:")
        .strip_suffix(";base64")?
        .to_string();
    let bytes = BASE64_STANDARD.decode(payload.trim()).ok()?;
    Some((mime_type, bytes))
}
