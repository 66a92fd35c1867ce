use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine as _};

/// Build a self-contained inline image representation: media type plus
/// base64 payload, displayable without a separate fetch.
pub fn encode_data_uri(media_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        media_type,
        general_purpose::STANDARD.encode(bytes)
    )
}

/// Split a data URI back into its media type and raw bytes.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| anyhow!("not a data URI"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| anyhow!("data URI missing payload separator"))?;
    let media_type = match meta.strip_suffix(";base64") {
        Some(mt) => mt,
        None => return Err(anyhow!("only base64 data URIs are supported")),
    };
    let bytes = general_purpose::STANDARD.decode(payload)?;
    Ok((media_type.to_string(), bytes))
}
