use anyhow::{Error, Result};
use base64::{engine::general_purpose, Engine as _};

/// `data:<mime>;base64,<payload>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime_type: Option<String>,
    pub data: Vec<u8>,
}

impl DataUrl {
    /// Everything after the first comma is the base64 payload. The header is
    /// read only for its mime type and never rejected.
    pub fn parse(s: &str) -> Result<DataUrl> {
        let Some((header, payload)) = s.split_once(',') else {
            return Err(Error::msg("image data is not a data url, missing ','"));
        };

        let data = general_purpose::STANDARD.decode(payload.trim())?;

        Ok(DataUrl {
            mime_type: parse_mime(header),
            data,
        })
    }
}

pub fn encode(mime_type: &str, data: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        general_purpose::STANDARD.encode(data)
    )
}

fn parse_mime(header: &str) -> Option<String> {
    let rest = header.strip_prefix("data:")?;
    let mime = rest.split(';').next()?.trim();

    if mime.is_empty() {
        None
    } else {
        Some(mime.to_string())
    }
}
