use std::collections::HashMap;

use anyhow::{Ok, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use url::Url;

use super::{http_client, SketchImage};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/";

/// Anything that turns a prompt plus an image into content parts.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Returns the parts of the first candidate.
    async fn generate_content(&self, prompt: &str, image: &SketchImage) -> Result<Vec<Part>>;
}

/// One piece of model output. The API sends parts as objects carrying
/// exactly one of `inlineData` or `text`; anything else lands in `Other`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Part {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
    Text {
        text: String,
    },
    Other(serde_json::Value),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn inline(mime_type: impl Into<String>, data: &[u8]) -> Self {
        Part::InlineData {
            inline_data: Blob {
                mime_type: mime_type.into(),
                data: general_purpose::STANDARD.encode(data),
            },
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    /// base64
    pub data: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Generated {
    Image(InlineImage),
    /// No image came back; holds the model's first text part, if any.
    NoImage(String),
}

/// The first inline part wins. Without one, the first text part is the
/// model's explanation.
pub fn extract_image(parts: &[Part]) -> Result<Generated> {
    let inline = parts.iter().find_map(|part| match part {
        Part::InlineData { inline_data } => Some(inline_data),
        _ => None,
    });

    if let Some(blob) = inline {
        let data = general_purpose::STANDARD.decode(&blob.data)?;
        return Ok(Generated::Image(InlineImage {
            mime_type: blob.mime_type.clone(),
            data: Bytes::from(data),
        }));
    }

    let text = parts
        .iter()
        .find_map(|part| match part {
            Part::Text { text } => Some(text.clone()),
            _ => None,
        })
        .unwrap_or_default();

    Ok(Generated::NoImage(text))
}

///
/// models/{model}:generateContent
///
/// curl -s -X POST \
/// -H "x-goog-api-key: $GOOGLE_API_KEY" \
/// -H "Content-Type: application/json" \
/// -d '{
///   "contents": [{ "parts": [
///     { "text": "..." },
///     { "inlineData": { "mimeType": "image/png", "data": "<base64>" } }
///   ]}],
///   "generationConfig": { "responseModalities": ["TEXT", "IMAGE"] }
/// }' \
/// https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-image-preview:generateContent
pub struct GeminiClient {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_base: &Url, model: &str, api_key: String) -> Result<Self> {
        let endpoint = api_base.join(&format!("v1beta/models/{model}:generateContent"))?;

        Ok(Self {
            client: http_client()?,
            endpoint,
            api_key,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HashMap::with_capacity(2);
        headers.insert("x-goog-api-key".to_string(), self.api_key.clone());
        headers.insert("content-type".to_string(), "application/json".to_string());

        let headers: HeaderMap = (&headers).try_into()?;
        Ok(headers)
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    async fn generate_content(&self, prompt: &str, image: &SketchImage) -> Result<Vec<Part>> {
        let body = ReqBody::new(prompt, image);
        let r = self
            .client
            .post(self.endpoint.clone())
            .headers(self.headers()?)
            .body(serde_json::to_string(&body)?);

        let r = r.send().await?;
        let status = r.status().as_u16();
        let text = r.text().await?;

        if !(200..300).contains(&status) {
            error!("gemini status: {}", status);
            error!("gemini response: {}", text);
            let msg = serde_json::from_str::<ErrBody>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(anyhow::anyhow!(
                "gemini request failed: status={}, msg={}",
                status,
                msg
            ));
        }

        let result = serde_json::from_str::<RespBody>(&text);
        if result.is_err() {
            let text = format!("serde_json error, text = {}", text);
            error!("{}", text);
            return Err(anyhow::anyhow!(text));
        }

        let resp = result?;
        debug!("gemini returned {} candidate(s)", resp.candidates.len());

        let candidate = resp
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("gemini returned no candidates"))?;

        Ok(candidate.content.map(|c| c.parts).unwrap_or_default())
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ReqBody {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Debug)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
}

impl ReqBody {
    fn new(prompt: &str, image: &SketchImage) -> ReqBody {
        ReqBody {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::text(prompt), Part::inline(&image.mime_type, &image.data)],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["TEXT", "IMAGE"],
            },
        }
    }
}

#[derive(Deserialize, Debug)]
struct RespBody {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize, Debug)]
struct ErrBody {
    error: ErrDetail,
}

#[derive(Deserialize, Debug)]
struct ErrDetail {
    message: String,
}
