use poem::{
    handler,
    http::StatusCode,
    web::{Data, Json},
    Body, IntoResponse, Response,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::core::{
    ai::{extract_image, Generated},
    data_url::{self, DataUrl},
    SketchImage,
};

use super::AppState;

pub const PROMPT: &str = "Turn this sketch into a beautiful, detailed image";

#[derive(Deserialize, Debug)]
struct GenerateReq {
    // the browser also sends its own `prompt`; it is ignored
    image_data: Option<String>,
}

#[derive(Serialize)]
struct GenerateResp {
    image_url: String,
}

#[derive(Serialize)]
struct ErrorResp {
    error: String,
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("AI model is not initialized. Check server logs.")]
    NotInitialized,

    #[error("No image data provided.")]
    MissingImage,

    #[error("AI could not generate image. Response: {0}")]
    NoImage(String),

    #[error("An internal server error occurred: {0}")]
    Internal(#[from] anyhow::Error),
}

impl GenerateError {
    pub fn status(&self) -> StatusCode {
        match self {
            GenerateError::MissingImage => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GenerateError {
    fn into_response(self) -> Response {
        let status = self.status();
        Json(ErrorResp {
            error: self.to_string(),
        })
        .with_status(status)
        .into_response()
    }
}

#[handler]
pub async fn generate(body: Body, state: Data<&AppState>) -> Response {
    match handle(body, state.0).await {
        Ok(image_url) => Json(GenerateResp { image_url }).into_response(),
        Err(e) => {
            match &e {
                GenerateError::MissingImage => warn!("{}", e),
                GenerateError::Internal(inner) => error!("{:?}", inner),
                _ => error!("{}", e),
            }
            e.into_response()
        }
    }
}

async fn handle(body: Body, state: &AppState) -> Result<String, GenerateError> {
    let generator = state
        .generator
        .as_ref()
        .ok_or(GenerateError::NotInitialized)?;

    let image_data = body
        .into_json::<GenerateReq>()
        .await
        .ok()
        .and_then(|req| req.image_data)
        .filter(|s| !s.is_empty())
        .ok_or(GenerateError::MissingImage)?;

    let DataUrl {
        mime_type: declared,
        data,
    } = DataUrl::parse(&image_data)?;
    let sketch = SketchImage::from_bytes(data)?;
    info!(
        "generating from {} sketch (declared {}), {} bytes",
        sketch.mime_type,
        declared.as_deref().unwrap_or("none"),
        sketch.data.len()
    );

    let parts = generator.generate_content(PROMPT, &sketch).await?;

    match extract_image(&parts)? {
        Generated::Image(image) => {
            info!(
                "generated {} image, {} bytes",
                image.mime_type,
                image.data.len()
            );
            Ok(data_url::encode(&image.mime_type, &image.data))
        }
        Generated::NoImage(text) => Err(GenerateError::NoImage(text)),
    }
}
