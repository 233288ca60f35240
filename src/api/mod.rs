use std::{path::Path, sync::Arc};

use anyhow::Result;
use poem::{endpoint::StaticFilesEndpoint, get, post, EndpointExt, Route};
use tracing::{error, info};

use crate::{
    auth::{FirebaseVerifier, IdentityVerifier, SessionGate},
    config::AppConfig,
    core::ai::{GeminiClient, ImageGenerator},
};

pub mod generate;
pub mod login;
pub mod pages;

/// Collaborators shared by every handler, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<dyn IdentityVerifier>,
    /// `None` when no API key is configured.
    pub generator: Option<Arc<dyn ImageGenerator>>,
}

impl AppState {
    pub fn new(
        verifier: Arc<dyn IdentityVerifier>,
        generator: Option<Arc<dyn ImageGenerator>>,
    ) -> Self {
        Self {
            verifier,
            generator,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<AppState> {
        let verifier = FirebaseVerifier::new(&config.firebase.project_id)?;
        info!(
            "firebase verifier ready for project {}",
            verifier.project_id()
        );

        let generator: Option<Arc<dyn ImageGenerator>> = match &config.gemini {
            Some(gemini) => {
                let client =
                    GeminiClient::new(&gemini.api_base, &gemini.model, gemini.api_key.clone())?;
                info!("AI model {} initialized", gemini.model);
                Some(Arc::new(client))
            }
            None => {
                error!("GOOGLE_API_KEY not set, image generation is disabled");
                None
            }
        };

        Ok(AppState::new(Arc::new(verifier), generator))
    }
}

pub fn routes(static_dir: &Path) -> Route {
    Route::new()
        .at("/", get(pages::index).with(SessionGate))
        .at("/auth", get(pages::auth_page))
        .at("/login", post(login::login))
        .at("/logout", get(login::logout))
        // reachable without a session
        .at("/api/generate", post(generate::generate))
        .nest("/static", StaticFilesEndpoint::new(static_dir))
}
