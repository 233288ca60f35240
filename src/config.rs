//! Startup configuration, read once from the environment (and `.env` when
//! present) and handed to the router. Nothing here is global.
//!
//! - `FIREBASE_CREDENTIALS` - service account JSON (required)
//! - `GOOGLE_API_KEY` - Gemini key; generation is disabled without it
//! - `GEMINI_MODEL` - model name (default: gemini-2.5-flash-image-preview)
//! - `GEMINI_API_BASE` - API base url
//! - `BIND_ADDR` - listen address (default: 0.0.0.0:5000)
//! - `SESSION_SECRET` - cookie signing secret, at least 32 bytes (default: random)
//! - `SESSION_TTL_SECS` - session lifetime, cookie and server entry (default: 86400)
//! - `SESSION_COOKIE_SECURE` - send the cookie over https only (default: true).
//!   Browsers drop a secure cookie served over plain http to any host other
//!   than localhost, so sign-in appears to work but `/` keeps redirecting.
//!   Set it to `false` when serving plain http on a LAN address.
//! - `STATIC_DIR` - static asset directory (default: static)

use std::{env, path::PathBuf, time::Duration};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use url::Url;

use crate::core::ai::{DEFAULT_API_BASE, DEFAULT_MODEL};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

pub const DEFAULT_STATIC_DIR: &str = "static";

pub const MIN_SESSION_SECRET_LEN: usize = 32;

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60 * 24);

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub firebase: ServiceAccount,
    pub gemini: Option<GeminiConfig>,
    pub session: SessionConfig,
    pub static_dir: PathBuf,
}

/// The parts of a Firebase service account file this server needs.
#[derive(Deserialize, Debug, Clone)]
pub struct ServiceAccount {
    pub project_id: String,
}

#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: Url,
}

// keeps the key out of logs
impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("model", &self.model)
            .field("api_base", &self.api_base.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct SessionConfig {
    pub secret: Option<Vec<u8>>,
    pub ttl: Duration,
    pub secure: bool,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<set>"))
            .field("ttl", &self.ttl)
            .field("secure", &self.secure)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<AppConfig> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<AppConfig> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let creds = get("FIREBASE_CREDENTIALS")
            .ok_or_else(|| anyhow!("FIREBASE_CREDENTIALS environment variable not set"))?;
        let firebase = parse_service_account(&creds)?;

        let gemini = match get("GOOGLE_API_KEY") {
            Some(api_key) => {
                let base = get("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string());
                Some(GeminiConfig {
                    api_key,
                    model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                    api_base: parse_base_url(&base)?,
                })
            }
            None => None,
        };

        let secret = match get("SESSION_SECRET") {
            Some(s) if s.len() < MIN_SESSION_SECRET_LEN => {
                return Err(anyhow!(
                    "SESSION_SECRET must be at least {} bytes",
                    MIN_SESSION_SECRET_LEN
                ));
            }
            s => s.map(String::into_bytes),
        };

        let ttl = get("SESSION_TTL_SECS")
            .map(|v| v.parse::<u64>().context("SESSION_TTL_SECS is not a number"))
            .transpose()?
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SESSION_TTL);

        let secure = get("SESSION_COOKIE_SECURE")
            .map(|v| v.parse::<bool>().context("SESSION_COOKIE_SECURE is not a bool"))
            .transpose()?
            .unwrap_or(true);

        Ok(AppConfig {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            firebase,
            gemini,
            session: SessionConfig {
                secret,
                ttl,
                secure,
            },
            static_dir: get("STATIC_DIR")
                .unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string())
                .into(),
        })
    }
}

pub fn parse_service_account(json: &str) -> Result<ServiceAccount> {
    let account: ServiceAccount =
        serde_json::from_str(json).context("FIREBASE_CREDENTIALS is not a valid service account")?;

    if account.project_id.trim().is_empty() {
        return Err(anyhow!("FIREBASE_CREDENTIALS has an empty project_id"));
    }

    Ok(account)
}

// Url::join drops the last path segment unless the base ends with '/'
fn parse_base_url(base: &str) -> Result<Url> {
    let base = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{base}/")
    };

    Url::parse(&base).with_context(|| format!("GEMINI_API_BASE is not a url: {base}"))
}
