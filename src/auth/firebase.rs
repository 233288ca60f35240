use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{
    decode, decode_header,
    jwk::{Jwk, JwkSet},
    Algorithm, DecodingKey, Validation,
};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

use crate::core::http_client;

/// Google's public keys for Firebase ID tokens, as a JWK set.
pub const SECURETOKEN_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

const ISSUER_PREFIX: &str = "https://securetoken.google.com/";

// keys rotate every few hours; an unknown kid forces an early refetch
const KEY_TTL: Duration = Duration::from_secs(60 * 60);

// floor between refetches triggered by unknown kids
const MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(60);

const LEEWAY_SECS: u64 = 60;

const MAX_UID_LEN: usize = 128;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("id token is empty")]
    Empty,

    #[error("malformed id token: {0}")]
    Malformed(String),

    #[error("id token signed with unknown key: {0}")]
    UnknownKey(String),

    #[error("invalid id token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("invalid id token claims: {0}")]
    Claims(&'static str),

    #[error("failed to fetch signing keys: {0}")]
    KeyFetch(String),
}

/// Turns an opaque identity token into a user id. Implementations are
/// authoritative: a failure is final for that request.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<String, VerifyError>;
}

#[derive(Deserialize, Debug)]
struct FirebaseClaims {
    sub: String,
    iat: u64,
    #[serde(default)]
    auth_time: Option<u64>,
}

struct CachedKeys {
    keys: JwkSet,
    // None for injected keys, which never expire
    fetched_at: Option<Instant>,
}

impl CachedKeys {
    fn is_fresh(&self) -> bool {
        self.fetched_at.map_or(true, |t| t.elapsed() < KEY_TTL)
    }
}

/// Verifies Firebase ID tokens locally against Google's published keys.
pub struct FirebaseVerifier {
    project_id: String,
    client: Client,
    keys_url: Option<Url>,
    min_refetch: Duration,
    cache: RwLock<Option<CachedKeys>>,
}

impl FirebaseVerifier {
    pub fn new(project_id: impl Into<String>) -> anyhow::Result<Self> {
        Self::with_keys_url(project_id, Url::parse(SECURETOKEN_JWKS_URL)?)
    }

    /// Fetches the JWK set from `keys_url` instead of Google.
    pub fn with_keys_url(project_id: impl Into<String>, keys_url: Url) -> anyhow::Result<Self> {
        Ok(Self {
            project_id: project_id.into(),
            client: http_client()?,
            keys_url: Some(keys_url),
            min_refetch: MIN_REFETCH_INTERVAL,
            cache: RwLock::new(None),
        })
    }

    pub fn min_refetch_interval(mut self, interval: Duration) -> Self {
        self.min_refetch = interval;
        self
    }

    /// Uses a fixed key set and never goes to the network.
    pub fn with_keys(project_id: impl Into<String>, keys: JwkSet) -> Self {
        Self {
            project_id: project_id.into(),
            client: Client::new(),
            keys_url: None,
            min_refetch: MIN_REFETCH_INTERVAL,
            cache: RwLock::new(Some(CachedKeys {
                keys,
                fetched_at: None,
            })),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    async fn find_key(&self, kid: &str) -> Result<Jwk, VerifyError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_fresh() {
                    if let Some(jwk) = cached.keys.find(kid) {
                        return Ok(jwk.clone());
                    }
                }
            }
        }

        let Some(url) = &self.keys_url else {
            return Err(VerifyError::UnknownKey(kid.to_string()));
        };

        // held across the fetch so concurrent misses share one request
        let mut cache = self.cache.write().await;
        if let Some(cached) = cache.as_ref() {
            if cached.is_fresh() {
                if let Some(jwk) = cached.keys.find(kid) {
                    return Ok(jwk.clone());
                }
                if cached
                    .fetched_at
                    .is_some_and(|t| t.elapsed() < self.min_refetch)
                {
                    debug!("unknown kid {} within refetch interval", kid);
                    return Err(VerifyError::UnknownKey(kid.to_string()));
                }
            }
        }

        let keys = self.fetch_keys(url).await?;
        let found = keys.find(kid).cloned();

        *cache = Some(CachedKeys {
            keys,
            fetched_at: Some(Instant::now()),
        });

        found.ok_or_else(|| VerifyError::UnknownKey(kid.to_string()))
    }

    async fn fetch_keys(&self, url: &Url) -> Result<JwkSet, VerifyError> {
        info!("fetching firebase signing keys from {}", url);

        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| VerifyError::KeyFetch(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(VerifyError::KeyFetch(format!("status={}", resp.status())));
        }

        resp.json::<JwkSet>()
            .await
            .map_err(|e| VerifyError::KeyFetch(e.to_string()))
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[format!("{}{}", ISSUER_PREFIX, self.project_id)]);
        validation.set_required_spec_claims(&["exp", "aud", "iss", "sub"]);
        validation.leeway = LEEWAY_SECS;
        validation
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, id_token: &str) -> Result<String, VerifyError> {
        let id_token = id_token.trim();
        if id_token.is_empty() {
            return Err(VerifyError::Empty);
        }

        let header = decode_header(id_token)?;
        if header.alg != Algorithm::RS256 {
            return Err(VerifyError::Malformed(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| VerifyError::Malformed("missing kid".to_string()))?;

        let jwk = self.find_key(&kid).await?;
        let key = DecodingKey::from_jwk(&jwk)?;

        let claims = decode::<FirebaseClaims>(id_token, &key, &self.validation())?.claims;

        let now = jsonwebtoken::get_current_timestamp();
        if claims.iat > now + LEEWAY_SECS {
            return Err(VerifyError::Claims("issued in the future"));
        }
        if claims.auth_time.is_some_and(|t| t > now + LEEWAY_SECS) {
            return Err(VerifyError::Claims("authenticated in the future"));
        }
        if claims.sub.is_empty() || claims.sub.len() > MAX_UID_LEN {
            return Err(VerifyError::Claims("bad subject"));
        }

        debug!("verified id token for {}", claims.sub);
        Ok(claims.sub)
    }
}
