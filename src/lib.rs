pub mod api;
pub mod auth;
pub mod config;
pub mod core;
pub mod extractor;

#[cfg(test)]
mod test_support;

use std::path::Path;

use poem::{
    middleware::{CatchPanic, Tracing},
    session::{CookieConfig, MemoryStorage, ServerSession},
    web::cookie::{CookieKey, SameSite},
    Endpoint, EndpointExt,
};

use api::AppState;
use config::SessionConfig;

pub const SESSION_COOKIE: &str = "sketch-session";

/// The full application: routes, server-side sessions and shared state.
pub fn build_app(state: AppState, session: &SessionConfig, static_dir: &Path) -> impl Endpoint {
    api::routes(static_dir)
        .with(ServerSession::new(cookie_config(session), MemoryStorage::new()))
        .with(Tracing)
        .with(CatchPanic::new())
        .data(state)
}

fn cookie_config(session: &SessionConfig) -> CookieConfig {
    let key = match &session.secret {
        Some(secret) => CookieKey::derive_from(secret),
        // sessions live in memory anyway, so a restart loses nothing extra
        None => CookieKey::generate(),
    };

    CookieConfig::signed(key)
        .name(SESSION_COOKIE)
        .path("/")
        .http_only(true)
        .secure(session.secure)
        .same_site(SameSite::Lax)
        // also the server-side expiry in MemoryStorage
        .max_age(session.ttl)
}
