use anyhow::Result;
use poem::{listener::TcpListener, Server};
use tracing::info;
use tracing_subscriber::EnvFilter;

use sketch_studio::{api::AppState, build_app, config::AppConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = AppConfig::from_env()?;
    let state = AppState::from_config(&config)?;
    let app = build_app(state, &config.session, &config.static_dir);

    info!("listening on {}", config.bind_addr);
    Server::new(TcpListener::bind(config.bind_addr.clone()))
        .run(app)
        .await?;

    Ok(())
}
