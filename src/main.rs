use dotenvy::dotenv;
use schedserver::auth::StaticTokenProvider;
use schedserver::config::AppConfig;
use schedserver::shared::state::AppState;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;
    let addr = config.bind_addr();

    let identity = Arc::new(StaticTokenProvider::new());
    if let Ok(token) = std::env::var("SCHEDSERVER_DEV_TOKEN") {
        let tenant = uuid::Uuid::new_v4();
        identity.register(&token, tenant).await;
        tracing::info!(%tenant, "registered dev token");
    }

    let state = Arc::new(AppState::new(config, identity));
    let app = schedserver::api::router(state);

    tracing::info!(%addr, "schedserver listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
