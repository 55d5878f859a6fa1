use campaign_dashboard::{router, spawn_periodic, AppState, Config, Refresher};
use std::{net::SocketAddr, sync::Arc};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env();
    match &config.upstream_base_url {
        Some(url) => info!("using upstream {url}"),
        None => info!("no UPSTREAM_BASE_URL set, serving fallback data"),
    }

    let refresher = Arc::new(Refresher::new(config.clone())?);
    if let Some(every) = config.refresh_interval {
        spawn_periodic(Arc::clone(&refresher), every);
    }

    let app = router(AppState::new(refresher));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
