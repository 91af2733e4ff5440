use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{error, info, warn};

use signup_board::config::BoardConfig;
use signup_board::services::notifier::Notifier;
use signup_board::services::remote_store::HttpRemoteStore;
use signup_board::services::view_model::ViewModel;
use signup_board::web::routes;

#[tokio::main]
async fn main() {
    // Load .env
    dotenv().ok();

    // 1. Start logging
    tracing_subscriber::fmt::init();

    let config = match BoardConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    // 2. Upstream activities API
    let store = match HttpRemoteStore::from_config(&config) {
        Ok(s) => s,
        Err(e) => {
            error!("cannot build activities client: {}", e);
            std::process::exit(2);
        }
    };
    info!("using activities API at {}", config.api_url);

    // 3. Board state, loaded once up front
    let board = ViewModel::new(
        Arc::new(store),
        Notifier::new(config.notice_duration),
        config.refresh_ordering,
    );
    board.refresh().await;
    if let Some(err) = board.view().load_error.as_deref() {
        warn!("initial load failed: {}", err);
    }

    let app = routes::router(board);

    // 4. Serve (with fallback port)
    let listener = match bind(&config, config.port).await {
        Ok(l) => l,
        Err(e) => {
            warn!(
                "could not bind {}:{}: {}; trying {}",
                config.host,
                config.port,
                e,
                config.port.wrapping_add(1)
            );
            match bind(&config, config.port.wrapping_add(1)).await {
                Ok(l) => l,
                Err(e) => {
                    error!("could not bind fallback port: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    match listener.local_addr() {
        Ok(addr) => info!("signup board listening on http://{}", addr),
        Err(e) => warn!("listening, but local address is unknown: {}", e),
    }

    if let Err(e) = axum::serve(listener, app).await {
        error!("server stopped: {}", e);
        std::process::exit(1);
    }
}

async fn bind(config: &BoardConfig, port: u16) -> std::io::Result<tokio::net::TcpListener> {
    let addr = config
        .listen_addr(port)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    tokio::net::TcpListener::bind(addr).await
}
