use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::databases::mongo::MongoDb;
use crate::state::AppState;
use crate::utils::cache::PhotoCache;
use crate::utils::error::AppError;

mod config;
mod databases;
mod models;
mod routes;
mod state;
mod utils;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let config = Config::from_env()?;
    let mongo = MongoDb::init(&config).await?;

    let state = AppState {
        store: Arc::new(mongo.room_store()),
        photos: PhotoCache::new(config.photo_cache_capacity),
        admin_token: config.admin_token.as_str().into(),
    };
    let app = routes::router(state);

    let listener = TcpListener::bind(config.bind_address)
        .await
        .map_err(AppError::internal)?;
    tracing::info!(address = %config.bind_address, "listening");
    axum::serve(listener, app.into_make_service())
        .await
        .map_err(AppError::internal)?;
    Ok(())
}
