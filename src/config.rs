use std::env;
use std::net::SocketAddr;

use axum::http::StatusCode;

use crate::utils::error::AppError;

const DEFAULT_DATABASE: &str = "roombooking";
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_PHOTO_CACHE_CAPACITY: u64 = 256;

#[derive(Debug, Clone)]
pub struct Config {
    pub mongodb_uri: String,
    pub mongodb_database: String,
    pub bind_address: SocketAddr,
    pub admin_token: String,
    pub photo_cache_capacity: u64,
}

impl Config {
    /// Reads the configuration from the environment, after loading `.env`
    /// if one is present.
    pub fn from_env() -> Result<Self, AppError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(config_error(format!("Invalid .env file: {}", e)));
            }
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| config_error(format!("{} must be set", key)))
        };

        let bind_address = lookup("BIND_ADDRESS")
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let bind_address: SocketAddr = bind_address
            .parse()
            .map_err(|e| config_error(format!("Invalid BIND_ADDRESS '{}': {}", bind_address, e)))?;

        let photo_cache_capacity: u64 = match lookup("PHOTO_CACHE_CAPACITY") {
            Some(v) => v
                .parse()
                .map_err(|e| config_error(format!("Invalid PHOTO_CACHE_CAPACITY '{}': {}", v, e)))?,
            None => DEFAULT_PHOTO_CACHE_CAPACITY,
        };

        Ok(Self {
            mongodb_uri: required("MONGODB_URI")?,
            mongodb_database: lookup("MONGODB_DATABASE")
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            bind_address,
            admin_token: required("ADMIN_TOKEN")?,
            photo_cache_capacity,
        })
    }
}

fn config_error(error: String) -> AppError {
    AppError::new(StatusCode::INTERNAL_SERVER_ERROR, error)
}
