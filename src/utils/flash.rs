use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use strum::Display;

#[derive(Debug, Clone, Copy, Display, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FlashCategory {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Flash {
    pub category: FlashCategory,
    pub message: String,
}

/// A one-shot message delivered together with a `303 See Other`.
#[derive(Debug, Serialize, Deserialize)]
pub struct FlashRedirect {
    pub flash: Flash,
    pub redirect: String,
}

impl FlashRedirect {
    pub fn success(message: &str, redirect: String) -> Self {
        Self::new(FlashCategory::Success, message, redirect)
    }

    pub fn error(message: &str, redirect: String) -> Self {
        Self::new(FlashCategory::Error, message, redirect)
    }

    fn new(category: FlashCategory, message: &str, redirect: String) -> Self {
        Self {
            flash: Flash {
                category,
                message: message.to_string(),
            },
            redirect,
        }
    }
}

impl IntoResponse for FlashRedirect {
    fn into_response(self) -> axum::response::Response {
        (
            StatusCode::SEE_OTHER,
            [(header::LOCATION, self.redirect.clone())],
            Json(self),
        )
            .into_response()
    }
}
