use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
    Router,
};
use rooms::room_router;
use subtle::ConstantTimeEq;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::utils::error::AppError;

pub mod rooms;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(room_router(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Lets a request through only if it carries the configured admin token.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| token.as_bytes().ct_eq(state.admin_token.as_bytes()).into());

    if !authorized {
        tracing::warn!(uri = %request.uri(), "rejected admin request without valid token");
        return Err(AppError::new(
            StatusCode::UNAUTHORIZED,
            "Admin token required".to_string(),
        ));
    }
    Ok(next.run(request).await)
}
