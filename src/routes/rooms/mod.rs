use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::routes::require_admin;
use crate::state::AppState;

mod form;
mod guards;
mod handlers;
mod schemas;

pub fn room_router(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route(
            "/admin/locations/:location/rooms/new",
            get(handlers::new_room_form),
        )
        .route(
            "/admin/locations/:location/rooms",
            post(handlers::create_room),
        )
        .route(
            "/admin/locations/:location/rooms/:room_id",
            get(handlers::edit_room_form).post(handlers::modify_room),
        )
        .route("/admin/rooms/:room_id", delete(handlers::delete_room))
        .route_layer(middleware::from_fn_with_state(state, require_admin));

    Router::new()
        .route("/rooms/:room_id", get(handlers::room_details))
        .route("/rooms/:room_id/photo/:size", get(handlers::room_photo))
        .merge(admin)
}
