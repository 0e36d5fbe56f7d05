use mongodb::bson::oid::ObjectId;

use crate::databases::RoomStore;
use crate::models::{locations::Location, rooms::Room};
use crate::utils::error::AppError;

/// Resolves the location named in the URL or fails with 404.
pub async fn require_location(store: &dyn RoomStore, name: &str) -> Result<Location, AppError> {
    store
        .find_location_by_name(name)
        .await?
        .ok_or_else(|| AppError::not_found("Location"))
}

/// Resolves a room by its hex id. Malformed ids are reported as unknown rooms.
pub async fn require_room(store: &dyn RoomStore, room_id: &str) -> Result<(ObjectId, Room), AppError> {
    let id = ObjectId::parse_str(room_id).map_err(|_| AppError::not_found("Room"))?;
    let room = store
        .find_room(id)
        .await?
        .ok_or_else(|| AppError::not_found("Room"))?;
    Ok((id, room))
}

/// Like [`require_room`], but the room must also belong to `location`.
pub async fn require_room_in(
    store: &dyn RoomStore,
    location: &Location,
    room_id: &str,
) -> Result<(ObjectId, Room), AppError> {
    let (id, room) = require_room(store, room_id).await?;
    if room.location_id != Some(location.id) {
        return Err(AppError::not_found("Room"));
    }
    Ok((id, room))
}
