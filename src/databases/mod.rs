use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, DateTime};

use crate::models::{locations::Location, rooms::Room, users::User};
use crate::utils::error::AppError;

#[cfg(test)]
pub mod memory;
pub mod mongo;

/// Persistence used by the room administration handlers.
///
/// Lookups that find nothing return `Ok(None)`; errors are reserved for
/// failures of the backing store.
#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn find_location_by_name(&self, name: &str) -> Result<Option<Location>, AppError>;
    async fn find_location(&self, id: ObjectId) -> Result<Option<Location>, AppError>;
    async fn find_room(&self, id: ObjectId) -> Result<Option<Room>, AppError>;
    /// Stores a new room, assigning an id when it has none.
    async fn insert_room(&self, room: Room) -> Result<Room, AppError>;
    async fn replace_room(&self, room: &Room) -> Result<(), AppError>;
    async fn delete_room(&self, id: ObjectId) -> Result<(), AppError>;
    async fn has_live_reservations(&self, room_id: ObjectId, now: DateTime)
        -> Result<bool, AppError>;
    async fn find_user(&self, id: &str) -> Result<Option<User>, AppError>;
}
