use async_trait::async_trait;
use axum::http::StatusCode;
use mongodb::bson::{doc, oid::ObjectId, DateTime};
use mongodb::{Client, Collection, Database};

use crate::config::Config;
use crate::databases::RoomStore;
use crate::models::{locations::Location, reservations::Reservation, rooms::Room, users::User};
use crate::utils::error::AppError;

pub struct MongoDb {
    db: Database,
}

impl MongoDb {
    pub async fn init(config: &Config) -> Result<Self, AppError> {
        tracing::info!(database = %config.mongodb_database, "connecting to MongoDB");
        let client = Client::with_uri_str(&config.mongodb_uri)
            .await
            .map_err(|e| {
                AppError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Can't connect to MongoDB: {}", e),
                )
            })?;
        let db = client.database(&config.mongodb_database);
        db.run_command(doc! { "ping": 1 }).await?;
        tracing::info!("connected to MongoDB");
        Ok(Self { db })
    }

    pub fn room_store(&self) -> MongoRoomStore {
        MongoRoomStore {
            locations: self.db.collection("locations"),
            rooms: self.db.collection("rooms"),
            reservations: self.db.collection("reservations"),
            users: self.db.collection("users"),
        }
    }
}

pub struct MongoRoomStore {
    locations: Collection<Location>,
    rooms: Collection<Room>,
    reservations: Collection<Reservation>,
    users: Collection<User>,
}

#[async_trait]
impl RoomStore for MongoRoomStore {
    async fn find_location_by_name(&self, name: &str) -> Result<Option<Location>, AppError> {
        Ok(self.locations.find_one(doc! { "name": name }).await?)
    }

    async fn find_location(&self, id: ObjectId) -> Result<Option<Location>, AppError> {
        Ok(self.locations.find_one(doc! { "_id": id }).await?)
    }

    async fn find_room(&self, id: ObjectId) -> Result<Option<Room>, AppError> {
        Ok(self.rooms.find_one(doc! { "_id": id }).await?)
    }

    async fn insert_room(&self, mut room: Room) -> Result<Room, AppError> {
        let id = *room.id.get_or_insert_with(ObjectId::new);
        self.rooms.insert_one(&room).await?;
        tracing::debug!(room_id = %id, "inserted room");
        Ok(room)
    }

    async fn replace_room(&self, room: &Room) -> Result<(), AppError> {
        let id = room
            .id
            .ok_or_else(|| AppError::internal("cannot replace a room without id"))?;
        let result = self.rooms.replace_one(doc! { "_id": id }, room).await?;
        if result.matched_count == 0 {
            return Err(AppError::not_found("Room"));
        }
        Ok(())
    }

    async fn delete_room(&self, id: ObjectId) -> Result<(), AppError> {
        self.rooms.delete_one(doc! { "_id": id }).await?;
        Ok(())
    }

    async fn has_live_reservations(
        &self,
        room_id: ObjectId,
        now: DateTime,
    ) -> Result<bool, AppError> {
        let filter = doc! {
            "roomId": room_id,
            "isCancelled": { "$ne": true },
            "isRejected": { "$ne": true },
            "endDt": { "$gt": now },
        };
        let live = self.reservations.count_documents(filter).limit(1).await?;
        Ok(live > 0)
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.find_one(doc! { "_id": id }).await?)
    }
}
