use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, DateTime};

use crate::databases::RoomStore;
use crate::models::{locations::Location, reservations::Reservation, rooms::Room, users::User};
use crate::utils::error::AppError;

#[derive(Default)]
pub struct MemoryRoomStore {
    pub locations: Mutex<Vec<Location>>,
    pub rooms: Mutex<HashMap<ObjectId, Room>>,
    pub reservations: Mutex<Vec<Reservation>>,
    pub users: Mutex<Vec<User>>,
}

impl MemoryRoomStore {
    pub fn with_location(self, location: Location) -> Self {
        self.locations.lock().unwrap().push(location);
        self
    }

    pub fn with_room(self, room: Room) -> Self {
        let id = room.id.expect("seeded rooms need an id");
        self.rooms.lock().unwrap().insert(id, room);
        self
    }

    pub fn with_reservation(self, reservation: Reservation) -> Self {
        self.reservations.lock().unwrap().push(reservation);
        self
    }

    pub fn with_user(self, user: User) -> Self {
        self.users.lock().unwrap().push(user);
        self
    }

    pub fn room(&self, id: &ObjectId) -> Option<Room> {
        self.rooms.lock().unwrap().get(id).cloned()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.lock().unwrap().len()
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn find_location_by_name(&self, name: &str) -> Result<Option<Location>, AppError> {
        let locations = self.locations.lock().unwrap();
        Ok(locations.iter().find(|l| l.name == name).cloned())
    }

    async fn find_location(&self, id: ObjectId) -> Result<Option<Location>, AppError> {
        let locations = self.locations.lock().unwrap();
        Ok(locations.iter().find(|l| l.id == id).cloned())
    }

    async fn find_room(&self, id: ObjectId) -> Result<Option<Room>, AppError> {
        Ok(self.room(&id))
    }

    async fn insert_room(&self, mut room: Room) -> Result<Room, AppError> {
        let id = *room.id.get_or_insert_with(ObjectId::new);
        self.rooms.lock().unwrap().insert(id, room.clone());
        Ok(room)
    }

    async fn replace_room(&self, room: &Room) -> Result<(), AppError> {
        let id = room
            .id
            .ok_or_else(|| AppError::internal("cannot replace a room without id"))?;
        let mut rooms = self.rooms.lock().unwrap();
        match rooms.get_mut(&id) {
            Some(stored) => {
                *stored = room.clone();
                Ok(())
            }
            None => Err(AppError::not_found("Room")),
        }
    }

    async fn delete_room(&self, id: ObjectId) -> Result<(), AppError> {
        self.rooms.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn has_live_reservations(
        &self,
        room_id: ObjectId,
        now: DateTime,
    ) -> Result<bool, AppError> {
        let reservations = self.reservations.lock().unwrap();
        Ok(reservations
            .iter()
            .any(|r| r.room_id == room_id && r.is_live(now)))
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }
}
