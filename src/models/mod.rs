pub mod locations;
pub mod reservations;
pub mod rooms;
pub mod users;
