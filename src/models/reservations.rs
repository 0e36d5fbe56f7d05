use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// Only the parts of a booking needed to guard room deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub room_id: ObjectId,
    pub end_dt: DateTime,
    #[serde(default)]
    pub is_cancelled: bool,
    #[serde(default)]
    pub is_rejected: bool,
}

impl Reservation {
    pub fn is_live(&self, now: DateTime) -> bool {
        !self.is_cancelled && !self.is_rejected && self.end_dt > now
    }
}
