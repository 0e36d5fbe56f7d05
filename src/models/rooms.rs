use chrono::{NaiveDateTime, NaiveTime};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, skip_serializing_none, Bytes};

use crate::utils::cache::PhotoSize;

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Photo {
    #[serde_as(as = "Bytes")]
    pub thumbnail: Vec<u8>,
    #[serde_as(as = "Bytes")]
    pub data: Vec<u8>,
}

impl Photo {
    pub fn get(&self, size: PhotoSize) -> &[u8] {
        match size {
            PhotoSize::Small => &self.thumbnail,
            PhotoSize::Large => &self.data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomAttributeValue {
    #[serde(rename = "attributeId")]
    pub attribute_id: ObjectId,
    pub value: String,
}

/// A daily window during which the room may be booked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookableTime {
    #[serde(rename = "startTime")]
    pub start_time: NaiveTime,
    #[serde(rename = "endTime")]
    pub end_time: NaiveTime,
}

/// A period during which the room cannot be booked at all.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NonBookableDate {
    #[serde(rename = "startDt")]
    pub start_dt: NaiveDateTime,
    #[serde(rename = "endDt")]
    pub end_dt: NaiveDateTime,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    #[serde(rename = "_id")]
    pub id: Option<ObjectId>,
    pub location_id: Option<ObjectId>,
    #[serde(default)]
    pub name: String,
    pub site: Option<String>,
    #[serde(default)]
    pub building: String,
    #[serde(default)]
    pub floor: String,
    #[serde(default)]
    pub number: String,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_reservable: bool,
    #[serde(default)]
    pub reservations_need_confirmation: bool,
    #[serde(default)]
    pub notification_for_assistance: bool,
    #[serde(default)]
    pub notification_for_responsible: bool,
    pub notification_before_days: Option<i32>,
    #[serde(default)]
    pub owner_id: String,
    pub key_location: Option<String>,
    pub telephone: Option<String>,
    pub capacity: Option<i32>,
    pub division: Option<String>,
    pub surface_area: Option<i32>,
    pub max_advance_days: Option<i32>,
    pub comments: Option<String>,
    #[serde(default)]
    pub equipment: Vec<ObjectId>,
    pub photo: Option<Photo>,
    #[serde(default)]
    pub attributes: Vec<RoomAttributeValue>,
    #[serde(default)]
    pub bookable_times: Vec<BookableTime>,
    #[serde(default)]
    pub nonbookable_dates: Vec<NonBookableDate>,
}

impl Room {
    pub fn generate_name(&self) -> String {
        format!("{}-{}-{}", self.building, self.floor, self.number)
    }

    /// True when the room carries a name other than the generated one.
    pub fn has_special_name(&self) -> bool {
        !self.name.is_empty() && self.name != self.generate_name()
    }

    pub fn update_name(&mut self) {
        if self.name.is_empty()
            && !self.building.is_empty()
            && !self.floor.is_empty()
            && !self.number.is_empty()
        {
            self.name = self.generate_name();
        }
    }
}
