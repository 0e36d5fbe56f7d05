use std::collections::BTreeMap;

use axum::http::StatusCode;
use chrono::{NaiveDateTime, NaiveTime};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::{base64::Base64, serde_as, skip_serializing_none};
use validator::Validate;

use crate::models::rooms::{BookableTime, NonBookableDate, Room};
use crate::models::users::User;
use crate::utils::error::AppError;
use crate::utils::serializer::{serialize_object_id, serialize_object_ids, serialize_option_object_id};

/// One row of a repeated `{start, end}` sub-form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pair<T> {
    pub start: Option<T>,
    pub end: Option<T>,
}

impl<T: Copy> Pair<T> {
    pub fn empty() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn complete(&self) -> Option<(T, T)> {
        Some((self.start?, self.end?))
    }
}

pub type TimePair = Pair<NaiveTime>;
pub type DateTimePair = Pair<NaiveDateTime>;

impl From<&BookableTime> for TimePair {
    fn from(bt: &BookableTime) -> Self {
        Self {
            start: Some(bt.start_time),
            end: Some(bt.end_time),
        }
    }
}

impl From<&NonBookableDate> for DateTimePair {
    fn from(nbd: &NonBookableDate) -> Self {
        Self {
            start: Some(nbd.start_dt),
            end: Some(nbd.end_dt),
        }
    }
}

/// Submitted (or pre-filled) values of the room form.
///
/// Custom attribute values live in `attributes`, keyed by their field name
/// (`attribute_{id}`). Photos travel base64 encoded and are never echoed back.
#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RoomFormData {
    pub name: String,
    pub site: String,
    #[validate(length(min = 1, message = "This field is required."))]
    pub building: String,
    #[validate(length(min = 1, message = "This field is required."))]
    pub floor: String,
    #[validate(length(min = 1, message = "This field is required."))]
    pub number: String,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub is_active: bool,
    pub is_reservable: bool,
    pub reservations_need_confirmation: bool,
    pub notification_for_assistance: bool,
    pub notification_for_responsible: bool,
    #[validate(range(min = 1, max = 9, message = "Number must be between 1 and 9."))]
    pub notification_before_days: Option<i32>,
    #[validate(length(min = 1, message = "This field is required."))]
    pub owner_id: String,
    pub key_location: String,
    pub telephone: String,
    #[validate(range(min = 1, message = "Number must be at least 1."))]
    pub capacity: Option<i32>,
    pub division: String,
    #[validate(range(min = 0, message = "Number must be at least 0."))]
    pub surface_area: Option<i32>,
    #[validate(range(min = 1, message = "Number must be at least 1."))]
    pub max_advance_days: Option<i32>,
    pub comments: String,
    pub delete_photos: bool,
    #[serde_as(as = "Option<Base64>")]
    #[serde(skip_serializing)]
    pub small_photo: Option<Vec<u8>>,
    #[serde_as(as = "Option<Base64>")]
    #[serde(skip_serializing)]
    pub large_photo: Option<Vec<u8>>,
    pub equipment: Vec<String>,
    pub bookable_times: Vec<TimePair>,
    pub nonbookable_dates: Vec<DateTimePair>,
    pub attributes: BTreeMap<String, String>,
}

impl RoomFormData {
    /// Values shown on an empty creation form.
    pub fn for_new_room() -> Self {
        Self {
            is_active: true,
            is_reservable: true,
            capacity: Some(20),
            ..Default::default()
        }
    }

    /// Values shown when editing `room`. A generated name is left blank so
    /// that it keeps following building, floor and number.
    pub fn from_room(room: &Room) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            name: if room.has_special_name() {
                room.name.clone()
            } else {
                String::new()
            },
            site: text(&room.site),
            building: room.building.clone(),
            floor: room.floor.clone(),
            number: room.number.clone(),
            longitude: room.longitude,
            latitude: room.latitude,
            is_active: room.is_active,
            is_reservable: room.is_reservable,
            reservations_need_confirmation: room.reservations_need_confirmation,
            notification_for_assistance: room.notification_for_assistance,
            notification_for_responsible: room.notification_for_responsible,
            notification_before_days: room.notification_before_days,
            owner_id: room.owner_id.clone(),
            key_location: text(&room.key_location),
            telephone: text(&room.telephone),
            capacity: room.capacity,
            division: text(&room.division),
            surface_area: room.surface_area,
            max_advance_days: room.max_advance_days,
            comments: text(&room.comments),
            delete_photos: false,
            small_photo: None,
            large_photo: None,
            equipment: room.equipment.iter().map(|id| id.to_hex()).collect(),
            bookable_times: room.bookable_times.iter().map(TimePair::from).collect(),
            nonbookable_dates: room.nonbookable_dates.iter().map(DateTimePair::from).collect(),
            attributes: room
                .attributes
                .iter()
                .map(|a| (attribute_field_name(&a.attribute_id), a.value.clone()))
                .collect(),
        }
    }

    /// Reads a submitted JSON object one key at a time. Keys whose value
    /// does not fit their field are left at the default and returned so the
    /// form can report them.
    pub fn from_submission(body: Value) -> Result<(Self, Vec<String>), AppError> {
        let Value::Object(fields) = body else {
            return Err(AppError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Expected a JSON object".to_string(),
            ));
        };

        let mut accepted = Map::new();
        let mut rejected = Vec::new();
        for (key, value) in fields {
            let single = Value::Object(Map::from_iter([(key.clone(), value.clone())]));
            if serde_json::from_value::<Self>(single).is_ok() {
                accepted.insert(key, value);
            } else {
                rejected.push(key);
            }
        }

        let data = serde_json::from_value(Value::Object(accepted))
            .map_err(|e| AppError::new(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
        Ok((data, rejected))
    }

    /// Strips surrounding whitespace from the free-text fields.
    pub fn normalize(&mut self) {
        for value in [
            &mut self.name,
            &mut self.site,
            &mut self.building,
            &mut self.floor,
            &mut self.number,
            &mut self.owner_id,
            &mut self.key_location,
            &mut self.telephone,
            &mut self.division,
        ] {
            *value = value.trim().to_string();
        }
        for value in self.attributes.values_mut() {
            *value = value.trim().to_string();
        }
    }

    pub fn attribute(&self, field_name: &str) -> &str {
        self.attributes.get(field_name).map(String::as_str).unwrap_or("")
    }
}

pub fn attribute_field_name(attribute_id: &ObjectId) -> String {
    format!("attribute_{}", attribute_id.to_hex())
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number,
    Boolean,
    File,
    MultiSelect,
    TimePairs,
    DateTimePairs,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub required: bool,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct EquipmentChoice {
    #[serde(serialize_with = "serialize_object_id")]
    pub id: ObjectId,
    pub name: String,
}

/// A rendered room form: its fields, current values and validation errors.
#[derive(Debug, Serialize)]
pub struct RoomFormView {
    pub location: String,
    #[serde(serialize_with = "serialize_option_object_id")]
    pub room_id: Option<ObjectId>,
    pub fields: Vec<FormField>,
    pub equipment_choices: Vec<EquipmentChoice>,
    pub values: RoomFormData,
    pub errors: Vec<String>,
    pub room_owner: Option<User>,
}

#[derive(Debug, Serialize)]
pub struct AttributeValueDetails {
    #[serde(serialize_with = "serialize_object_id")]
    pub attribute_id: ObjectId,
    pub value: String,
}

#[skip_serializing_none]
#[derive(Debug, Serialize)]
pub struct RoomDetails {
    #[serde(serialize_with = "serialize_object_id")]
    pub id: ObjectId,
    #[serde(serialize_with = "serialize_option_object_id")]
    pub location_id: Option<ObjectId>,
    pub name: String,
    pub site: Option<String>,
    pub building: String,
    pub floor: String,
    pub number: String,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub is_active: bool,
    pub is_reservable: bool,
    pub reservations_need_confirmation: bool,
    pub owner_id: String,
    pub capacity: Option<i32>,
    pub division: Option<String>,
    pub surface_area: Option<i32>,
    pub max_advance_days: Option<i32>,
    pub comments: Option<String>,
    #[serde(serialize_with = "serialize_object_ids")]
    pub equipment: Vec<ObjectId>,
    pub has_photo: bool,
    pub attributes: Vec<AttributeValueDetails>,
    pub bookable_times: Vec<BookableTime>,
    pub nonbookable_dates: Vec<NonBookableDate>,
}

impl RoomDetails {
    pub fn new(id: ObjectId, room: Room) -> Self {
        Self {
            id,
            location_id: room.location_id,
            has_photo: room.photo.is_some(),
            name: room.name,
            site: room.site,
            building: room.building,
            floor: room.floor,
            number: room.number,
            longitude: room.longitude,
            latitude: room.latitude,
            is_active: room.is_active,
            is_reservable: room.is_reservable,
            reservations_need_confirmation: room.reservations_need_confirmation,
            owner_id: room.owner_id,
            capacity: room.capacity,
            division: room.division,
            surface_area: room.surface_area,
            max_advance_days: room.max_advance_days,
            comments: room.comments,
            equipment: room.equipment,
            attributes: room
                .attributes
                .into_iter()
                .map(|a| AttributeValueDetails {
                    attribute_id: a.attribute_id,
                    value: a.value,
                })
                .collect(),
            bookable_times: room.bookable_times,
            nonbookable_dates: room.nonbookable_dates,
        }
    }
}
