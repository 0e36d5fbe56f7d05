use mongodb::bson::oid::ObjectId;
use serde_json::Value;
use validator::{Validate, ValidateEmail};

use crate::models::locations::{Location, NOTIFICATION_EMAIL_ATTRIBUTE};
use crate::models::rooms::{BookableTime, NonBookableDate, Photo, Room, RoomAttributeValue};
use crate::models::users::User;
use crate::utils::error::AppError;

use super::schemas::{
    attribute_field_name, EquipmentChoice, FieldKind, FormField, Pair, RoomFormData, RoomFormView,
};

const REQUIRED: &str = "This field is required.";

struct StaticField {
    name: &'static str,
    label: &'static str,
    required: bool,
    kind: FieldKind,
}

const fn field(name: &'static str, label: &'static str, kind: FieldKind) -> StaticField {
    StaticField {
        name,
        label,
        required: false,
        kind,
    }
}

const fn required(name: &'static str, label: &'static str) -> StaticField {
    StaticField {
        name,
        label,
        required: true,
        kind: FieldKind::Text,
    }
}

const STATIC_FIELDS: &[StaticField] = &[
    field("name", "Name", FieldKind::Text),
    field("site", "Site", FieldKind::Text),
    required("building", "Building"),
    required("floor", "Floor"),
    required("number", "Number"),
    field("longitude", "Longitude", FieldKind::Number),
    field("latitude", "Latitude", FieldKind::Number),
    field("is_active", "Active", FieldKind::Boolean),
    field("is_reservable", "Public", FieldKind::Boolean),
    field("reservations_need_confirmation", "Confirmations", FieldKind::Boolean),
    field("notification_for_assistance", "Assistance", FieldKind::Boolean),
    field("notification_for_responsible", "Notification to responsible", FieldKind::Boolean),
    field("notification_before_days", "Send booking reminders X days before", FieldKind::Number),
    required("owner_id", "Owner"),
    field("key_location", "Where is key?", FieldKind::Text),
    field("telephone", "Telephone", FieldKind::Text),
    field("capacity", "Capacity", FieldKind::Number),
    field("division", "Department", FieldKind::Text),
    field("surface_area", "Surface area", FieldKind::Number),
    field("max_advance_days", "Maximum advance time for bookings", FieldKind::Number),
    field("comments", "Comments", FieldKind::Text),
    field("delete_photos", "Delete photos", FieldKind::Boolean),
    field("large_photo", "Large photo", FieldKind::File),
    field("small_photo", "Small photo", FieldKind::File),
    field("equipment", "Equipment", FieldKind::MultiSelect),
    field("bookable_times", "Bookable times", FieldKind::TimePairs),
    field("nonbookable_dates", "Non-bookable periods", FieldKind::DateTimePairs),
];

/// A text field generated from one of the location's custom attributes.
#[derive(Debug, Clone)]
pub struct AttributeField {
    pub name: String,
    pub label: String,
    pub required: bool,
    pub multi_email: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub label: String,
    pub message: String,
}

/// The room form for one location: static fields plus one field per
/// custom attribute, and the values being edited.
#[derive(Debug)]
pub struct RoomForm {
    pub attribute_fields: Vec<AttributeField>,
    pub equipment_choices: Vec<EquipmentChoice>,
    pub data: RoomFormData,
    pub errors: Vec<FieldError>,
    rejected: Vec<String>,
}

impl RoomForm {
    /// Builds the form for `location`.
    ///
    /// Without `submitted` data the values default to those of `room` (or of
    /// an empty room), and the repeated sub-forms get at least one row.
    pub fn make(location: &Location, room: Option<&Room>, submitted: Option<RoomFormData>) -> Self {
        let attribute_fields = location
            .ordered_attributes()
            .into_iter()
            .map(|attribute| AttributeField {
                name: attribute_field_name(&attribute.id),
                label: attribute.title.clone(),
                required: attribute.is_required,
                multi_email: attribute.name == NOTIFICATION_EMAIL_ATTRIBUTE,
            })
            .collect();

        let equipment_choices = location
            .ordered_equipment()
            .into_iter()
            .map(|e| EquipmentChoice {
                id: e.id,
                name: e.name.clone(),
            })
            .collect();

        let data = match submitted {
            Some(mut data) => {
                data.normalize();
                data
            }
            None => {
                let mut data = room
                    .map(RoomFormData::from_room)
                    .unwrap_or_else(RoomFormData::for_new_room);
                if data.bookable_times.is_empty() {
                    data.bookable_times.push(Pair::empty());
                }
                if data.nonbookable_dates.is_empty() {
                    data.nonbookable_dates.push(Pair::empty());
                }
                data
            }
        };

        Self {
            attribute_fields,
            equipment_choices,
            data,
            errors: Vec::new(),
            rejected: Vec::new(),
        }
    }

    /// Builds the form from a submitted JSON body. Values of the wrong type
    /// are dropped and reported by `validate` as errors on their field.
    pub fn submitted(location: &Location, room: Option<&Room>, body: Value) -> Result<Self, AppError> {
        let (data, rejected) = RoomFormData::from_submission(body)?;
        let mut form = Self::make(location, room, Some(data));
        form.rejected = rejected;
        Ok(form)
    }

    /// Runs every field check, replacing `errors`. Returns true when the
    /// form is valid.
    pub fn validate(&mut self) -> bool {
        let mut errors: Vec<(String, String)> = Vec::new();
        let data = &self.data;

        for field in &self.rejected {
            errors.push((field.clone(), type_error(field).to_string()));
        }

        if let Err(e) = data.validate() {
            for (field, field_errors) in e.field_errors() {
                let field: &str = &field;
                if self.rejected.iter().any(|r| r == field) {
                    continue;
                }
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| error.code.to_string());
                    errors.push((field.to_string(), message));
                }
            }
        }

        match (photo(&data.small_photo), photo(&data.large_photo)) {
            (Some(_), None) => errors.push((
                "large_photo".to_string(),
                "When uploading a small photo you need to upload a large photo, too.".to_string(),
            )),
            (None, Some(_)) => errors.push((
                "small_photo".to_string(),
                "When uploading a large photo you need to upload a small photo, too.".to_string(),
            )),
            _ => {}
        }

        for value in &data.equipment {
            let valid = ObjectId::parse_str(value)
                .map(|id| self.equipment_choices.iter().any(|c| c.id == id))
                .unwrap_or(false);
            if !valid {
                errors.push((
                    "equipment".to_string(),
                    format!("'{}' is not a valid choice for this field.", value),
                ));
            }
        }

        for message in pair_errors(&data.bookable_times, "End time must be after start time.") {
            errors.push(("bookable_times".to_string(), message));
        }
        for message in pair_errors(&data.nonbookable_dates, "End date must be after start date.") {
            errors.push(("nonbookable_dates".to_string(), message));
        }

        for field in &self.attribute_fields {
            let value = data.attribute(&field.name);
            if value.is_empty() {
                if field.required {
                    errors.push((field.name.clone(), REQUIRED.to_string()));
                }
            } else if field.multi_email {
                for address in invalid_emails(value) {
                    errors.push((field.name.clone(), format!("Invalid email address: {}", address)));
                }
            }
        }

        errors.sort_by_key(|(field, _)| self.position(field));
        self.errors = errors
            .into_iter()
            .map(|(field, message)| FieldError {
                label: self.label(&field),
                field,
                message,
            })
            .collect();
        self.errors.is_empty()
    }

    pub fn error_list(&self) -> Vec<String> {
        self.errors
            .iter()
            .map(|e| format!("{}: {}", e.label, e.message))
            .collect()
    }

    /// Copies the validated values onto `room`, replacing its photo, custom
    /// attribute values and availability windows. Returns true when the
    /// room's photo was replaced or removed.
    pub fn save(&self, room: &mut Room, location: &Location) -> bool {
        let data = &self.data;
        self.populate(room);
        room.update_name();

        let photo_changed = match (photo(&data.small_photo), photo(&data.large_photo)) {
            (Some(small), Some(large)) => {
                room.photo = Some(Photo {
                    thumbnail: small.to_vec(),
                    data: large.to_vec(),
                });
                true
            }
            _ if data.delete_photos => {
                room.photo = None;
                true
            }
            _ => false,
        };

        room.attributes = location
            .attributes
            .iter()
            .filter_map(|attribute| {
                let value = data.attribute(&attribute_field_name(&attribute.id));
                (!value.is_empty()).then(|| RoomAttributeValue {
                    attribute_id: attribute.id,
                    value: value.to_string(),
                })
            })
            .collect();

        room.bookable_times = data
            .bookable_times
            .iter()
            .filter_map(Pair::complete)
            .map(|(start_time, end_time)| BookableTime {
                start_time,
                end_time,
            })
            .collect();

        room.nonbookable_dates = data
            .nonbookable_dates
            .iter()
            .filter_map(Pair::complete)
            .map(|(start_dt, end_dt)| NonBookableDate { start_dt, end_dt })
            .collect();

        photo_changed
    }

    pub fn into_view(
        self,
        location: &Location,
        room_id: Option<ObjectId>,
        room_owner: Option<User>,
    ) -> RoomFormView {
        let errors = self.error_list();
        let fields = STATIC_FIELDS
            .iter()
            .map(|f| FormField {
                name: f.name.to_string(),
                label: f.label.to_string(),
                required: f.required,
                kind: f.kind,
            })
            .chain(self.attribute_fields.into_iter().map(|f| FormField {
                name: f.name,
                label: f.label,
                required: f.required,
                kind: FieldKind::Text,
            }))
            .collect();

        RoomFormView {
            location: location.name.clone(),
            room_id,
            fields,
            equipment_choices: self.equipment_choices,
            values: self.data,
            errors,
            room_owner,
        }
    }

    fn populate(&self, room: &mut Room) {
        let data = &self.data;
        room.name = data.name.clone();
        room.site = optional(&data.site);
        room.building = data.building.clone();
        room.floor = data.floor.clone();
        room.number = data.number.clone();
        room.longitude = data.longitude;
        room.latitude = data.latitude;
        room.is_active = data.is_active;
        room.is_reservable = data.is_reservable;
        room.reservations_need_confirmation = data.reservations_need_confirmation;
        room.notification_for_assistance = data.notification_for_assistance;
        room.notification_for_responsible = data.notification_for_responsible;
        room.notification_before_days = data.notification_before_days;
        room.owner_id = data.owner_id.clone();
        room.key_location = optional(&data.key_location);
        room.telephone = optional(&data.telephone);
        room.capacity = data.capacity;
        room.division = optional(&data.division);
        room.surface_area = data.surface_area;
        room.max_advance_days = data.max_advance_days;
        room.comments = optional(&data.comments);
        room.equipment = data
            .equipment
            .iter()
            .filter_map(|id| ObjectId::parse_str(id).ok())
            .collect();
    }

    fn position(&self, field: &str) -> usize {
        STATIC_FIELDS
            .iter()
            .position(|f| f.name == field)
            .or_else(|| {
                self.attribute_fields
                    .iter()
                    .position(|f| f.name == field)
                    .map(|i| STATIC_FIELDS.len() + i)
            })
            .unwrap_or(usize::MAX)
    }

    fn label(&self, field: &str) -> String {
        STATIC_FIELDS
            .iter()
            .find(|f| f.name == field)
            .map(|f| f.label.to_string())
            .or_else(|| {
                self.attribute_fields
                    .iter()
                    .find(|f| f.name == field)
                    .map(|f| f.label.clone())
            })
            .unwrap_or_else(|| field.to_string())
    }
}

fn type_error(field: &str) -> &'static str {
    match STATIC_FIELDS.iter().find(|f| f.name == field).map(|f| f.kind) {
        Some(FieldKind::Number) => "Not a valid number.",
        Some(FieldKind::Boolean) => "Not a valid boolean.",
        Some(FieldKind::File) => "Not a valid base64 upload.",
        Some(FieldKind::TimePairs) => "Not a valid time.",
        Some(FieldKind::DateTimePairs) => "Not a valid date and time.",
        _ => "Not a valid value.",
    }
}

fn photo(upload: &Option<Vec<u8>>) -> Option<&[u8]> {
    upload.as_deref().filter(|bytes| !bytes.is_empty())
}

fn optional(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Blank rows are skipped; a half-filled row or one that ends before it
/// starts is an error.
fn pair_errors<T: Copy + PartialOrd>(pairs: &[Pair<T>], order_message: &str) -> Vec<String> {
    pairs
        .iter()
        .filter(|pair| !pair.is_blank())
        .filter_map(|pair| match pair.complete() {
            None => Some("Both start and end are required.".to_string()),
            Some((start, end)) if start >= end => Some(order_message.to_string()),
            Some(_) => None,
        })
        .collect()
}

fn invalid_emails(value: &str) -> Vec<&str> {
    value
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|address| !address.is_empty())
        .filter(|address| !address.validate_email())
        .collect()
}
