use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// Attribute name that gets the multi-address email check on the room form.
pub const NOTIFICATION_EMAIL_ATTRIBUTE: &str = "notification-email";

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomAttribute {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub title: String,
    #[serde(rename = "isRequired", default)]
    pub is_required: bool,
    #[serde(rename = "parentId")]
    pub parent_id: Option<ObjectId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Equipment {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<RoomAttribute>,
    #[serde(default)]
    pub equipment: Vec<Equipment>,
}

impl Location {
    /// Custom attributes in form order: top-level ones first, then by parent.
    pub fn ordered_attributes(&self) -> Vec<&RoomAttribute> {
        let mut attributes: Vec<_> = self.attributes.iter().collect();
        attributes.sort_by_key(|a| a.parent_id);
        attributes
    }

    pub fn ordered_equipment(&self) -> Vec<&Equipment> {
        let mut equipment: Vec<_> = self.equipment.iter().collect();
        equipment.sort_by(|a, b| a.name.cmp(&b.name));
        equipment
    }

    pub fn admin_url(&self) -> String {
        format!("/admin/locations/{}", self.name)
    }
}
