use axum::body::Bytes;
use moka::future::Cache;
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use strum::{Display, EnumIter, IntoEnumIterator};

#[derive(Debug, Clone, Copy, Display, EnumIter, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PhotoSize {
    Small,
    Large,
}

/// Rendered room photos keyed by `photo-{room}-{size}`.
#[derive(Clone)]
pub struct PhotoCache {
    inner: Cache<String, Bytes>,
}

impl PhotoCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            inner: Cache::builder().max_capacity(capacity).build(),
        }
    }

    pub fn key(room_id: &ObjectId, size: PhotoSize) -> String {
        format!("photo-{}-{}", room_id.to_hex(), size)
    }

    pub async fn get(&self, room_id: &ObjectId, size: PhotoSize) -> Option<Bytes> {
        self.inner.get(&Self::key(room_id, size)).await
    }

    pub async fn insert(&self, room_id: &ObjectId, size: PhotoSize, data: Bytes) {
        self.inner.insert(Self::key(room_id, size), data).await;
    }

    /// Drops every cached size of the room's photo.
    pub async fn invalidate_room(&self, room_id: &ObjectId) {
        for size in PhotoSize::iter() {
            self.inner.invalidate(&Self::key(room_id, size)).await;
        }
        tracing::debug!(room_id = %room_id, "invalidated cached photos");
    }
}
