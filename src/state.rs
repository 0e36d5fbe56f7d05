use std::sync::Arc;

use crate::databases::RoomStore;
use crate::utils::cache::PhotoCache;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RoomStore>,
    pub photos: PhotoCache,
    pub admin_token: Arc<str>,
}
