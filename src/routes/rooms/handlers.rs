use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use mongodb::bson::{oid::ObjectId, DateTime};
use serde_json::Value;

use crate::databases::RoomStore;
use crate::models::{locations::Location, rooms::Room, users::User};
use crate::state::AppState;
use crate::utils::cache::PhotoSize;
use crate::utils::error::AppError;
use crate::utils::flash::FlashRedirect;

use super::form::RoomForm;
use super::guards::{require_location, require_room, require_room_in};
use super::schemas::{RoomDetails, RoomFormView};

fn room_details_url(room_id: &ObjectId) -> String {
    format!("/rooms/{}", room_id.to_hex())
}

pub async fn delete_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<FlashRedirect, AppError> {
    let store = state.store.as_ref();
    let (id, room) = require_room(store, &room_id).await?;

    if store.has_live_reservations(id, DateTime::now()).await? {
        tracing::warn!(room_id = %id, "refusing to delete room with live bookings");
        return Ok(FlashRedirect::error(
            "Cannot delete room with live bookings",
            room_details_url(&id),
        ));
    }

    let location = match room.location_id {
        Some(location_id) => store.find_location(location_id).await?,
        None => None,
    };
    store.delete_room(id).await?;
    state.photos.invalidate_room(&id).await;
    tracing::info!(room_id = %id, room = %room.name, "deleted room");

    let redirect = location
        .map(|l| l.admin_url())
        .unwrap_or_else(|| "/admin/locations".to_string());
    Ok(FlashRedirect::success("Room deleted", redirect))
}

pub async fn new_room_form(
    State(state): State<AppState>,
    Path(location): Path<String>,
) -> Result<Json<RoomFormView>, AppError> {
    let store = state.store.as_ref();
    let location = require_location(store, &location).await?;
    let form = RoomForm::make(&location, None, None);
    let room_owner = resolve_owner(store, &form, None).await?;
    Ok(Json(form.into_view(&location, None, room_owner)))
}

pub async fn create_room(
    State(state): State<AppState>,
    Path(location): Path<String>,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    let location = require_location(state.store.as_ref(), &location).await?;
    let room = Room {
        id: Some(ObjectId::new()),
        ..Default::default()
    };
    let form = RoomForm::submitted(&location, None, body)?;
    process(&state, &location, room, form, SaveMode::Create).await
}

pub async fn edit_room_form(
    State(state): State<AppState>,
    Path((location, room_id)): Path<(String, String)>,
) -> Result<Json<RoomFormView>, AppError> {
    let store = state.store.as_ref();
    let location = require_location(store, &location).await?;
    let (id, room) = require_room_in(store, &location, &room_id).await?;
    let form = RoomForm::make(&location, Some(&room), None);
    let room_owner = resolve_owner(store, &form, Some(&room)).await?;
    Ok(Json(form.into_view(&location, Some(id), room_owner)))
}

pub async fn modify_room(
    State(state): State<AppState>,
    Path((location, room_id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    let store = state.store.as_ref();
    let location = require_location(store, &location).await?;
    let (_, room) = require_room_in(store, &location, &room_id).await?;
    let form = RoomForm::submitted(&location, Some(&room), body)?;
    process(&state, &location, room, form, SaveMode::Modify).await
}

pub async fn room_details(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomDetails>, AppError> {
    let (id, room) = require_room(state.store.as_ref(), &room_id).await?;
    Ok(Json(RoomDetails::new(id, room)))
}

pub async fn room_photo(
    State(state): State<AppState>,
    Path((room_id, size)): Path<(String, PhotoSize)>,
) -> Result<Response, AppError> {
    let id = ObjectId::parse_str(&room_id).map_err(|_| AppError::not_found("Room"))?;
    let data = match state.photos.get(&id, size).await {
        Some(data) => data,
        None => {
            let (_, room) = require_room(state.store.as_ref(), &room_id).await?;
            let photo = room.photo.ok_or_else(|| AppError::not_found("Photo"))?;
            let data = axum::body::Bytes::copy_from_slice(photo.get(size));
            state.photos.insert(&id, size, data.clone()).await;
            data
        }
    };
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], data).into_response())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SaveMode {
    Create,
    Modify,
}

/// The owner shown next to the form: the submitted one if any, otherwise
/// the room's current responsible.
async fn resolve_owner(
    store: &dyn RoomStore,
    form: &RoomForm,
    room: Option<&Room>,
) -> Result<Option<User>, AppError> {
    let owner_id = if !form.data.owner_id.is_empty() {
        form.data.owner_id.as_str()
    } else {
        match room {
            Some(room) if !room.owner_id.is_empty() => room.owner_id.as_str(),
            _ => return Ok(None),
        }
    };
    store.find_user(owner_id).await
}

async fn process(
    state: &AppState,
    location: &Location,
    mut room: Room,
    mut form: RoomForm,
    mode: SaveMode,
) -> Result<Response, AppError> {
    let store = state.store.as_ref();
    let room_owner = match mode {
        SaveMode::Create => resolve_owner(store, &form, None).await?,
        SaveMode::Modify => resolve_owner(store, &form, Some(&room)).await?,
    };

    if !form.validate() {
        tracing::debug!(errors = ?form.error_list(), "room form rejected");
        let room_id = match mode {
            SaveMode::Create => None,
            SaveMode::Modify => room.id,
        };
        let view = form.into_view(location, room_id, room_owner);
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(view)).into_response());
    }

    let photo_changed = form.save(&mut room, location);
    let (id, response) = match mode {
        SaveMode::Create => {
            room.location_id = Some(location.id);
            let room = store.insert_room(room).await?;
            let id = room
                .id
                .ok_or_else(|| AppError::internal("inserted room has no id"))?;
            tracing::info!(room_id = %id, room = %room.name, location = %location.name, "added room");
            (id, FlashRedirect::success("Room added", room_details_url(&id)))
        }
        SaveMode::Modify => {
            store.replace_room(&room).await?;
            let id = room
                .id
                .ok_or_else(|| AppError::internal("stored room has no id"))?;
            tracing::info!(room_id = %id, room = %room.name, "updated room");
            (id, FlashRedirect::success("Room updated", room_details_url(&id)))
        }
    };
    // Only after the write, so a concurrent read cannot re-cache the old photo.
    if photo_changed {
        state.photos.invalidate_room(&id).await;
    }
    Ok(response.into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Method, Request},
        Router,
    };
    use chrono::NaiveTime;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::databases::memory::MemoryRoomStore;
    use crate::models::locations::{Equipment, RoomAttribute};
    use crate::models::reservations::Reservation;
    use crate::models::rooms::{BookableTime, Photo};
    use crate::routes::router;
    use crate::utils::cache::PhotoCache;

    const TOKEN: &str = "let-me-in";

    struct Fixture {
        store: Arc<MemoryRoomStore>,
        location: Location,
        room_id: ObjectId,
        app: Router,
    }

    fn fixture(seed: impl FnOnce(MemoryRoomStore, &Location, ObjectId) -> MemoryRoomStore) -> Fixture {
        let location = Location {
            id: ObjectId::new(),
            name: "CERN".to_string(),
            attributes: vec![RoomAttribute {
                id: ObjectId::new(),
                name: "manager-group".to_string(),
                title: "Manager group".to_string(),
                is_required: true,
                parent_id: None,
            }],
            equipment: vec![Equipment {
                id: ObjectId::new(),
                name: "Projector".to_string(),
            }],
        };
        let room_id = ObjectId::new();
        let room = Room {
            id: Some(room_id),
            location_id: Some(location.id),
            name: "28-1-012".to_string(),
            building: "28".to_string(),
            floor: "1".to_string(),
            number: "012".to_string(),
            owner_id: "7".to_string(),
            bookable_times: vec![BookableTime {
                start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            }],
            photo: Some(Photo {
                thumbnail: b"thumb".to_vec(),
                data: b"full".to_vec(),
            }),
            ..Default::default()
        };
        let store = MemoryRoomStore::default()
            .with_location(location.clone())
            .with_room(room)
            .with_user(User {
                id: "7".to_string(),
                full_name: "Ada Admin".to_string(),
                email: "ada@cern.ch".to_string(),
            });
        let store = Arc::new(seed(store, &location, room_id));
        let state = AppState {
            store: store.clone(),
            photos: PhotoCache::new(16),
            admin_token: TOKEN.into(),
        };
        Fixture {
            store,
            location,
            room_id,
            app: router(state),
        }
    }

    fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN));
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    fn public(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn fetch_photo(app: &Router, room_id: &ObjectId, size: &str) -> (StatusCode, Vec<u8>) {
        let uri = format!("/rooms/{}/photo/{}", room_id.to_hex(), size);
        let response = app.clone().oneshot(public(&uri)).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn submission(location: &Location) -> Value {
        json!({
            "building": "28",
            "floor": "2",
            "number": "005",
            "owner_id": "7",
            "capacity": 12,
            "is_active": true,
            "equipment": [location.equipment[0].id.to_hex()],
            "bookable_times": [{ "start": "09:00:00", "end": "17:00:00" }, {}],
            "nonbookable_dates": [{ "start": "2026-12-24T00:00:00", "end": "2027-01-04T00:00:00" }],
            "attributes": {
                format!("attribute_{}", location.attributes[0].id.to_hex()): "rb-admins"
            }
        })
    }

    #[tokio::test]
    async fn admin_routes_require_token() {
        let f = fixture(|s, _, _| s);
        let request = Request::builder()
            .uri("/admin/locations/CERN/rooms/new")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&f.app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_token_is_rejected() {
        let f = fixture(|s, _, _| s);
        let request = Request::builder()
            .uri("/admin/locations/CERN/rooms/new")
            .header(header::AUTHORIZATION, "Bearer let-me-out")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&f.app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let uri = format!("/admin/rooms/{}", f.room_id.to_hex());
        let request = Request::builder()
            .method(Method::DELETE)
            .uri(uri)
            .header(header::AUTHORIZATION, TOKEN)
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&f.app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(f.store.room_count(), 1);
    }

    #[tokio::test]
    async fn new_form_lists_dynamic_fields() {
        let f = fixture(|s, _, _| s);
        let (status, body) = send(
            &f.app,
            request(Method::GET, "/admin/locations/CERN/rooms/new", None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let attribute_field = format!("attribute_{}", f.location.attributes[0].id.to_hex());
        let fields = body["fields"].as_array().unwrap();
        assert!(fields
            .iter()
            .any(|field| field["name"] == attribute_field.as_str() && field["required"] == true));
        assert_eq!(body["values"]["capacity"], 20);
        assert_eq!(body["values"]["bookable_times"].as_array().unwrap().len(), 1);
        assert!(body["room_owner"].is_null());
    }

    #[tokio::test]
    async fn unknown_location_is_not_found() {
        let f = fixture(|s, _, _| s);
        let (status, _) = send(
            &f.app,
            request(Method::GET, "/admin/locations/Nowhere/rooms/new", None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_room_persists_and_redirects() {
        let f = fixture(|s, _, _| s);
        let (status, body) = send(
            &f.app,
            request(
                Method::POST,
                "/admin/locations/CERN/rooms",
                Some(submission(&f.location)),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(body["flash"]["category"], "success");
        assert_eq!(body["flash"]["message"], "Room added");
        assert_eq!(f.store.room_count(), 2);

        let redirect = body["redirect"].as_str().unwrap();
        let id = ObjectId::parse_str(redirect.trim_start_matches("/rooms/")).unwrap();
        let room = f.store.room(&id).unwrap();
        assert_eq!(room.name, "28-2-005");
        assert_eq!(room.location_id, Some(f.location.id));
        assert_eq!(room.capacity, Some(12));
        assert_eq!(room.bookable_times.len(), 1);
        assert_eq!(room.nonbookable_dates.len(), 1);
        assert_eq!(room.attributes[0].value, "rb-admins");
    }

    #[tokio::test]
    async fn invalid_submission_rerenders_with_errors() {
        let f = fixture(|s, _, _| s);
        let mut data = submission(&f.location);
        data["building"] = json!("");
        data["attributes"] = json!({});

        let (status, body) = send(
            &f.app,
            request(Method::POST, "/admin/locations/CERN/rooms", Some(data)),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body["errors"],
            json!([
                "Building: This field is required.",
                "Manager group: This field is required."
            ])
        );
        assert_eq!(body["room_owner"]["fullName"], "Ada Admin");
        assert_eq!(f.store.room_count(), 1);
    }

    #[tokio::test]
    async fn wrongly_typed_submission_rerenders_with_errors() {
        let f = fixture(|s, _, _| s);
        let mut data = submission(&f.location);
        data["capacity"] = json!("lots");
        let uri = format!("/admin/locations/CERN/rooms/{}", f.room_id.to_hex());

        let (status, body) = send(&f.app, request(Method::POST, &uri, Some(data))).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["errors"], json!(["Capacity: Not a valid number."]));
        assert_eq!(body["values"]["floor"], "2");
        assert_eq!(body["room_owner"]["fullName"], "Ada Admin");
        assert_eq!(f.store.room(&f.room_id).unwrap().floor, "1");
    }

    #[tokio::test]
    async fn non_object_submission_is_unprocessable() {
        let f = fixture(|s, _, _| s);
        let (status, body) = send(
            &f.app,
            request(Method::POST, "/admin/locations/CERN/rooms", Some(json!("28-1-012"))),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Expected a JSON object");
        assert_eq!(f.store.room_count(), 1);
    }

    #[tokio::test]
    async fn edit_form_is_prefilled_from_room() {
        let f = fixture(|s, _, _| s);
        let uri = format!("/admin/locations/CERN/rooms/{}", f.room_id.to_hex());
        let (status, body) = send(&f.app, request(Method::GET, &uri, None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["room_id"], f.room_id.to_hex());
        assert_eq!(body["values"]["name"], "");
        assert_eq!(body["values"]["building"], "28");
        assert_eq!(body["values"]["bookable_times"][0]["start"], "08:00:00");
        assert_eq!(body["room_owner"]["_id"], "7");
    }

    #[tokio::test]
    async fn modify_room_updates_and_redirects() {
        let f = fixture(|s, _, _| s);
        let mut data = submission(&f.location);
        data["name"] = json!("Council Chamber");
        let uri = format!("/admin/locations/CERN/rooms/{}", f.room_id.to_hex());

        let (status, body) = send(&f.app, request(Method::POST, &uri, Some(data))).await;

        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(body["flash"]["message"], "Room updated");
        assert_eq!(body["redirect"], format!("/rooms/{}", f.room_id.to_hex()));
        let room = f.store.room(&f.room_id).unwrap();
        assert_eq!(room.name, "Council Chamber");
        assert_eq!(room.floor, "2");
        assert!(room.photo.is_some(), "photo kept when nothing uploaded");
    }

    #[tokio::test]
    async fn room_from_other_location_is_not_found() {
        let f = fixture(|s, _, _| {
            s.with_location(Location {
                id: ObjectId::new(),
                name: "Elsewhere".to_string(),
                attributes: vec![],
                equipment: vec![],
            })
        });
        let uri = format!("/admin/locations/Elsewhere/rooms/{}", f.room_id.to_hex());
        let (status, _) = send(&f.app, request(Method::GET, &uri, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &f.app,
            request(Method::GET, "/admin/locations/CERN/rooms/not-an-id", None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_room_redirects_to_location() {
        let f = fixture(|s, _, _| s);
        let uri = format!("/admin/rooms/{}", f.room_id.to_hex());

        let (status, body) = send(&f.app, request(Method::DELETE, &uri, None)).await;

        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(body["flash"]["message"], "Room deleted");
        assert_eq!(body["redirect"], "/admin/locations/CERN");
        assert_eq!(f.store.room_count(), 0);
    }

    #[tokio::test]
    async fn deleted_room_photo_is_no_longer_served() {
        let f = fixture(|s, _, _| s);
        assert_eq!(fetch_photo(&f.app, &f.room_id, "large").await, (StatusCode::OK, b"full".to_vec()));

        let uri = format!("/admin/rooms/{}", f.room_id.to_hex());
        let (status, _) = send(&f.app, request(Method::DELETE, &uri, None)).await;
        assert_eq!(status, StatusCode::SEE_OTHER);

        let (status, _) = fetch_photo(&f.app, &f.room_id, "large").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn modified_photo_replaces_cached_one() {
        let f = fixture(|s, _, _| s);
        assert_eq!(fetch_photo(&f.app, &f.room_id, "small").await, (StatusCode::OK, b"thumb".to_vec()));
        assert_eq!(fetch_photo(&f.app, &f.room_id, "large").await, (StatusCode::OK, b"full".to_vec()));

        let mut data = submission(&f.location);
        data["small_photo"] = json!("bmV3LXRodW1i");
        data["large_photo"] = json!("bmV3LWZ1bGw=");
        let uri = format!("/admin/locations/CERN/rooms/{}", f.room_id.to_hex());
        let (status, _) = send(&f.app, request(Method::POST, &uri, Some(data))).await;
        assert_eq!(status, StatusCode::SEE_OTHER);

        assert_eq!(
            fetch_photo(&f.app, &f.room_id, "small").await,
            (StatusCode::OK, b"new-thumb".to_vec())
        );
        assert_eq!(
            fetch_photo(&f.app, &f.room_id, "large").await,
            (StatusCode::OK, b"new-full".to_vec())
        );
    }

    #[tokio::test]
    async fn deleting_photo_drops_cached_one() {
        let f = fixture(|s, _, _| s);
        assert_eq!(fetch_photo(&f.app, &f.room_id, "small").await.0, StatusCode::OK);

        let mut data = submission(&f.location);
        data["delete_photos"] = json!(true);
        let uri = format!("/admin/locations/CERN/rooms/{}", f.room_id.to_hex());
        let (status, _) = send(&f.app, request(Method::POST, &uri, Some(data))).await;
        assert_eq!(status, StatusCode::SEE_OTHER);

        assert_eq!(fetch_photo(&f.app, &f.room_id, "small").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_refused_with_live_bookings() {
        let f = fixture(|s, _, room_id| {
            s.with_reservation(Reservation {
                id: ObjectId::new(),
                room_id,
                end_dt: DateTime::from_millis(DateTime::now().timestamp_millis() + 3_600_000),
                is_cancelled: false,
                is_rejected: false,
            })
        });
        let uri = format!("/admin/rooms/{}", f.room_id.to_hex());

        let (status, body) = send(&f.app, request(Method::DELETE, &uri, None)).await;

        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(body["flash"]["category"], "error");
        assert_eq!(body["flash"]["message"], "Cannot delete room with live bookings");
        assert_eq!(body["redirect"], format!("/rooms/{}", f.room_id.to_hex()));
        assert_eq!(f.store.room_count(), 1);
    }

    #[tokio::test]
    async fn past_bookings_do_not_block_delete() {
        let f = fixture(|s, _, room_id| {
            s.with_reservation(Reservation {
                id: ObjectId::new(),
                room_id,
                end_dt: DateTime::from_millis(0),
                is_cancelled: false,
                is_rejected: false,
            })
        });
        let uri = format!("/admin/rooms/{}", f.room_id.to_hex());
        let (status, body) = send(&f.app, request(Method::DELETE, &uri, None)).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(body["flash"]["category"], "success");
    }

    #[tokio::test]
    async fn room_details_are_public() {
        let f = fixture(|s, _, _| s);
        let request = Request::builder()
            .uri(format!("/rooms/{}", f.room_id.to_hex()))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&f.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "28-1-012");
        assert_eq!(body["has_photo"], true);
    }

    #[tokio::test]
    async fn photo_is_served_by_size() {
        let f = fixture(|s, _, _| s);
        let request = Request::builder()
            .uri(format!("/rooms/{}/photo/small", f.room_id.to_hex()))
            .body(Body::empty())
            .unwrap();
        let response = f.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"thumb");
    }
}
