use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;

use super::{found, identifier};
use crate::auth::CurrentAdmin;
use crate::error::{FieldErrors, ServiceError};
use crate::models::NewRoom;
use crate::store::Registry;
use crate::timefmt::now_epoch;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewRoomForm {
    pub number: String,
    pub capacity: i32,
    pub available: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityForm {
    pub available: bool,
}

#[get("/room")]
async fn list(registry: web::Data<Registry>) -> Result<HttpResponse, ServiceError> {
    let rooms = web::block(move || registry.rooms().list()).await??;
    Ok(HttpResponse::Ok().json(rooms))
}

#[post("/admin/room/create")]
async fn create(
    current: CurrentAdmin,
    registry: web::Data<Registry>,
    form: web::Json<NewRoomForm>,
) -> Result<HttpResponse, ServiceError> {
    let mut errors = FieldErrors::new();
    let number = identifier(&mut errors, "number", "Room number", &form.number, 32);
    if form.capacity <= 0 {
        errors.add("capacity", "Capacity must be greater than 0.");
    }
    errors.into_result()?;

    let now = now_epoch();
    let new_room = NewRoom {
        number,
        capacity: form.capacity,
        available: form.available.unwrap_or(true),
        created_at: now,
        updated_at: now,
    };
    let room = web::block(move || registry.rooms().create(new_room)).await??;

    log::info!("Admin {} added room {}", current.0.admin_id, room.number);
    Ok(HttpResponse::Created().json(room))
}

/// Closing a room keeps its applications; applicants see a warning.
#[post("/admin/room/{id:\\d+}/availability")]
async fn set_availability(
    current: CurrentAdmin,
    registry: web::Data<Registry>,
    path: web::Path<i32>,
    form: web::Json<AvailabilityForm>,
) -> Result<HttpResponse, ServiceError> {
    let id = path.into_inner();
    let available = form.available;
    let now = now_epoch();

    let room = found(web::block(move || registry.rooms().set_available(id, available, now)).await??)?;

    log::info!(
        "Admin {} marked room {} as {}",
        current.0.admin_id,
        room.number,
        if available { "available" } else { "unavailable" }
    );
    Ok(HttpResponse::Ok().json(room))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list).service(create).service(set_availability);
}
