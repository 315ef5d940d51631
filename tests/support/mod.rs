#![allow(dead_code)]

use actix_web::{
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    http::header,
    web, App, Error,
};
use chrono::{Offset, Utc};

use roombook::config::Config;
use roombook::models::{
    Admin, Application, ApplicationStatus, NewAdmin, NewApplication, NewRoom, NewUser, Room, User, USER_STATUS_ACTIVE,
};
use roombook::store::Registry;
use roombook::timefmt::{self, now_epoch};

pub const DAY: i64 = 24 * 3600;

pub fn test_config() -> Config {
    Config::default()
}

pub fn app(
    registry: &Registry,
) -> App<impl ServiceFactory<ServiceRequest, Config = (), Response = ServiceResponse, Error = Error, InitError = ()>> {
    App::new()
        .app_data(web::Data::new(registry.clone()))
        .app_data(web::Data::new(test_config()))
        .app_data(roombook::json_config())
        .app_data(roombook::query_config())
        .app_data(roombook::path_config())
        .configure(roombook::configure)
        .default_service(web::to(roombook::not_found))
}

pub fn bearer(auth_key: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {}", auth_key))
}

/// Epoch seconds `days` from now, truncated to the minute so it survives the
/// `YYYY-MM-DD HH:MM` form format.
pub fn days_from_now(days: i64) -> i64 {
    let t = now_epoch() + days * DAY;
    t - t.rem_euclid(60)
}

pub fn form_time(epoch: i64) -> String {
    timefmt::format_form_time(epoch, &Utc.fix())
}

pub fn seed_user(registry: &Registry, name: &str) -> User {
    registry
        .users()
        .create(NewUser {
            student_id: format!("S{}", name),
            username: name.to_string(),
            auth_key: format!("user-key-{}", name),
            password_hash: "not-a-hash".to_string(),
            email: format!("{}@example.com", name),
            status: USER_STATUS_ACTIVE,
            created_at: 1_700_000_000,
            updated_at: 1_700_000_000,
        })
        .unwrap()
}

pub fn seed_admin(registry: &Registry, admin_id: &str, admin_name: &str, email: &str) -> Admin {
    registry
        .admins()
        .create(NewAdmin {
            admin_id: admin_id.to_string(),
            admin_name: admin_name.to_string(),
            auth_key: format!("admin-key-{}", admin_id),
            password_hash: "not-a-hash".to_string(),
            email: email.to_string(),
            created_at: 1_700_000_000,
            updated_at: 1_700_000_000,
        })
        .unwrap()
}

pub fn seed_room(registry: &Registry, number: &str, available: bool) -> Room {
    registry
        .rooms()
        .create(NewRoom {
            number: number.to_string(),
            capacity: 30,
            available,
            created_at: 0,
            updated_at: 0,
        })
        .unwrap()
}

pub fn seed_application(
    registry: &Registry,
    applicant: &User,
    room: &Room,
    start_time: i64,
    end_time: i64,
    status: ApplicationStatus,
) -> Application {
    registry
        .applications()
        .create(NewApplication {
            applicant_id: applicant.id,
            room_id: room.id,
            organization: "Debate society".to_string(),
            phone: "13800000000".to_string(),
            event: "Weekly practice".to_string(),
            start_time,
            end_time,
            status,
            created_at: 0,
            updated_at: 0,
        })
        .unwrap()
}
