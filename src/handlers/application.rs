use std::collections::HashMap;

use actix_web::{get, http::header, post, web, HttpResponse};
use chrono::FixedOffset;
use serde::Deserialize;

use super::{found, phone, required, see_other};
use crate::auth::CurrentUser;
use crate::config::Config;
use crate::error::{FieldErrors, ServiceError};
use crate::models::{Application, ApplicationChanges, ApplicationStatus, NewApplication};
use crate::search::ApplicationSearchParams;
use crate::store::Registry;
use crate::timefmt::{self, now_epoch};
use crate::views::{self, ApplicationFormView, ApplicationView, ConflictDetailView};

/// Body of the create and update forms. Times use `YYYY-MM-DD HH:MM` in the
/// configured offset.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApplicationForm {
    pub room_id: Option<i32>,
    pub organization: String,
    pub phone: String,
    pub event: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone)]
pub(crate) struct ValidApplication {
    pub room_id: i32,
    pub organization: String,
    pub phone: String,
    pub event: String,
    pub start_time: i64,
    pub end_time: i64,
}

impl ApplicationForm {
    pub(crate) fn validate(&self, now: i64, offset: &FixedOffset) -> Result<ValidApplication, ServiceError> {
        let mut errors = FieldErrors::new();

        if self.room_id.is_none() {
            errors.add("room_id", "Room cannot be blank.");
        }
        let organization = required(&mut errors, "organization", "Organization", &self.organization, 64);
        let phone = phone(&mut errors, "phone", &self.phone);
        let event = required(&mut errors, "event", "Event", &self.event, 255);

        let start_time = parse_time(&mut errors, "start_time", "Start time", &self.start_time, offset);
        let end_time = parse_time(&mut errors, "end_time", "End time", &self.end_time, offset);
        if let (Some(start), Some(end)) = (start_time, end_time) {
            if start <= now {
                errors.add("start_time", "Start time must be in the future.");
            }
            if end <= start {
                errors.add("end_time", "End time must be later than start time.");
            }
        }

        errors.into_result()?;
        match (self.room_id, start_time, end_time) {
            (Some(room_id), Some(start_time), Some(end_time)) => Ok(ValidApplication {
                room_id,
                organization,
                phone,
                event,
                start_time,
                end_time,
            }),
            _ => Err(ServiceError::Internal("validated form is incomplete".to_string())),
        }
    }
}

fn parse_time(errors: &mut FieldErrors, field: &str, label: &str, value: &str, offset: &FixedOffset) -> Option<i64> {
    if value.trim().is_empty() {
        errors.add(field, format!("{} cannot be blank.", label));
        return None;
    }
    let parsed = timefmt::parse_form_time(value, offset);
    if parsed.is_none() {
        errors.add(field, format!("{} must look like 2024-05-01 14:30.", label));
    }
    parsed
}

/// The room must exist and accept bookings.
pub(crate) fn ensure_room_bookable(registry: &Registry, room_id: i32) -> Result<(), ServiceError> {
    match registry.rooms().find_by_id(room_id)? {
        None => Err(ServiceError::Validation(FieldErrors::single("room_id", "Room does not exist."))),
        Some(room) if !room.available => Err(ServiceError::Validation(FieldErrors::single(
            "room_id",
            "This room is not available.",
        ))),
        Some(_) => Ok(()),
    }
}

fn find_application(registry: &Registry, id: i32) -> Result<Application, ServiceError> {
    found(registry.applications().find_by_id(id)?)
}

/// Loads application `id` and checks it belongs to `user_id`.
fn find_own_application(registry: &Registry, id: i32, user_id: i32) -> Result<Application, ServiceError> {
    let application = find_application(registry, id)?;
    if application.applicant_id != user_id {
        return Err(ServiceError::forbidden());
    }
    Ok(application)
}

fn ensure_updatable(application: &Application, now: i64) -> Result<(), ServiceError> {
    if application.can_update(now) {
        Ok(())
    } else {
        Err(ServiceError::Conflict(
            "This application has been rejected or has already started and can no longer be changed.".to_string(),
        ))
    }
}

#[get("/application")]
async fn index(
    user: CurrentUser,
    registry: web::Data<Registry>,
    config: web::Data<Config>,
    query: web::Query<ApplicationSearchParams>,
) -> Result<HttpResponse, ServiceError> {
    let now = now_epoch();
    let offset = config.utc_offset;
    let filter = query.to_filter(Some(user.id()), now, &offset);
    let request = query.page_request();

    let (page, rooms) = web::block(move || -> Result<_, ServiceError> {
        let page = registry.applications().search(&filter, request)?;
        let rooms: HashMap<i32, _> = registry.rooms().list()?.into_iter().map(|r| (r.id, r)).collect();
        Ok((page, rooms))
    })
    .await??;

    let page = page.map(|application| ApplicationView::new(&application, rooms.get(&application.room_id), now, &offset));
    Ok(HttpResponse::Ok().json(page))
}

#[post("/application/create")]
async fn create(
    user: CurrentUser,
    registry: web::Data<Registry>,
    config: web::Data<Config>,
    form: web::Json<ApplicationForm>,
) -> Result<HttpResponse, ServiceError> {
    let now = now_epoch();
    let valid = form.validate(now, &config.utc_offset)?;
    let applicant_id = user.id();

    let application = web::block(move || -> Result<_, ServiceError> {
        ensure_room_bookable(&registry, valid.room_id)?;
        let application = registry.applications().create(NewApplication {
            applicant_id,
            room_id: valid.room_id,
            organization: valid.organization,
            phone: valid.phone,
            event: valid.event,
            start_time: valid.start_time,
            end_time: valid.end_time,
            status: ApplicationStatus::Pending,
            created_at: now,
            updated_at: now,
        })?;
        Ok(application)
    })
    .await??;

    log::info!(
        "User {} submitted application {} for room {}",
        applicant_id,
        application.id,
        application.room_id
    );
    Ok(see_other(format!("/application/{}", application.id)))
}

#[get("/application/{id:\\d+}")]
async fn view(
    user: CurrentUser,
    registry: web::Data<Registry>,
    config: web::Data<Config>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let id = path.into_inner();
    let user_id = user.id();
    let now = now_epoch();

    let (application, room, conflict_id) = web::block(move || -> Result<_, ServiceError> {
        let application = find_own_application(&registry, id, user_id)?;
        let room = registry.rooms().find_by_id(application.room_id)?;
        let conflict_id = if application.status == ApplicationStatus::Pending && application.can_update(now) {
            registry.applications().find_conflict_id(&application)?
        } else {
            None
        };
        Ok((application, room, conflict_id))
    })
    .await??;

    let view = ApplicationView::new(&application, room.as_ref(), now, &config.utc_offset)
        .with_warnings(conflict_id, room.as_ref());
    Ok(HttpResponse::Ok().json(view))
}

/// Any signed-in user may look at the application their own conflicts with.
#[get("/application/{id:\\d+}/conflict-detail")]
async fn conflict_detail(
    _user: CurrentUser,
    registry: web::Data<Registry>,
    config: web::Data<Config>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let id = path.into_inner();

    let (application, room) = web::block(move || -> Result<_, ServiceError> {
        let application = find_application(&registry, id)?;
        let room = registry.rooms().find_by_id(application.room_id)?;
        Ok((application, room))
    })
    .await??;

    Ok(HttpResponse::Ok().json(ConflictDetailView::new(&application, room.as_ref(), &config.utc_offset)))
}

#[get("/application/{id:\\d+}/update")]
async fn edit(
    user: CurrentUser,
    registry: web::Data<Registry>,
    config: web::Data<Config>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let id = path.into_inner();
    let user_id = user.id();

    let application = web::block(move || find_own_application(&registry, id, user_id)).await??;

    Ok(HttpResponse::Ok().json(ApplicationFormView::new(&application, &config.utc_offset)))
}

/// Saving always sends the application back to the approvers.
#[post("/application/{id:\\d+}/update")]
async fn update(
    user: CurrentUser,
    registry: web::Data<Registry>,
    config: web::Data<Config>,
    path: web::Path<i32>,
    form: web::Json<ApplicationForm>,
) -> Result<HttpResponse, ServiceError> {
    let id = path.into_inner();
    let user_id = user.id();
    let offset = config.utc_offset;
    let form = form.into_inner();
    let now = now_epoch();

    let application = web::block(move || -> Result<_, ServiceError> {
        let current = find_own_application(&registry, id, user_id)?;
        ensure_updatable(&current, now)?;
        let valid = form.validate(now, &offset)?;
        if valid.room_id != current.room_id {
            ensure_room_bookable(&registry, valid.room_id)?;
        }

        let changes = ApplicationChanges {
            room_id: valid.room_id,
            organization: valid.organization,
            phone: valid.phone,
            event: valid.event,
            start_time: valid.start_time,
            end_time: valid.end_time,
            status: ApplicationStatus::Pending,
            updated_at: now,
        };
        found(registry.applications().update(id, changes)?)
    })
    .await??;

    log::info!("User {} updated application {}; status reset to pending", user_id, application.id);
    Ok(see_other(format!("/application/{}", application.id)))
}

#[post("/application/{id:\\d+}/delete")]
async fn delete(user: CurrentUser, registry: web::Data<Registry>, path: web::Path<i32>) -> Result<HttpResponse, ServiceError> {
    let id = path.into_inner();
    let user_id = user.id();
    let now = now_epoch();

    web::block(move || -> Result<_, ServiceError> {
        let application = find_own_application(&registry, id, user_id)?;
        ensure_updatable(&application, now)?;
        if !registry.applications().delete(id)? {
            return Err(ServiceError::page_not_found());
        }
        Ok(())
    })
    .await??;

    log::info!("User {} withdrew application {}", user_id, id);
    Ok(see_other("/application"))
}

#[get("/application/{id:\\d+}/print")]
async fn print(
    user: CurrentUser,
    registry: web::Data<Registry>,
    config: web::Data<Config>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let id = path.into_inner();
    let user_id = user.id();

    let (application, room, applicant) = web::block(move || -> Result<_, ServiceError> {
        let application = find_own_application(&registry, id, user_id)?;
        let room = registry.rooms().find_by_id(application.room_id)?;
        let applicant = registry.users().find_by_id(application.applicant_id)?;
        Ok((application, room, applicant))
    })
    .await??;

    let slip = views::render_print_slip(&application, room.as_ref(), applicant.as_ref(), &config.utc_offset);
    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "text/plain; charset=utf-8"))
        .body(slip))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(create)
        .service(view)
        .service(conflict_detail)
        .service(edit)
        .service(update)
        .service(delete)
        .service(print);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Offset, Utc};

    fn form() -> ApplicationForm {
        ApplicationForm {
            room_id: Some(1),
            organization: "Photography club".into(),
            phone: "13800000000".into(),
            event: "Exhibition setup".into(),
            start_time: "2030-03-01 09:00".into(),
            end_time: "2030-03-01 11:30".into(),
        }
    }

    #[test]
    fn valid_form_parses_times() {
        let valid = form().validate(0, &Utc.fix()).unwrap();
        assert_eq!(valid.end_time - valid.start_time, 9000);
        assert_eq!(valid.organization, "Photography club");
    }

    #[test]
    fn end_must_follow_start() {
        let mut bad = form();
        bad.end_time = "2030-03-01 09:00".into();
        match bad.validate(0, &Utc.fix()) {
            Err(ServiceError::Validation(errors)) => assert!(errors.has("end_time")),
            other => panic!("unexpected {:?}", other.map(|v| v.room_id)),
        }
    }

    #[test]
    fn every_field_is_reported() {
        match ApplicationForm::default().validate(0, &Utc.fix()) {
            Err(ServiceError::Validation(errors)) => {
                for field in ["room_id", "organization", "phone", "event", "start_time", "end_time"] {
                    assert!(errors.has(field), "{} missing", field);
                }
            }
            other => panic!("unexpected {:?}", other.map(|v| v.room_id)),
        }
    }

    #[test]
    fn past_start_is_rejected() {
        let now = timefmt::parse_form_time("2030-03-02 00:00", &Utc.fix()).unwrap();
        match form().validate(now, &Utc.fix()) {
            Err(ServiceError::Validation(errors)) => assert!(errors.has("start_time")),
            other => panic!("unexpected {:?}", other.map(|v| v.room_id)),
        }
    }
}
