use std::collections::HashMap;

use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;

use super::{email, found, identifier, password, required, see_other};
use crate::auth::CurrentAdmin;
use crate::config::Config;
use crate::error::{FieldErrors, Res, ServiceError};
use crate::models::{ApplicationStatus, NewAdmin};
use crate::search::{AdminSearchParams, ApplicationSearchParams};
use crate::security;
use crate::store::{Approval, Registry};
use crate::timefmt::{format_detail_time, now_epoch};
use crate::views::{AdminView, ApplicationView, ResetTokenView, SessionView};

#[derive(Debug, Deserialize)]
pub struct AdminLoginForm {
    pub admin_id: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewAdminForm {
    pub admin_id: String,
    pub admin_name: String,
    pub email: String,
    pub password: String,
}

#[post("/admin/login")]
async fn login(registry: web::Data<Registry>, form: web::Json<AdminLoginForm>) -> Result<HttpResponse, ServiceError> {
    let AdminLoginForm { admin_id, password } = form.into_inner();

    let admin = web::block(move || -> Result<_, ServiceError> {
        let admin = registry.admins().find_by_admin_id(admin_id.trim())?;
        Ok(admin.filter(|admin| security::verify_password(&password, &admin.password_hash)))
    })
    .await??;

    match admin {
        Some(admin) => {
            log::info!("Admin {} signed in", admin.admin_id);
            Ok(HttpResponse::Ok().json(SessionView {
                id: admin.id,
                auth_key: admin.auth_key,
            }))
        }
        _ => Err(ServiceError::Validation(FieldErrors::single(
            "password",
            "Incorrect admin ID or password.",
        ))),
    }
}

/// Consumes a reset token issued through `/admin/{id}/reset-token`.
#[post("/admin/reset-password")]
async fn reset_password(
    registry: web::Data<Registry>,
    config: web::Data<Config>,
    form: web::Json<ResetPasswordForm>,
) -> Result<HttpResponse, ServiceError> {
    let form = form.into_inner();
    let mut errors = FieldErrors::new();
    password(&mut errors, "password", &form.password);
    errors.into_result()?;

    let now = now_epoch();
    let ttl = config.reset_token_ttl_secs;
    let token = form.token.trim().to_owned();
    let invalid_token = || {
        ServiceError::Validation(FieldErrors::single(
            "token",
            "Password reset token is invalid or has expired.",
        ))
    };
    if !security::is_reset_token_valid(&token, now, ttl) {
        return Err(invalid_token());
    }

    let admin = web::block(move || -> Result<_, ServiceError> {
        let Some(admin) = registry.admins().find_by_reset_token(&token)? else {
            return Ok(None);
        };
        let password_hash = security::hash_password(&form.password)?;
        let auth_key = security::generate_auth_key();
        Ok(registry.admins().reset_password(admin.id, &password_hash, &auth_key, now)?)
    })
    .await??
    .ok_or_else(invalid_token)?;

    log::info!("Admin {} reset their password", admin.admin_id);
    Ok(HttpResponse::Ok().json(Res {
        message: "New password saved.".to_string(),
    }))
}

#[get("/admin")]
async fn index(
    _admin: CurrentAdmin,
    registry: web::Data<Registry>,
    config: web::Data<Config>,
    query: web::Query<AdminSearchParams>,
) -> Result<HttpResponse, ServiceError> {
    let params = query.into_inner();
    let request = params.page_request();
    let filter = params.into_filter();

    let page = web::block(move || registry.admins().search(&filter, request)).await??;

    let offset = config.utc_offset;
    Ok(HttpResponse::Ok().json(page.map(|admin| AdminView::new(&admin, &offset))))
}

#[post("/admin/create")]
async fn create(
    current: CurrentAdmin,
    registry: web::Data<Registry>,
    form: web::Json<NewAdminForm>,
) -> Result<HttpResponse, ServiceError> {
    let mut errors = FieldErrors::new();
    let admin_id = identifier(&mut errors, "admin_id", "Admin ID", &form.admin_id, 32);
    let admin_name = required(&mut errors, "admin_name", "Name", &form.admin_name, 64);
    let email = email(&mut errors, "email", &form.email);
    password(&mut errors, "password", &form.password);
    errors.into_result()?;

    let now = now_epoch();
    let plain_password = form.into_inner().password;
    let admin = web::block(move || -> Result<_, ServiceError> {
        let new_admin = NewAdmin {
            admin_id,
            admin_name,
            auth_key: security::generate_auth_key(),
            password_hash: security::hash_password(&plain_password)?,
            email,
            created_at: now,
            updated_at: now,
        };
        Ok(registry.admins().create(new_admin)?)
    })
    .await??;

    log::info!("Admin {} created admin {}", current.0.admin_id, admin.admin_id);
    Ok(see_other(format!("/admin/{}", admin.id)))
}

#[get("/admin/{id:\\d+}")]
async fn view(
    _admin: CurrentAdmin,
    registry: web::Data<Registry>,
    config: web::Data<Config>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let id = path.into_inner();
    let admin = found(web::block(move || registry.admins().find_by_id(id)).await??)?;
    Ok(HttpResponse::Ok().json(AdminView::new(&admin, &config.utc_offset)))
}

#[post("/admin/{id:\\d+}/delete")]
async fn delete(
    current: CurrentAdmin,
    registry: web::Data<Registry>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let id = path.into_inner();
    if id == current.id() {
        return Err(ServiceError::Conflict("You cannot delete your own account.".to_string()));
    }

    let deleted = web::block(move || registry.admins().delete(id)).await??;
    if !deleted {
        return Err(ServiceError::page_not_found());
    }

    log::info!("Admin {} deleted admin #{}", current.0.admin_id, id);
    Ok(see_other("/admin"))
}

/// Issues a reset token. Mail delivery is not wired up, so the token goes
/// back to the admin who asked for it.
#[post("/admin/{id:\\d+}/reset-token")]
async fn issue_reset_token(
    current: CurrentAdmin,
    registry: web::Data<Registry>,
    config: web::Data<Config>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let id = path.into_inner();
    let now = now_epoch();
    let token = security::generate_reset_token(now);

    let stored = token.clone();
    let admin = found(web::block(move || registry.admins().set_reset_token(id, &stored, now)).await??)?;

    log::info!("Admin {} issued a password reset token for {}", current.0.admin_id, admin.admin_id);
    Ok(HttpResponse::Ok().json(ResetTokenView {
        admin_id: admin.admin_id,
        token,
        expires_at: format_detail_time(now.saturating_add(config.reset_token_ttl_secs), &config.utc_offset),
    }))
}

#[get("/admin/application")]
async fn applications(
    _admin: CurrentAdmin,
    registry: web::Data<Registry>,
    config: web::Data<Config>,
    query: web::Query<ApplicationSearchParams>,
) -> Result<HttpResponse, ServiceError> {
    let now = now_epoch();
    let offset = config.utc_offset;
    let filter = query.to_filter(None, now, &offset);
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

/// Refused while another approved application holds the room.
#[post("/admin/application/{id:\\d+}/approve")]
async fn approve(
    current: CurrentAdmin,
    registry: web::Data<Registry>,
    config: web::Data<Config>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let id = path.into_inner();
    let now = now_epoch();

    let (application, room) = web::block(move || -> Result<_, ServiceError> {
        let application = match found(registry.applications().approve(id, now)?)? {
            Approval::Approved(application) => application,
            Approval::Conflicts(conflict_id) => {
                return Err(ServiceError::Conflict(format!(
                    "Application {} overlaps approved application {} for the same room.",
                    id, conflict_id
                )))
            }
        };
        let room = registry.rooms().find_by_id(application.room_id)?;
        Ok((application, room))
    })
    .await??;

    log::info!("Admin {} approved application {}", current.0.admin_id, id);
    Ok(HttpResponse::Ok().json(ApplicationView::new(&application, room.as_ref(), now, &config.utc_offset)))
}

#[post("/admin/application/{id:\\d+}/reject")]
async fn reject(
    current: CurrentAdmin,
    registry: web::Data<Registry>,
    config: web::Data<Config>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let id = path.into_inner();
    let now = now_epoch();

    let (application, room) = web::block(move || -> Result<_, ServiceError> {
        let application = found(registry.applications().set_status(id, ApplicationStatus::Rejected, now)?)?;
        let room = registry.rooms().find_by_id(application.room_id)?;
        Ok((application, room))
    })
    .await??;

    log::info!("Admin {} rejected application {}", current.0.admin_id, id);
    Ok(HttpResponse::Ok().json(ApplicationView::new(&application, room.as_ref(), now, &config.utc_offset)))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(login)
        .service(reset_password)
        .service(index)
        .service(create)
        .service(applications)
        .service(approve)
        .service(reject)
        .service(view)
        .service(delete)
        .service(issue_reset_token);
}
