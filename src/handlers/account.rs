use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;

use super::{email, found, identifier, password, see_other};
use crate::auth::CurrentUser;
use crate::config::Config;
use crate::error::{FieldErrors, ServiceError};
use crate::models::{NewUser, UserProfileChanges, USER_STATUS_ACTIVE};
use crate::security;
use crate::store::Registry;
use crate::timefmt::now_epoch;
use crate::views::{AccountView, SessionView};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupForm {
    pub student_id: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Absent fields keep their current value.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub username: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChangePasswordForm {
    pub old_password: String,
    pub new_password: String,
    pub password_repeat: String,
}

fn ensure_self(user: &CurrentUser, id: i32) -> Result<(), ServiceError> {
    if user.id() == id {
        Ok(())
    } else {
        Err(ServiceError::forbidden())
    }
}

#[post("/site/signup")]
async fn signup(registry: web::Data<Registry>, form: web::Json<SignupForm>) -> Result<HttpResponse, ServiceError> {
    let mut errors = FieldErrors::new();
    let student_id = identifier(&mut errors, "student_id", "Student ID", &form.student_id, 32);
    let username = identifier(&mut errors, "username", "Username", &form.username, 64);
    let email = email(&mut errors, "email", &form.email);
    password(&mut errors, "password", &form.password);
    errors.into_result()?;

    let now = now_epoch();
    let plain_password = form.into_inner().password;
    let user = web::block(move || -> Result<_, ServiceError> {
        let new_user = NewUser {
            student_id,
            username,
            auth_key: security::generate_auth_key(),
            password_hash: security::hash_password(&plain_password)?,
            email,
            status: USER_STATUS_ACTIVE,
            created_at: now,
            updated_at: now,
        };
        Ok(registry.users().create(new_user)?)
    })
    .await??;

    log::info!("User {} signed up (id {})", user.username, user.id);
    Ok(HttpResponse::Created().json(SessionView {
        id: user.id,
        auth_key: user.auth_key,
    }))
}

#[post("/site/login")]
async fn login(registry: web::Data<Registry>, form: web::Json<LoginForm>) -> Result<HttpResponse, ServiceError> {
    let LoginForm { username, password } = form.into_inner();

    let user = web::block(move || -> Result<_, ServiceError> {
        let user = registry.users().find_by_username(username.trim())?;
        Ok(user.filter(|user| security::verify_password(&password, &user.password_hash)))
    })
    .await??;

    match user {
        Some(user) => {
            if !user.is_active() {
                return Err(ServiceError::Validation(FieldErrors::single(
                    "username",
                    "This account is not active.",
                )));
            }
            log::info!("User {} signed in", user.username);
            Ok(HttpResponse::Ok().json(SessionView {
                id: user.id,
                auth_key: user.auth_key,
            }))
        }
        _ => Err(ServiceError::Validation(FieldErrors::single(
            "password",
            "Incorrect username or password.",
        ))),
    }
}

#[get("/user/{id:\\d+}")]
async fn view(
    user: CurrentUser,
    registry: web::Data<Registry>,
    config: web::Data<Config>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let id = path.into_inner();
    ensure_self(&user, id)?;

    let account = found(web::block(move || registry.users().find_by_id(id)).await??)?;
    Ok(HttpResponse::Ok().json(AccountView::new(&account, &config.utc_offset)))
}

#[post("/user/{id:\\d+}/update")]
async fn update(
    user: CurrentUser,
    registry: web::Data<Registry>,
    path: web::Path<i32>,
    form: web::Json<ProfileForm>,
) -> Result<HttpResponse, ServiceError> {
    let id = path.into_inner();
    ensure_self(&user, id)?;

    let mut errors = FieldErrors::new();
    let changes = UserProfileChanges {
        username: form
            .username
            .as_deref()
            .map(|v| identifier(&mut errors, "username", "Username", v, 64)),
        email: form.email.as_deref().map(|v| email(&mut errors, "email", v)),
        updated_at: now_epoch(),
    };
    errors.into_result()?;

    let account = found(web::block(move || registry.users().update_profile(id, changes)).await??)?;

    log::info!("User {} updated their profile", account.id);
    Ok(see_other(format!("/user/{}", account.id)))
}

/// Changing the password rotates the auth key; the new one is returned.
#[post("/user/{id:\\d+}/resetpwd")]
async fn change_password(
    user: CurrentUser,
    registry: web::Data<Registry>,
    path: web::Path<i32>,
    form: web::Json<ChangePasswordForm>,
) -> Result<HttpResponse, ServiceError> {
    let id = path.into_inner();
    ensure_self(&user, id)?;

    let form = form.into_inner();
    let current_hash = user.0.password_hash;
    let now = now_epoch();

    let account = web::block(move || -> Result<_, ServiceError> {
        let mut errors = FieldErrors::new();
        if !security::verify_password(&form.old_password, &current_hash) {
            errors.add("old_password", "Incorrect password.");
        }
        password(&mut errors, "new_password", &form.new_password);
        if form.password_repeat != form.new_password {
            errors.add("password_repeat", "Passwords do not match.");
        }
        errors.into_result()?;

        let password_hash = security::hash_password(&form.new_password)?;
        let auth_key = security::generate_auth_key();
        found(registry.users().update_password(id, &password_hash, &auth_key, now)?)
    })
    .await??;

    log::info!("User {} changed their password", account.id);
    Ok(HttpResponse::Ok().json(SessionView {
        id: account.id,
        auth_key: account.auth_key,
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(signup)
        .service(login)
        .service(view)
        .service(update)
        .service(change_password);
}
