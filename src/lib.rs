//! Room booking service: users apply for rooms, admins approve or reject,
//! and overlapping approved bookings are reported as conflicts.

use actix_web::{
    error::{InternalError, JsonPayloadError},
    web, HttpResponse, ResponseError,
};

pub mod actions;
pub mod auth;
pub mod config;
pub mod conflict;
pub mod error;
pub mod handlers;
pub mod models;
pub mod schema;
pub mod search;
pub mod security;
pub mod store;
pub mod timefmt;
pub mod views;

use crate::error::{Res, ServiceError};

/// Registers every route. Path ids are restricted to digits, so anything
/// else falls through to the default 404.
pub fn configure(cfg: &mut web::ServiceConfig) {
    handlers::application::configure(cfg);
    handlers::account::configure(cfg);
    handlers::room::configure(cfg);
    handlers::admin::configure(cfg);
}

/// Malformed JSON bodies become `400 {"message": ...}`.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let detail = err.to_string();
        let response = match err {
            JsonPayloadError::ContentType => HttpResponse::UnsupportedMediaType().json(Res {
                message: "Unsupported Media Type".to_string(),
            }),
            JsonPayloadError::Deserialize(ref err) => HttpResponse::BadRequest().json(Res {
                message: err.to_string(),
            }),
            _ => HttpResponse::BadRequest().json(Res { message: detail }),
        };
        InternalError::from_response(err, response).into()
    })
}

/// Query strings that cannot be deserialized become `400 {"message": ...}`.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::BadRequest().json(Res {
            message: err.to_string(),
        });
        InternalError::from_response(err, response).into()
    })
}

/// Path segments that pass the route pattern but not the extractor
/// (an id too large for `i32`) are reported like any missing record.
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| {
        InternalError::from_response(err, ServiceError::page_not_found().error_response()).into()
    })
}

/// Fallback for unmatched routes.
pub async fn not_found() -> Result<HttpResponse, ServiceError> {
    Err(ServiceError::page_not_found())
}
