use std::collections::BTreeMap;

use actix_web::{
    error::BlockingError,
    http::{header, StatusCode},
    HttpResponse, ResponseError,
};
use serde::Serialize;

use crate::security::HashError;

#[derive(Debug, Serialize)]
pub struct Res {
    pub message: String,
}

/// Field name to messages, in the shape the forms render them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_owned()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), ServiceError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(self))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("duplicate value for {0}")]
    Duplicate(String),

    #[error("database error: {0}")]
    Query(diesel::result::Error),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<diesel::result::Error> for StoreError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};

        match err {
            Error::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info) => {
                let field = info
                    .constraint_name()
                    .and_then(constraint_field)
                    .unwrap_or("value")
                    .to_owned();
                StoreError::Duplicate(field)
            }
            other => StoreError::Query(other),
        }
    }
}

// Postgres names unique constraints `<table>_<column>_key`.
fn constraint_field(constraint: &str) -> Option<&str> {
    let trimmed = constraint.strip_suffix("_key")?;
    let (_, column) = trimmed.split_once('_')?;
    Some(column)
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Login required.")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Data validation failed.")]
    Validation(FieldErrors),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Store(StoreError),
}

impl ServiceError {
    pub fn forbidden() -> Self {
        ServiceError::Forbidden("You are not allowed to perform this action.".into())
    }

    pub fn page_not_found() -> Self {
        ServiceError::NotFound("The requested page does not exist.".into())
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(field) => {
                ServiceError::Validation(FieldErrors::single(&field, format!("This {} has already been taken.", field)))
            }
            other => ServiceError::Store(other),
        }
    }
}

impl From<BlockingError> for ServiceError {
    fn from(err: BlockingError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

impl From<HashError> for ServiceError {
    fn from(err: HashError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

#[derive(Serialize)]
struct ValidationBody<'a> {
    message: String,
    errors: &'a FieldErrors,
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Internal(_) | ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        match self {
            ServiceError::Validation(errors) => HttpResponse::build(status).json(ValidationBody {
                message: self.to_string(),
                errors,
            }),
            ServiceError::Unauthorized => HttpResponse::build(status)
                .insert_header((header::WWW_AUTHENTICATE, "Bearer"))
                .json(Res { message: self.to_string() }),
            ServiceError::Internal(_) | ServiceError::Store(_) => {
                log::error!("Request failed: {:?}", self);
                HttpResponse::build(status).json(Res {
                    message: "Internal server error".to_string(),
                })
            }
            _ => HttpResponse::build(status).json(Res { message: self.to_string() }),
        }
    }
}
