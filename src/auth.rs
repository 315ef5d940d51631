//! Bearer-token extractors. The token is the account's `auth_key`.

use std::future::Future;
use std::pin::Pin;

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};

use crate::error::ServiceError;
use crate::models::{Admin, User};
use crate::store::Registry;

/// An authenticated, active user.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// An authenticated administrator.
#[derive(Debug, Clone)]
pub struct CurrentAdmin(pub Admin);

impl CurrentUser {
    pub fn id(&self) -> i32 {
        self.0.id
    }
}

impl CurrentAdmin {
    pub fn id(&self) -> i32 {
        self.0.id
    }
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_owned())
}

fn registry(req: &HttpRequest) -> Result<web::Data<Registry>, ServiceError> {
    req.app_data::<web::Data<Registry>>()
        .cloned()
        .ok_or_else(|| ServiceError::Internal("store registry is not configured".to_string()))
}

type ExtractFuture<T> = Pin<Box<dyn Future<Output = Result<T, ServiceError>>>>;

impl FromRequest for CurrentUser {
    type Error = ServiceError;
    type Future = ExtractFuture<Self>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = bearer_token(req);
        let registry = registry(req);

        Box::pin(async move {
            let token = token.ok_or(ServiceError::Unauthorized)?;
            let registry = registry?;
            let user = web::block(move || registry.users().find_by_auth_key(&token)).await??;

            match user {
                Some(user) if user.is_active() => Ok(CurrentUser(user)),
                Some(user) => {
                    log::info!("Rejected token of inactive user {}", user.id);
                    Err(ServiceError::Unauthorized)
                }
                None => Err(ServiceError::Unauthorized),
            }
        })
    }
}

impl FromRequest for CurrentAdmin {
    type Error = ServiceError;
    type Future = ExtractFuture<Self>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = bearer_token(req);
        let registry = registry(req);

        Box::pin(async move {
            let token = token.ok_or(ServiceError::Unauthorized)?;
            let registry = registry?;
            let admin = web::block(move || registry.admins().find_by_auth_key(&token)).await??;

            admin.map(CurrentAdmin).ok_or(ServiceError::Unauthorized)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn reads_bearer_tokens_only() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer abc123"))
            .to_http_request();
        assert_eq!(bearer_token(&req).as_deref(), Some("abc123"));

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "bearer   xyz "))
            .to_http_request();
        assert_eq!(bearer_token(&req).as_deref(), Some("xyz"));

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Basic dXNlcjpwYXNz"))
            .to_http_request();
        assert_eq!(bearer_token(&req), None);

        assert_eq!(bearer_token(&TestRequest::default().to_http_request()), None);
    }
}
