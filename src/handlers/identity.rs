use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use uuid::Uuid;

use crate::domain::identity::{Identity, Role};
use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const ROLE_HEADER: &str = "x-user-role";

/// Identity injected by the upstream auth gateway. The service trusts
/// these headers; credential verification happens before requests get
/// here. Missing or malformed values are a 401, an unknown role too.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Identity);

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(extract(req))
    }
}

fn extract(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value).ok())
        .ok_or(AppError::Unauthorized)?;

    let role = match req.headers().get(ROLE_HEADER) {
        None => Role::Customer,
        Some(value) => value
            .to_str()
            .ok()
            .and_then(Role::parse)
            .ok_or(AppError::Unauthorized)?,
    };

    Ok(AuthenticatedUser(Identity { user_id, role }))
}
