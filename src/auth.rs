//! Identity extraction. Session handling and login live in the upstream
//! auth layer, which forwards the authenticated username in a trusted
//! header. Handlers take `User` when a login is mandatory and
//! `Option<User>` when anonymous access is allowed.

use std::future::{ready, Ready};

use actix_web::error::ErrorUnauthorized;
use actix_web::{dev::Payload, FromRequest, HttpRequest};

use crate::utils::is_valid_username;

pub const IDENTITY_HEADER: &str = "x-forwarded-user";

#[derive(Debug, Clone)]
pub struct User {
    pub username: String,
}

impl FromRequest for User {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user = req
            .headers()
            .get(IDENTITY_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|name| is_valid_username(name))
            .map(|name| User {
                username: name.to_string(),
            });
        ready(user.ok_or_else(|| ErrorUnauthorized("Not logged in")))
    }
}
