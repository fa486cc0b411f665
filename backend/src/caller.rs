//! Identity of the caller, as forwarded by the authenticating proxy.
//!
//! Credentials are verified upstream; this only reads the resulting user id
//! so history can be scoped per user.

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use std::future::{ready, Ready};

pub const USER_HEADER: &str = "X-User-Id";
const ANONYMOUS: &str = "anonymous";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub String);

impl FromRequest for Caller {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let id = req
            .headers()
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(ANONYMOUS);
        ready(Ok(Caller(id.to_string())))
    }
}
