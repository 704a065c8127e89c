//! Identity extraction for request handlers.
//!
//! Authentication happens upstream; this server trusts the `x-user-id`
//! header set by the authenticating proxy and treats the value as an opaque
//! owner identifier. Every query is scoped by it.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{Error, database_id::UserId};

/// The name of the header carrying the authenticated user's identifier.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The identity of the user making the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.trim().is_empty())
            .ok_or(Error::Unauthenticated)?;

        Ok(CurrentUser(user_id.to_owned()))
    }
}
