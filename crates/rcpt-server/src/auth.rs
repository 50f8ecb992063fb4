use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::error::{ServerError, ServerResult};

/// Header carrying the caller's opaque identity token.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The caller, as named by the `X-User-ID` header.
///
/// The token is opaque and trusted as-is; it is only compared against a
/// receipt's owner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
}

impl Identity {
    pub fn user(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into() }
    }

    pub fn from_headers(headers: &HeaderMap) -> ServerResult<Self> {
        let value = headers.get(USER_ID_HEADER).ok_or(ServerError::MissingIdentity)?;
        let user_id = value
            .to_str()
            .map_err(|_| ServerError::InvalidRequest("X-User-ID header must be visible ASCII".into()))?;
        if user_id.trim().is_empty() {
            return Err(ServerError::MissingIdentity);
        }
        Ok(Self::user(user_id))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
    }
}
