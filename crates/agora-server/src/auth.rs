use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use agora_types::UserId;

use crate::error::ServerError;

/// Header carrying the caller's user id, set by the authenticating proxy in
/// front of this service.
pub const CALLER_HEADER: &str = "x-agora-user";

/// The already-authenticated user making a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Caller(pub UserId);

impl Caller {
    pub fn id(&self) -> UserId {
        self.0
    }

    fn from_parts(parts: &Parts) -> Result<Self, ServerError> {
        let unauthenticated = ServerError::Unauthenticated;
        let value = parts
            .headers
            .get(CALLER_HEADER)
            .ok_or_else(|| unauthenticated(format!("missing {CALLER_HEADER} header")))?;
        let raw = value
            .to_str()
            .map_err(|_| unauthenticated(format!("{CALLER_HEADER} is not valid text")))?;
        raw.parse::<UserId>()
            .map(Self)
            .map_err(|_| unauthenticated(format!("{CALLER_HEADER} is not a user id: {raw}")))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_parts(parts)
    }
}
