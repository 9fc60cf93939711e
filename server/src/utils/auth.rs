use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::utils::error::AppError;

/// Header the upstream authentication layer sets to the signed-in user id.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// The authenticated user behind a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorIdentity {
    pub user_id: i64,
}

#[async_trait]
impl<S> FromRequestParts<S> for ActorIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ACTOR_HEADER)
            .ok_or_else(|| AppError::AuthError("Authentication required".to_string()))?;

        let user_id = raw
            .to_str()
            .ok()
            .and_then(|value| value.trim().parse::<i64>().ok())
            .ok_or_else(|| AppError::AuthError("Invalid actor identity".to_string()))?;

        Ok(Self { user_id })
    }
}
