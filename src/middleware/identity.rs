use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;
use uuid::Uuid;

use crate::{models::Identity, services::IdentityResolver};

/// Header carrying the signed-in player, set by the auth gateway in front of this service
pub const USER_ID_HEADER: &str = "x-user-id";

/// The player behind a request, if the gateway vouched for one
///
/// A missing or malformed header yields an anonymous user rather than a rejection:
/// anonymous players can still play, only their scores are not saved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CurrentUser(pub Option<Identity>);

impl CurrentUser {
    fn from_parts(parts: &Parts) -> Self {
        let identity = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .map(Identity);

        if identity.is_none() && parts.headers.contains_key(USER_ID_HEADER) {
            tracing::warn!("Ignoring malformed user id header");
        }

        Self(identity)
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

impl IdentityResolver for CurrentUser {
    fn current_identity(&self) -> Option<Identity> {
        self.0
    }
}
