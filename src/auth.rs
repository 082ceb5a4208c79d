use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::api::error::ApiError;
use crate::session::AppState;

/// Expected bearer token, pulled out of the app state by the extractor.
#[derive(Clone)]
pub struct ExpectedToken(pub String);

impl FromRef<AppState> for ExpectedToken {
    fn from_ref(state: &AppState) -> Self {
        Self(state.cfg.auth.token.clone())
    }
}

/// Extractor that rejects requests without a matching `Bearer` token.
#[derive(Debug, Clone)]
pub struct AuthBearer;

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthBearer
where
    ExpectedToken: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let expected = ExpectedToken::from_ref(state).0;
        let presented = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        match presented {
            Some(token) if token == expected => Ok(Self),
            _ => Err(ApiError::Unauthorized),
        }
    }
}
