use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::{AuthError, SubjectIdentity};
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated caller context extracted from the verified credential and
/// attached to the request extensions for the controllers.
#[derive(Clone, Debug)]
pub struct AuthSubject {
    pub subject: String,
    pub email: Option<String>,
}

impl From<SubjectIdentity> for AuthSubject {
    fn from(identity: SubjectIdentity) -> Self {
        Self {
            subject: identity.subject,
            email: identity.email,
        }
    }
}

/// Bearer authentication middleware. Every item route runs through here; no
/// controller executes until verification succeeds. Rejection halts the
/// request with a 401 and a generic body - verifier detail is logged, never
/// echoed.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())?;

    match state.identity.verify_token(&token).await {
        Ok(identity) => {
            request.extensions_mut().insert(AuthSubject::from(identity));
            Ok(next.run(request).await)
        }
        Err(AuthError::ProviderUnavailable(detail)) => {
            tracing::error!("Identity provider error: {}", detail);
            Err(ApiError::service_unavailable(
                "Identity provider temporarily unavailable",
            ))
        }
        Err(err) => {
            tracing::warn!("Credential verification failed: {}", err);
            Err(ApiError::unauthorized("Invalid or expired token"))
        }
    }
}

/// Extract the bearer credential from the Authorization header.
fn bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| ApiError::unauthorized("Missing or invalid Authorization header"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Missing or invalid Authorization header"))?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.to_string()),
        _ => Err(ApiError::unauthorized(
            "Missing or invalid Authorization header",
        )),
    }
}
