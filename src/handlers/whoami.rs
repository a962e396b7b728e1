use axum::{
    extract::{Extension, State},
    response::Json,
};

use crate::auth::UserProfile;
use crate::error::ApiError;
use crate::middleware::AuthSubject;
use crate::state::AppState;

/// GET /auth/whoami - resolve the caller's profile through the identity
/// provider. The subject comes from the verified credential, so callers can
/// only ever look themselves up.
pub async fn whoami(
    State(state): State<AppState>,
    Extension(subject): Extension<AuthSubject>,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = state.identity.get_user(&subject.subject).await?;
    Ok(Json(profile))
}
