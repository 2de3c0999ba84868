//! Account route handlers (require a signed-in user).

use axum::{Json, extract::State};
use tower_sessions::Session;
use tracing::instrument;

use crate::baas::{AuthUser, ProfileUpdate};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAuth, current_user};
use crate::models::{Purchase, session_keys};
use crate::services::auth::AuthClient;
use crate::state::AppState;

/// Update the signed-in user's display name or photo URL.
///
/// Blank fields keep their current value.
#[instrument(skip_all, fields(uid = %user.uid))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<AuthUser>> {
    let signed_in = current_user(&session)
        .await?
        .ok_or_else(|| AppError::Unauthorized("sign in required".to_string()))?;
    let client = AuthClient::restore(state.auth().clone(), Some(signed_in));

    let updated = client.update_profile(update).await?;
    session.insert(session_keys::CURRENT_USER, &updated).await?;
    Ok(Json(updated))
}

/// The signed-in user's purchase history.
#[instrument(skip_all, fields(uid = %user.uid))]
pub async fn purchases(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Purchase>>> {
    Ok(Json(state.checkout().purchases_for(&user.uid).await?))
}
