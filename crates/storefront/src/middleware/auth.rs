//! Authentication extractors.
//!
//! Every request resolves its session through a fresh
//! [`SessionGate`](crate::services::session::SessionGate): the signed-in user
//! stored in the session cookie is observed once and the admin role is
//! looked up from `users/{uid}`. Guards reject with JSON 401/403 responses.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::baas::AuthUser;
use crate::error::AppError;
use crate::models::{CurrentUser, session_keys};
use crate::services::session::{SessionState, SessionUser};
use crate::state::AppState;

fn session_from_parts(parts: &Parts) -> Result<Session, AppError> {
    parts
        .extensions
        .get::<Session>()
        .cloned()
        .ok_or_else(|| AppError::Internal("session layer missing".to_string()))
}

/// The resolved session state of the current request.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(CurrentSession(state): CurrentSession) -> impl IntoResponse {
///     if state.is_admin() { "hello admin" } else { "hello" }
/// }
/// ```
pub struct CurrentSession(pub SessionState);

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = session_from_parts(parts)?;
        let user = current_user(&session).await?;
        let gate = state.session_gate();
        Ok(Self(gate.observe(user).await))
    }
}

/// Extractor that requires a signed-in user.
pub struct RequireAuth(pub SessionUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentSession(session) = CurrentSession::from_request_parts(parts, state).await?;
        match session {
            SessionState::Authenticated(user) => Ok(Self(user)),
            SessionState::Unknown | SessionState::Anonymous => {
                Err(AppError::Unauthorized("sign in required".to_string()))
            }
        }
    }
}

/// Extractor that requires a signed-in admin.
pub struct RequireAdmin(pub SessionUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if !user.is_admin {
            tracing::warn!(uid = %user.uid, path = %parts.uri.path(), "non-admin denied");
            return Err(AppError::Forbidden("admin access required".to_string()));
        }
        Ok(Self(user))
    }
}

/// The signed-in user stored in the session, if any.
///
/// # Errors
///
/// Returns an error if the session cannot be read.
pub async fn current_user(
    session: &Session,
) -> Result<Option<CurrentUser>, tower_sessions::session::Error> {
    session.get(session_keys::CURRENT_USER).await
}

/// Helper to set the current user in the session.
///
/// The session id is cycled to prevent fixation.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &AuthUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// The cart stays with the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    session
        .remove::<serde_json::Value>(session_keys::LAST_RECEIPT)
        .await?;
    Ok(())
}
