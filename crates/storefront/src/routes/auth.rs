//! Authentication route handlers.
//!
//! Each request restores an [`AuthClient`] from the user kept in the session,
//! runs the auth operation through it and writes the resulting user back.

use axum::{Json, extract::State};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::middleware::{CurrentSession, clear_current_user, current_user, set_current_user};
use crate::services::auth::{AuthClient, SignUp};
use crate::services::session::SessionState;
use crate::state::AppState;

/// Sign-up form data.
#[derive(Deserialize)]
pub struct SignUpForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

async fn restore_client(state: &AppState, session: &Session) -> Result<AuthClient> {
    let user = current_user(session).await?;
    Ok(AuthClient::restore(state.auth().clone(), user))
}

/// Store the client's user in the session and resolve the session state.
async fn commit(state: &AppState, session: &Session, client: &AuthClient) -> Result<SessionState> {
    let user = client.current_user();
    if let Some(user) = &user {
        set_current_user(session, user).await?;
        set_sentry_user(&user.uid, Some(user.email.as_str()));
    }
    Ok(state.session_gate().observe(user).await)
}

/// Create an account and sign in.
#[instrument(skip_all)]
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<SignUpForm>,
) -> Result<Json<SessionState>> {
    let client = restore_client(&state, &session).await?;
    client
        .sign_up(SignUp {
            username: form.username,
            email: form.email,
            password: SecretString::from(form.password),
            confirm_password: SecretString::from(form.confirm_password),
        })
        .await?;
    add_breadcrumb("auth", "User signed up", &[]);

    Ok(Json(commit(&state, &session, &client).await?))
}

/// Sign in with email and password.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<LoginForm>,
) -> Result<Json<SessionState>> {
    let client = restore_client(&state, &session).await?;
    let password = SecretString::from(form.password);
    client.sign_in(&form.email, &password).await?;
    add_breadcrumb("auth", "User logged in", &[]);

    Ok(Json(commit(&state, &session, &client).await?))
}

/// Sign out. The session's cart is kept.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Json<SessionState>> {
    let client = restore_client(&state, &session).await?;
    client.sign_out();
    clear_current_user(&session).await?;
    clear_sentry_user();

    Ok(Json(state.session_gate().observe(client.current_user()).await))
}

/// The current session state.
pub async fn session(CurrentSession(state): CurrentSession) -> Json<SessionState> {
    Json(state)
}
