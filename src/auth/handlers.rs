use axum::extract::{FromRef, Path, State};
use axum::http::StatusCode;
use axum::Json;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{info, instrument, warn};

use crate::error::{is_unique_violation, ApiError, ApiResult};
use crate::state::AppState;
use crate::users::repo::User;

use super::dto::{
    AuthResponse, ForgotPasswordRequest, GoogleAuthRequest, MessageResponse, ResetPasswordRequest,
    SignInRequest, SignUpRequest,
};
use super::jwt::JwtKeys;
use super::password::{hash_password, verify_password};
use super::reset;
use super::validate::{validate_email, validate_password, validate_username};

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignUpRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let username = payload.username.trim().to_string();
    let email = payload.email.trim().to_lowercase();
    validate_username(&username)?;
    validate_email(&email)?;
    validate_password(&payload.password)?;

    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!(email = %email, "signup for registered email");
        return Err(ApiError::validation("Email is already registered"));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, &username, &email, &password_hash, None)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::validation("Username or email is already taken")
            } else {
                ApiError::from(e)
            }
        })?;

    info!(user_id = %user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::ok("User created successfully!")),
    ))
}

/// Password sign-in. Unknown email and wrong password get the same answer,
/// so the endpoint does not confirm which addresses have accounts.
#[instrument(skip(state, payload))]
pub async fn signin(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let email = payload.email.trim().to_lowercase();

    let user = match User::find_by_email(&state.db, &email).await? {
        Some(user) => user,
        None => {
            warn!("sign-in for unknown email");
            return Err(ApiError::unauthorized("Invalid credentials"));
        }
    };
    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "sign-in with wrong password");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let token = JwtKeys::from_ref(&state).sign_session(user.id)?;
    info!(user_id = %user.id, "user signed in");
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

/// Federated sign-in. The identity provider already vouched for the email;
/// first visit provisions an account with a derived username and a random
/// password, after that it behaves like a plain sign-in.
#[instrument(skip(state, payload))]
pub async fn google(
    State(state): State<AppState>,
    Json(payload): Json<GoogleAuthRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let email = payload.email.trim().to_lowercase();
    validate_email(&email)?;

    let user = match User::find_by_email(&state.db, &email).await? {
        Some(user) => user,
        None => {
            let username = generate_username(&payload.name);
            let password_hash = hash_password(&random_password())?;
            let user = User::create(
                &state.db,
                &username,
                &email,
                &password_hash,
                payload.photo.as_deref(),
            )
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ApiError::validation("Username or email is already taken")
                } else {
                    ApiError::from(e)
                }
            })?;
            info!(user_id = %user.id, "account provisioned for federated sign-in");
            user
        }
    };

    let token = JwtKeys::from_ref(&state).sign_session(user.id)?;
    info!(user_id = %user.id, "federated sign-in");
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

/// Sessions are bearer tokens the client simply discards; the endpoint
/// exists so the client has something to call and acknowledges the intent.
#[instrument]
pub async fn signout() -> Json<MessageResponse> {
    Json(MessageResponse::ok("User has been signed out!"))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let email = payload.email.trim().to_lowercase();
    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let _token = reset::issue(&state.db, user.id, state.config.reset_token_ttl_minutes).await?;
    // TODO: hand the token to the mailer once the email service lands
    info!(user_id = %user.id, "password reset token issued");
    Ok(Json(MessageResponse::ok(
        "Password reset link has been sent to your email",
    )))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    // check the new password before spending the single-use token
    validate_password(&payload.password)?;

    let user_id = reset::consume(&state.db, &token)
        .await?
        .ok_or_else(|| ApiError::validation("Invalid or expired reset token"))?;

    let password_hash = hash_password(&payload.password)?;
    if !User::set_password(&state.db, user_id, &password_hash).await? {
        return Err(ApiError::not_found("User not found"));
    }

    info!(user_id = %user_id, "password reset completed");
    Ok(Json(MessageResponse::ok(
        "Password has been reset successfully!",
    )))
}

/// Username for a provisioned account: provider display name squeezed to
/// the username alphabet plus a short random suffix to dodge collisions.
fn generate_username(name: &str) -> String {
    let base: String = name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(26)
        .collect::<String>()
        .to_lowercase();
    let base = if base.is_empty() { "user".to_string() } else { base };
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(4)
        .map(char::from)
        .collect::<String>()
        .to_lowercase();
    format!("{base}{suffix}")
}

/// Throwaway credential for accounts that only ever sign in federated.
fn random_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}
