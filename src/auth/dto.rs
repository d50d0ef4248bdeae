use serde::{Deserialize, Serialize};

use crate::users::dto::PublicUser;

/// Request body for account creation.
#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request body for credential sign-in.
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Profile handed over by the client after a federated (Google) sign-in.
/// The OAuth flow itself happens client-side.
#[derive(Debug, Deserialize)]
pub struct GoogleAuthRequest {
    pub name: String,
    pub email: String,
    pub photo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

/// Response for signin/google: bearer token plus the public profile.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

/// Plain acknowledgement envelope.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}
