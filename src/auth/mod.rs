//! Credentials and sessions: signup, sign-in (password and federated),
//! stateless signout, and the password-reset loop.

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod reset;
pub mod validate;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(handlers::signup))
        .route("/signin", post(handlers::signin))
        .route("/google", post(handlers::google))
        .route("/signout", get(handlers::signout))
        .route("/forgot-password", post(handlers::forgot_password))
        .route("/reset-password/:token", post(handlers::reset_password))
}
