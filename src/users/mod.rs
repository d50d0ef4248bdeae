//! Account profiles and the favorites list.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/update/:id", post(handlers::update_user))
        .route("/delete/:id", delete(handlers::delete_user))
        .route("/listings/:id", get(handlers::get_user_listings))
        .route("/favorites/get", get(handlers::get_favorites))
        .route("/favorites/:listing_id", post(handlers::toggle_favorite))
        .route("/:id", get(handlers::get_user))
}
