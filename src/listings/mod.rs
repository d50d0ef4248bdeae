//! Property listings: CRUD for owners, search and promo feeds for everyone.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod query;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/get", get(handlers::search_listings))
        .route("/get/:id", get(handlers::get_listing))
        .route("/getUpcoming", get(handlers::get_upcoming))
        .route("/create", post(handlers::create_listing))
        .route("/update/:id", put(handlers::update_listing))
        .route("/delete/:id", delete(handlers::delete_listing))
}
