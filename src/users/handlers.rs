use axum::extract::{Path, State};
use axum::Json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::dto::MessageResponse;
use crate::auth::extractors::AuthUser;
use crate::auth::password::hash_password;
use crate::auth::validate::{validate_email, validate_password, validate_username};
use crate::authz::authorize;
use crate::error::{is_unique_violation, ApiError, ApiResult};
use crate::listings::dto::ListingResponse;
use crate::listings::repo::Listing;
use crate::state::AppState;

use super::dto::{FavoriteToggleResponse, PublicUser, UpdateUserRequest};
use super::repo::User;

/// Public profile lookup; any signed-in user may resolve another account,
/// the contact flow depends on it.
#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(_requester): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PublicUser>> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, body))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateUserRequest>,
) -> ApiResult<Json<PublicUser>> {
    authorize(requester, id).require("You can only update your own account!")?;

    if let Some(username) = &body.username {
        validate_username(username)?;
    }
    if let Some(email) = &body.email {
        validate_email(email)?;
    }
    let password_hash = match &body.password {
        Some(password) => {
            validate_password(password)?;
            Some(hash_password(password)?)
        }
        None => None,
    };

    let updated = User::update_profile(
        &state.db,
        id,
        body.username.as_deref(),
        body.email.as_deref(),
        password_hash.as_deref(),
        body.avatar.as_deref(),
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::validation("Username or email is already taken")
        } else {
            ApiError::from(e)
        }
    })?
    .ok_or_else(|| ApiError::not_found("User not found"))?;

    info!(user_id = %id, "profile updated");
    Ok(Json(updated.into()))
}

/// Closes an account. Outstanding bearer tokens for it die with the row:
/// every authenticated request re-checks that its subject still exists.
#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    authorize(requester, id).require("You can only delete your own account!")?;

    if !User::delete(&state.db, id).await? {
        return Err(ApiError::not_found("User not found"));
    }
    info!(user_id = %id, "account deleted");
    Ok(Json(MessageResponse::ok("User has been deleted!")))
}

#[instrument(skip(state))]
pub async fn get_user_listings(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<ListingResponse>>> {
    authorize(requester, id).require("You can only view your own listings!")?;

    let listings = Listing::list_by_owner(&state.db, id).await?;
    Ok(Json(
        listings.into_iter().map(ListingResponse::from).collect(),
    ))
}

/// Adds or removes one listing from the caller's favorites. Removal is
/// allowed even when the listing is gone so stale entries can be cleaned
/// up; adding a listing that never existed is a 404.
#[instrument(skip(state))]
pub async fn toggle_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(listing_id): Path<Uuid>,
) -> ApiResult<Json<FavoriteToggleResponse>> {
    let status = User::favorite_status(&state.db, user_id, listing_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    if !status.is_favorite && !status.listing_exists {
        return Err(ApiError::not_found("Listing not found"));
    }

    let is_favorite = User::toggle_favorite(&state.db, user_id, listing_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    info!(user_id = %user_id, listing_id = %listing_id, is_favorite, "favorite toggled");
    let message = if is_favorite {
        "Added to favorites"
    } else {
        "Removed from favorites"
    };
    Ok(Json(FavoriteToggleResponse {
        success: true,
        is_favorite,
        message: message.into(),
    }))
}

#[instrument(skip(state))]
pub async fn get_favorites(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Vec<ListingResponse>>> {
    let listings = User::favorite_listings(&state.db, user_id).await?;
    Ok(Json(
        listings.into_iter().map(ListingResponse::from).collect(),
    ))
}
