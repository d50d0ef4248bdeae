use axum::async_trait;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::dto::MessageResponse;
use crate::auth::extractors::AuthUser;
use crate::authz::authorize;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

use super::dto::{ListingPayload, ListingResponse, SearchResponse};
use super::query::SearchCriteria;
use super::repo::Listing;

#[instrument(skip(state, payload))]
pub async fn create_listing(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ListingPayload>,
) -> ApiResult<(StatusCode, Json<ListingResponse>)> {
    payload.validate()?;
    let payload = payload.normalized();

    let listing = Listing::create(&state.db, user_id, &payload).await?;
    info!(listing_id = %listing.id, owner_id = %user_id, "listing created");
    Ok((StatusCode::CREATED, Json(listing.into())))
}

#[instrument(skip(state))]
pub async fn get_listing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ListingResponse>> {
    let listing = Listing::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Listing not found"))?;
    Ok(Json(listing.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_listing(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ListingPayload>,
) -> ApiResult<Json<ListingResponse>> {
    let existing = Listing::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Listing not found"))?;
    authorize(user_id, existing.owner_id).require("You can only update your own listing!")?;

    payload.validate()?;
    let payload = payload.normalized();

    let updated = Listing::update(&state.db, id, &payload)
        .await?
        .ok_or_else(|| ApiError::not_found("Listing not found"))?;
    info!(listing_id = %id, "listing updated");
    Ok(Json(updated.into()))
}

#[instrument(skip(state))]
pub async fn delete_listing(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    let existing = Listing::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Listing not found"))?;
    authorize(user_id, existing.owner_id).require("You can only delete your own listing!")?;

    if !Listing::delete(&state.db, id).await? {
        return Err(ApiError::not_found("Listing not found"));
    }
    info!(listing_id = %id, "listing deleted");
    Ok(Json(MessageResponse::ok("Listing has been deleted!")))
}

/// `Query<SearchCriteria>` with rejections rewritten into the shared error
/// envelope, so an unknown `city` or a bad `bedrooms` value 400s the same
/// way every other validation failure does.
#[derive(Debug)]
pub struct SearchQuery(pub SearchCriteria);

#[async_trait]
impl<S> FromRequestParts<S> for SearchQuery
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(criteria) = Query::<SearchCriteria>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::validation(e.body_text()))?;
        Ok(SearchQuery(criteria))
    }
}

/// Storefront search. Criteria arrive as query parameters; anything outside
/// the whitelisted vocabulary was already rejected by deserialization.
#[instrument(skip(state))]
pub async fn search_listings(
    State(state): State<AppState>,
    SearchQuery(criteria): SearchQuery,
) -> ApiResult<Json<SearchResponse>> {
    let (listings, total_listings) = Listing::search(&state.db, &criteria).await?;
    Ok(Json(SearchResponse {
        listings: listings.into_iter().map(ListingResponse::from).collect(),
        total_listings,
    }))
}

#[instrument(skip(state))]
pub async fn get_upcoming(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ListingResponse>>> {
    let listings = Listing::upcoming(&state.db).await?;
    Ok(Json(
        listings.into_iter().map(ListingResponse::from).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;
    use crate::listings::query::TypeFilter;

    fn parts_for(uri: &str) -> Parts {
        let (parts, _) = Request::builder()
            .uri(uri)
            .body(())
            .expect("request")
            .into_parts();
        parts
    }

    #[tokio::test]
    async fn search_query_parses_the_query_string() {
        let mut parts = parts_for("/api/listing/get?type=rent&limit=5");
        let SearchQuery(criteria) = SearchQuery::from_request_parts(&mut parts, &())
            .await
            .expect("criteria");
        assert_eq!(criteria.kind, TypeFilter::Rent);
        assert_eq!(criteria.limit, 5);
    }

    #[tokio::test]
    async fn search_query_rejections_use_the_error_envelope() {
        let mut parts = parts_for("/api/listing/get?city=Atlantis");
        let err = SearchQuery::from_request_parts(&mut parts, &())
            .await
            .expect_err("unknown city must be rejected");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("Atlantis"));
    }
}
