use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::dto::{AdoptBody, OwnerRequestsQuery, RequestResponse};
use super::repo_types::AdoptionRequest;
use super::services;
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    pets::{self, dto::PetView},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/adopt/:id/", post(adopt_pet))
        .route("/my-requests/", get(my_requests))
        .route("/owner-requests/", get(owner_requests))
        .route("/update-request/:id/:status/", post(update_request))
        .route("/my-adopted-pets/", get(my_adopted_pets))
}

fn parse_pet_filter(raw: Option<&str>) -> AppResult<Option<i64>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse::<i64>()
            .map(Some)
            .map_err(|_| AppError::field("pet_id", "Enter a whole number.")),
    }
}

/// An empty body means no message. Anything else has to be valid JSON.
fn parse_adopt_body(raw: &[u8]) -> AppResult<AdoptBody> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(AdoptBody::default());
    }
    serde_json::from_slice(raw)
        .map_err(|e| AppError::field("body", format!("Invalid JSON body: {}", e)))
}

/// POST /adopt/:id/ with an optional `{ "message": "..." }` body.
#[instrument(skip(state, body))]
pub async fn adopt_pet(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(pet_id): Path<i64>,
    body: Bytes,
) -> AppResult<(StatusCode, Json<RequestResponse>)> {
    let body = parse_adopt_body(&body)?;
    let request = services::request_adoption(&state, pet_id, user_id, body.message.as_deref()).await?;
    Ok((
        StatusCode::CREATED,
        Json(RequestResponse {
            message: format!("You have requested to adopt {}!", request.pet_name),
            request,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn my_requests(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<AdoptionRequest>>> {
    Ok(Json(services::list_by_requester(&state, user_id).await?))
}

#[instrument(skip(state))]
pub async fn owner_requests(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(params): Query<OwnerRequestsQuery>,
) -> AppResult<Json<Vec<AdoptionRequest>>> {
    let pet_id = parse_pet_filter(params.pet_id.as_deref())?;
    Ok(Json(services::list_for_owner(&state, user_id, pet_id).await?))
}

#[instrument(skip(state))]
pub async fn update_request(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((request_id, status)): Path<(i64, String)>,
) -> AppResult<Json<RequestResponse>> {
    let decision = services::parse_decision(&status)?;
    let request = services::decide(&state, request_id, user_id, decision).await?;
    Ok(Json(RequestResponse {
        message: format!("Request has been {}.", request.status),
        request,
    }))
}

#[instrument(skip(state))]
pub async fn my_adopted_pets(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<PetView>>> {
    let pets = services::list_adopted_pets(&state, user_id).await?;
    Ok(Json(pets::services::to_views(&state, pets).await))
}
